//! Browser registry and query configuration

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::platform::Platform;

/// Browsers supported for cookie extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Browser {
    Chrome,
    Chromium,
    Edge,
    Brave,
    Arc,
    Opera,
    OperaGx,
    Vivaldi,
    Whale,
    Firefox,
    Safari,
}

/// Engine family a browser stores its cookies with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Chromium,
    Gecko,
    WebKit,
}

impl Browser {
    pub fn family(&self) -> Family {
        match self {
            Browser::Firefox => Family::Gecko,
            Browser::Safari => Family::WebKit,
            _ => Family::Chromium,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Browser::Chrome => "Chrome",
            Browser::Chromium => "Chromium",
            Browser::Edge => "Edge",
            Browser::Brave => "Brave",
            Browser::Arc => "Arc",
            Browser::Opera => "Opera",
            Browser::OperaGx => "Opera GX",
            Browser::Vivaldi => "Vivaldi",
            Browser::Whale => "Whale",
            Browser::Firefox => "Firefox",
            Browser::Safari => "Safari",
        }
    }

    /// Every browser the composite query fans out to.
    pub fn all() -> &'static [Browser] {
        &[
            Browser::Chrome,
            Browser::Chromium,
            Browser::Edge,
            Browser::Brave,
            Browser::Arc,
            Browser::Opera,
            Browser::OperaGx,
            Browser::Vivaldi,
            Browser::Whale,
            Browser::Firefox,
            Browser::Safari,
        ]
    }

    /// Executable or app name to look for when the store is locked.
    pub fn process_name(&self, platform: Platform) -> Option<&'static str> {
        let name = match (self, platform) {
            (Browser::Chrome, Platform::MacOs) => "Google Chrome",
            (Browser::Chrome, Platform::Linux) => "chrome",
            (Browser::Chrome, Platform::Windows) => "chrome.exe",
            (Browser::Chromium, Platform::MacOs) => "Chromium",
            (Browser::Chromium, Platform::Linux) => "chromium",
            (Browser::Chromium, Platform::Windows) => "chromium.exe",
            (Browser::Edge, Platform::MacOs) => "Microsoft Edge",
            (Browser::Edge, Platform::Linux) => "msedge",
            (Browser::Edge, Platform::Windows) => "msedge.exe",
            (Browser::Brave, Platform::MacOs) => "Brave Browser",
            (Browser::Brave, Platform::Linux) => "brave",
            (Browser::Brave, Platform::Windows) => "brave.exe",
            (Browser::Arc, Platform::MacOs) => "Arc",
            (Browser::Arc, Platform::Windows) => "Arc.exe",
            (Browser::Opera, Platform::MacOs) => "Opera",
            (Browser::Opera, Platform::Linux) => "opera",
            (Browser::Opera, Platform::Windows) => "opera.exe",
            (Browser::OperaGx, Platform::MacOs) => "Opera GX",
            (Browser::OperaGx, Platform::Windows) => "opera.exe",
            (Browser::Vivaldi, Platform::MacOs) => "Vivaldi",
            (Browser::Vivaldi, Platform::Linux) => "vivaldi",
            (Browser::Vivaldi, Platform::Windows) => "vivaldi.exe",
            (Browser::Whale, Platform::MacOs) => "Whale",
            (Browser::Whale, Platform::Linux) => "whale",
            (Browser::Whale, Platform::Windows) => "whale.exe",
            (Browser::Firefox, Platform::MacOs) => "firefox",
            (Browser::Firefox, Platform::Linux) => "firefox",
            (Browser::Firefox, Platform::Windows) => "firefox.exe",
            (Browser::Safari, Platform::MacOs) => "Safari",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for Browser {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chrome" => Ok(Browser::Chrome),
            "chromium" => Ok(Browser::Chromium),
            "edge" => Ok(Browser::Edge),
            "brave" => Ok(Browser::Brave),
            "arc" => Ok(Browser::Arc),
            "opera" => Ok(Browser::Opera),
            "opera-gx" | "operagx" => Ok(Browser::OperaGx),
            "vivaldi" => Ok(Browser::Vivaldi),
            "whale" => Ok(Browser::Whale),
            "firefox" => Ok(Browser::Firefox),
            "safari" => Ok(Browser::Safari),
            _ => Err(()),
        }
    }
}

/// Per-product settings for the Chromium family.
///
/// Directory entries are relative to the platform user-data base
/// (`~/Library/Application Support` on macOS, `~/.config` on Linux,
/// `%LOCALAPPDATA%` or `%APPDATA%` on Windows). `None` means the product
/// does not ship on that platform.
pub struct ChromiumProduct {
    pub browser: Browser,
    pub mac_dir: Option<&'static str>,
    pub linux_dir: Option<&'static str>,
    pub windows_dir: Option<&'static str>,
    pub windows_roaming: bool,
    /// macOS keychain service name. Opera GX deliberately shares Opera's
    /// entry.
    pub keystore_service: &'static str,
    /// Label the Linux keyring stores the passphrase under
    /// ("<label> Safe Storage").
    pub linux_keyring_label: &'static str,
}

const CHROMIUM_PRODUCTS: &[ChromiumProduct] = &[
    ChromiumProduct {
        browser: Browser::Chrome,
        mac_dir: Some("Google/Chrome"),
        linux_dir: Some("google-chrome"),
        windows_dir: Some("Google/Chrome/User Data"),
        windows_roaming: false,
        keystore_service: "Chrome Safe Storage",
        linux_keyring_label: "Chrome",
    },
    ChromiumProduct {
        browser: Browser::Chromium,
        mac_dir: Some("Chromium"),
        linux_dir: Some("chromium"),
        windows_dir: Some("Chromium/User Data"),
        windows_roaming: false,
        keystore_service: "Chromium Safe Storage",
        linux_keyring_label: "Chromium",
    },
    ChromiumProduct {
        browser: Browser::Edge,
        mac_dir: Some("Microsoft Edge"),
        linux_dir: Some("microsoft-edge"),
        windows_dir: Some("Microsoft/Edge/User Data"),
        windows_roaming: false,
        keystore_service: "Microsoft Edge Safe Storage",
        linux_keyring_label: "Chromium",
    },
    ChromiumProduct {
        browser: Browser::Brave,
        mac_dir: Some("BraveSoftware/Brave-Browser"),
        linux_dir: Some("BraveSoftware/Brave-Browser"),
        windows_dir: Some("BraveSoftware/Brave-Browser/User Data"),
        windows_roaming: false,
        keystore_service: "Brave Safe Storage",
        linux_keyring_label: "Brave",
    },
    ChromiumProduct {
        browser: Browser::Arc,
        mac_dir: Some("Arc/User Data"),
        linux_dir: None,
        windows_dir: Some("Arc/User Data"),
        windows_roaming: false,
        keystore_service: "Arc Safe Storage",
        linux_keyring_label: "Arc",
    },
    ChromiumProduct {
        browser: Browser::Opera,
        mac_dir: Some("com.operasoftware.Opera"),
        linux_dir: Some("opera"),
        windows_dir: Some("Opera Software/Opera Stable"),
        windows_roaming: true,
        keystore_service: "Opera Safe Storage",
        linux_keyring_label: "Chromium",
    },
    ChromiumProduct {
        browser: Browser::OperaGx,
        mac_dir: Some("com.operasoftware.OperaGX"),
        linux_dir: None,
        windows_dir: Some("Opera Software/Opera GX Stable"),
        windows_roaming: true,
        // Shared with Opera; both products unlock with the same entry.
        keystore_service: "Opera Safe Storage",
        linux_keyring_label: "Chromium",
    },
    ChromiumProduct {
        browser: Browser::Vivaldi,
        mac_dir: Some("Vivaldi"),
        linux_dir: Some("vivaldi"),
        windows_dir: Some("Vivaldi/User Data"),
        windows_roaming: false,
        keystore_service: "Vivaldi Safe Storage",
        linux_keyring_label: "Chrome",
    },
    ChromiumProduct {
        browser: Browser::Whale,
        mac_dir: Some("Naver/Whale"),
        linux_dir: Some("naver-whale"),
        windows_dir: Some("Naver/Naver Whale/User Data"),
        windows_roaming: false,
        keystore_service: "Whale Safe Storage",
        linux_keyring_label: "Whale",
    },
];

pub fn chromium_products() -> &'static [ChromiumProduct] {
    CHROMIUM_PRODUCTS
}

pub fn product_for(browser: Browser) -> Option<&'static ChromiumProduct> {
    CHROMIUM_PRODUCTS.iter().find(|p| p.browser == browser)
}

/// Options for a single query
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Explicit store file; bypasses discovery when set.
    pub store: Option<PathBuf>,
    /// Restrict the query to one browser.
    pub browser: Option<Browser>,
    /// Restrict discovery to one profile label.
    pub profile: Option<String>,
    /// Allow the lock handler to close a browser holding the store.
    pub force: bool,
    /// Keep records whose expiry is in the past.
    pub include_expired: bool,
    /// Ignore the spec filters and return every record.
    pub include_all: bool,
}

/// Options for a batched query
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub query: QueryOptions,
    /// Keep the longest non-empty value per (name, domain).
    pub deduplicate: bool,
    /// When false, the first per-branch failure aborts the batch.
    pub continue_on_error: bool,
    /// Upper bound on concurrently processed specs.
    pub concurrency: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions {
            query: QueryOptions::default(),
            deduplicate: true,
            continue_on_error: true,
            concurrency: 4,
        }
    }
}
