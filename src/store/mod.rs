//! Cookie store discovery
//!
//! Maps a browser family to the user-data roots on the current platform and
//! enumerates the store files underneath them.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{Browser, ChromiumProduct, Family};
use crate::error::Result;
use crate::platform::{self, Platform};

pub mod binary;
pub mod sqlite;

const CHROMIUM_STORE_FILE: &str = "Cookies";
const GECKO_STORE_FILE: &str = "cookies.sqlite";

/// One discovered on-disk cookie store
#[derive(Debug, Clone)]
pub struct StoreDescriptor {
    pub path: PathBuf,
    pub browser: Browser,
    /// Profile label derived from the store's parent directory.
    pub profile: Option<String>,
}

impl StoreDescriptor {
    /// Wrap an explicit store path, bypassing discovery.
    pub fn from_override(path: PathBuf, browser: Browser) -> StoreDescriptor {
        let profile = profile_label(&path);
        StoreDescriptor {
            path,
            browser,
            profile,
        }
    }
}

/// Enumerate the existing cookie stores for a browser.
///
/// A missing user-data root is not an error; the browser is simply not
/// installed for this user and contributes no stores.
pub fn locate(browser: Browser, platform: Platform) -> Result<Vec<StoreDescriptor>> {
    let mut paths = match browser.family() {
        Family::Chromium => {
            let Some(product) = crate::config::product_for(browser) else {
                return Ok(Vec::new());
            };
            match chromium_user_data_root(product, platform) {
                Some(root) if root.exists() => find_files(&root, CHROMIUM_STORE_FILE),
                _ => Vec::new(),
            }
        }
        Family::Gecko => gecko_roots(platform)?
            .into_iter()
            .filter(|root| root.exists())
            .flat_map(|root| find_files(&root, GECKO_STORE_FILE))
            .collect(),
        Family::WebKit => {
            if platform != Platform::MacOs {
                return Ok(Vec::new());
            }
            webkit_candidates()?
                .into_iter()
                .filter(|path| path.is_file())
                .collect()
        }
    };

    paths.sort();
    paths.dedup();

    Ok(paths
        .into_iter()
        .map(|path| {
            let profile = profile_label(&path);
            StoreDescriptor {
                path,
                browser,
                profile,
            }
        })
        .collect())
}

/// User-data root holding a Chromium product's profiles and `Local State`.
pub(crate) fn chromium_user_data_root(
    product: &ChromiumProduct,
    platform: Platform,
) -> Option<PathBuf> {
    match platform {
        Platform::MacOs => {
            let dir = product.mac_dir?;
            Some(
                platform::home_dir()
                    .ok()?
                    .join("Library/Application Support")
                    .join(dir),
            )
        }
        Platform::Linux => {
            let dir = product.linux_dir?;
            let config_home = dirs::config_dir()
                .or_else(|| platform::home_dir().ok().map(|home| home.join(".config")))?;
            Some(config_home.join(dir))
        }
        Platform::Windows => {
            let dir = product.windows_dir?;
            let root = if product.windows_roaming {
                env::var("APPDATA")
                    .map(PathBuf::from)
                    .ok()
                    .or_else(|| platform::home_dir().ok().map(|h| h.join("AppData/Roaming")))?
            } else {
                env::var("LOCALAPPDATA")
                    .map(PathBuf::from)
                    .ok()
                    .or_else(|| platform::home_dir().ok().map(|h| h.join("AppData/Local")))?
            };
            Some(root.join(dir))
        }
        Platform::Unsupported => None,
    }
}

fn gecko_roots(platform: Platform) -> Result<Vec<PathBuf>> {
    let home = platform::home_dir()?;
    Ok(match platform {
        Platform::MacOs => vec![home.join("Library/Application Support/Firefox/Profiles")],
        Platform::Linux => vec![home.join(".mozilla/firefox")],
        Platform::Windows => {
            let roaming = env::var("APPDATA")
                .map(PathBuf::from)
                .unwrap_or_else(|_| home.join("AppData/Roaming"));
            vec![roaming.join("Mozilla/Firefox/Profiles")]
        }
        Platform::Unsupported => Vec::new(),
    })
}

fn webkit_candidates() -> Result<Vec<PathBuf>> {
    let home = platform::home_dir()?;
    Ok(vec![
        home.join("Library/Cookies/Cookies.binarycookies"),
        home.join("Library/Containers/com.apple.Safari/Data/Library/Cookies/Cookies.binarycookies"),
    ])
}

/// Iterative walk collecting every file named `filename` under `root`.
/// Unreadable directories are skipped.
fn find_files(root: &Path, filename: &str) -> Vec<PathBuf> {
    let mut matches = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                log::debug!("Skipping unreadable directory {:?}: {}", dir, err);
                continue;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.file_name().and_then(|name| name.to_str()) == Some(filename) {
                matches.push(path);
            }
        }
    }
    matches
}

/// Derive a profile label from the directories above a store file,
/// skipping Chromium's `Network` subdirectory.
fn profile_label(path: &Path) -> Option<String> {
    path.ancestors()
        .skip(1)
        .filter_map(|dir| dir.file_name().and_then(|name| name.to_str()))
        .find(|name| *name != "Network")
        .map(|name| name.to_string())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::{find_files, profile_label, StoreDescriptor};
    use crate::config::Browser;

    #[test]
    fn find_files_walks_nested_profiles() {
        let dir = tempdir().expect("tempdir");
        let default = dir.path().join("Default");
        let network = dir.path().join("Profile 1/Network");
        fs::create_dir_all(&default).expect("mkdir");
        fs::create_dir_all(&network).expect("mkdir");
        fs::write(default.join("Cookies"), b"").expect("write");
        fs::write(network.join("Cookies"), b"").expect("write");
        fs::write(dir.path().join("Default/README"), b"").expect("write");

        let mut found = find_files(dir.path(), "Cookies");
        found.sort();
        assert_eq!(found.len(), 2);
        assert!(found[0].ends_with("Default/Cookies"));
        assert!(found[1].ends_with("Profile 1/Network/Cookies"));
    }

    #[test]
    fn profile_label_skips_network_directory() {
        let label = profile_label(std::path::Path::new(
            "/data/User Data/Profile 1/Network/Cookies",
        ));
        assert_eq!(label.as_deref(), Some("Profile 1"));

        let label = profile_label(std::path::Path::new("/data/User Data/Default/Cookies"));
        assert_eq!(label.as_deref(), Some("Default"));
    }

    #[test]
    fn override_descriptor_keeps_path_verbatim() {
        let descriptor = StoreDescriptor::from_override(
            std::path::PathBuf::from("/tmp/exported/Cookies"),
            Browser::Chrome,
        );
        assert_eq!(descriptor.path, std::path::PathBuf::from("/tmp/exported/Cookies"));
        assert_eq!(descriptor.profile.as_deref(), Some("exported"));
    }
}
