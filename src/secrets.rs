//! Master-secret acquisition and caching
//!
//! One keystore round-trip per (service, platform) per process. Opera GX
//! resolves to Opera's cache entry because the two products share a
//! keystore record.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::config::{product_for, Browser, ChromiumProduct};
use crate::error::{CrumbError, Result};
use crate::platform::Platform;

/// The OS-protected value a browser encrypts cookie values with
#[derive(Clone, PartialEq, Eq)]
pub enum MasterSecret {
    /// UTF-8 passphrase fed through PBKDF2 (macOS keychain, Linux keyring).
    Passphrase(String),
    /// DPAPI-unwrapped AES-256 key (Windows).
    Key([u8; 32]),
}

// Secrets must never reach logs, so Debug shows the variant only.
impl fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MasterSecret::Passphrase(_) => write!(f, "MasterSecret::Passphrase(..)"),
            MasterSecret::Key(_) => write!(f, "MasterSecret::Key(..)"),
        }
    }
}

type CacheKey = (&'static str, Platform);

/// `None` records a keystore miss so the lookup is still done only once.
static SECRET_CACHE: Lazy<Mutex<HashMap<CacheKey, Option<MasterSecret>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Obtain the master secret for a Chromium-family browser.
///
/// Gecko and WebKit stores are not encrypted and have no secret. The first
/// caller for a given (service, platform) performs the keystore round-trip;
/// concurrent late callers re-check the cache and discard their result.
pub fn master_secret(browser: Browser, platform: Platform) -> Result<MasterSecret> {
    let product = product_for(browser).ok_or_else(|| {
        CrumbError::SecretUnavailable(format!("{} stores are not encrypted", browser))
    })?;
    if !platform.is_supported() {
        return Err(CrumbError::Unsupported(
            "No credential store on this platform".to_string(),
        ));
    }

    let cache_key: CacheKey = (product.keystore_service, platform);
    if let Some(entry) = SECRET_CACHE.lock().expect("secret cache").get(&cache_key) {
        return entry.clone().ok_or_else(|| {
            CrumbError::SecretUnavailable(format!(
                "Keystore lookup for {} already failed this process",
                browser
            ))
        });
    }

    let fetched = fetch_secret(product);
    let mut cache = SECRET_CACHE.lock().expect("secret cache");
    let entry = cache
        .entry(cache_key)
        .or_insert_with(|| fetched.as_ref().ok().cloned());
    entry.clone().map(Ok).unwrap_or(fetched)
}

#[cfg(target_os = "macos")]
fn fetch_secret(product: &ChromiumProduct) -> Result<MasterSecret> {
    crate::platform::macos::read_keychain_secret(product.keystore_service)
        .map(MasterSecret::Passphrase)
}

#[cfg(target_os = "linux")]
fn fetch_secret(product: &ChromiumProduct) -> Result<MasterSecret> {
    crate::platform::linux::read_keyring_passphrase(product.linux_keyring_label)
        .map(MasterSecret::Passphrase)
}

#[cfg(windows)]
fn fetch_secret(product: &ChromiumProduct) -> Result<MasterSecret> {
    let root = crate::store::chromium_user_data_root(product, Platform::Windows).ok_or_else(
        || {
            CrumbError::SecretUnavailable(format!(
                "{} has no user-data root on Windows",
                product.browser
            ))
        },
    )?;
    crate::platform::windows::read_local_state_key(&root).map(MasterSecret::Key)
}

#[cfg(not(any(target_os = "macos", target_os = "linux", windows)))]
fn fetch_secret(_product: &ChromiumProduct) -> Result<MasterSecret> {
    Err(CrumbError::Unsupported(
        "No credential store on this platform".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::{master_secret, MasterSecret};
    use crate::config::Browser;
    use crate::platform::Platform;

    #[test]
    fn debug_output_never_contains_secret_material() {
        let passphrase = MasterSecret::Passphrase("hunter2".to_string());
        let key = MasterSecret::Key([7u8; 32]);
        assert!(!format!("{:?}", passphrase).contains("hunter2"));
        assert!(!format!("{:?}", key).contains('7'));
    }

    #[test]
    fn plaintext_families_have_no_secret() {
        let err = master_secret(Browser::Firefox, Platform::current()).expect_err("no secret");
        assert!(matches!(
            err,
            crate::error::CrumbError::SecretUnavailable(_)
        ));
    }

    #[test]
    fn unsupported_platform_is_rejected() {
        let err = master_secret(Browser::Chrome, Platform::Unsupported).expect_err("unsupported");
        assert!(matches!(err, crate::error::CrumbError::Unsupported(_)));
    }
}
