//! Chromium-family extraction strategy
//!
//! Covers Chrome and its derivatives; the product differences (paths,
//! keystore service) live in the configuration table, not here.

use futures_util::future::join_all;

use super::{effective_spec, resolve_stores};
use crate::config::{Browser, Family, QueryOptions};
use crate::cookie::{CookieSpec, ExportedCookie};
use crate::crypto;
use crate::error::Result;
use crate::lock;
use crate::platform::Platform;
use crate::secrets::{self, MasterSecret};
use crate::store::sqlite::{self, ChromiumStore};
use crate::store::StoreDescriptor;

pub struct ChromiumStrategy {
    browser: Browser,
}

impl ChromiumStrategy {
    pub fn new(browser: Browser) -> Self {
        debug_assert_eq!(browser.family(), Family::Chromium);
        ChromiumStrategy { browser }
    }

    pub fn browser(&self) -> Browser {
        self.browser
    }

    pub async fn query(
        &self,
        spec: &CookieSpec,
        options: &QueryOptions,
    ) -> Result<Vec<ExportedCookie>> {
        let platform = Platform::current();
        if !platform.is_supported() {
            return Ok(Vec::new());
        }

        let stores = resolve_stores(self.browser, platform, options)?;
        if stores.is_empty() {
            return Ok(Vec::new());
        }

        // One keystore round-trip per query; without the secret every
        // record degrades to its raw fallback instead of failing.
        let secret = match secrets::master_secret(self.browser, platform) {
            Ok(secret) => Some(secret),
            Err(err) => {
                log::warn!(
                    "Reading {} stores without a master secret: {}",
                    self.browser,
                    err
                );
                None
            }
        };

        let spec = effective_spec(spec, options);
        let reads = join_all(stores.iter().map(|store| {
            read_store(store, &spec, secret.as_ref(), platform, options.force)
        }))
        .await;

        let mut cookies = Vec::new();
        for (store, result) in stores.iter().zip(reads) {
            match result {
                Ok(mut records) => cookies.append(&mut records),
                Err(err) => log::warn!("Skipping store {:?}: {}", store.path, err),
            }
        }
        Ok(cookies)
    }
}

/// Read one store: `discover → open → read → (ok | lock-conflict) →
/// [resolve → reread] → normalize`.
async fn read_store(
    store: &StoreDescriptor,
    spec: &CookieSpec,
    secret: Option<&MasterSecret>,
    platform: Platform,
    force: bool,
) -> Result<Vec<ExportedCookie>> {
    let raw = match sqlite::read_chromium(&store.path, spec) {
        Ok(raw) => raw,
        Err(err) if err.is_lock_conflict() => {
            let resolution = lock::resolve(store.browser, platform, force).await;
            if !resolution.resolved {
                return Err(err);
            }
            let retried = sqlite::read_chromium(&store.path, spec);
            if resolution.should_relaunch {
                lock::relaunch(store.browser, platform);
            }
            retried?
        }
        Err(err) => return Err(err),
    };

    Ok(normalize_rows(raw, spec, secret, platform, store))
}

fn normalize_rows(
    raw: ChromiumStore,
    spec: &CookieSpec,
    secret: Option<&MasterSecret>,
    platform: Platform,
    store: &StoreDescriptor,
) -> Vec<ExportedCookie> {
    let mut records = Vec::new();
    for row in &raw.rows {
        // The SQL filter is a substring match; apply the exact suffix rule.
        if !spec.matches(&row.name, &row.host_key) {
            continue;
        }
        let value = crypto::decrypt_chromium_value(
            &row.encrypted_value,
            secret,
            platform,
            raw.hash_prefixed,
        );
        match crate::normalize::chromium_record(row, value, store) {
            Ok(record) => records.push(record),
            Err(err) => {
                log::warn!(
                    "Skipping record {:?} in {:?}: {}",
                    row.name,
                    store.path,
                    err
                );
            }
        }
    }
    records
}
