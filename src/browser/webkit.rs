//! WebKit-family extraction strategy
//!
//! Safari keeps a single binary container per user. Values are stored in
//! the clear; the work is all in the container parse.

use std::fs;

use super::{effective_spec, resolve_stores};
use crate::config::{Browser, Family, QueryOptions};
use crate::cookie::{CookieSpec, ExportedCookie};
use crate::error::Result;
use crate::platform::Platform;
use crate::store::binary;
use crate::store::StoreDescriptor;

pub struct WebKitStrategy {
    browser: Browser,
}

impl WebKitStrategy {
    pub fn new(browser: Browser) -> Self {
        debug_assert_eq!(browser.family(), Family::WebKit);
        WebKitStrategy { browser }
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
        // The container only exists on macOS, except when the caller hands
        // us an exported file directly.
        if platform != Platform::MacOs && options.store.is_none() {
            return Ok(Vec::new());
        }

        let stores = resolve_stores(self.browser, platform, options)?;
        let spec = effective_spec(spec, options);

        let mut cookies = Vec::new();
        for store in &stores {
            match read_store(store, &spec) {
                Ok(mut records) => cookies.append(&mut records),
                Err(err) => log::warn!("Skipping store {:?}: {}", store.path, err),
            }
        }
        Ok(cookies)
    }
}

fn read_store(store: &StoreDescriptor, spec: &CookieSpec) -> Result<Vec<ExportedCookie>> {
    let data = fs::read(&store.path)?;
    let outcome = binary::parse(&data);
    if let Some(failure) = outcome.failure {
        // Pages decoded before the violation are still good.
        log::warn!("Partial parse of {:?}: {}", store.path, failure);
    }

    let mut records = Vec::new();
    for cookie in &outcome.cookies {
        if !spec.matches(&cookie.name, &cookie.domain) {
            continue;
        }
        match crate::normalize::webkit_record(cookie, store) {
            Ok(record) => records.push(record),
            Err(err) => {
                log::warn!(
                    "Skipping record {:?} in {:?}: {}",
                    cookie.name,
                    store.path,
                    err
                );
            }
        }
    }
    Ok(records)
}
