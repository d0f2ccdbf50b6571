//! Gecko-family extraction strategy
//!
//! Firefox stores its cookies unencrypted in `cookies.sqlite`, so this
//! strategy needs no secret and no crypto pass.

use futures_util::future::join_all;

use super::{effective_spec, resolve_stores};
use crate::config::{Browser, Family, QueryOptions};
use crate::cookie::{CookieSpec, ExportedCookie};
use crate::error::Result;
use crate::lock;
use crate::platform::Platform;
use crate::store::sqlite::{self, GeckoRow};
use crate::store::StoreDescriptor;

pub struct GeckoStrategy {
    browser: Browser,
}

impl GeckoStrategy {
    pub fn new(browser: Browser) -> Self {
        debug_assert_eq!(browser.family(), Family::Gecko);
        GeckoStrategy { browser }
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
        let spec = effective_spec(spec, options);
        let reads = join_all(
            stores
                .iter()
                .map(|store| read_store(store, &spec, platform, options.force)),
        )
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

async fn read_store(
    store: &StoreDescriptor,
    spec: &CookieSpec,
    platform: Platform,
    force: bool,
) -> Result<Vec<ExportedCookie>> {
    let rows = match sqlite::read_gecko(&store.path, spec) {
        Ok(rows) => rows,
        Err(err) if err.is_lock_conflict() => {
            let resolution = lock::resolve(store.browser, platform, force).await;
            if !resolution.resolved {
                return Err(err);
            }
            let retried = sqlite::read_gecko(&store.path, spec);
            if resolution.should_relaunch {
                lock::relaunch(store.browser, platform);
            }
            retried?
        }
        Err(err) => return Err(err),
    };

    Ok(normalize_rows(&rows, spec, store))
}

fn normalize_rows(
    rows: &[GeckoRow],
    spec: &CookieSpec,
    store: &StoreDescriptor,
) -> Vec<ExportedCookie> {
    let mut records = Vec::new();
    for row in rows {
        if !spec.matches(&row.name, &row.host) {
            continue;
        }
        match crate::normalize::gecko_record(row, store) {
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
