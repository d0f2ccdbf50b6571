//! crumb - browser cookie extraction
//!
//! This crate locates the cookie stores of locally installed browsers,
//! decrypts their values with the master secret from the host OS
//! credential store, and returns uniform records. The CLI, renderers, and
//! batch tooling all consume the two query functions below.

use std::collections::HashMap;

use futures_util::stream::{self, StreamExt};

pub mod browser;
pub mod cli;
pub mod config;
pub mod cookie;
pub mod crypto;
pub mod error;
pub mod exit_code;
pub mod lock;
pub mod logging;
pub mod normalize;
pub mod platform;
pub mod secrets;
pub mod store;

pub use config::{BatchOptions, Browser, QueryOptions};
pub use cookie::{CookieSpec, ExportedCookie, Expiry};
pub use error::{CrumbError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Query every registered browser for cookies matching `spec`.
///
/// A missing cookie is an empty vector, never an error: failed stores and
/// failed branches are logged and skipped, and undecryptable values come
/// back as raw fallbacks flagged `decrypted = false`.
pub async fn query(spec: &CookieSpec, options: &QueryOptions) -> Vec<ExportedCookie> {
    browser::query_composite(spec, options).await.cookies
}

/// Run several specs and merge the results.
///
/// Specs are processed concurrently up to `options.concurrency`. With
/// `deduplicate`, one record survives per (name, domain): the one with the
/// longest non-empty value. Expired records are dropped unless
/// `include_expired` is set. An error is returned only when
/// `continue_on_error` is false and some branch failed.
pub async fn query_all(
    specs: &[CookieSpec],
    options: &BatchOptions,
) -> Result<Vec<ExportedCookie>> {
    let concurrency = options.concurrency.max(1);
    let outcomes: Vec<browser::QueryOutcome> = stream::iter(
        specs
            .iter()
            .map(|spec| browser::query_composite(spec, &options.query)),
    )
    .buffer_unordered(concurrency)
    .collect()
    .await;

    let mut cookies = Vec::new();
    for mut outcome in outcomes {
        if !options.continue_on_error {
            if let Some(failure) = outcome.failures.drain(..).next() {
                return Err(failure);
            }
        }
        cookies.append(&mut outcome.cookies);
    }

    if !options.query.include_expired {
        let now = cookie::now_unix_millis();
        cookies.retain(|cookie| !cookie.expiry.is_expired(now));
    }
    if options.deduplicate {
        cookies = deduplicate(cookies);
    }
    Ok(cookies)
}

/// Keep one record per (name, domain): the longest non-empty value wins,
/// first-seen order is preserved.
fn deduplicate(cookies: Vec<ExportedCookie>) -> Vec<ExportedCookie> {
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut kept: Vec<ExportedCookie> = Vec::new();
    for cookie in cookies {
        let key = (cookie.name.clone(), cookie.domain.clone());
        match index.get(&key) {
            Some(&slot) => {
                if cookie.value.len() > kept[slot].value.len() {
                    kept[slot] = cookie;
                }
            }
            None => {
                index.insert(key, kept.len());
                kept.push(cookie);
            }
        }
    }
    kept
}
