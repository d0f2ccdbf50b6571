//! Browser strategies and the composite query
//!
//! One strategy per engine family assembles discovery, the physical read,
//! secret acquisition, decryption, and normalization into a uniform query.
//! The composite fans a query out across every registered strategy and
//! tolerates per-branch failures.

use futures_util::future::join_all;

use crate::config::{Browser, Family, QueryOptions};
use crate::cookie::{CookieSpec, ExportedCookie};
use crate::error::{CrumbError, Result};
use crate::platform::Platform;
use crate::store::{self, StoreDescriptor};

pub mod chromium;
pub mod gecko;
pub mod webkit;

pub use chromium::ChromiumStrategy;
pub use gecko::GeckoStrategy;
pub use webkit::WebKitStrategy;

/// Closed set of extraction strategies
pub enum Strategy {
    Chromium(ChromiumStrategy),
    Gecko(GeckoStrategy),
    WebKit(WebKitStrategy),
}

impl Strategy {
    pub fn for_browser(browser: Browser) -> Strategy {
        match browser.family() {
            Family::Chromium => Strategy::Chromium(ChromiumStrategy::new(browser)),
            Family::Gecko => Strategy::Gecko(GeckoStrategy::new(browser)),
            Family::WebKit => Strategy::WebKit(WebKitStrategy::new(browser)),
        }
    }

    pub fn browser(&self) -> Browser {
        match self {
            Strategy::Chromium(s) => s.browser(),
            Strategy::Gecko(s) => s.browser(),
            Strategy::WebKit(s) => s.browser(),
        }
    }

    pub async fn query(
        &self,
        spec: &CookieSpec,
        options: &QueryOptions,
    ) -> Result<Vec<ExportedCookie>> {
        match self {
            Strategy::Chromium(s) => s.query(spec, options).await,
            Strategy::Gecko(s) => s.query(spec, options).await,
            Strategy::WebKit(s) => s.query(spec, options).await,
        }
    }
}

/// Strategies a query fans out to.
///
/// An explicit store override belongs to exactly one strategy; without a
/// browser filter it defaults to Chrome, the most common export source.
pub(crate) fn registry(options: &QueryOptions) -> Vec<Strategy> {
    if let Some(browser) = options.browser {
        return vec![Strategy::for_browser(browser)];
    }
    if options.store.is_some() {
        return vec![Strategy::for_browser(Browser::Chrome)];
    }
    Browser::all()
        .iter()
        .map(|browser| Strategy::for_browser(*browser))
        .collect()
}

/// Aggregate of a composite query
pub(crate) struct QueryOutcome {
    pub cookies: Vec<ExportedCookie>,
    pub failures: Vec<CrumbError>,
}

/// Fan a query out across the registered strategies. Branch failures are
/// logged and collected; they never abort the aggregate.
pub(crate) async fn query_composite(spec: &CookieSpec, options: &QueryOptions) -> QueryOutcome {
    let strategies = registry(options);
    let results = join_all(
        strategies
            .iter()
            .map(|strategy| strategy.query(spec, options)),
    )
    .await;

    let mut cookies = Vec::new();
    let mut failures = Vec::new();
    for (strategy, result) in strategies.iter().zip(results) {
        match result {
            Ok(mut records) => cookies.append(&mut records),
            Err(err) => {
                log::warn!("{} query failed: {}", strategy.browser(), err);
                failures.push(err);
            }
        }
    }
    QueryOutcome { cookies, failures }
}

/// Stores a strategy should read: the override verbatim, or discovery
/// narrowed to the requested profile.
pub(crate) fn resolve_stores(
    browser: Browser,
    platform: Platform,
    options: &QueryOptions,
) -> Result<Vec<StoreDescriptor>> {
    if let Some(path) = &options.store {
        return Ok(vec![StoreDescriptor::from_override(path.clone(), browser)]);
    }
    let mut stores = store::locate(browser, platform)?;
    if let Some(profile) = &options.profile {
        stores.retain(|store| store.profile.as_deref() == Some(profile.as_str()));
    }
    Ok(stores)
}

/// The spec actually applied to records, honoring `include_all`.
pub(crate) fn effective_spec(spec: &CookieSpec, options: &QueryOptions) -> CookieSpec {
    if options.include_all {
        CookieSpec::any()
    } else {
        spec.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::{effective_spec, registry, Strategy};
    use crate::config::{Browser, QueryOptions};
    use crate::cookie::CookieSpec;

    #[test]
    fn registry_covers_every_browser_by_default() {
        let strategies = registry(&QueryOptions::default());
        assert_eq!(strategies.len(), Browser::all().len());
    }

    #[test]
    fn registry_narrows_to_the_requested_browser() {
        let options = QueryOptions {
            browser: Some(Browser::Firefox),
            ..QueryOptions::default()
        };
        let strategies = registry(&options);
        assert_eq!(strategies.len(), 1);
        assert_eq!(strategies[0].browser(), Browser::Firefox);
        assert!(matches!(strategies[0], Strategy::Gecko(_)));
    }

    #[test]
    fn store_override_without_browser_defaults_to_chrome() {
        let options = QueryOptions {
            store: Some(std::path::PathBuf::from("/tmp/Cookies")),
            ..QueryOptions::default()
        };
        let strategies = registry(&options);
        assert_eq!(strategies.len(), 1);
        assert_eq!(strategies[0].browser(), Browser::Chrome);
    }

    #[test]
    fn include_all_widens_the_spec() {
        let spec = CookieSpec::new("sid", "example.com");
        let options = QueryOptions {
            include_all: true,
            ..QueryOptions::default()
        };
        assert_eq!(effective_spec(&spec, &options), CookieSpec::any());
        assert_eq!(
            effective_spec(&spec, &QueryOptions::default()),
            spec
        );
    }
}
