//! Public cookie records and query specs

use std::fmt;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::ser::Serializer;
use serde::Serialize;
use url::Url;

use crate::error::{CrumbError, Result};

/// Field value that matches any name or any domain.
pub const WILDCARD: &str = "%";

/// A cookie query: a name pattern and a domain pattern.
///
/// Names compare by equality unless the pattern is the wildcard. Domains
/// match by suffix: `"x.y"` matches hosts equal to `x.y` or ending with
/// `.x.y`; a leading dot on the stored host is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSpec {
    pub name: String,
    pub domain: String,
}

impl CookieSpec {
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        CookieSpec {
            name: name.into(),
            domain: domain.into(),
        }
    }

    /// Spec matching any record in any store.
    pub fn any() -> Self {
        CookieSpec::new(WILDCARD, WILDCARD)
    }

    pub fn is_name_wildcard(&self) -> bool {
        self.name == WILDCARD
    }

    pub fn is_domain_wildcard(&self) -> bool {
        self.domain == WILDCARD
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.is_name_wildcard() || self.name == name
    }

    pub fn matches_domain(&self, host: &str) -> bool {
        if self.is_domain_wildcard() {
            return true;
        }
        let host = host.strip_prefix('.').unwrap_or(host);
        let pattern = self.domain.strip_prefix('.').unwrap_or(&self.domain);
        host == pattern || host.ends_with(&format!(".{}", pattern))
    }

    pub fn matches(&self, name: &str, host: &str) -> bool {
        self.matches_name(name) && self.matches_domain(host)
    }

    /// Expand an URL into the ordered list of domain-pattern specs for it:
    /// the full host first, then each parent domain down to the registrable
    /// pair (`https://api.example.com` yields `api.example.com`,
    /// `example.com`).
    pub fn for_url(name: impl Into<String>, input: &str) -> Result<Vec<CookieSpec>> {
        let url_str = if input.contains("://") {
            input.to_string()
        } else {
            format!("https://{}", input)
        };
        let url = Url::parse(&url_str)
            .map_err(|e| CrumbError::InvalidUrl(format!("Invalid URL '{}': {}", input, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| CrumbError::InvalidUrl(format!("URL '{}' has no host", input)))?;

        let name = name.into();
        if host.parse::<std::net::IpAddr>().is_ok() {
            return Ok(vec![CookieSpec::new(name, host)]);
        }

        let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
        if labels.len() < 2 {
            return Ok(vec![CookieSpec::new(name, host)]);
        }

        let mut specs = Vec::new();
        for start in 0..=labels.len() - 2 {
            specs.push(CookieSpec::new(name.clone(), labels[start..].join(".")));
        }
        Ok(specs)
    }
}

/// Cookie expiry, normalized to Unix milliseconds.
///
/// A raw expiry of zero (a session cookie) maps to `Never`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Never,
    At(i64),
}

impl Expiry {
    pub fn is_expired(&self, now_millis: i64) -> bool {
        match self {
            Expiry::Never => false,
            Expiry::At(millis) => *millis <= now_millis,
        }
    }

    pub fn unix_millis(&self) -> Option<i64> {
        match self {
            Expiry::Never => None,
            Expiry::At(millis) => Some(*millis),
        }
    }
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expiry::Never => write!(f, "never"),
            Expiry::At(millis) => write!(f, "{}", millis),
        }
    }
}

impl Serialize for Expiry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Expiry::Never => serializer.serialize_str("never"),
            Expiry::At(millis) => serializer.serialize_i64(*millis),
        }
    }
}

/// Current wall-clock time in Unix milliseconds.
pub fn now_unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    None,
    Lax,
    Strict,
}

/// Provenance and attributes carried alongside the decrypted value
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieMeta {
    /// Display name of the originating browser.
    pub browser: String,
    /// Store file the record came from.
    pub store: PathBuf,
    /// True iff the crypto layer produced the value; false for plaintext
    /// passthrough and for the raw fallback after a failed decrypt.
    pub decrypted: bool,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

/// A decrypted, normalized cookie record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub expiry: Expiry,
    pub meta: CookieMeta,
}
