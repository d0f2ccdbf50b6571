//! Raw record normalization
//!
//! Converts browser-native rows into the public record shape, including
//! expiry conversion from the Chromium (1601, microseconds) and WebKit
//! (2001, seconds) epochs to Unix milliseconds.

use crate::cookie::{CookieMeta, ExportedCookie, Expiry, SameSite};
use crate::crypto::DecryptedValue;
use crate::error::{CrumbError, Result};
use crate::store::binary::BinaryCookie;
use crate::store::sqlite::{ChromiumRow, GeckoRow};
use crate::store::StoreDescriptor;

/// Offset of the Unix epoch from the Windows/Chromium epoch
/// (1601-01-01 UTC), in milliseconds.
const CHROMIUM_EPOCH_OFFSET_MILLIS: i64 = 11_644_473_600_000;

/// Offset of the WebKit epoch (2001-01-01 UTC) from the Unix epoch, in
/// seconds.
const WEBKIT_EPOCH_OFFSET_SECONDS: f64 = 978_307_200.0;

const MAX_UNIX_SECONDS: f64 = (i64::MAX / 1000) as f64;

/// Chromium expiry: microseconds since 1601. Zero marks a session cookie.
pub fn chromium_expiry(expires_utc: i64) -> Result<Expiry> {
    if expires_utc == 0 {
        return Ok(Expiry::Never);
    }
    if expires_utc < 0 {
        return Err(CrumbError::InvalidTimestamp(format!(
            "negative Chromium expiry {}",
            expires_utc
        )));
    }
    Ok(Expiry::At(expires_utc / 1000 - CHROMIUM_EPOCH_OFFSET_MILLIS))
}

/// WebKit expiry: seconds since 2001 as an IEEE-754 double.
pub fn webkit_expiry(seconds: f64) -> Result<Expiry> {
    if seconds == 0.0 {
        return Ok(Expiry::Never);
    }
    if !seconds.is_finite() {
        return Err(CrumbError::InvalidTimestamp(format!(
            "non-finite WebKit expiry {}",
            seconds
        )));
    }
    let unix_seconds = seconds + WEBKIT_EPOCH_OFFSET_SECONDS;
    if unix_seconds.abs() > MAX_UNIX_SECONDS {
        return Err(CrumbError::InvalidTimestamp(format!(
            "WebKit expiry {} out of range",
            seconds
        )));
    }
    Ok(Expiry::At(unix_seconds as i64 * 1000))
}

/// Gecko expiry: already Unix seconds.
pub fn gecko_expiry(seconds: i64) -> Result<Expiry> {
    if seconds == 0 {
        return Ok(Expiry::Never);
    }
    seconds
        .checked_mul(1000)
        .map(Expiry::At)
        .ok_or_else(|| {
            CrumbError::InvalidTimestamp(format!("Gecko expiry {} out of range", seconds))
        })
}

/// Chromium stores -1 for unspecified.
pub fn chromium_same_site(value: i64) -> Option<SameSite> {
    match value {
        0 => Some(SameSite::None),
        1 => Some(SameSite::Lax),
        2 => Some(SameSite::Strict),
        _ => None,
    }
}

pub fn gecko_same_site(value: i64) -> Option<SameSite> {
    match value {
        0 => Some(SameSite::None),
        1 => Some(SameSite::Lax),
        2 => Some(SameSite::Strict),
        _ => None,
    }
}

pub fn chromium_record(
    row: &ChromiumRow,
    value: DecryptedValue,
    store: &StoreDescriptor,
) -> Result<ExportedCookie> {
    Ok(ExportedCookie {
        name: row.name.clone(),
        value: value.value,
        domain: row.host_key.clone(),
        expiry: chromium_expiry(row.expires_utc)?,
        meta: CookieMeta {
            browser: store.browser.display_name().to_string(),
            store: store.path.clone(),
            decrypted: value.decrypted,
            path: row.path.clone(),
            secure: row.secure,
            http_only: row.http_only,
            same_site: chromium_same_site(row.same_site),
        },
    })
}

pub fn gecko_record(row: &GeckoRow, store: &StoreDescriptor) -> Result<ExportedCookie> {
    Ok(ExportedCookie {
        name: row.name.clone(),
        value: row.value.clone(),
        domain: row.host.clone(),
        expiry: gecko_expiry(row.expiry)?,
        meta: CookieMeta {
            browser: store.browser.display_name().to_string(),
            store: store.path.clone(),
            decrypted: false,
            path: row.path.clone(),
            secure: row.secure,
            http_only: row.http_only,
            same_site: gecko_same_site(row.same_site),
        },
    })
}

pub fn webkit_record(cookie: &BinaryCookie, store: &StoreDescriptor) -> Result<ExportedCookie> {
    Ok(ExportedCookie {
        name: cookie.name.clone(),
        value: cookie.value.clone(),
        domain: cookie.domain.clone(),
        expiry: webkit_expiry(cookie.expiry_seconds)?,
        meta: CookieMeta {
            browser: store.browser.display_name().to_string(),
            store: store.path.clone(),
            decrypted: false,
            path: cookie.path.clone(),
            secure: cookie.secure,
            http_only: cookie.http_only,
            same_site: None,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::{chromium_expiry, chromium_same_site, gecko_expiry, webkit_expiry};
    use crate::cookie::{Expiry, SameSite};
    use crate::error::CrumbError;

    const CHROMIUM_OFFSET_MILLIS: i64 = 11_644_473_600_000;

    #[test]
    fn chromium_zero_is_a_session_cookie() {
        assert_eq!(chromium_expiry(0).expect("expiry"), Expiry::Never);
    }

    #[test]
    fn chromium_round_trip_truncates_below_one_millisecond() {
        for unix_millis in [0i64, 1, 999, 1_700_000_000_123, 4_102_444_800_000] {
            let micros = (unix_millis + CHROMIUM_OFFSET_MILLIS) * 1000;
            assert_eq!(
                chromium_expiry(micros).expect("expiry"),
                Expiry::At(unix_millis)
            );
            // Sub-millisecond residue truncates toward the same instant.
            assert_eq!(
                chromium_expiry(micros + 999).expect("expiry"),
                Expiry::At(unix_millis)
            );
        }
    }

    #[test]
    fn chromium_rejects_negative_raw_expiry() {
        assert!(matches!(
            chromium_expiry(-1),
            Err(CrumbError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn webkit_expiry_shifts_the_2001_epoch() {
        assert_eq!(
            webkit_expiry(700_000_000.0).expect("expiry"),
            Expiry::At((700_000_000i64 + 978_307_200) * 1000)
        );
        assert_eq!(webkit_expiry(0.0).expect("expiry"), Expiry::Never);
    }

    #[test]
    fn webkit_rejects_unrepresentable_doubles() {
        assert!(matches!(
            webkit_expiry(f64::NAN),
            Err(CrumbError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            webkit_expiry(f64::INFINITY),
            Err(CrumbError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            webkit_expiry(1e17),
            Err(CrumbError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn gecko_expiry_is_unix_seconds() {
        assert_eq!(
            gecko_expiry(1_893_456_000).expect("expiry"),
            Expiry::At(1_893_456_000_000)
        );
        assert_eq!(gecko_expiry(0).expect("expiry"), Expiry::Never);
        assert!(matches!(
            gecko_expiry(i64::MAX),
            Err(CrumbError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn same_site_mapping_keeps_unspecified_open() {
        assert_eq!(chromium_same_site(-1), None);
        assert_eq!(chromium_same_site(0), Some(SameSite::None));
        assert_eq!(chromium_same_site(1), Some(SameSite::Lax));
        assert_eq!(chromium_same_site(2), Some(SameSite::Strict));
    }
}
