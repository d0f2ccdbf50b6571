//! Read-only SQLite access to Chromium and Gecko cookie stores
//!
//! Stores are opened read-only with a shared cache and a busy timeout so a
//! live browser writing through WAL does not starve us. Busy and locked
//! failures are classified so the lock handler can intervene.

use std::path::Path;
use std::time::Duration;

use rusqlite::{named_params, Connection, ErrorCode, OpenFlags, Row};

use crate::cookie::CookieSpec;
use crate::error::{CrumbError, Result};

const BUSY_TIMEOUT: Duration = Duration::from_millis(1500);

/// Chromium `meta.version` from which decrypted values carry a leading
/// SHA-256 hash of the host key.
const HASH_PREFIX_META_VERSION: i64 = 24;

const CHROMIUM_PROJECTION: &str =
    "SELECT name, host_key, encrypted_value, expires_utc, path, is_secure, is_httponly, samesite
     FROM cookies";
const GECKO_PROJECTION: &str =
    "SELECT name, host, value, expiry, path, isSecure, isHttpOnly, sameSite
     FROM moz_cookies";

/// Raw row from a Chromium `cookies` table. The value is ciphertext (or
/// pre-v10 plaintext bytes) and is never interpreted as text here.
#[derive(Debug, Clone)]
pub struct ChromiumRow {
    pub name: String,
    pub host_key: String,
    pub encrypted_value: Vec<u8>,
    pub expires_utc: i64,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: i64,
}

/// Rows plus the store-level flags the crypto layer needs
#[derive(Debug)]
pub struct ChromiumStore {
    pub rows: Vec<ChromiumRow>,
    /// True when decrypted plaintext starts with a 32-byte host-key hash.
    pub hash_prefixed: bool,
}

/// Raw row from a Gecko `moz_cookies` table; values are plaintext.
#[derive(Debug, Clone)]
pub struct GeckoRow {
    pub name: String,
    pub host: String,
    pub value: String,
    pub expiry: i64,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: i64,
}

pub fn read_chromium(path: &Path, spec: &CookieSpec) -> Result<ChromiumStore> {
    let conn = open_read_only(path)?;
    let hash_prefixed = read_meta_version(&conn) >= HASH_PREFIX_META_VERSION;
    let rows = select_rows(&conn, path, CHROMIUM_PROJECTION, "host_key", spec, |row| {
        Ok(ChromiumRow {
            name: row.get(0)?,
            host_key: row.get(1)?,
            encrypted_value: read_value_bytes(row, 2)?,
            expires_utc: row.get(3)?,
            path: row.get(4)?,
            secure: row.get::<_, i64>(5)? != 0,
            http_only: row.get::<_, i64>(6)? != 0,
            same_site: row.get(7)?,
        })
    })?;
    Ok(ChromiumStore {
        rows,
        hash_prefixed,
    })
}

pub fn read_gecko(path: &Path, spec: &CookieSpec) -> Result<Vec<GeckoRow>> {
    let conn = open_read_only(path)?;
    select_rows(&conn, path, GECKO_PROJECTION, "host", spec, |row| {
        Ok(GeckoRow {
            name: row.get(0)?,
            host: row.get(1)?,
            value: row.get(2)?,
            expiry: row.get(3)?,
            path: row.get(4)?,
            secure: row.get::<_, i64>(5)? != 0,
            http_only: row.get::<_, i64>(6)? != 0,
            same_site: row.get(7)?,
        })
    })
}

fn open_read_only(path: &Path) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_SHARED_CACHE;
    let conn = Connection::open_with_flags(path, flags).map_err(|e| classify(path, e))?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(|e| classify(path, e))?;
    Ok(conn)
}

fn select_rows<T>(
    conn: &Connection,
    path: &Path,
    projection: &str,
    host_column: &str,
    spec: &CookieSpec,
    mut map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    // The LIKE filter narrows by substring; exact suffix matching happens
    // against the normalized record.
    let domain = if spec.is_domain_wildcard() {
        ""
    } else {
        spec.domain.as_str()
    };

    let mut run = |stmt: &mut rusqlite::Statement<'_>,
               params: &[(&str, &dyn rusqlite::ToSql)]|
     -> rusqlite::Result<Vec<T>> {
        let mut rows = stmt.query(params)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(map(row)?);
        }
        Ok(out)
    };

    let result = if spec.is_name_wildcard() {
        let sql = format!(
            "{} WHERE {} LIKE '%' || :domain || '%'",
            projection, host_column
        );
        let mut stmt = conn.prepare(&sql).map_err(|e| classify(path, e))?;
        run(&mut stmt, named_params! { ":domain": domain })
    } else {
        let sql = format!(
            "{} WHERE name = :name AND {} LIKE '%' || :domain || '%'",
            projection, host_column
        );
        let mut stmt = conn.prepare(&sql).map_err(|e| classify(path, e))?;
        run(
            &mut stmt,
            named_params! { ":name": spec.name, ":domain": domain },
        )
    };

    result.map_err(|e| classify(path, e))
}

/// Column 2 of the Chromium projection is BLOB in practice but TEXT in
/// ancient stores; both are surfaced as raw bytes.
fn read_value_bytes(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<u8>> {
    use rusqlite::types::ValueRef;
    match row.get_ref(idx)? {
        ValueRef::Blob(bytes) => Ok(bytes.to_vec()),
        ValueRef::Text(text) => Ok(text.to_vec()),
        ValueRef::Null => Ok(Vec::new()),
        other => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "encrypted_value".to_string(),
            other.data_type(),
        )),
    }
}

fn read_meta_version(conn: &Connection) -> i64 {
    let result: rusqlite::Result<String> =
        conn.query_row("SELECT value FROM meta WHERE key = 'version'", [], |row| {
            row.get(0)
        });
    result
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

/// Fold busy/locked SQLite failures into the lock-conflict error kind.
fn classify(path: &Path, err: rusqlite::Error) -> CrumbError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(
                failure.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ) =>
        {
            CrumbError::StoreLocked(path.display().to_string())
        }
        _ => CrumbError::Sqlite(err),
    }
}
