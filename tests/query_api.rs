//! Batch query semantics: dedup, expiry filtering, URL expansion.

use std::path::Path;

use rusqlite::Connection;
use tempfile::tempdir;

use crumb::{query_all, BatchOptions, Browser, CookieSpec, QueryOptions};

/// Microseconds since 1601 for an instant in late 2031.
const FUTURE_EXPIRES_UTC: i64 = 13_600_000_000_000_000;
/// Microseconds since 1601 for an instant in 2001.
const PAST_EXPIRES_UTC: i64 = 12_644_473_600_000_000;

fn create_store(path: &Path, rows: &[(&str, &str, &str, i64)]) {
    let conn = Connection::open(path).expect("open db");
    conn.execute("CREATE TABLE meta (key TEXT, value TEXT)", [])
        .expect("create meta");
    conn.execute("INSERT INTO meta (key, value) VALUES ('version', '24')", [])
        .expect("insert meta");
    conn.execute(
        "CREATE TABLE cookies (
            name TEXT,
            host_key TEXT,
            encrypted_value BLOB,
            expires_utc INTEGER,
            path TEXT,
            is_secure INTEGER,
            is_httponly INTEGER,
            samesite INTEGER
        )",
        [],
    )
    .expect("create cookies");
    for (name, host, value, expires) in rows {
        conn.execute(
            "INSERT INTO cookies VALUES (?1, ?2, ?3, ?4, '/', 0, 0, -1)",
            (name, host, value.as_bytes(), expires),
        )
        .expect("insert cookie");
    }
}

fn batch_for(store: &Path) -> BatchOptions {
    BatchOptions {
        query: QueryOptions {
            store: Some(store.to_path_buf()),
            browser: Some(Browser::Chrome),
            ..QueryOptions::default()
        },
        ..BatchOptions::default()
    }
}

#[tokio::test]
async fn overlapping_specs_deduplicate_by_name_and_domain() {
    let dir = tempdir().expect("tempdir");
    let db = dir.path().join("Cookies");
    create_store(
        &db,
        &[
            ("sid", ".example.com", "short", FUTURE_EXPIRES_UTC),
            ("theme", ".example.com", "dark", FUTURE_EXPIRES_UTC),
        ],
    );

    // Both specs match "sid"; only one merged record must survive.
    let specs = vec![
        CookieSpec::new("sid", "example.com"),
        CookieSpec::new("%", "example.com"),
    ];
    let cookies = query_all(&specs, &batch_for(&db)).await.expect("batch");
    assert_eq!(cookies.len(), 2);
    assert_eq!(
        cookies.iter().filter(|c| c.name == "sid").count(),
        1
    );
}

#[tokio::test]
async fn no_dedup_keeps_every_branch_result() {
    let dir = tempdir().expect("tempdir");
    let db = dir.path().join("Cookies");
    create_store(&db, &[("sid", ".example.com", "v", FUTURE_EXPIRES_UTC)]);

    let specs = vec![
        CookieSpec::new("sid", "example.com"),
        CookieSpec::new("%", "example.com"),
    ];
    let mut options = batch_for(&db);
    options.deduplicate = false;
    let cookies = query_all(&specs, &options).await.expect("batch");
    assert_eq!(cookies.len(), 2);
}

#[tokio::test]
async fn expired_records_drop_unless_requested() {
    let dir = tempdir().expect("tempdir");
    let db = dir.path().join("Cookies");
    create_store(
        &db,
        &[
            ("fresh", ".example.com", "a", FUTURE_EXPIRES_UTC),
            ("stale", ".example.com", "b", PAST_EXPIRES_UTC),
            ("session", ".example.com", "c", 0),
        ],
    );

    let specs = vec![CookieSpec::new("%", "example.com")];
    let cookies = query_all(&specs, &batch_for(&db)).await.expect("batch");
    let names: Vec<&str> = cookies.iter().map(|c| c.name.as_str()).collect();
    assert!(names.contains(&"fresh"));
    assert!(names.contains(&"session"));
    assert!(!names.contains(&"stale"));

    let mut options = batch_for(&db);
    options.query.include_expired = true;
    let cookies = query_all(&specs, &options).await.expect("batch");
    assert_eq!(cookies.len(), 3);
}

#[tokio::test]
async fn url_expansion_reaches_parent_domain_records() {
    let dir = tempdir().expect("tempdir");
    let db = dir.path().join("Cookies");
    create_store(&db, &[("sid", ".example.com", "root", FUTURE_EXPIRES_UTC)]);

    // A record on the registrable domain must be found through the full
    // host's spec list.
    let specs = CookieSpec::for_url("sid", "https://api.example.com").expect("specs");
    let cookies = query_all(&specs, &batch_for(&db)).await.expect("batch");
    assert_eq!(cookies.len(), 1);
    assert_eq!(cookies[0].value, "root");
}

#[tokio::test]
async fn strict_batches_still_succeed_on_clean_stores() {
    let dir = tempdir().expect("tempdir");
    let db = dir.path().join("Cookies");
    create_store(&db, &[("sid", ".example.com", "v", FUTURE_EXPIRES_UTC)]);

    let mut options = batch_for(&db);
    options.continue_on_error = false;
    options.concurrency = 1;
    let specs = vec![CookieSpec::new("sid", "example.com")];
    let cookies = query_all(&specs, &options).await.expect("strict batch");
    assert_eq!(cookies.len(), 1);
}
