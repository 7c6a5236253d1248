#![forbid(unsafe_code)]

use bi_storage::SqliteStore;

#[test]
fn set_get_overwrite_delete() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut store = SqliteStore::open(dir.path()).expect("open store");

    assert!(store.cache_get("buildapi:pending").expect("get").is_none());
    store.cache_set("buildapi:pending", "[1,2]", None).expect("set");
    assert_eq!(store.cache_get("buildapi:pending").expect("get").expect("entry").value, "[1,2]");

    store
        .cache_set("buildapi:pending", "[3]", Some(60_000))
        .expect("overwrite");
    let entry = store.cache_get("buildapi:pending").expect("get").expect("entry");
    assert_eq!(entry.value, "[3]");
    assert!(entry.expires_at_ms.is_some());

    assert!(store.cache_delete("buildapi:pending").expect("delete"));
    assert!(store.cache_get("buildapi:pending").expect("get").is_none());
    assert!(store.cache_set("  ", "x", None).is_err());
}

#[test]
fn expired_entries_read_as_absent_and_purge() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut store = SqliteStore::open(dir.path()).expect("open store");

    store.cache_set("buildapi:running", "[1]", Some(0)).expect("set");
    store.cache_set("buildapi:complete", "[2]", None).expect("set");

    assert!(store.cache_get("buildapi:running").expect("get").is_none());
    assert_eq!(store.cache_purge_expired().expect("purge"), 1);
    assert!(store.cache_get("buildapi:complete").expect("get").is_some());
}

#[test]
fn entries_are_visible_across_connections() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut writer = SqliteStore::open(dir.path()).expect("open writer");
    let reader = SqliteStore::open(dir.path()).expect("open reader");

    writer.cache_set("buildapi:complete", "[7]", None).expect("set");
    assert_eq!(reader.cache_get("buildapi:complete").expect("get").expect("entry").value, "[7]");
}
