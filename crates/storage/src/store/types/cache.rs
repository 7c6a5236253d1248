#![forbid(unsafe_code)]

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntryRow {
    pub key: String,
    pub value: String,
    pub expires_at_ms: Option<i64>,
    pub updated_at_ms: i64,
}
