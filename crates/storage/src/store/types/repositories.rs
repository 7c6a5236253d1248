#![forbid(unsafe_code)]

/// A registered repository; inactive ones keep their pushes but resolve no jobs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepositoryRow {
    pub name: String,
    pub url: String,
    pub active: bool,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}
