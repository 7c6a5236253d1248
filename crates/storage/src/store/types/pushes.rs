#![forbid(unsafe_code)]

#[derive(Clone, Debug)]
pub struct PushRow {
    pub id: i64,
    pub repository: String,
    pub push_id: i64,
    pub revision: String,
    pub author: String,
    pub pushed_at: i64,
    pub changeset_count: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PushInsertResult {
    pub id: i64,
    pub created: bool,
}
