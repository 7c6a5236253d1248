#![forbid(unsafe_code)]

mod cache;
mod core;
mod indexes;
mod jobs;
mod pragmas;
mod pushes;

pub(super) fn full_schema_sql() -> String {
    let mut sql = String::new();
    sql.push_str(pragmas::SQL);
    sql.push_str(core::SQL);
    sql.push_str(pushes::SQL);
    sql.push_str(jobs::SQL);
    sql.push_str(cache::SQL);
    sql.push_str(indexes::SQL);
    sql
}
