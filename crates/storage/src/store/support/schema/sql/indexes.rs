#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE INDEX IF NOT EXISTS idx_pushes_revision ON pushes(repository, revision);
        CREATE INDEX IF NOT EXISTS idx_pushes_short_revision ON pushes(repository, short_revision);
        CREATE INDEX IF NOT EXISTS idx_revisions_push ON revisions(push_row_id, position);
        CREATE INDEX IF NOT EXISTS idx_jobs_state ON jobs(state, request_id);
        CREATE INDEX IF NOT EXISTS idx_jobs_short_revision ON jobs(substr(revision, 1, 12));
        CREATE INDEX IF NOT EXISTS idx_missing_created ON missing_resultsets(created_at_ms, request_id);
"#;
