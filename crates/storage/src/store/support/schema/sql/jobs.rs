#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS jobs (
          request_id INTEGER PRIMARY KEY,
          category TEXT NOT NULL,
          state TEXT NOT NULL,
          repository TEXT NOT NULL,
          revision TEXT NOT NULL,
          build_name TEXT NOT NULL,
          result TEXT NOT NULL,
          resultset_id INTEGER NOT NULL REFERENCES pushes(id),
          submit_timestamp INTEGER NOT NULL,
          start_timestamp INTEGER NOT NULL,
          end_timestamp INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS missing_resultsets (
          request_id INTEGER PRIMARY KEY,
          category TEXT NOT NULL,
          repository TEXT NOT NULL,
          revision TEXT NOT NULL,
          build_name TEXT NOT NULL,
          result TEXT NOT NULL,
          submit_timestamp INTEGER NOT NULL,
          start_timestamp INTEGER NOT NULL,
          end_timestamp INTEGER NOT NULL,
          attempts INTEGER NOT NULL DEFAULT 0,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );
"#;
