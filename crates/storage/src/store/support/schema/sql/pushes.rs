#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS pushes (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          repository TEXT NOT NULL,
          push_id INTEGER NOT NULL,
          revision TEXT NOT NULL,
          short_revision TEXT NOT NULL,
          author TEXT NOT NULL,
          pushed_at INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          UNIQUE (repository, push_id)
        );

        CREATE TABLE IF NOT EXISTS revisions (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          push_row_id INTEGER NOT NULL REFERENCES pushes(id) ON DELETE CASCADE,
          repository TEXT NOT NULL,
          position INTEGER NOT NULL,
          node TEXT NOT NULL,
          author TEXT NOT NULL,
          description TEXT NOT NULL,
          branch TEXT,
          tags_json TEXT NOT NULL,
          UNIQUE (push_row_id, node)
        );
"#;
