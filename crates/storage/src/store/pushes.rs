#![forbid(unsafe_code)]

use super::*;
use bi_core::ids::{Revision, SHORT_REVISION_LEN};
use bi_core::{Changeset, Push};
use rusqlite::{OptionalExtension, params};
use serde_json::Value as JsonValue;

fn encode_tags(tags: &[String]) -> String {
    JsonValue::from(tags.to_vec()).to_string()
}

fn decode_tags(raw: &str) -> Result<Vec<String>, StoreError> {
    serde_json::from_str(raw).map_err(|_| StoreError::CorruptRow {
        table: "revisions",
        column: "tags_json",
    })
}

impl SqliteStore {
    /// Stores a push and its changesets. Pushes are unique per
    /// (repository, push id); storing a known push is a no-op.
    pub fn push_insert(&mut self, push: &Push) -> Result<PushInsertResult, StoreError> {
        let repository = push.repository().as_str();
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM pushes WHERE repository=?1 AND push_id=?2",
                params![repository, push.push_id()],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(PushInsertResult { id, created: false });
        }

        let revision = push.revision();
        tx.execute(
            r#"
            INSERT INTO pushes(repository, push_id, revision, short_revision, author, pushed_at, created_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                repository,
                push.push_id(),
                revision.as_str(),
                revision.short(),
                push.author(),
                push.pushed_at(),
                now_ms,
            ],
        )?;
        let id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR IGNORE INTO revisions(
                  push_row_id, repository, position, node, author, description, branch, tags_json
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )?;
            for (position, changeset) in push.changesets().iter().enumerate() {
                stmt.execute(params![
                    id,
                    repository,
                    to_sqlite_i64(position)?,
                    changeset.node.as_str(),
                    changeset.author,
                    changeset.description,
                    changeset.branch,
                    encode_tags(&changeset.tags),
                ])?;
            }
        }

        tx.commit()?;
        Ok(PushInsertResult { id, created: true })
    }

    /// Exact match on the push's tip revision.
    pub fn push_id_for_revision(
        &self,
        repository: &str,
        revision: &str,
    ) -> Result<Option<i64>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM pushes WHERE repository=?1 AND revision=?2",
                params![repository, revision.trim().to_ascii_lowercase()],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Match on the first 12 hex digits of the tip revision. When several
    /// pushes share the prefix the most recent one wins.
    pub fn push_id_for_short_revision(
        &self,
        repository: &str,
        revision: &str,
    ) -> Result<Option<i64>, StoreError> {
        let revision = revision.trim().to_ascii_lowercase();
        let short = revision
            .get(..SHORT_REVISION_LEN)
            .ok_or(StoreError::InvalidInput("revision is shorter than 12 characters"))?;
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM pushes WHERE repository=?1 AND short_revision=?2 \
                 ORDER BY push_id DESC LIMIT 1",
                params![repository, short],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn push_get(&self, id: i64) -> Result<Option<PushRow>, StoreError> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT p.id, p.repository, p.push_id, p.revision, p.author, p.pushed_at,
                       (SELECT COUNT(*) FROM revisions r WHERE r.push_row_id = p.id)
                FROM pushes p
                WHERE p.id=?1
                "#,
                params![id],
                read_push_row,
            )
            .optional()?)
    }

    /// Newest pushes first.
    pub fn pushes_list(&self, repository: &str, limit: usize) -> Result<Vec<PushRow>, StoreError> {
        let limit = to_sqlite_i64(clamp_limit(limit))?;
        let mut stmt = self.conn.prepare(
            r#"
            SELECT p.id, p.repository, p.push_id, p.revision, p.author, p.pushed_at,
                   (SELECT COUNT(*) FROM revisions r WHERE r.push_row_id = p.id)
            FROM pushes p
            WHERE p.repository=?1
            ORDER BY p.push_id DESC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![repository, limit], read_push_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn push_changesets(&self, id: i64) -> Result<Vec<Changeset>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT node, author, description, branch, tags_json \
             FROM revisions WHERE push_row_id=?1 ORDER BY position ASC",
        )?;
        let mut rows = stmt.query(params![id])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let node: String = row.get(0)?;
            let tags_json: String = row.get(4)?;
            out.push(Changeset {
                node: Revision::try_new(node).map_err(|_| StoreError::CorruptRow {
                    table: "revisions",
                    column: "node",
                })?,
                author: row.get(1)?,
                description: row.get(2)?,
                branch: row.get(3)?,
                tags: decode_tags(&tags_json)?,
            });
        }
        Ok(out)
    }

    /// Every distinct changeset node, optionally restricted to one repository.
    /// A node that landed in several pushes is listed once, at its first sighting.
    pub fn revision_nodes(&self, repository: Option<&str>) -> Result<Vec<String>, StoreError> {
        let mut out = Vec::new();
        match repository {
            Some(repository) => {
                let mut stmt = self.conn.prepare(
                    "SELECT node FROM revisions WHERE repository=?1 \
                     GROUP BY node ORDER BY MIN(id) ASC",
                )?;
                let rows = stmt.query_map(params![repository], |row| row.get::<_, String>(0))?;
                for node in rows {
                    out.push(node?);
                }
            }
            None => {
                let mut stmt = self.conn.prepare(
                    "SELECT node FROM revisions GROUP BY repository, node ORDER BY MIN(id) ASC",
                )?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                for node in rows {
                    out.push(node?);
                }
            }
        }
        Ok(out)
    }
}

fn read_push_row(row: &rusqlite::Row<'_>) -> Result<PushRow, rusqlite::Error> {
    let changeset_count: i64 = row.get(6)?;
    Ok(PushRow {
        id: row.get(0)?,
        repository: row.get(1)?,
        push_id: row.get(2)?,
        revision: row.get(3)?,
        author: row.get(4)?,
        pushed_at: row.get(5)?,
        changeset_count: usize::try_from(changeset_count).unwrap_or(0),
    })
}
