#![forbid(unsafe_code)]

use super::*;
use bi_core::ids::BranchName;
use rusqlite::{OptionalExtension, params};

fn normalize_repository_url(raw: &str) -> Result<String, StoreError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(StoreError::InvalidInput("repository.url must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn read_repository_row(row: &rusqlite::Row<'_>) -> Result<RepositoryRow, rusqlite::Error> {
    Ok(RepositoryRow {
        name: row.get(0)?,
        url: row.get(1)?,
        active: row.get::<_, i64>(2)? != 0,
        created_at_ms: row.get(3)?,
        updated_at_ms: row.get(4)?,
    })
}

impl SqliteStore {
    /// Registers a repository, or re-activates it with a new url.
    pub fn repository_upsert(
        &mut self,
        name: &BranchName,
        url: &str,
    ) -> Result<RepositoryRow, StoreError> {
        let url = normalize_repository_url(url)?;
        let now_ms = now_ms();
        self.conn.execute(
            r#"
            INSERT INTO repositories(name, url, active, created_at_ms, updated_at_ms)
            VALUES (?1, ?2, 1, ?3, ?3)
            ON CONFLICT(name) DO UPDATE SET url=excluded.url, active=1, updated_at_ms=excluded.updated_at_ms
            "#,
            params![name.as_str(), url, now_ms],
        )?;
        self.repository_get(name.as_str())?
            .ok_or_else(|| StoreError::UnknownRepository(name.to_string()))
    }

    pub fn repository_get(&self, name: &str) -> Result<Option<RepositoryRow>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT name, url, active, created_at_ms, updated_at_ms FROM repositories WHERE name=?1",
                params![name.trim()],
                read_repository_row,
            )
            .optional()?)
    }

    pub fn repositories_list(&self) -> Result<Vec<RepositoryRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT name, url, active, created_at_ms, updated_at_ms FROM repositories ORDER BY name ASC",
        )?;
        let rows = stmt.query_map([], read_repository_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn repository_set_active(&mut self, name: &str, active: bool) -> Result<(), StoreError> {
        let updated = self.conn.execute(
            "UPDATE repositories SET active=?2, updated_at_ms=?3 WHERE name=?1",
            params![name.trim(), i64::from(active), now_ms()],
        )?;
        if updated == 0 {
            return Err(StoreError::UnknownRepository(name.trim().to_string()));
        }
        Ok(())
    }
}
