#![forbid(unsafe_code)]

use super::*;
use rusqlite::{OptionalExtension, params};

fn normalize_cache_key(raw: &str) -> Result<&str, StoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidInput("cache key must not be empty"));
    }
    Ok(trimmed)
}

impl SqliteStore {
    /// Expired entries read as absent.
    pub fn cache_get(&self, key: &str) -> Result<Option<CacheEntryRow>, StoreError> {
        let key = normalize_cache_key(key)?;
        let entry = self
            .conn
            .query_row(
                "SELECT key, value, expires_at_ms, updated_at_ms FROM cache_entries WHERE key=?1",
                params![key],
                |row| {
                    Ok(CacheEntryRow {
                        key: row.get(0)?,
                        value: row.get(1)?,
                        expires_at_ms: row.get(2)?,
                        updated_at_ms: row.get(3)?,
                    })
                },
            )
            .optional()?;
        let now_ms = now_ms();
        Ok(entry.filter(|e| e.expires_at_ms.is_none_or(|expires| expires > now_ms)))
    }

    /// `ttl_ms = None` keeps the entry until it is overwritten or deleted.
    pub fn cache_set(&mut self, key: &str, value: &str, ttl_ms: Option<u64>) -> Result<(), StoreError> {
        let key = normalize_cache_key(key)?;
        let now_ms = now_ms();
        let expires_at_ms = ttl_ms
            .map(|ttl| i64::try_from(ttl).unwrap_or(i64::MAX))
            .map(|ttl| now_ms.saturating_add(ttl));
        self.conn.execute(
            r#"
            INSERT INTO cache_entries(key, value, expires_at_ms, updated_at_ms)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(key) DO UPDATE SET
              value=excluded.value, expires_at_ms=excluded.expires_at_ms, updated_at_ms=excluded.updated_at_ms
            "#,
            params![key, value, expires_at_ms, now_ms],
        )?;
        Ok(())
    }

    pub fn cache_delete(&mut self, key: &str) -> Result<bool, StoreError> {
        let key = normalize_cache_key(key)?;
        let removed = self
            .conn
            .execute("DELETE FROM cache_entries WHERE key=?1", params![key])?;
        Ok(removed > 0)
    }

    pub fn cache_purge_expired(&mut self) -> Result<usize, StoreError> {
        Ok(self.conn.execute(
            "DELETE FROM cache_entries WHERE expires_at_ms IS NOT NULL AND expires_at_ms <= ?1",
            params![now_ms()],
        )?)
    }
}
