#![forbid(unsafe_code)]

use super::jobs::{JOB_COLUMNS, read_raw_job};
use super::*;
use bi_core::ids::RequestId;
use bi_core::{JobCategory, JobRecord};
use rusqlite::{OptionalExtension, params};

impl SqliteStore {
    /// Queues a job whose push is not known yet. One entry per request id;
    /// a newer state for a queued request replaces the payload but keeps its
    /// attempt count and age.
    pub fn missing_enqueue(&mut self, job: &JobRecord) -> Result<MissingEnqueueOutcome, StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let queued: Option<String> = tx
            .query_row(
                "SELECT category FROM missing_resultsets WHERE request_id=?1",
                params![job.request_id.get()],
                |row| row.get(0),
            )
            .optional()?;

        let outcome = match queued {
            None => {
                tx.execute(
                    r#"
                    INSERT INTO missing_resultsets(
                      request_id, category, repository, revision, build_name, result,
                      submit_timestamp, start_timestamp, end_timestamp, attempts, created_at_ms, updated_at_ms
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?10)
                    "#,
                    params![
                        job.request_id.get(),
                        job.category.as_str(),
                        job.branch.as_str(),
                        job.revision.as_str(),
                        job.build_name.as_str(),
                        job.result.as_str(),
                        job.submit_timestamp,
                        job.start_timestamp,
                        job.end_timestamp,
                        now_ms,
                    ],
                )?;
                MissingEnqueueOutcome::Queued
            }
            Some(raw) => {
                let queued = JobCategory::parse(&raw).ok_or(StoreError::CorruptRow {
                    table: "missing_resultsets",
                    column: "category",
                })?;
                if queued.state().can_advance_to(job.state()) {
                    tx.execute(
                        r#"
                        UPDATE missing_resultsets
                        SET category=?2, repository=?3, revision=?4, build_name=?5, result=?6,
                            submit_timestamp=?7, start_timestamp=?8, end_timestamp=?9, updated_at_ms=?10
                        WHERE request_id=?1
                        "#,
                        params![
                            job.request_id.get(),
                            job.category.as_str(),
                            job.branch.as_str(),
                            job.revision.as_str(),
                            job.build_name.as_str(),
                            job.result.as_str(),
                            job.submit_timestamp,
                            job.start_timestamp,
                            job.end_timestamp,
                            now_ms,
                        ],
                    )?;
                    MissingEnqueueOutcome::Refreshed
                } else {
                    MissingEnqueueOutcome::Unchanged
                }
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    /// Oldest entries first.
    pub fn missing_list(&self, limit: usize) -> Result<Vec<MissingResultsetRow>, StoreError> {
        let limit = to_sqlite_i64(clamp_limit(limit))?;
        let sql = format!(
            "SELECT {JOB_COLUMNS}, attempts, created_at_ms, updated_at_ms \
             FROM missing_resultsets \
             ORDER BY created_at_ms ASC, request_id ASC \
             LIMIT ?1"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![limit])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let raw = read_raw_job(row)?;
            let attempts: i64 = row.get(9)?;
            out.push(MissingResultsetRow {
                job: raw.decode("missing_resultsets")?,
                attempts: u32::try_from(attempts).unwrap_or(0),
                created_at_ms: row.get(10)?,
                updated_at_ms: row.get(11)?,
            });
        }
        Ok(out)
    }

    /// Returns the attempt count after the increment.
    pub fn missing_record_attempt(&mut self, request_id: RequestId) -> Result<u32, StoreError> {
        let tx = self.conn.transaction()?;
        let updated = tx.execute(
            "UPDATE missing_resultsets SET attempts=attempts+1, updated_at_ms=?2 WHERE request_id=?1",
            params![request_id.get(), now_ms()],
        )?;
        if updated == 0 {
            return Err(StoreError::UnknownId);
        }
        let attempts: i64 = tx.query_row(
            "SELECT attempts FROM missing_resultsets WHERE request_id=?1",
            params![request_id.get()],
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok(u32::try_from(attempts).unwrap_or(u32::MAX))
    }

    pub fn missing_remove(&mut self, request_id: RequestId) -> Result<bool, StoreError> {
        let removed = self.conn.execute(
            "DELETE FROM missing_resultsets WHERE request_id=?1",
            params![request_id.get()],
        )?;
        Ok(removed > 0)
    }

    pub fn missing_count(&self) -> Result<u64, StoreError> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM missing_resultsets", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
