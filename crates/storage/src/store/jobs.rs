#![forbid(unsafe_code)]

use super::*;
use bi_core::ids::{BranchName, RequestId, Revision};
use bi_core::{JobCategory, JobRecord, JobResult, JobState};
use rusqlite::types::Value as SqlValue;
use rusqlite::{OptionalExtension, params, params_from_iter};

/// Column order shared by `jobs` and `missing_resultsets` reads; see [`read_raw_job`].
pub(super) const JOB_COLUMNS: &str = "request_id, category, repository, revision, build_name, result, \
     submit_timestamp, start_timestamp, end_timestamp";
const JOB_COLUMN_COUNT: usize = 9;

pub(super) struct RawJob {
    request_id: i64,
    category: String,
    repository: String,
    revision: String,
    build_name: String,
    result: String,
    submit_timestamp: i64,
    start_timestamp: i64,
    end_timestamp: i64,
}

pub(super) fn read_raw_job(row: &rusqlite::Row<'_>) -> Result<RawJob, rusqlite::Error> {
    Ok(RawJob {
        request_id: row.get(0)?,
        category: row.get(1)?,
        repository: row.get(2)?,
        revision: row.get(3)?,
        build_name: row.get(4)?,
        result: row.get(5)?,
        submit_timestamp: row.get(6)?,
        start_timestamp: row.get(7)?,
        end_timestamp: row.get(8)?,
    })
}

impl RawJob {
    pub(super) fn decode(self, table: &'static str) -> Result<JobRecord, StoreError> {
        let corrupt = |column: &'static str| StoreError::CorruptRow { table, column };
        Ok(JobRecord {
            request_id: RequestId::try_new(self.request_id).map_err(|_| corrupt("request_id"))?,
            category: JobCategory::parse(&self.category).ok_or_else(|| corrupt("category"))?,
            branch: BranchName::try_new(self.repository).map_err(|_| corrupt("repository"))?,
            revision: Revision::try_new(self.revision).map_err(|_| corrupt("revision"))?,
            build_name: self.build_name,
            result: JobResult::parse(&self.result).ok_or_else(|| corrupt("result"))?,
            submit_timestamp: self.submit_timestamp,
            start_timestamp: self.start_timestamp,
            end_timestamp: self.end_timestamp,
        })
    }
}

struct RawJobRow {
    job: RawJob,
    state: String,
    resultset_id: i64,
    created_at_ms: i64,
    updated_at_ms: i64,
}

fn read_raw_job_row(row: &rusqlite::Row<'_>) -> Result<RawJobRow, rusqlite::Error> {
    Ok(RawJobRow {
        job: read_raw_job(row)?,
        state: row.get(JOB_COLUMN_COUNT)?,
        resultset_id: row.get(JOB_COLUMN_COUNT + 1)?,
        created_at_ms: row.get(JOB_COLUMN_COUNT + 2)?,
        updated_at_ms: row.get(JOB_COLUMN_COUNT + 3)?,
    })
}

impl RawJobRow {
    fn decode(self) -> Result<JobRow, StoreError> {
        let state = JobState::parse(&self.state).ok_or(StoreError::CorruptRow {
            table: "jobs",
            column: "state",
        })?;
        Ok(JobRow {
            job: self.job.decode("jobs")?,
            state,
            resultset_id: self.resultset_id,
            created_at_ms: self.created_at_ms,
            updated_at_ms: self.updated_at_ms,
        })
    }
}

fn normalize_build_name(raw: &str) -> Result<&str, StoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidInput("job.build_name must not be empty"));
    }
    Ok(trimmed)
}

impl SqliteStore {
    /// Inserts the job or moves the stored row forward to the job's state.
    ///
    /// The read and the write share one transaction, so concurrent ingesters
    /// sharing the database file cannot interleave on the same request id.
    pub fn job_upsert(&mut self, request: JobUpsertRequest) -> Result<JobUpsertOutcome, StoreError> {
        let JobUpsertRequest { job, resultset_id } = request;
        let build_name = normalize_build_name(&job.build_name)?;
        let state = job.state();
        let now_ms = now_ms();

        let tx = self.conn.transaction()?;
        let current: Option<String> = tx
            .query_row(
                "SELECT state FROM jobs WHERE request_id=?1",
                params![job.request_id.get()],
                |row| row.get(0),
            )
            .optional()?;

        let outcome = match current {
            None => {
                tx.execute(
                    r#"
                    INSERT INTO jobs(
                      request_id, category, state, repository, revision, build_name, result, resultset_id,
                      submit_timestamp, start_timestamp, end_timestamp, created_at_ms, updated_at_ms
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                    "#,
                    params![
                        job.request_id.get(),
                        job.category.as_str(),
                        state.as_str(),
                        job.branch.as_str(),
                        job.revision.as_str(),
                        build_name,
                        job.result.as_str(),
                        resultset_id,
                        job.submit_timestamp,
                        job.start_timestamp,
                        job.end_timestamp,
                        now_ms,
                        now_ms,
                    ],
                )?;
                JobUpsertOutcome::Inserted
            }
            Some(raw) => {
                let current = JobState::parse(&raw).ok_or(StoreError::CorruptRow {
                    table: "jobs",
                    column: "state",
                })?;
                if current.can_advance_to(state) {
                    tx.execute(
                        r#"
                        UPDATE jobs
                        SET category=?2, state=?3, repository=?4, revision=?5, build_name=?6, result=?7,
                            resultset_id=?8, submit_timestamp=?9, start_timestamp=?10, end_timestamp=?11,
                            updated_at_ms=?12
                        WHERE request_id=?1
                        "#,
                        params![
                            job.request_id.get(),
                            job.category.as_str(),
                            state.as_str(),
                            job.branch.as_str(),
                            job.revision.as_str(),
                            build_name,
                            job.result.as_str(),
                            resultset_id,
                            job.submit_timestamp,
                            job.start_timestamp,
                            job.end_timestamp,
                            now_ms,
                        ],
                    )?;
                    JobUpsertOutcome::Updated { from: current }
                } else {
                    JobUpsertOutcome::Skipped { current }
                }
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    pub fn job_get(&self, request_id: RequestId) -> Result<Option<JobRow>, StoreError> {
        let sql = format!(
            "SELECT {JOB_COLUMNS}, state, resultset_id, created_at_ms, updated_at_ms \
             FROM jobs WHERE request_id=?1"
        );
        let raw = self
            .conn
            .query_row(&sql, params![request_id.get()], read_raw_job_row)
            .optional()?;
        raw.map(RawJobRow::decode).transpose()
    }

    pub fn jobs_list(&self, request: JobsListRequest) -> Result<Vec<JobRow>, StoreError> {
        let limit = to_sqlite_i64(clamp_limit(request.limit))?;

        let mut clauses = Vec::<&str>::new();
        let mut args = Vec::<SqlValue>::new();
        if let Some(state) = request.state {
            clauses.push("state=?");
            args.push(SqlValue::Text(state.as_str().to_string()));
        }
        if let Some(revision) = request
            .revision
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            // Feeds carry either form of a revision; both share the 12-char prefix.
            clauses.push("substr(revision, 1, 12)=substr(?, 1, 12)");
            args.push(SqlValue::Text(revision.to_ascii_lowercase()));
        }
        args.push(SqlValue::Integer(limit));

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT {JOB_COLUMNS}, state, resultset_id, created_at_ms, updated_at_ms \
             FROM jobs {where_sql} ORDER BY request_id ASC LIMIT ?"
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(args))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(read_raw_job_row(row)?.decode()?);
        }
        Ok(out)
    }

    pub fn jobs_count(&self, state: Option<JobState>) -> Result<u64, StoreError> {
        let count: i64 = match state {
            Some(state) => self.conn.query_row(
                "SELECT COUNT(*) FROM jobs WHERE state=?1",
                params![state.as_str()],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))?,
        };
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
