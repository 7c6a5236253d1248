#![forbid(unsafe_code)]

//! Decoders for the three buildapi feeds.
//!
//! Pending and running documents nest records under `branch -> revision`;
//! the builds4h document is a flat `builds` array whose branch and revision
//! live in each build's `properties`. A document whose root is missing or of
//! the wrong type is rejected as a whole. A single record that cannot be
//! turned into a [`JobRecord`] is logged and skipped.

use bi_core::ids::{BranchName, RequestId, Revision};
use crate::error::FetchError;
use bi_core::{JobCategory, JobRecord, JobResult};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
enum RecordError {
    #[error("undecodable record: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("record carries no positive request id")]
    MissingRequestId,
    #[error("record carries no branch")]
    MissingBranch,
    #[error("record carries no revision")]
    MissingRevision,
    #[error("record carries no builder name")]
    MissingBuildName,
    #[error("invalid branch {0:?}")]
    InvalidBranch(String),
    #[error("invalid revision {0:?}")]
    InvalidRevision(String),
}

#[derive(Deserialize)]
struct PendingRequest {
    id: i64,
    #[serde(default)]
    submitted_at: Option<f64>,
    #[serde(default)]
    buildername: Option<String>,
    #[serde(default)]
    revision: Option<String>,
}

#[derive(Deserialize)]
struct RunningBuild {
    #[serde(default)]
    request_ids: Vec<i64>,
    #[serde(default)]
    submitted_at: Option<f64>,
    #[serde(default)]
    start_time: Option<f64>,
    #[serde(default)]
    buildername: Option<String>,
    #[serde(default)]
    revision: Option<String>,
}

#[derive(Deserialize)]
struct CompletedBuild {
    #[serde(default)]
    request_ids: Vec<i64>,
    #[serde(default)]
    requesttime: Option<f64>,
    #[serde(default)]
    starttime: Option<f64>,
    #[serde(default)]
    endtime: Option<f64>,
    #[serde(default)]
    result: Option<i64>,
    #[serde(default)]
    properties: BuildProperties,
}

#[derive(Default, Deserialize)]
struct BuildProperties {
    #[serde(default)]
    branch: Option<String>,
    #[serde(default)]
    revision: Option<String>,
    #[serde(default)]
    buildername: Option<String>,
    #[serde(default)]
    request_ids: Vec<i64>,
}

pub fn parse_pending(document: &JsonValue) -> Result<Vec<JobRecord>, FetchError> {
    let mut out = Vec::new();
    for_each_nested_record(document, "pending", |branch, revision, record| {
        let request = PendingRequest::deserialize(record)?;
        Ok(JobRecord {
            request_id: request_id(&[request.id])?,
            category: JobCategory::Pending,
            branch: branch_name(Some(branch))?,
            revision: revision_of(request.revision.as_deref().or(Some(revision)))?,
            build_name: build_name(request.buildername)?,
            result: JobResult::Unknown,
            submit_timestamp: epoch_seconds(request.submitted_at),
            start_timestamp: 0,
            end_timestamp: 0,
        })
    }, &mut out)?;
    Ok(out)
}

pub fn parse_running(document: &JsonValue) -> Result<Vec<JobRecord>, FetchError> {
    let mut out = Vec::new();
    for_each_nested_record(document, "running", |branch, revision, record| {
        let build = RunningBuild::deserialize(record)?;
        Ok(JobRecord {
            request_id: request_id(&build.request_ids)?,
            category: JobCategory::Running,
            branch: branch_name(Some(branch))?,
            revision: revision_of(build.revision.as_deref().or(Some(revision)))?,
            build_name: build_name(build.buildername)?,
            result: JobResult::Unknown,
            submit_timestamp: epoch_seconds(build.submitted_at),
            start_timestamp: epoch_seconds(build.start_time),
            end_timestamp: 0,
        })
    }, &mut out)?;
    Ok(out)
}

pub fn parse_builds4h(document: &JsonValue) -> Result<Vec<JobRecord>, FetchError> {
    let builds = document
        .get("builds")
        .and_then(JsonValue::as_array)
        .ok_or(FetchError::Shape {
            root: "builds",
            expected: "array",
        })?;
    let mut out = Vec::with_capacity(builds.len());
    for (index, record) in builds.iter().enumerate() {
        match completed_record(record) {
            Ok(job) => out.push(job),
            Err(error) => warn!(category = "completed", index, %error, "skipping malformed buildapi record"),
        }
    }
    Ok(out)
}

fn completed_record(record: &JsonValue) -> Result<JobRecord, RecordError> {
    let build = CompletedBuild::deserialize(record)?;
    let properties = build.properties;
    let ids = if properties.request_ids.is_empty() {
        build.request_ids
    } else {
        properties.request_ids
    };
    Ok(JobRecord {
        request_id: request_id(&ids)?,
        category: JobCategory::Completed,
        branch: branch_name(properties.branch.as_deref())?,
        revision: revision_of(properties.revision.as_deref())?,
        build_name: build_name(properties.buildername)?,
        result: build
            .result
            .map(JobResult::from_buildbot_code)
            .unwrap_or(JobResult::Unknown),
        submit_timestamp: epoch_seconds(build.requesttime),
        start_timestamp: epoch_seconds(build.starttime),
        end_timestamp: epoch_seconds(build.endtime),
    })
}

fn for_each_nested_record(
    document: &JsonValue,
    root: &'static str,
    mut decode: impl FnMut(&str, &str, &JsonValue) -> Result<JobRecord, RecordError>,
    out: &mut Vec<JobRecord>,
) -> Result<(), FetchError> {
    let branches = document
        .get(root)
        .and_then(JsonValue::as_object)
        .ok_or(FetchError::Shape {
            root,
            expected: "object",
        })?;
    for (branch, revisions) in branches {
        let Some(revisions) = revisions.as_object() else {
            warn!(category = root, branch = %branch, "expected revisions keyed by hash");
            continue;
        };
        for (revision, records) in revisions {
            let Some(records) = records.as_array() else {
                warn!(category = root, branch = %branch, revision = %revision, "expected an array of records");
                continue;
            };
            for record in records {
                match decode(branch, revision, record) {
                    Ok(job) => out.push(job),
                    Err(error) => warn!(
                        category = root,
                        branch = %branch,
                        revision = %revision,
                        %error,
                        "skipping malformed buildapi record"
                    ),
                }
            }
        }
    }
    Ok(())
}

/// The job's identity is its newest request: coalesced builds carry several.
fn request_id(ids: &[i64]) -> Result<RequestId, RecordError> {
    ids.iter()
        .copied()
        .max()
        .and_then(|id| RequestId::try_new(id).ok())
        .ok_or(RecordError::MissingRequestId)
}

fn branch_name(raw: Option<&str>) -> Result<BranchName, RecordError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or(RecordError::MissingBranch)?;
    BranchName::try_new(raw).map_err(|_| RecordError::InvalidBranch(raw.to_string()))
}

fn revision_of(raw: Option<&str>) -> Result<Revision, RecordError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or(RecordError::MissingRevision)?;
    Revision::try_new(raw).map_err(|_| RecordError::InvalidRevision(raw.to_string()))
}

fn build_name(raw: Option<String>) -> Result<String, RecordError> {
    raw.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(RecordError::MissingBuildName)
}

/// buildapi timestamps are float epoch seconds; absent or nonsensical values read as 0.
fn epoch_seconds(raw: Option<f64>) -> i64 {
    raw.filter(|v| v.is_finite() && *v > 0.0)
        .map(|v| v as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const REV: &str = "45f8637cb9f78f19cb8463ff174e81756805d8cf";

    #[test]
    fn pending_records_use_the_request_id_and_map_keys() {
        let document = json!({
            "pending": {
                "mozilla-central": {
                    "45f8637cb9f7": [
                        {"id": 24575179, "submitted_at": 1369231311, "buildername": "WINNT 6.2 mozilla-central opt test mochitest-1", "revision": REV}
                    ]
                }
            }
        });
        let jobs = parse_pending(&document).expect("document shape");
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].request_id.get(), 24575179);
        assert_eq!(jobs[0].branch.as_str(), "mozilla-central");
        assert_eq!(jobs[0].revision.as_str(), REV);
        assert_eq!(jobs[0].submit_timestamp, 1369231311);
        assert_eq!(jobs[0].category, JobCategory::Pending);
    }

    #[test]
    fn running_records_use_the_largest_request_id() {
        let document = json!({
            "running": {
                "mozilla-central": {
                    "45f8637cb9f7": [
                        {"request_ids": [24767130, 24767134], "submitted_at": 1369231311.5, "start_time": 1369231400, "buildername": "b2g_ics_armv7a_gecko_emulator", "number": 3}
                    ]
                }
            }
        });
        let jobs = parse_running(&document).expect("document shape");
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].request_id.get(), 24767134);
        assert_eq!(jobs[0].revision.as_str(), "45f8637cb9f7");
        assert_eq!(jobs[0].start_timestamp, 1369231400);
    }

    #[test]
    fn builds4h_prefers_property_request_ids_and_maps_result_codes() {
        let document = json!({
            "builds": [
                {
                    "request_ids": [1],
                    "requesttime": 1369231311, "starttime": 1369231400, "endtime": 1369232400,
                    "result": 2,
                    "properties": {"branch": "mozilla-central", "revision": REV, "buildername": "linux opt build", "request_ids": [7, 9]}
                }
            ]
        });
        let jobs = parse_builds4h(&document).expect("document shape");
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].request_id.get(), 9);
        assert_eq!(jobs[0].result, JobResult::Busted);
        assert_eq!(jobs[0].end_timestamp, 1369232400);
    }

    #[test]
    fn malformed_records_are_skipped() {
        let document = json!({
            "builds": [
                {"properties": {"branch": "mozilla-central", "revision": REV, "buildername": "no ids"}},
                {"request_ids": [5], "properties": {"revision": REV, "buildername": "no branch"}},
                {"request_ids": [6], "properties": {"branch": "mozilla-central", "buildername": "no revision"}},
                {"request_ids": [7], "properties": {"branch": "mozilla-central", "revision": "not-hex!", "buildername": "bad revision"}},
                {"request_ids": [8], "properties": {"branch": "mozilla-central", "revision": REV, "buildername": "ok"}}
            ]
        });
        let jobs = parse_builds4h(&document).expect("document shape");
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].request_id.get(), 8);
    }

    #[test]
    fn missing_or_mistyped_root_rejects_the_document() {
        assert!(matches!(
            parse_pending(&json!({})),
            Err(FetchError::Shape { root: "pending", .. })
        ));
        assert!(matches!(
            parse_running(&json!({"running": []})),
            Err(FetchError::Shape { root: "running", .. })
        ));
        assert!(matches!(
            parse_builds4h(&json!({"builds": {}})),
            Err(FetchError::Shape { root: "builds", .. })
        ));
    }

    #[test]
    fn empty_roots_are_valid_documents() {
        assert!(parse_pending(&json!({"pending": {}})).expect("shape").is_empty());
        assert!(parse_builds4h(&json!({"builds": []})).expect("shape").is_empty());
    }

    #[test]
    fn epoch_seconds_truncates_and_defaults_to_zero() {
        assert_eq!(epoch_seconds(Some(12.9)), 12);
        assert_eq!(epoch_seconds(Some(-1.0)), 0);
        assert_eq!(epoch_seconds(Some(f64::NAN)), 0);
        assert_eq!(epoch_seconds(None), 0);
    }
}
