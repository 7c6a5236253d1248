#![forbid(unsafe_code)]

use crate::error::FetchError;
use crate::fetch::Fetcher;
use bi_core::ids::{BranchName, Revision};
use bi_core::{Changeset, Push};
use bi_storage::RepositoryRow;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Deserialize)]
struct PushlogDocument {
    #[serde(default)]
    pushes: BTreeMap<String, PushlogEntry>,
}

#[derive(Deserialize)]
struct PushlogEntry {
    #[serde(default)]
    date: i64,
    #[serde(default)]
    user: String,
    #[serde(default)]
    changesets: Vec<PushlogChangeset>,
}

#[derive(Deserialize)]
struct PushlogChangeset {
    node: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    branch: Option<String>,
    #[serde(default)]
    desc: String,
    #[serde(default)]
    tags: Vec<String>,
}

pub fn pushlog_url(repository_url: &str, revision: &str) -> String {
    format!(
        "{}/json-pushes/?full=1&version=2&changeset={}",
        repository_url.trim().trim_end_matches('/'),
        revision.trim()
    )
}

/// Decodes a version 2 pushlog document, oldest push first. Entries that do
/// not form a valid push are logged and left out.
pub fn parse_pushlog(
    repository: &BranchName,
    document: &JsonValue,
) -> Result<Vec<Push>, serde_json::Error> {
    let document = PushlogDocument::deserialize(document)?;
    let mut pushes = Vec::with_capacity(document.pushes.len());
    for (key, entry) in document.pushes {
        let Ok(push_id) = key.trim().parse::<i64>() else {
            warn!(repository = %repository, push_id = %key, "skipping pushlog entry with a non-numeric id");
            continue;
        };
        let mut changesets = Vec::with_capacity(entry.changesets.len());
        for changeset in entry.changesets {
            let Ok(node) = Revision::try_new(changeset.node.as_str()) else {
                warn!(repository = %repository, push_id, node = %changeset.node, "skipping changeset with an invalid node");
                continue;
            };
            changesets.push(Changeset {
                node,
                author: changeset.author,
                description: changeset.desc,
                branch: changeset.branch,
                tags: changeset.tags,
            });
        }
        match Push::try_new(repository.clone(), push_id, entry.user, entry.date, changesets) {
            Ok(push) => pushes.push(push),
            Err(error) => warn!(repository = %repository, push_id, ?error, "skipping invalid push"),
        }
    }
    pushes.sort_by_key(Push::push_id);
    Ok(pushes)
}

/// Supplies push metadata for a revision that is not stored yet.
pub trait PushSource {
    fn fetch_pushes(
        &self,
        repository: &RepositoryRow,
        revision: &str,
    ) -> Result<Vec<Push>, FetchError>;
}

/// Reads `json-pushes` from the repository's hg server.
pub struct HgPushlogSource {
    fetcher: Fetcher,
}

impl HgPushlogSource {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

impl PushSource for HgPushlogSource {
    fn fetch_pushes(
        &self,
        repository: &RepositoryRow,
        revision: &str,
    ) -> Result<Vec<Push>, FetchError> {
        let name = BranchName::try_new(repository.name.as_str())
            .map_err(|_| FetchError::InvalidRepository(repository.name.clone()))?;
        let url = pushlog_url(&repository.url, revision);
        let document = self.fetcher.fetch_json(&url)?;
        parse_pushlog(&name, &document).map_err(|source| FetchError::Json { url, source })
    }
}
