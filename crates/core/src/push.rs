#![forbid(unsafe_code)]

use crate::ids::{BranchName, Revision, RevisionError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Changeset {
    pub node: Revision,
    pub author: String,
    pub description: String,
    pub branch: Option<String>,
    pub tags: Vec<String>,
}

/// One pushlog entry: the changesets that landed together on a repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Push {
    repository: BranchName,
    push_id: i64,
    author: String,
    pushed_at: i64,
    changesets: Vec<Changeset>,
    tip: Revision,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushError {
    NoChangesets,
    InvalidPushId,
    InvalidNode { index: usize, error: RevisionError },
}

impl Push {
    pub fn try_new(
        repository: BranchName,
        push_id: i64,
        author: impl Into<String>,
        pushed_at: i64,
        changesets: Vec<Changeset>,
    ) -> Result<Self, PushError> {
        if push_id <= 0 {
            return Err(PushError::InvalidPushId);
        }
        let tip = changesets
            .last()
            .map(|cs| cs.node.clone())
            .ok_or(PushError::NoChangesets)?;
        if let Some((index, _)) = changesets
            .iter()
            .enumerate()
            .find(|(_, cs)| !cs.node.is_full())
        {
            return Err(PushError::InvalidNode {
                index,
                error: RevisionError::TooShort,
            });
        }
        Ok(Self {
            repository,
            push_id,
            author: author.into(),
            pushed_at,
            changesets,
            tip,
        })
    }

    pub fn repository(&self) -> &BranchName {
        &self.repository
    }

    pub fn push_id(&self) -> i64 {
        self.push_id
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn pushed_at(&self) -> i64 {
        self.pushed_at
    }

    pub fn changesets(&self) -> &[Changeset] {
        &self.changesets
    }

    /// The tip (last) changeset identifies the push. Every push has one.
    pub fn revision(&self) -> &Revision {
        &self.tip
    }
}
