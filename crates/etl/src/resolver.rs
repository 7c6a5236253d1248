#![forbid(unsafe_code)]

use crate::error::ResolveError;
use bi_core::ids::{BranchName, Revision};
use bi_storage::SqliteStore;

/// Maps a job's branch and revision to the id of its stored push.
///
/// The branch must name an active repository. The revision is matched in
/// full first, then by its 12-character prefix, because pending and running
/// feeds only carry the short form.
pub fn resolve(
    store: &SqliteStore,
    branch: &BranchName,
    revision: &Revision,
) -> Result<i64, ResolveError> {
    let active = store
        .repository_get(branch.as_str())?
        .is_some_and(|repository| repository.active);
    if !active {
        return Err(ResolveError::BranchNotFound {
            branch: branch.to_string(),
        });
    }

    let exact = if revision.is_full() {
        store.push_id_for_revision(branch.as_str(), revision.as_str())?
    } else {
        None
    };
    let found = match exact {
        Some(id) => Some(id),
        None => store.push_id_for_short_revision(branch.as_str(), revision.as_str())?,
    };

    found.ok_or_else(|| ResolveError::ResultsetNotFound {
        branch: branch.to_string(),
        revision: revision.to_string(),
    })
}
