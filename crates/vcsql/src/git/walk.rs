//! Revision walk that owns the repository it reads from.

use crate::error::Result;
use crate::git::repository::GitRepo;
use git2::{Oid, Revwalk, Sort};
use self_cell::self_cell;

self_cell!(
    struct WalkCell {
        owner: GitRepo,

        #[covariant]
        dependent: Revwalk,
    }
);

/// Reverse-chronological walk over everything reachable from HEAD.
///
/// Each commit is yielded once, newest committer time first. The walk is
/// incremental: history is read as the cursor advances.
pub struct CommitWalk {
    cell: WalkCell,
}

impl CommitWalk {
    pub fn from_head(repo: GitRepo) -> Result<Self> {
        let cell = WalkCell::try_new(repo, revwalk_from_head)?;
        tracing::debug!(repo = %cell.borrow_owner().path(), "revision walk started");
        Ok(Self { cell })
    }

    pub fn repo(&self) -> &GitRepo {
        self.cell.borrow_owner()
    }

    /// Id of the next commit, or `None` once the walk is done.
    pub fn next_id(&mut self) -> Result<Option<Oid>> {
        let next = self.cell.with_dependent_mut(|_, revwalk| revwalk.next());
        Ok(next.transpose()?)
    }
}

fn revwalk_from_head(repo: &GitRepo) -> Result<Revwalk<'_>> {
    let mut revwalk = repo.inner().revwalk()?;
    revwalk.set_sorting(Sort::TIME)?;
    revwalk.push_head()?;
    Ok(revwalk)
}
