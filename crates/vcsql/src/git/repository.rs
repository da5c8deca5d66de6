//! Git repository wrapper for vcsql.

use crate::error::{Result, VcsqlError};
use chrono::{DateTime, FixedOffset};
use git2::{
    BlameOptions, Branch, BranchType, Commit, Delta, DiffFindOptions, DiffOptions, ObjectType,
    Oid, Patch, Reference, Repository, TreeWalkMode, TreeWalkResult,
};
use std::path::Path;

/// A wrapper around a Git repository handle owned by a single cursor.
///
/// The handle, and every tree, diff and blame object derived from it, is
/// released when the wrapper is dropped.
///
/// # Example
///
/// ```no_run
/// use vcsql::GitRepo;
///
/// let repo = GitRepo::open(".")?;
/// println!("Repository at: {}", repo.path());
/// # Ok::<(), vcsql::VcsqlError>(())
/// ```
pub struct GitRepo {
    repo: Repository,
    path: String,
}

/// Line counts for one file changed by a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub path: String,
    pub old_path: Option<String>,
    pub status: &'static str,
    pub additions: i64,
    pub deletions: i64,
}

/// A blob reachable from a commit's tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeFile {
    pub path: String,
    pub id: Oid,
    pub executable: bool,
}

/// One line of a file with the commit that last touched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameLine {
    pub line_no: i64,
    pub commit: Option<Oid>,
    pub text: String,
}

/// A resolved `refs/tags/*` reference.
#[derive(Debug, Clone, PartialEq)]
pub struct TagInfo {
    pub full_name: String,
    pub name: String,
    pub target: Option<Oid>,
    pub annotation: Option<TagAnnotation>,
}

/// Fields only annotated tags carry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagAnnotation {
    pub target_type: Option<&'static str>,
    pub tagger_name: Option<String>,
    pub tagger_email: Option<String>,
    pub tagger_when: Option<DateTime<FixedOffset>>,
    pub message: Option<String>,
}

/// A resolved local or remote-tracking branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    pub name: String,
    pub full_name: String,
    pub target: Option<Oid>,
    pub symbolic_target: Option<String>,
    pub is_remote: bool,
    pub is_head: bool,
}

impl GitRepo {
    /// Opens a Git repository at the given path.
    ///
    /// Uses `git2::Repository::discover` to find the repository root,
    /// supporting nested directories within a repository.
    ///
    /// # Errors
    ///
    /// Returns `VcsqlError::RepoNotFound` if no Git repository is found.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let repo = Repository::discover(path_ref).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                VcsqlError::RepoNotFound(path_ref.display().to_string())
            } else {
                VcsqlError::Git(e)
            }
        })?;

        let workdir = repo
            .workdir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| repo.path().display().to_string());

        Ok(Self {
            repo,
            path: workdir,
        })
    }

    /// Returns the working directory path of the repository.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns a reference to the underlying `git2::Repository`.
    pub fn inner(&self) -> &Repository {
        &self.repo
    }

    pub fn head_commit(&self) -> Result<Commit<'_>> {
        let head = self.repo.head()?;
        Ok(head.peel_to_commit()?)
    }

    /// Resolves any revision expression (`HEAD~2`, a branch, a tag, a hash).
    pub fn resolve_commit(&self, rev: &str) -> Result<Commit<'_>> {
        let object = self.repo.revparse_single(rev).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                VcsqlError::CommitNotFound(rev.to_string())
            } else {
                VcsqlError::InvalidRevision {
                    rev: rev.to_string(),
                    reason: e.message().to_string(),
                }
            }
        })?;
        object.peel_to_commit().map_err(|e| VcsqlError::InvalidRevision {
            rev: rev.to_string(),
            reason: e.message().to_string(),
        })
    }

    /// Looks up a commit by object id.
    pub fn find_commit(&self, id: Oid) -> Result<Commit<'_>> {
        self.repo.find_commit(id).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                VcsqlError::CommitNotFound(id.to_string())
            } else {
                VcsqlError::Git(e)
            }
        })
    }

    /// Parses a full hexadecimal object id; abbreviated or malformed ids
    /// return `None`.
    pub fn parse_full_id(hex: &str) -> Option<Oid> {
        let full = hex.len() == 40 || hex.len() == 64;
        if !full || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Oid::from_str(hex).ok()
    }

    /// Diffs `commit` against its first parent (or the empty tree) with
    /// rename detection, counting added and deleted lines per file.
    pub fn diff_stats(&self, commit: &Commit<'_>) -> Result<Vec<FileStat>> {
        let tree = commit.tree()?;
        let parent_tree = match commit.parent_count() {
            0 => None,
            _ => Some(commit.parent(0)?.tree()?),
        };

        let mut opts = DiffOptions::new();
        let mut diff =
            self.repo
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))?;
        let mut find = DiffFindOptions::new();
        find.renames(true);
        diff.find_similar(Some(&mut find))?;

        let mut stats = Vec::with_capacity(diff.deltas().len());
        for (idx, delta) in diff.deltas().enumerate() {
            let (mut additions, mut deletions) = (0, 0);
            if let Some(patch) = Patch::from_diff(&diff, idx)? {
                for hunk in 0..patch.num_hunks() {
                    for line in 0..patch.num_lines_in_hunk(hunk)? {
                        match patch.line_in_hunk(hunk, line)?.origin() {
                            '+' => additions += 1,
                            '-' => deletions += 1,
                            _ => {}
                        }
                    }
                }
            }

            let new_path = delta.new_file().path().map(|p| p.display().to_string());
            let old_path = delta.old_file().path().map(|p| p.display().to_string());
            let path = new_path.clone().or_else(|| old_path.clone()).unwrap_or_default();
            let old_path = match delta.status() {
                Delta::Renamed | Delta::Copied => old_path,
                _ => None,
            };

            stats.push(FileStat {
                path,
                old_path,
                status: delta_status(delta.status()),
                additions,
                deletions,
            });
        }
        Ok(stats)
    }

    /// Lists every blob in `commit`'s tree, in tree order.
    pub fn tree_files(&self, commit: &Commit<'_>) -> Result<Vec<TreeFile>> {
        let tree = commit.tree()?;
        let mut files = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                if let Some(name) = entry.name() {
                    files.push(TreeFile {
                        path: format!("{}{}", root, name),
                        id: entry.id(),
                        executable: entry.filemode() == 0o100755,
                    });
                }
            }
            TreeWalkResult::Ok
        })?;
        Ok(files)
    }

    pub fn blob_content(&self, id: Oid) -> Result<Vec<u8>> {
        Ok(self.repo.find_blob(id)?.content().to_vec())
    }

    /// Attributes every line of `file` as of `commit`.
    ///
    /// The blame object lives only for this call; the returned lines own
    /// their data.
    pub fn blame_file(&self, commit: Oid, file: &TreeFile) -> Result<Vec<BlameLine>> {
        let content = self.blob_content(file.id)?;
        if content.is_empty() {
            return Ok(Vec::new());
        }

        let mut opts = BlameOptions::new();
        opts.newest_commit(commit);
        let blame = self.repo.blame_file(Path::new(&file.path), Some(&mut opts))?;

        let text = String::from_utf8_lossy(&content);
        let lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| BlameLine {
                line_no: i as i64 + 1,
                commit: blame.get_line(i + 1).map(|hunk| hunk.final_commit_id()),
                text: line.to_string(),
            })
            .collect();
        Ok(lines)
    }

    /// Full names of all `refs/tags/*` references.
    pub fn tag_refs(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for reference in self.repo.references_glob("refs/tags/*")? {
            if let Some(name) = reference?.name() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    /// Resolves a tag reference, reading the tag object when it is annotated.
    pub fn tag(&self, full_name: &str) -> Result<TagInfo> {
        let reference = self.repo.find_reference(full_name)?;
        let name = reference.shorthand().unwrap_or(full_name).to_string();
        let direct = reference.target();

        let annotated = direct.and_then(|oid| self.repo.find_tag(oid).ok());
        let (target, annotation) = match annotated {
            Some(tag) => {
                let tagger = tag.tagger();
                let annotation = TagAnnotation {
                    target_type: tag.target_type().map(|t| t.str()),
                    tagger_name: tagger.as_ref().and_then(|s| s.name().map(str::to_string)),
                    tagger_email: tagger.as_ref().and_then(|s| s.email().map(str::to_string)),
                    tagger_when: tagger.as_ref().and_then(|s| git_time(s.when())),
                    message: tag.message().map(str::to_string),
                };
                (Some(tag.target_id()), Some(annotation))
            }
            None => (reference.resolve().ok().and_then(|r| r.target()), None),
        };

        Ok(TagInfo {
            full_name: full_name.to_string(),
            name,
            target,
            annotation,
        })
    }

    /// Full names and kinds of all local and remote-tracking branches.
    pub fn branch_refs(&self) -> Result<Vec<(String, BranchType)>> {
        let mut names = Vec::new();
        for branch in self.repo.branches(None)? {
            let (branch, kind) = branch?;
            if let Some(name) = branch.get().name() {
                names.push((name.to_string(), kind));
            }
        }
        Ok(names)
    }

    /// Resolves a branch. A symbolic branch (such as `origin/HEAD`) reports
    /// the ref it points at separately from the commit it finally resolves to.
    pub fn branch(&self, full_name: &str, kind: BranchType) -> Result<BranchInfo> {
        let reference = self.repo.find_reference(full_name)?;
        let symbolic_target = reference.symbolic_target().map(str::to_string);
        let target = resolve_target(&reference)?;
        let branch = Branch::wrap(reference);
        let name = branch
            .name()?
            .map(str::to_string)
            .unwrap_or_else(|| full_name.to_string());

        Ok(BranchInfo {
            name,
            full_name: full_name.to_string(),
            target,
            symbolic_target,
            is_remote: kind == BranchType::Remote,
            is_head: branch.is_head(),
        })
    }
}

fn resolve_target(reference: &Reference<'_>) -> Result<Option<Oid>> {
    match reference.target() {
        Some(oid) => Ok(Some(oid)),
        None => match reference.resolve() {
            Ok(resolved) => Ok(resolved.target()),
            // dangling symbolic ref
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        },
    }
}

fn delta_status(status: Delta) -> &'static str {
    match status {
        Delta::Added => "added",
        Delta::Deleted => "deleted",
        Delta::Modified => "modified",
        Delta::Renamed => "renamed",
        Delta::Copied => "copied",
        Delta::Typechange => "typechange",
        Delta::Unmodified => "unmodified",
        _ => "other",
    }
}

/// Converts a git timestamp, keeping its UTC offset.
pub fn git_time(time: git2::Time) -> Option<DateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(time.offset_minutes() * 60)?;
    DateTime::from_timestamp(time.seconds(), 0).map(|dt| dt.with_timezone(&offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_id() {
        let hex = "0123456789abcdef0123456789abcdef01234567";
        assert_eq!(GitRepo::parse_full_id(hex), Oid::from_str(hex).ok());
        assert!(GitRepo::parse_full_id("0123456").is_none());
        assert!(GitRepo::parse_full_id("zz23456789abcdef0123456789abcdef01234567").is_none());
    }

    #[test]
    fn test_git_time_keeps_offset() {
        let when = git2::Time::new(1_700_000_000, 120);
        let ts = git_time(when).unwrap();
        assert_eq!(ts.to_rfc3339(), "2023-11-15T00:13:20+02:00");
    }
}
