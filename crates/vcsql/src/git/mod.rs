mod repository;
mod walk;

pub use repository::{
    git_time, BlameLine, BranchInfo, FileStat, GitRepo, TagAnnotation, TagInfo, TreeFile,
};
pub use walk::CommitWalk;
