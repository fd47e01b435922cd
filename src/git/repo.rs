use crate::error::{CommitSizeError, Result};
use gix::{discover, Repository};
use std::path::{Path, PathBuf};

pub struct GitRepo {
    repo: Repository,
    path: PathBuf,
}

impl GitRepo {
    /// Open a repository at `path`, or current dir if `None`
    pub fn open<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let repo_path = match path {
            Some(p) => p.as_ref().to_path_buf(),
            None => std::env::current_dir()?,
        };

        let repo = discover(&repo_path)?;
        let path = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();

        Ok(Self { repo, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full hex id of the commit HEAD currently points at.
    ///
    /// A repository without commits has nothing to measure and reports
    /// `EmptyDistribution`.
    pub fn head_revision(&self) -> Result<String> {
        let mut head = self.repo.head()?;
        if head.is_unborn() {
            return Err(CommitSizeError::EmptyDistribution);
        }
        let head_commit = head.peel_to_commit_in_place()?;
        Ok(head_commit.id.to_string())
    }
}
