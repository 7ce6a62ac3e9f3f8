use std::collections::HashSet;
use std::path::PathBuf;

use git2::{Oid, Sort};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::Repository;
use crate::{Error, Result};

/// Snapshot of a commit, detached from the repository handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub id: Oid,
    pub parent_ids: Vec<Oid>,
    pub tree_id: Oid,
    pub message: String,
    pub author: String,
    /// Committer time, seconds since the epoch
    pub time: i64,
}

impl From<&git2::Commit<'_>> for CommitRecord {
    fn from(commit: &git2::Commit<'_>) -> Self {
        Self {
            id: commit.id(),
            parent_ids: commit.parent_ids().collect(),
            tree_id: commit.tree_id(),
            message: commit.message().unwrap_or_default().to_string(),
            author: commit.author().name().unwrap_or_default().to_string(),
            time: commit.time().seconds(),
        }
    }
}

impl Repository {
    /// Stage the whole working tree and commit it on top of `HEAD`
    ///
    /// Every regular file outside `.git` is added; index entries whose file
    /// no longer exists are removed. Advances the current branch and `HEAD`.
    pub fn commit_all(&self, message: &str) -> Result<CommitRecord> {
        if message.is_empty() {
            return Err(Error::EmptyMessage);
        }

        let signature = self.signature()?;
        let mut index = self.git.index()?;
        let mut staged = HashSet::new();

        let walker = WalkDir::new(&self.path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.file_name() != ".git");
        for entry in walker {
            let entry = entry.map_err(|err| Error::Staging {
                path: err.path().map(PathBuf::from).unwrap_or_else(|| self.path.clone()),
                message: err.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = self.relative_path(entry.path())?;
            index.add_path(&relative).map_err(|err| Error::Staging {
                path: entry.path().to_path_buf(),
                message: err.message().to_string(),
            })?;
            staged.insert(relative);
        }

        let vanished: Vec<PathBuf> = index
            .iter()
            .map(|entry| PathBuf::from(String::from_utf8_lossy(&entry.path).into_owned()))
            .filter(|path| !staged.contains(path))
            .collect();
        for path in &vanished {
            index.remove_path(path).map_err(|err| Error::Staging {
                path: path.clone(),
                message: err.message().to_string(),
            })?;
        }
        debug!(staged = staged.len(), removed = vanished.len(), "staged working tree");

        index.write()?;
        let tree_id = index.write_tree().map_err(Error::WriteTree)?;
        let tree = self.git.find_tree(tree_id)?;

        let parent = self.head_git_commit()?;
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        let id = self
            .git
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;

        let commit = self.git.find_commit(id)?;
        info!(commit = %id, "created commit");
        Ok(CommitRecord::from(&commit))
    }

    /// Commit `HEAD` points at, `None` before the first commit
    pub fn head_commit(&self) -> Result<Option<CommitRecord>> {
        Ok(self.head_git_commit()?.as_ref().map(CommitRecord::from))
    }

    /// Look up any commit by id
    pub fn find_commit(&self, id: Oid) -> Result<CommitRecord> {
        Ok(CommitRecord::from(&self.git.find_commit(id)?))
    }

    /// Number of commits reachable from `HEAD`
    pub fn commit_count(&self) -> Result<usize> {
        if self.head_git_commit()?.is_none() {
            return Ok(0);
        }

        let mut walk = self.git.revwalk()?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        walk.push_head()?;

        let mut count = 0;
        for id in walk {
            id?;
            count += 1;
        }
        Ok(count)
    }
}
