use std::path::Path;

use git2::{ErrorCode, Oid, Tree, TreeWalkMode, TreeWalkResult};
use tracing::debug;

use super::Repository;
use crate::Result;

impl Repository {
    /// Paths touched by `commit` relative to its first parent
    ///
    /// Directories come before their contents, entries within a level in tree
    /// order. A commit without parents reports every path in its tree.
    pub fn changed_paths(&self, commit: Oid) -> Result<Vec<String>> {
        let commit = self.git.find_commit(commit)?;
        let tree = commit.tree()?;
        let parent_tree = match commit.parent_count() {
            0 => None,
            _ => Some(commit.parent(0)?.tree()?),
        };

        let mut paths = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            let Some(name) = entry.name() else {
                return TreeWalkResult::Skip;
            };
            let path = format!("{root}{name}");

            let unchanged = parent_tree
                .as_ref()
                .and_then(|parent| parent.get_path(Path::new(&path)).ok())
                .is_some_and(|old| old.id() == entry.id() && old.filemode() == entry.filemode());
            if unchanged {
                return TreeWalkResult::Skip;
            }

            paths.push(path);
            TreeWalkResult::Ok
        })?;

        Ok(paths)
    }

    /// Whether `path` was added by the `HEAD` commit
    ///
    /// Errors resolve to `false`; see [`Repository::try_created_in_last`].
    pub fn created_in_last(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        self.try_created_in_last(path).unwrap_or_else(|err| {
            debug!(?path, error = %err, "could not classify path as created");
            false
        })
    }

    /// Whether `path` was changed, but not added, by the `HEAD` commit
    ///
    /// Errors resolve to `false`; see [`Repository::try_modified_in_last`].
    pub fn modified_in_last(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        self.try_modified_in_last(path).unwrap_or_else(|err| {
            debug!(?path, error = %err, "could not classify path as modified");
            false
        })
    }

    pub fn try_created_in_last(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = self.relative_path(path.as_ref())?;
        match self.head_parent_tree()? {
            None => Ok(true),
            Some(tree) => tree_contains(&tree, &path).map(|present| !present),
        }
    }

    pub fn try_modified_in_last(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = self.relative_path(path.as_ref())?;
        let Some(tree) = self.head_parent_tree()? else {
            return Ok(false);
        };
        if !tree_contains(&tree, &path)? {
            return Ok(false);
        }

        let head = self.require_head()?;
        let wanted = path.to_string_lossy().replace('\\', "/");
        Ok(self
            .changed_paths(head.id())?
            .iter()
            .any(|changed| *changed == wanted))
    }

    fn require_head(&self) -> Result<git2::Commit<'_>> {
        self.head_git_commit()?
            .ok_or_else(|| git2::Error::from_str("repository has no commits").into())
    }

    /// Tree of `HEAD`'s first parent, `None` for a root commit
    fn head_parent_tree(&self) -> Result<Option<Tree<'_>>> {
        let head = self.require_head()?;
        if head.parent_count() == 0 {
            return Ok(None);
        }
        Ok(Some(head.parent(0)?.tree()?))
    }
}

fn tree_contains(tree: &Tree<'_>, path: &Path) -> Result<bool> {
    match tree.get_path(path) {
        Ok(_) => Ok(true),
        Err(err) if err.code() == ErrorCode::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}
