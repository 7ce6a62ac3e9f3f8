use std::collections::BTreeSet;

use git2::build::CheckoutBuilder;
use git2::{ErrorCode, FetchOptions, Oid, PushOptions};
use tracing::{debug, info};

use super::{remote_callbacks, CommitRecord, Repository, DEFAULT_REMOTE};
use crate::{Error, Result};

/// Relationship between the local branch tip and a fetched remote tip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAnalysis {
    /// Remote tip is the local tip or one of its ancestors
    UpToDate,
    /// Local tip is an ancestor of the remote tip
    FastForward,
    /// Histories diverged
    Normal,
}

/// What a pull did to the local branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    UpToDate,
    FastForwarded,
    Merged,
}

impl Repository {
    /// Fetch `branch` from `remote` and reconcile the local branch with it
    ///
    /// Fast-forwards move the branch and `HEAD` in one ref transaction after
    /// checking out the remote tree. Diverged histories are merged into a
    /// two-parent commit; conflicts leave the merge in progress and fail.
    /// Both require `HEAD` to be on `branch`, otherwise nothing is touched.
    pub fn pull(&self, remote: &str, branch: &str) -> Result<PullOutcome> {
        let remote_tip = self.fetch(remote, branch)?;

        match self.merge_analysis(branch, remote_tip)? {
            MergeAnalysis::UpToDate => {
                debug!(remote, branch, "already up to date");
                Ok(PullOutcome::UpToDate)
            }
            MergeAnalysis::FastForward => {
                self.fast_forward(branch, remote_tip)?;
                info!(remote, branch, commit = %remote_tip, "fast-forwarded");
                Ok(PullOutcome::FastForwarded)
            }
            MergeAnalysis::Normal => {
                let merge = self.merge_remote(remote, branch, remote_tip)?;
                info!(remote, branch, commit = %merge.id, "merged");
                Ok(PullOutcome::Merged)
            }
        }
    }

    /// Classify the local `branch` against `remote_tip`
    ///
    /// A branch that does not exist locally yet is always fast-forwarded.
    pub fn merge_analysis(&self, branch: &str, remote_tip: Oid) -> Result<MergeAnalysis> {
        let local_tip = match self.git.find_reference(&branch_ref(branch)) {
            Ok(reference) => reference.peel_to_commit()?.id(),
            Err(err) if err.code() == ErrorCode::NotFound => return Ok(MergeAnalysis::FastForward),
            Err(err) => return Err(err.into()),
        };

        if local_tip == remote_tip || self.git.graph_descendant_of(local_tip, remote_tip)? {
            Ok(MergeAnalysis::UpToDate)
        } else if self.git.graph_descendant_of(remote_tip, local_tip)? {
            Ok(MergeAnalysis::FastForward)
        } else {
            Ok(MergeAnalysis::Normal)
        }
    }

    /// Push the local `branch` to `origin`
    pub fn push(&self, branch: &str) -> Result<()> {
        let mut remote = self.find_remote(DEFAULT_REMOTE)?;
        let refspec = format!("{0}:{0}", branch_ref(branch));

        let mut rejected = Vec::new();
        {
            let mut callbacks = remote_callbacks();
            callbacks.push_update_reference(|name, status| {
                if let Some(status) = status {
                    rejected.push(format!("{name}: {status}"));
                }
                Ok(())
            });
            let mut opts = PushOptions::new();
            opts.remote_callbacks(callbacks);

            remote
                .push(&[refspec.as_str()], Some(&mut opts))
                .map_err(|err| Error::Remote {
                    remote: DEFAULT_REMOTE.to_string(),
                    message: err.message().to_string(),
                })?;
        }

        if !rejected.is_empty() {
            return Err(Error::Remote {
                remote: DEFAULT_REMOTE.to_string(),
                message: format!("push rejected: {}", rejected.join(", ")),
            });
        }

        info!(branch, "pushed");
        Ok(())
    }

    /// Commit the whole working tree, then push `branch`
    pub fn commit_and_push(&self, message: &str, branch: &str) -> Result<CommitRecord> {
        let commit = self.commit_all(message)?;
        self.push(branch)?;
        Ok(commit)
    }

    fn find_remote(&self, name: &str) -> Result<git2::Remote<'_>> {
        self.git.find_remote(name).map_err(|err| match err.code() {
            ErrorCode::NotFound | ErrorCode::InvalidSpec => Error::NoRemote {
                name: name.to_string(),
            },
            _ => err.into(),
        })
    }

    /// Fetch `branch` into `refs/remotes/<remote>/<branch>` and return its tip
    fn fetch(&self, remote_name: &str, branch: &str) -> Result<Oid> {
        let mut remote = self.find_remote(remote_name)?;
        let tracking = format!("refs/remotes/{remote_name}/{branch}");
        let refspec = format!("+{}:{tracking}", branch_ref(branch));

        let mut opts = FetchOptions::new();
        opts.remote_callbacks(remote_callbacks());
        remote
            .fetch(&[refspec.as_str()], Some(&mut opts), None)
            .map_err(|err| Error::Remote {
                remote: remote_name.to_string(),
                message: err.message().to_string(),
            })?;
        debug!(remote = remote_name, branch, "fetched");

        let reference = self.git.find_reference(&tracking).map_err(|err| Error::Remote {
            remote: remote_name.to_string(),
            message: format!("branch '{branch}' not found on remote: {}", err.message()),
        })?;
        Ok(reference.peel_to_commit()?.id())
    }

    fn fast_forward(&self, branch: &str, target: Oid) -> Result<()> {
        self.ensure_head_on(branch)?;
        let commit = self.git.find_commit(target)?;
        self.git
            .checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))?;

        let refname = branch_ref(branch);
        let message = format!("pull: fast-forward to {target}");
        let mut transaction = self.git.transaction()?;
        transaction.lock_ref(&refname)?;
        transaction.lock_ref("HEAD")?;
        transaction.set_target(&refname, target, None, &message)?;
        transaction.set_symbolic_target("HEAD", &refname, None, &message)?;
        transaction.commit()?;
        Ok(())
    }

    fn merge_remote(&self, remote: &str, branch: &str, remote_tip: Oid) -> Result<CommitRecord> {
        self.ensure_head_on(branch)?;
        let local = self.git.head()?.peel_to_commit()?;
        let theirs = self.git.find_commit(remote_tip)?;
        let annotated = self.git.find_annotated_commit(remote_tip)?;
        self.git.merge(&[&annotated], None, None)?;

        let mut index = self.git.index()?;
        if index.has_conflicts() {
            let mut paths = BTreeSet::new();
            for conflict in index.conflicts()? {
                let conflict = conflict?;
                let entry = conflict.our.or(conflict.their).or(conflict.ancestor);
                if let Some(entry) = entry {
                    paths.insert(String::from_utf8_lossy(&entry.path).into_owned());
                }
            }
            return Err(Error::Conflict {
                paths: paths.into_iter().collect(),
            });
        }

        let signature = self.signature()?;
        let tree = self.git.find_tree(index.write_tree().map_err(Error::WriteTree)?)?;
        let message = format!("Merge {remote}/{branch} into {branch}");
        let id = self.git.commit(
            Some("HEAD"),
            &signature,
            &signature,
            &message,
            &tree,
            &[&local, &theirs],
        )?;
        self.git.cleanup_state()?;

        Ok(CommitRecord::from(&self.git.find_commit(id)?))
    }

    /// Fail with `BranchMismatch` unless `HEAD` is attached to `branch`
    ///
    /// An unborn `HEAD` counts as attached to the branch it names.
    fn ensure_head_on(&self, branch: &str) -> Result<()> {
        let head = self.git.find_reference("HEAD")?;
        let refname = branch_ref(branch);
        match head.symbolic_target() {
            Some(target) if target == refname => Ok(()),
            target => Err(Error::BranchMismatch {
                expected: branch.to_string(),
                actual: target
                    .map(|target| target.strip_prefix("refs/heads/").unwrap_or(target))
                    .unwrap_or("HEAD")
                    .to_string(),
            }),
        }
    }
}

fn branch_ref(branch: &str) -> String {
    format!("refs/heads/{branch}")
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{repository, write};
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_pull_without_remote() {
        let temp = TempDir::new().unwrap();
        let repo = repository(temp.path());

        let err = repo.pull(DEFAULT_REMOTE, "master").unwrap_err();
        assert!(matches!(err, Error::NoRemote { name } if name == "origin"));
    }

    #[test]
    fn test_push_without_remote() {
        let temp = TempDir::new().unwrap();
        let repo = repository(temp.path());
        write(&repo, "a.txt", "a");

        let err = repo.commit_and_push("first", "master").unwrap_err();
        assert!(matches!(err, Error::NoRemote { .. }));
        // the commit itself still landed
        assert_eq!(repo.commit_count().unwrap(), 1);
    }

    #[test]
    fn test_commit_and_push_skips_push_on_empty_message() {
        let temp = TempDir::new().unwrap();
        let repo = repository(temp.path());

        let err = repo.commit_and_push("", "master").unwrap_err();
        assert!(matches!(err, Error::EmptyMessage));
    }

    #[test]
    fn test_merge_analysis_on_own_history() {
        let temp = TempDir::new().unwrap();
        let repo = repository(temp.path());
        write(&repo, "a.txt", "a");
        let first = repo.commit_all("first").unwrap();
        write(&repo, "a.txt", "b");
        let second = repo.commit_all("second").unwrap();

        assert_eq!(
            repo.merge_analysis("master", second.id).unwrap(),
            MergeAnalysis::UpToDate
        );
        assert_eq!(
            repo.merge_analysis("master", first.id).unwrap(),
            MergeAnalysis::UpToDate
        );
        assert_eq!(
            repo.merge_analysis("missing", first.id).unwrap(),
            MergeAnalysis::FastForward
        );
    }
}
