//! The managed git repository
//!
//! `Repository` owns the working-tree path and a `git2::Repository`, and
//! exposes only the operations hearth needs: committing, change
//! classification, syncing with a remote and switching environments.

mod branch;
mod changes;
mod commit;
mod sync;

use std::path::{Path, PathBuf};

use git2::{Cred, CredentialType, ErrorCode, RemoteCallbacks, RepositoryInitOptions, Signature};
use tracing::debug;

use crate::{Error, Result};

pub use commit::CommitRecord;
pub use sync::{MergeAnalysis, PullOutcome};

/// Remote used when none is named
pub const DEFAULT_REMOTE: &str = "origin";
/// Branch used when none is named
pub const DEFAULT_BRANCH: &str = "master";

pub struct Repository {
    path: PathBuf,
    git: git2::Repository,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository").field("path", &self.path).finish()
    }
}

impl Repository {
    /// Open an existing repository whose working tree is `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = &absolute(path.as_ref())?;
        let git = git2::Repository::open(path).map_err(|source| Error::Repository {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            git,
        })
    }

    /// Initialize a new repository at `path` and register `origin` when given
    ///
    /// Fails if `path` already exists.
    pub fn create(path: impl AsRef<Path>, origin: Option<&str>) -> Result<Self> {
        let path = &absolute(path.as_ref())?;
        if path.exists() {
            return Err(Error::Repository {
                path: path.to_path_buf(),
                source: git2::Error::from_str("path already exists"),
            });
        }

        let mut opts = RepositoryInitOptions::new();
        opts.initial_head(DEFAULT_BRANCH);
        let git = git2::Repository::init_opts(path, &opts).map_err(|source| Error::Repository {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(url) = origin {
            git.remote(DEFAULT_REMOTE, url)?;
            debug!(url, "added origin remote");
        }

        Ok(Self {
            path: path.to_path_buf(),
            git,
        })
    }

    /// Clone `url` into `path`
    pub fn clone(url: &str, path: impl AsRef<Path>) -> Result<Self> {
        let path = &absolute(path.as_ref())?;
        let mut fetch = git2::FetchOptions::new();
        fetch.remote_callbacks(remote_callbacks());

        let git = git2::build::RepoBuilder::new()
            .fetch_options(fetch)
            .clone(url, path)
            .map_err(|source| Error::Repository {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            git,
        })
    }

    /// Root of the working tree
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// URL of a configured remote, if any
    pub fn remote_url(&self, name: &str) -> Result<Option<String>> {
        match self.git.find_remote(name) {
            Ok(remote) => Ok(remote.url().map(str::to_string)),
            Err(err) if err.code() == ErrorCode::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Working-tree changes relative to the index and `HEAD`, as `(status, path)` pairs
    pub fn worktree_changes(&self) -> Result<Vec<(git2::Status, String)>> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(true).recurse_untracked_dirs(true);

        let statuses = self.git.statuses(Some(&mut opts))?;
        Ok(statuses
            .iter()
            .filter_map(|entry| {
                let path = entry.path()?.to_string();
                Some((entry.status(), path))
            })
            .collect())
    }

    /// Signature from git config, falling back to the login and host names
    fn signature(&self) -> Result<Signature<'static>> {
        match self.git.signature() {
            Ok(signature) => Ok(signature.to_owned()),
            Err(err) => {
                debug!(error = %err, "no configured identity, using login name");
                let user = whoami::username();
                let host = whoami::fallible::hostname().unwrap_or_else(|_| "localhost".to_string());
                Ok(Signature::now(&user, &format!("{user}@{host}"))?)
            }
        }
    }

    /// Commit `HEAD` points at, `None` while the branch is unborn
    fn head_git_commit(&self) -> Result<Option<git2::Commit<'_>>> {
        match self.git.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?)),
            Err(err) if matches!(err.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Convert `path` to a repository-relative path, stripping an absolute prefix
    fn relative_path(&self, path: &Path) -> Result<PathBuf> {
        if path.is_absolute() {
            return path
                .strip_prefix(&self.path)
                .map(Path::to_path_buf)
                .map_err(|_| Error::OutsideRepository {
                    path: path.to_path_buf(),
                });
        }
        Ok(path.to_path_buf())
    }
}

/// `path` joined onto the current directory when relative
///
/// Symlinks are left alone so the stored path matches what the caller named.
fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(std::path::absolute(path)?)
}

/// Callbacks for network operations: ssh agent for ssh remotes, otherwise
/// whatever git's credential helpers provide
fn remote_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(|url, username, allowed| {
        if allowed.contains(CredentialType::SSH_KEY) {
            let user = username.unwrap_or("git");
            return Cred::ssh_key_from_agent(user);
        }
        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            if let Ok(config) = git2::Config::open_default() {
                return Cred::credential_helper(&config, url, username);
            }
        }
        Cred::default()
    });
    callbacks
}
