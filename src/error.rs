//! Error types for hearth operations

use std::path::PathBuf;

/// Result type for hearth library operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while syncing the repository or running package actions
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Config error at {path:?}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("Repository error at {path:?}: {source}")]
    Repository {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("Remote '{name}' does not exist in the repository")]
    NoRemote { name: String },

    #[error("Remote '{remote}' failed: {message}")]
    Remote { remote: String, message: String },

    #[error("Merge conflicts in {} path(s), resolve them manually: {}", paths.len(), paths.join(", "))]
    Conflict { paths: Vec<String> },

    #[error("Command '{command}' failed ({}):\n{output}", exit_label(*code))]
    Command {
        command: String,
        code: Option<i32>,
        output: String,
    },

    #[error("Could not start command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Package '{name}' not found")]
    PackageNotFound { name: String },

    #[error("Branch '{name}' not found")]
    BranchNotFound { name: String },

    #[error("A commit message is required")]
    EmptyMessage,

    #[error("Could not stage {path:?}: {message}")]
    Staging { path: PathBuf, message: String },

    #[error("Could not write tree: {0}")]
    WriteTree(#[source] git2::Error),

    #[error("Path {path:?} is outside the repository")]
    OutsideRepository { path: PathBuf },

    #[error("HEAD is on '{actual}', expected branch '{expected}'")]
    BranchMismatch { expected: String, actual: String },

    #[error("Could not link {source_path:?} -> {target:?}: {source}")]
    Link {
        source_path: PathBuf,
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not determine the home directory")]
    NoHome,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}
