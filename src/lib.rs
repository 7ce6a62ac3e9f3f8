// Public API
pub mod cli;
pub mod commands;

// Core domain types
pub mod actions;
pub mod config;
mod error;
pub mod exec;
pub mod package;
pub mod paths;
pub mod repository;
pub mod ui;
pub mod workspace;

// Re-export main types
pub use config::Config;
pub use error::{Error, Result};
pub use package::{InstallCommands, InstallSpec, PackageInfo, UpdateSpec};
pub use repository::{CommitRecord, MergeAnalysis, PullOutcome, Repository};
pub use workspace::Workspace;
