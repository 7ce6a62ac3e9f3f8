use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::paths::CONFIG_ENV;
use crate::repository::DEFAULT_REMOTE;

/// Hearth - dotfiles and package manager backed by git
///
/// hearth keeps a repository of packages (directories of configuration)
/// in sync across machines, and installs or updates each package when a
/// pull brings in changes to it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to ~/.hearthrc)
    #[arg(short, long, global = true, value_name = "PATH", env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create or clone the repository and write the config
    Init {
        /// Repository location (defaults to ~/.hearth)
        #[arg(short, long, value_name = "PATH")]
        repo: Option<PathBuf>,

        /// URL of the `origin` remote for a new repository
        #[arg(short, long, value_name = "URL", conflicts_with = "clone")]
        origin: Option<String>,

        /// Clone an existing repository instead of creating one
        #[arg(long, value_name = "URL")]
        clone: Option<String>,
    },

    /// Create a package
    Create {
        /// Package name
        #[arg(value_name = "NAME")]
        name: String,

        #[command(flatten)]
        install: InstallArgs,

        /// Create an empty file in the package
        #[arg(short, long, value_name = "FILE")]
        file: Option<String>,

        /// Make the created file executable
        #[arg(short = 'x', long, requires = "file")]
        exec: bool,
    },

    /// Remove packages and their directories
    Remove {
        #[arg(value_name = "NAME", required = true)]
        names: Vec<String>,
    },

    /// Change how packages are installed
    Modify {
        #[arg(value_name = "NAME", required = true)]
        names: Vec<String>,

        #[command(flatten)]
        install: InstallArgs,
    },

    /// Install packages
    Install(Selection),

    /// Run package update commands
    Update(Selection),

    /// Pull from the remote and act on changed packages
    Pull {
        #[command(flatten)]
        sync: SyncArgs,

        /// Install packages created by the pulled changes
        #[arg(short, long)]
        install: bool,

        /// Update packages modified by the pulled changes
        #[arg(short, long)]
        update: bool,
    },

    /// Pull, installing new packages and updating changed ones
    Upgrade {
        #[command(flatten)]
        sync: SyncArgs,
    },

    /// Commit everything and push it
    Save {
        /// Commit message (defaults to a timestamp)
        #[arg(short, long, value_name = "MESSAGE")]
        message: Option<String>,

        /// Branch to push (defaults to the current environment)
        #[arg(short, long, value_name = "BRANCH")]
        branch: Option<String>,

        /// Commit without pushing
        #[arg(long)]
        no_push: bool,
    },

    /// Switch to an environment, creating it if needed
    Env {
        /// Environment (branch) name
        #[arg(value_name = "NAME")]
        name: String,

        /// Fail instead of creating a missing environment
        #[arg(long)]
        no_create: bool,
    },

    /// Show uncommitted changes in the repository
    Status,
}

/// Install recipe flags shared by `create` and `modify`
#[derive(Args, Debug, Clone, Default)]
pub struct InstallArgs {
    /// Symlink the package into this directory (`all:DIR` links each entry)
    #[arg(short, long, value_name = "DIR", conflicts_with_all = ["cmd", "pre", "post"])]
    pub target: Option<String>,

    /// Install command
    #[arg(long, value_name = "COMMAND")]
    pub cmd: Option<String>,

    /// Command run before the install command
    #[arg(long, value_name = "COMMAND", requires = "cmd")]
    pub pre: Option<String>,

    /// Command run after the install command
    #[arg(long, value_name = "COMMAND", requires = "cmd")]
    pub post: Option<String>,
}

/// Which packages an `install` or `update` acts on
#[derive(Args, Debug, Clone, Default)]
pub struct Selection {
    /// Package names
    #[arg(value_name = "NAME")]
    pub names: Vec<String>,

    /// Every package
    #[arg(short, long, conflicts_with = "names")]
    pub all: bool,

    /// Only packages whose name matches this regular expression
    #[arg(short, long, value_name = "REGEX")]
    pub filter: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    /// Remote to pull from
    #[arg(short, long, value_name = "REMOTE", default_value = DEFAULT_REMOTE)]
    pub remote: String,

    /// Branch to pull (defaults to the current environment)
    #[arg(short, long, value_name = "BRANCH")]
    pub branch: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_pull_flags() {
        let cli = Cli::try_parse_from(["hearth", "pull", "--install", "-b", "work"]).unwrap();
        match cli.command {
            Commands::Pull {
                sync,
                install,
                update,
            } => {
                assert_eq!(sync.remote, "origin");
                assert_eq!(sync.branch.as_deref(), Some("work"));
                assert!(install);
                assert!(!update);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_target_conflicts_with_cmd() {
        let result = Cli::try_parse_from(["hearth", "create", "zsh", "--target", "~/", "--cmd", "make"]);
        assert!(result.is_err());
    }
}
