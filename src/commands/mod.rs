use crate::cli::{Cli, Commands, InstallArgs};
use crate::package::{InstallCommands, InstallSpec};
use crate::{paths, Workspace};
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

mod create;
mod env_cmd;
mod init;
mod install;
mod modify;
mod pull;
mod remove;
mod save;
mod status;
mod update;

/// Options shared by every command, resolved once per invocation
#[derive(Debug, Clone)]
pub struct Session {
    pub config_path: PathBuf,
    pub verbose: bool,
}

impl Session {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config_path = match &cli.config {
            Some(path) => path.clone(),
            None => paths::default_config_path()?,
        };
        Ok(Self {
            config_path,
            verbose: cli.verbose,
        })
    }

    pub fn workspace(&self) -> Result<Workspace> {
        Workspace::open(&self.config_path)
    }
}

pub fn execute(cli: Cli) -> Result<()> {
    let session = Session::from_cli(&cli)?;

    match cli.command {
        Commands::Init { repo, origin, clone } => init::execute(&session, repo, origin, clone),

        Commands::Create {
            name,
            install,
            file,
            exec,
        } => create::execute(&session, name, install, file, exec),

        Commands::Remove { names } => remove::execute(&session, names),

        Commands::Modify { names, install } => modify::execute(&session, names, install),

        Commands::Install(selection) => install::execute(&session, selection),

        Commands::Update(selection) => update::execute(&session, selection),

        Commands::Pull {
            sync,
            install,
            update,
        } => pull::execute(&session, sync, install, update),

        Commands::Upgrade { sync } => pull::execute(&session, sync, true, true),

        Commands::Save {
            message,
            branch,
            no_push,
        } => save::execute(&session, message, branch, !no_push),

        Commands::Env { name, no_create } => env_cmd::execute(&session, name, !no_create),

        Commands::Status => status::execute(&session),
    }
}

/// Install spec described by `create`/`modify` flags, `None` when none were given
///
/// Targets under `$HOME` are stored as `~/...` so the config works on other
/// machines.
fn install_spec(args: InstallArgs) -> Result<Option<InstallSpec>> {
    if let Some(target) = args.target {
        let (prefix, dir) = match target.strip_prefix("all:") {
            Some(rest) => ("all:", rest),
            None => ("", target.as_str()),
        };
        let mut path = paths::expand_home(dir)?;
        if path.is_relative() {
            path = env::current_dir()
                .context("Failed to read the current directory")?
                .join(path);
        }
        let dir = paths::collapse_home(&path)?;
        return Ok(Some(InstallSpec::Target(format!("{prefix}{dir}"))));
    }

    Ok(args.cmd.map(|cmd| {
        InstallSpec::Commands(InstallCommands {
            pre: args.pre,
            cmd,
            post: args.post,
        })
    }))
}
