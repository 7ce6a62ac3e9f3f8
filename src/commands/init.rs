use super::Session;
use crate::workspace::RepositorySource;
use crate::{paths, ui, Workspace};
use anyhow::Result;
use std::path::PathBuf;

pub fn execute(
    session: &Session,
    repo: Option<PathBuf>,
    origin: Option<String>,
    clone: Option<String>,
) -> Result<()> {
    let directory = match repo {
        Some(path) => path,
        None => paths::default_repository_dir()?,
    };
    let source = match clone {
        Some(url) => RepositorySource::Clone { url },
        None => RepositorySource::New { origin },
    };

    let workspace = Workspace::init(&session.config_path, &directory, &source)?;
    ui::success(
        "Initialized",
        format!("repository at {}", workspace.config().directory.display()),
    );
    ui::info(format!("Config: {}", session.config_path.display()));
    Ok(())
}
