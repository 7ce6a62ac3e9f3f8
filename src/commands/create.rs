use super::{install_spec, Session};
use crate::cli::InstallArgs;
use crate::package::PackageInfo;
use crate::ui;
use crate::workspace::NewFile;
use anyhow::Result;

pub fn execute(
    session: &Session,
    name: String,
    install: InstallArgs,
    file: Option<String>,
    executable: bool,
) -> Result<()> {
    let mut workspace = session.workspace()?;

    let mut package = PackageInfo::new(name);
    if let Some(spec) = install_spec(install)? {
        package.install = spec;
    }
    let file = file.map(|name| NewFile { name, executable });

    let name = package.name.clone();
    let dir = workspace.create_package(package, file.as_ref())?;
    ui::success("Created", format!("{} at {}", name, dir.display()));
    Ok(())
}
