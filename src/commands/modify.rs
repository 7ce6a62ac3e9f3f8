use super::{install_spec, Session};
use crate::cli::InstallArgs;
use crate::ui;
use anyhow::{bail, Result};

pub fn execute(session: &Session, names: Vec<String>, install: InstallArgs) -> Result<()> {
    let Some(spec) = install_spec(install)? else {
        bail!("Nothing to change; pass --target or --cmd");
    };

    let mut workspace = session.workspace()?;
    for name in &names {
        workspace.set_install(name, spec.clone())?;
        ui::success("Modified", name);
    }
    Ok(())
}
