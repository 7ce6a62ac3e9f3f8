use super::Session;
use crate::ui;
use anyhow::Result;

pub fn execute(session: &Session, names: Vec<String>) -> Result<()> {
    let mut workspace = session.workspace()?;

    for name in &names {
        if workspace.remove_package(name)? {
            ui::success("Removed", name);
        } else {
            ui::warn(format!("Package '{}' not found, skipping", name));
        }
    }
    Ok(())
}
