use super::Session;
use crate::ui;
use anyhow::Result;

pub fn execute(session: &Session, name: String, create_if_missing: bool) -> Result<()> {
    let mut workspace = session.workspace()?;
    workspace.switch_environment(&name, create_if_missing)?;
    ui::success("Switched", format!("to environment '{}'", name));
    Ok(())
}
