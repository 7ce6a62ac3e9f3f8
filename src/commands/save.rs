use super::Session;
use crate::ui;
use anyhow::Result;
use chrono::Local;

pub fn execute(
    session: &Session,
    message: Option<String>,
    branch: Option<String>,
    push: bool,
) -> Result<()> {
    let workspace = session.workspace()?;
    let branch = workspace.branch_or_current(branch)?;
    let message = message.unwrap_or_else(default_message);

    let label = if push { "Saving" } else { "Committing" };
    let progress = ui::Progress::new(label, message.clone());
    match workspace.save(&message, &branch, push) {
        Ok(commit) => {
            let id = commit.id.to_string();
            progress.success("Saved", format!("as {}", &id[..7.min(id.len())]));
            Ok(())
        }
        Err(err) => {
            progress.fail(&err);
            Err(err)
        }
    }
}

fn default_message() -> String {
    format!("hearth save {}", Local::now().format("%Y-%m-%d %H:%M:%S"))
}
