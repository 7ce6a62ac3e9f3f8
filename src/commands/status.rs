use super::Session;
use crate::ui;
use anyhow::Result;
use git2::Status;

pub fn execute(session: &Session) -> Result<()> {
    let workspace = session.workspace()?;
    let repository = workspace.repository();

    if let Some(branch) = repository.current_branch()? {
        ui::info(format!("On environment '{}'", branch));
    }

    let changes = repository.worktree_changes()?;
    if changes.is_empty() {
        ui::success("Clean", "nothing to save");
        return Ok(());
    }

    for (status, path) in &changes {
        ui::status(label(*status), path);
    }
    Ok(())
}

fn label(status: Status) -> &'static str {
    if status.intersects(Status::WT_NEW | Status::INDEX_NEW) {
        "New"
    } else if status.intersects(Status::WT_DELETED | Status::INDEX_DELETED) {
        "Deleted"
    } else if status.intersects(Status::WT_RENAMED | Status::INDEX_RENAMED) {
        "Renamed"
    } else if status.is_conflicted() {
        "Conflicted"
    } else {
        "Modified"
    }
}
