use super::install::compile_filter;
use super::Session;
use crate::actions::UpdateReport;
use crate::cli::Selection;
use crate::ui;
use anyhow::Result;

pub fn execute(session: &Session, selection: Selection) -> Result<()> {
    let workspace = session.workspace()?;
    let filter = compile_filter(selection.filter.as_deref())?;
    let packages = workspace.select(&selection.names, selection.all, filter.as_ref())?;

    if packages.is_empty() {
        ui::info("No packages matched");
        return Ok(());
    }

    for package in packages {
        ui::status("Updating", &package.name);
        let report = workspace.update(&package.name)?;
        summarize(session, &package.name, &report);
    }
    Ok(())
}

pub(super) fn summarize(session: &Session, name: &str, report: &UpdateReport) {
    if report.failures.is_empty() {
        ui::success("Updated", format!("{} ({} commands)", name, report.commands_run));
        return;
    }

    ui::warn(format!(
        "{}: {} of {} commands failed",
        name,
        report.failures.len(),
        report.commands_run
    ));
    if session.verbose {
        for failure in &report.failures {
            ui::warn(failure);
        }
    }
}
