use super::Session;
use crate::actions::InstallOutcome;
use crate::cli::Selection;
use crate::ui;
use anyhow::{Context, Result};
use regex::Regex;

pub fn execute(session: &Session, selection: Selection) -> Result<()> {
    let workspace = session.workspace()?;
    let filter = compile_filter(selection.filter.as_deref())?;
    let packages = workspace.select(&selection.names, selection.all, filter.as_ref())?;

    if packages.is_empty() {
        ui::info("No packages matched");
        return Ok(());
    }

    for package in packages {
        ui::status("Installing", &package.name);
        let outcome = workspace.install(&package.name)?;
        report(&package.name, &outcome);
    }
    Ok(())
}

pub(super) fn compile_filter(filter: Option<&str>) -> Result<Option<Regex>> {
    filter
        .map(|pattern| Regex::new(pattern).with_context(|| format!("Invalid filter '{}'", pattern)))
        .transpose()
}

pub(super) fn report(name: &str, outcome: &InstallOutcome) {
    match outcome {
        InstallOutcome::Linked { links, skipped } => {
            for link in links {
                ui::success("Linked", link.display());
            }
            if *skipped > 0 {
                ui::warn(format!("{}: {} entries could not be linked", name, skipped));
            }
        }
        InstallOutcome::Ran { steps: 0 } => ui::info(format!("{}: nothing to install", name)),
        InstallOutcome::Ran { steps } => {
            ui::success("Installed", format!("{} ({} commands)", name, steps));
        }
    }
}
