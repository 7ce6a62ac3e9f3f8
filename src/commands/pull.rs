use super::Session;
use crate::cli::SyncArgs;
use crate::repository::PullOutcome;
use crate::workspace::PullOptions;
use crate::ui;
use anyhow::Result;

pub fn execute(session: &Session, sync: SyncArgs, install: bool, update: bool) -> Result<()> {
    let mut workspace = session.workspace()?;
    let options = PullOptions {
        branch: workspace.branch_or_current(sync.branch)?,
        remote: sync.remote,
        install,
        update,
    };

    let progress = ui::Progress::new("Pulling", format!("{}/{}", options.remote, options.branch));
    let report = match workspace.pull(&options) {
        Ok(report) => report,
        Err(err) => {
            progress.fail(&err);
            return Err(err);
        }
    };
    let detail = match report.outcome {
        PullOutcome::UpToDate => "(up to date)",
        PullOutcome::FastForwarded => "(fast-forward)",
        PullOutcome::Merged => "(merged)",
    };
    progress.success("Pulled", detail);

    for (name, outcome) in &report.installed {
        super::install::report(name, outcome);
    }
    for (name, update) in &report.updated {
        super::update::summarize(session, name, update);
    }
    Ok(())
}
