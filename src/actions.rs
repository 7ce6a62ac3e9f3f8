//! Package install and update actions

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::exec;
use crate::package::{InstallSpec, PackageInfo};
use crate::paths;
use crate::{Error, Result};

/// Directory being visited by an update command (package root for `once`)
pub const DIR_ENV: &str = "HEARTH_DIR";
/// File being visited by an update `file` command
pub const FILE_ENV: &str = "HEARTH_FILE";

const ALL_PREFIX: &str = "all:";

/// What an install did
#[derive(Debug, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Symlinks created, plus how many entries could not be linked
    Linked { links: Vec<PathBuf>, skipped: usize },
    /// Install commands executed
    Ran { steps: usize },
}

/// What an update did
#[derive(Debug, Default)]
pub struct UpdateReport {
    pub commands_run: usize,
    /// Failures tolerated because the package sets `ignore_errors`
    pub failures: Vec<Error>,
}

impl UpdateReport {
    fn record(&mut self, result: Result<()>, ignore_errors: bool) -> Result<()> {
        self.commands_run += 1;
        match result {
            Ok(()) => Ok(()),
            Err(err) if ignore_errors => {
                warn!(error = %err, "ignoring failed update command");
                self.failures.push(err);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

/// Install a package located at `working_dir`
///
/// A symlink target always wins; install commands are never also run.
pub fn install(package: &PackageInfo, working_dir: &Path) -> Result<InstallOutcome> {
    match &package.install {
        InstallSpec::Target(target) => link(package, target, working_dir),
        InstallSpec::Commands(commands) => {
            let steps = commands.steps();
            for step in &steps {
                exec::run_split(step, working_dir)?;
            }
            Ok(InstallOutcome::Ran { steps: steps.len() })
        }
    }
}

fn link(package: &PackageInfo, target: &str, working_dir: &Path) -> Result<InstallOutcome> {
    let (all_entries, target) = match target.strip_prefix(ALL_PREFIX) {
        Some(rest) => (true, rest),
        None => (false, target),
    };
    let target_dir = paths::expand_home(target)?;

    if !all_entries {
        let dest = target_dir.join(&package.name);
        symlink(working_dir, &dest).map_err(|source| Error::Link {
            source_path: working_dir.to_path_buf(),
            target: dest.clone(),
            source,
        })?;
        info!(package = %package.name, link = %dest.display(), "linked package");
        return Ok(InstallOutcome::Linked {
            links: vec![dest],
            skipped: 0,
        });
    }

    let mut entries = fs::read_dir(working_dir)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    let mut links = Vec::new();
    let mut skipped = 0;
    for entry in entries {
        let source = entry.path();
        let dest = target_dir.join(entry.file_name());
        match symlink(&source, &dest) {
            Ok(()) => {
                info!(link = %dest.display(), "linked entry");
                links.push(dest);
            }
            Err(err) => {
                warn!(source = %source.display(), link = %dest.display(), error = %err, "skipping entry");
                skipped += 1;
            }
        }
    }

    Ok(InstallOutcome::Linked { links, skipped })
}

#[cfg(unix)]
pub(crate) fn symlink(source: &Path, dest: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, dest)
}

#[cfg(windows)]
pub(crate) fn symlink(source: &Path, dest: &Path) -> io::Result<()> {
    if source.is_dir() {
        std::os::windows::fs::symlink_dir(source, dest)
    } else {
        std::os::windows::fs::symlink_file(source, dest)
    }
}

/// Update a package located at `working_dir`
///
/// Runs `once` at the package root, then walks the package pre-order
/// (lexicographic within a directory) running `directory` for every directory,
/// the root included, and `file` for every regular file.
pub fn update(package: &PackageInfo, working_dir: &Path) -> Result<UpdateReport> {
    let spec = &package.update;
    let mut report = UpdateReport::default();

    if let Some(once) = &spec.once {
        let env = [(DIR_ENV, working_dir.display().to_string())];
        let result = exec::run_shell(once, working_dir, &env);
        report.record(result, spec.ignore_errors)?;
    }

    if spec.directory.is_none() && spec.file.is_none() {
        return Ok(report);
    }

    for entry in WalkDir::new(working_dir).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let path = entry.path();
        let file_type = entry.file_type();

        if file_type.is_dir() {
            if let Some(command) = &spec.directory {
                let env = [(DIR_ENV, path.display().to_string())];
                let result = exec::run_shell(command, path, &env);
                report.record(result, spec.ignore_errors)?;
            }
        } else if file_type.is_file() {
            if let Some(command) = &spec.file {
                let dir = path.parent().unwrap_or(working_dir);
                let env = [
                    (DIR_ENV, dir.display().to_string()),
                    (FILE_ENV, path.display().to_string()),
                ];
                let result = exec::run_shell(command, dir, &env);
                report.record(result, spec.ignore_errors)?;
            }
        }
    }

    Ok(report)
}
