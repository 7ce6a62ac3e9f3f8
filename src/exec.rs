//! Child-process execution for package recipes
//!
//! Install commands are expanded and split on whitespace, then run directly.
//! There is no shell quoting, so arguments cannot contain spaces. Update
//! commands run through `sh -c`. In both cases output is captured and only
//! surfaced when the command fails.

use std::borrow::Cow;
use std::env;
use std::path::Path;
use std::process::{Command, Output};

use tracing::debug;

use crate::{Error, Result};

/// Extra environment injected into a command, consulted before the process environment
pub type CommandEnv<'a> = [(&'a str, String)];

/// Expand `$VAR` / `${VAR}` references
///
/// Variables from `extra` take precedence over the process environment.
/// Unknown variables expand to the empty string.
pub fn expand<'a>(raw: &'a str, extra: &CommandEnv<'_>) -> Cow<'a, str> {
    shellexpand::env_with_context_no_errors(raw, |name: &str| {
        let value = extra
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.clone())
            .or_else(|| env::var(name).ok())
            .unwrap_or_default();
        Some(value)
    })
}

/// A command split into program and arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Expand and split a command string; `None` when nothing is left to run
    pub fn parse(raw: &str, extra: &CommandEnv<'_>) -> Option<Self> {
        let expanded = expand(raw, extra);
        let mut parts = expanded.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Run an install step inside `dir`
pub fn run_split(raw: &str, dir: &Path) -> Result<()> {
    let Some(line) = CommandLine::parse(raw, &[]) else {
        return Ok(());
    };

    let mut command = Command::new(&line.program);
    command.args(&line.args).current_dir(dir);
    run(command, line.display())
}

/// Run an update command through `sh -c` inside `dir` with `extra` exported
pub fn run_shell(raw: &str, dir: &Path, extra: &CommandEnv<'_>) -> Result<()> {
    let expanded = expand(raw, extra);
    let script = expanded.trim();
    if script.is_empty() {
        return Ok(());
    }

    let mut command = Command::new("sh");
    command.arg("-c").arg(script).current_dir(dir);
    for (key, value) in extra {
        command.env(key, value);
    }
    run(command, script.to_string())
}

fn run(mut command: Command, shown: String) -> Result<()> {
    debug!(command = %shown, "running");
    let output = command.output().map_err(|source| Error::Spawn {
        command: shown.clone(),
        source,
    })?;

    if output.status.success() {
        return Ok(());
    }

    Err(Error::Command {
        command: shown,
        code: output.status.code(),
        output: combined_output(&output),
    })
}

fn combined_output(output: &Output) -> String {
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !combined.is_empty() && !stderr.is_empty() && !combined.ends_with('\n') {
        combined.push('\n');
    }
    combined.push_str(&stderr);
    combined.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    #[rstest]
    #[case("ln -s a b", "ln", &["-s", "a", "b"])]
    #[case("  make   install ", "make", &["install"])]
    #[case("true", "true", &[])]
    fn test_parse_splits_on_whitespace(
        #[case] raw: &str,
        #[case] program: &str,
        #[case] args: &[&str],
    ) {
        let line = CommandLine::parse(raw, &[]).unwrap();
        assert_eq!(line.program, program);
        assert_eq!(line.args, args);
    }

    #[test]
    fn test_parse_empty_is_none() {
        assert!(CommandLine::parse("", &[]).is_none());
        assert!(CommandLine::parse("   ", &[]).is_none());
    }

    #[test]
    #[serial]
    fn test_expand_prefers_extra_then_process_env() {
        env::set_var("HEARTH_TEST_VALUE", "from-env");
        env::remove_var("HEARTH_TEST_MISSING");

        let extra = [("HEARTH_DIR", "/pkg".to_string())];
        assert_eq!(
            expand("$HEARTH_DIR ${HEARTH_TEST_VALUE}", &extra),
            "/pkg from-env"
        );
        assert_eq!(expand("a${HEARTH_TEST_MISSING}b", &extra), "ab");

        env::remove_var("HEARTH_TEST_VALUE");
    }

    #[test]
    fn test_run_split_executes_in_directory() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a"), "content").unwrap();

        run_split("ln -s a b", temp.path()).unwrap();

        let link = temp.path().join("b");
        assert!(link.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(link).unwrap(), "content");
    }

    #[test]
    fn test_run_split_reports_output_on_failure() {
        let temp = TempDir::new().unwrap();

        let err = run_split("ls does-not-exist", temp.path()).unwrap_err();
        match err {
            Error::Command { command, code, output } => {
                assert_eq!(command, "ls does-not-exist");
                assert_ne!(code, Some(0));
                assert!(output.contains("does-not-exist"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_run_split_missing_program() {
        let temp = TempDir::new().unwrap();
        let err = run_split("hearth-no-such-program", temp.path()).unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }

    #[test]
    fn test_run_shell_exports_extra_env() {
        let temp = TempDir::new().unwrap();
        let extra = [("HEARTH_FILE", temp.path().join("f").display().to_string())];

        run_shell("echo hi > \"$HEARTH_FILE\"", temp.path(), &extra).unwrap();

        assert_eq!(fs::read_to_string(temp.path().join("f")).unwrap(), "hi\n");
    }

    #[test]
    fn test_run_shell_failure() {
        let temp = TempDir::new().unwrap();
        let err = run_shell("echo boom >&2; exit 3", temp.path(), &[]).unwrap_err();
        match err {
            Error::Command { code, output, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(output, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
