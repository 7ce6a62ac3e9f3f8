use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn hearth(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("hearth").unwrap();
    cmd.env("HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("HEARTH_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn init(home: &Path) {
    hearth(home).arg("init").assert().success();
}

#[test]
#[serial]
fn test_init_creates_repository_and_config_link() {
    let temp = TempDir::new().unwrap();
    hearth(temp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized"));

    let repo = temp.path().join(".hearth");
    assert!(repo.join(".git").exists());
    assert!(repo.join(".hearthrc").exists());
    let link = fs::read_link(temp.path().join(".hearthrc")).unwrap();
    assert!(link.ends_with(".hearth/.hearthrc"));
}

#[test]
#[serial]
fn test_init_twice_fails() {
    let temp = TempDir::new().unwrap();
    init(temp.path());

    hearth(temp.path()).arg("init").assert().failure();
}

#[test]
#[serial]
fn test_commands_require_init() {
    let temp = TempDir::new().unwrap();
    hearth(temp.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("hearth init"));
}

#[test]
#[serial]
fn test_create_and_install_with_command() {
    let temp = TempDir::new().unwrap();
    init(temp.path());

    hearth(temp.path())
        .args(["create", "tools", "--cmd", "touch installed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    hearth(temp.path())
        .args(["install", "tools"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed"));

    assert!(temp.path().join(".hearth/tools/installed").exists());
}

#[test]
#[serial]
fn test_create_and_install_with_target() {
    let temp = TempDir::new().unwrap();
    init(temp.path());
    fs::create_dir(temp.path().join("links")).unwrap();

    hearth(temp.path())
        .args(["create", "zsh", "--target", "~/links"])
        .assert()
        .success();

    let config = fs::read_to_string(temp.path().join(".hearthrc")).unwrap();
    assert!(config.contains("~/links"));

    hearth(temp.path()).args(["install", "--all"]).assert().success();

    let link = temp.path().join("links/zsh");
    let expected = fs::canonicalize(temp.path()).unwrap().join(".hearth/zsh");
    assert_eq!(fs::read_link(&link).unwrap(), expected);
}

#[test]
#[serial]
fn test_install_unknown_package() {
    let temp = TempDir::new().unwrap();
    init(temp.path());

    hearth(temp.path())
        .args(["install", "emacs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Package 'emacs' not found"));
}

#[test]
#[serial]
fn test_remove_package() {
    let temp = TempDir::new().unwrap();
    init(temp.path());
    hearth(temp.path()).args(["create", "vim"]).assert().success();
    assert!(temp.path().join(".hearth/vim").exists());

    hearth(temp.path())
        .args(["remove", "vim", "emacs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed"))
        .stderr(predicate::str::contains("'emacs' not found"));

    assert!(!temp.path().join(".hearth/vim").exists());
}

#[test]
#[serial]
fn test_save_then_status_is_clean() {
    let temp = TempDir::new().unwrap();
    init(temp.path());
    hearth(temp.path())
        .args(["create", "tmux", "--file", "tmux.conf"])
        .assert()
        .success();

    hearth(temp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("tmux/tmux.conf"));

    hearth(temp.path())
        .args(["save", "--no-push", "-m", "add tmux"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved"));

    hearth(temp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Clean"));
}

#[test]
#[serial]
fn test_save_without_origin_fails() {
    let temp = TempDir::new().unwrap();
    init(temp.path());

    hearth(temp.path())
        .args(["save", "-m", "first"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Remote 'origin' does not exist"));
}

#[test]
#[serial]
fn test_env_switches_branch() {
    let temp = TempDir::new().unwrap();
    init(temp.path());
    hearth(temp.path())
        .args(["save", "--no-push", "-m", "first"])
        .assert()
        .success();

    hearth(temp.path())
        .args(["env", "work", "--no-create"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Branch 'work' not found"));

    hearth(temp.path()).args(["env", "work"]).assert().success();

    hearth(temp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("On environment 'work'"));
}

#[test]
#[serial]
fn test_upgrade_installs_package_from_other_machine() {
    let temp = TempDir::new().unwrap();
    let origin = temp.path().join("origin.git");
    let mut opts = git2::RepositoryInitOptions::new();
    opts.bare(true).initial_head("master");
    git2::Repository::init_opts(&origin, &opts).unwrap();
    let origin = origin.display().to_string();

    let laptop = temp.path().join("laptop");
    let desktop = temp.path().join("desktop");
    fs::create_dir_all(&laptop).unwrap();
    fs::create_dir_all(&desktop).unwrap();

    hearth(&laptop)
        .args(["init", "--origin", &origin])
        .assert()
        .success();
    hearth(&laptop).args(["save", "-m", "initial"]).assert().success();

    hearth(&desktop)
        .args(["init", "--clone", &origin])
        .assert()
        .success();

    hearth(&laptop)
        .args(["create", "tools", "--cmd", "touch installed", "--file", "setup.sh"])
        .assert()
        .success();
    hearth(&laptop).args(["save", "-m", "add tools"]).assert().success();

    hearth(&desktop)
        .arg("upgrade")
        .assert()
        .success()
        .stdout(predicate::str::contains("fast-forward"));

    assert!(desktop.join(".hearth/tools/installed").exists());
}
