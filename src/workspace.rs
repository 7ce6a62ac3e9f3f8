use anyhow::{bail, Context, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

use crate::actions::{self, InstallOutcome, UpdateReport};
use crate::config::Config;
use crate::package::{InstallSpec, PackageInfo};
use crate::paths::CONFIG_FILE_NAME;
use crate::repository::{CommitRecord, PullOutcome, Repository};

/// How `init` obtains the repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositorySource {
    /// Start an empty repository, optionally with an `origin` remote
    New { origin: Option<String> },
    /// Clone an existing repository
    Clone { url: String },
}

#[derive(Debug, Clone)]
pub struct PullOptions {
    pub remote: String,
    pub branch: String,
    /// Install packages created by the pulled commit
    pub install: bool,
    /// Update packages modified by the pulled commit
    pub update: bool,
}

/// Packages touched by a pull and what was done with them
#[derive(Debug)]
pub struct PullReport {
    pub outcome: PullOutcome,
    pub installed: Vec<(String, InstallOutcome)>,
    pub updated: Vec<(String, UpdateReport)>,
}

/// Extra file created alongside a new package
#[derive(Debug, Clone)]
pub struct NewFile {
    pub name: String,
    pub executable: bool,
}

/// Workspace - a loaded config together with the repository it describes
///
/// The config file at `config_path` is normally a symlink into the
/// repository, so saving it stages the change for the next commit.
#[derive(Debug)]
pub struct Workspace {
    config_path: PathBuf,
    config: Config,
    repository: Repository,
}

impl Workspace {
    /// Open the workspace described by the config at `config_path`
    pub fn open(config_path: &Path) -> Result<Self> {
        let config = Config::load(config_path)
            .with_context(|| format!("Failed to load config {:?}", config_path))?;
        let repository = Repository::open(&config.directory)
            .with_context(|| format!("Failed to open repository {:?}", config.directory))?;

        Ok(Self {
            config_path: config_path.to_path_buf(),
            config,
            repository,
        })
    }

    /// Create or clone the repository at `directory`, write its config and
    /// link `config_path` to it
    pub fn init(config_path: &Path, directory: &Path, source: &RepositorySource) -> Result<Self> {
        let repository = match source {
            RepositorySource::New { origin } => Repository::create(directory, origin.as_deref())
                .with_context(|| format!("Failed to create repository {:?}", directory))?,
            RepositorySource::Clone { url } => Repository::clone(url, directory)
                .with_context(|| format!("Failed to clone {} to {:?}", url, directory))?,
        };

        let root = fs::canonicalize(repository.path())
            .with_context(|| format!("Failed to resolve {:?}", repository.path()))?;
        let repository = Repository::open(&root)?;
        let repo_config = root.join(CONFIG_FILE_NAME);

        let mut config = if repo_config.exists() {
            Config::load(&repo_config)?
        } else {
            Config::default()
        };
        config.directory = root;
        config
            .save(&repo_config)
            .with_context(|| format!("Failed to write config {:?}", repo_config))?;

        link_config(config_path, &repo_config)?;
        info!(repository = %config.directory.display(), "initialized");

        Ok(Self {
            config_path: config_path.to_path_buf(),
            config,
            repository,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Directory holding the package `name`
    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.repository.path().join(name)
    }

    /// `branch` when given, otherwise the environment `HEAD` is on
    pub fn branch_or_current(&self, branch: Option<String>) -> Result<String> {
        match branch {
            Some(branch) => Ok(branch),
            None => self
                .repository
                .current_branch()?
                .context("HEAD is detached; pass --branch"),
        }
    }

    pub fn save_config(&self) -> Result<()> {
        self.config
            .save(&self.config_path)
            .with_context(|| format!("Failed to write config {:?}", self.config_path))
    }

    /// Re-read the config after the repository contents changed underneath it
    ///
    /// The synced file may carry another machine's `directory`; it is pointed
    /// back at the local repository and rewritten.
    fn reload_config(&mut self) -> Result<()> {
        self.config = Config::load(&self.config_path)
            .with_context(|| format!("Failed to reload config {:?}", self.config_path))?;

        let local = self.repository.path();
        if self.config.directory != local {
            debug!(synced = %self.config.directory.display(), "restoring local directory in config");
            self.config.directory = local.to_path_buf();
            self.save_config()?;
        }
        Ok(())
    }

    /// Resolve a package selection from explicit names, `--all` and `--filter`
    pub fn select(
        &self,
        names: &[String],
        all: bool,
        filter: Option<&Regex>,
    ) -> Result<Vec<&PackageInfo>> {
        let matches = |package: &&PackageInfo| filter.map_or(true, |re| re.is_match(&package.name));

        if all || (names.is_empty() && filter.is_some()) {
            return Ok(self.config.packages.values().filter(matches).collect());
        }
        if names.is_empty() {
            bail!("No packages given; name them or pass --all");
        }

        let mut selected = Vec::new();
        for name in names {
            selected.push(self.config.package(name)?);
        }
        Ok(selected.into_iter().filter(matches).collect())
    }

    pub fn install(&self, name: &str) -> Result<InstallOutcome> {
        let package = self.config.package(name)?;
        actions::install(package, &self.package_dir(name))
            .with_context(|| format!("Failed to install {}", name))
    }

    pub fn update(&self, name: &str) -> Result<UpdateReport> {
        let package = self.config.package(name)?;
        actions::update(package, &self.package_dir(name))
            .with_context(|| format!("Failed to update {}", name))
    }

    /// Register a new package and create its directory
    pub fn create_package(&mut self, package: PackageInfo, file: Option<&NewFile>) -> Result<PathBuf> {
        if self.config.packages.contains_key(&package.name) {
            bail!("Package '{}' already exists", package.name);
        }

        let dir = self.package_dir(&package.name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create package directory {:?}", dir))?;

        if let Some(file) = file {
            let path = dir.join(&file.name);
            fs::write(&path, "").with_context(|| format!("Failed to create {:?}", path))?;
            if file.executable {
                make_executable(&path)?;
            }
        }

        info!(package = %package.name, "created package");
        self.config.insert(package);
        self.save_config()?;
        Ok(dir)
    }

    /// Delete a package directory and its config entry
    ///
    /// Returns `false` when no such package is registered.
    pub fn remove_package(&mut self, name: &str) -> Result<bool> {
        if self.config.remove(name).is_none() {
            return Ok(false);
        }

        let dir = self.package_dir(name);
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .with_context(|| format!("Failed to remove package directory {:?}", dir))?;
        }

        info!(package = name, "removed package");
        self.save_config()?;
        Ok(true)
    }

    /// Replace the install spec of an existing package
    pub fn set_install(&mut self, name: &str, install: InstallSpec) -> Result<()> {
        let package = self
            .config
            .packages
            .get_mut(name)
            .ok_or_else(|| crate::Error::PackageNotFound {
                name: name.to_string(),
            })?;
        package.install = install;
        self.save_config()
    }

    /// Pull from the remote, then install or update the packages the new
    /// `HEAD` commit touched
    pub fn pull(&mut self, options: &PullOptions) -> Result<PullReport> {
        let outcome = self
            .repository
            .pull(&options.remote, &options.branch)
            .with_context(|| format!("Failed to pull {}/{}", options.remote, options.branch))?;

        let mut report = PullReport {
            outcome,
            installed: Vec::new(),
            updated: Vec::new(),
        };
        if outcome == PullOutcome::UpToDate {
            return Ok(report);
        }

        self.reload_config()?;
        if !options.install && !options.update {
            return Ok(report);
        }

        for name in self.touched_packages()? {
            if self.repository.created_in_last(&name) {
                if options.install {
                    report.installed.push((name.clone(), self.install(&name)?));
                }
            } else if self.repository.modified_in_last(&name) && options.update {
                report.updated.push((name.clone(), self.update(&name)?));
            }
        }

        Ok(report)
    }

    /// Registered packages whose directories the `HEAD` commit touched
    fn touched_packages(&self) -> Result<Vec<String>> {
        let head = self
            .repository
            .head_commit()?
            .context("Repository has no commits")?;

        let mut seen = BTreeSet::new();
        let mut packages = Vec::new();
        for path in self.repository.changed_paths(head.id)? {
            let Some(Component::Normal(first)) = Path::new(&path).components().next() else {
                continue;
            };
            let name = first.to_string_lossy().into_owned();
            if !seen.insert(name.clone()) {
                continue;
            }
            if self.config.packages.contains_key(&name) {
                packages.push(name);
            } else {
                debug!(path = %path, "change outside any package");
            }
        }
        Ok(packages)
    }

    /// Commit the working tree, pushing `branch` unless `push` is false
    pub fn save(&self, message: &str, branch: &str, push: bool) -> Result<CommitRecord> {
        let commit = if push {
            self.repository.commit_and_push(message, branch)
        } else {
            self.repository.commit_all(message)
        };
        commit.context("Failed to save")
    }

    /// Switch to environment `name`, then reload the config from that branch
    pub fn switch_environment(&mut self, name: &str, create_if_missing: bool) -> Result<()> {
        self.repository
            .switch_environment(name, create_if_missing)
            .with_context(|| format!("Failed to switch to environment '{}'", name))?;
        self.reload_config()
    }
}

/// Point `config_path` at the repository's config file
fn link_config(config_path: &Path, repo_config: &Path) -> Result<()> {
    if config_path == repo_config {
        return Ok(());
    }

    if config_path.symlink_metadata().is_ok() {
        if fs::read_link(config_path).ok().as_deref() == Some(repo_config) {
            return Ok(());
        }
        bail!(
            "{:?} already exists; remove it or pass --config to use another path",
            config_path
        );
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    actions::symlink(repo_config, config_path)
        .with_context(|| format!("Failed to link {:?} to {:?}", config_path, repo_config))?;
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("Failed to make {:?} executable", path))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{InstallCommands, UpdateSpec};
    use crate::repository::DEFAULT_REMOTE;
    use tempfile::TempDir;

    fn init(root: &Path, name: &str, source: RepositorySource) -> Workspace {
        let config_path = root.join(format!("{name}.hearthrc"));
        Workspace::init(&config_path, &root.join(name), &source).unwrap()
    }

    fn bare_origin(root: &Path) -> String {
        let path = root.join("origin.git");
        let mut opts = git2::RepositoryInitOptions::new();
        opts.bare(true).initial_head("master");
        git2::Repository::init_opts(&path, &opts).unwrap();
        path.display().to_string()
    }

    fn pull_options(install: bool, update: bool) -> PullOptions {
        PullOptions {
            remote: DEFAULT_REMOTE.to_string(),
            branch: "master".to_string(),
            install,
            update,
        }
    }

    #[test]
    fn test_init_writes_and_links_config() {
        let temp = TempDir::new().unwrap();
        let workspace = init(temp.path(), "repo", RepositorySource::New { origin: None });

        let root = fs::canonicalize(temp.path().join("repo")).unwrap();
        assert_eq!(workspace.config().directory, root);
        assert_eq!(
            fs::read_link(temp.path().join("repo.hearthrc")).unwrap(),
            root.join(CONFIG_FILE_NAME)
        );

        let reopened = Workspace::open(&temp.path().join("repo.hearthrc")).unwrap();
        assert_eq!(reopened.config(), workspace.config());
    }

    #[test]
    fn test_init_refuses_foreign_config() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("repo.hearthrc"), "directory: /elsewhere\n").unwrap();

        let result = Workspace::init(
            &temp.path().join("repo.hearthrc"),
            &temp.path().join("repo"),
            &RepositorySource::New { origin: None },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_create_and_remove_package() {
        let temp = TempDir::new().unwrap();
        let mut workspace = init(temp.path(), "repo", RepositorySource::New { origin: None });

        let file = NewFile {
            name: "install.sh".to_string(),
            executable: true,
        };
        let dir = workspace
            .create_package(PackageInfo::new("tools").with_target("/usr/local/bin"), Some(&file))
            .unwrap();
        assert!(dir.join("install.sh").exists());
        assert!(workspace
            .create_package(PackageInfo::new("tools"), None)
            .is_err());

        let reopened = Workspace::open(workspace.config_path()).unwrap();
        assert!(reopened.config().packages.contains_key("tools"));

        assert!(workspace.remove_package("tools").unwrap());
        assert!(!dir.exists());
        assert!(!workspace.remove_package("tools").unwrap());
    }

    #[test]
    fn test_select_packages() {
        let temp = TempDir::new().unwrap();
        let mut workspace = init(temp.path(), "repo", RepositorySource::New { origin: None });
        for name in ["vim", "zsh", "zsh-plugins"] {
            workspace.create_package(PackageInfo::new(name), None).unwrap();
        }

        let names = |selected: Vec<&PackageInfo>| -> Vec<String> {
            selected.into_iter().map(|p| p.name.clone()).collect()
        };

        assert_eq!(names(workspace.select(&[], true, None).unwrap()).len(), 3);
        let re = Regex::new("^zsh").unwrap();
        assert_eq!(
            names(workspace.select(&[], false, Some(&re)).unwrap()),
            vec!["zsh", "zsh-plugins"]
        );
        assert_eq!(
            names(workspace.select(&["vim".to_string()], false, None).unwrap()),
            vec!["vim"]
        );
        assert!(workspace.select(&["emacs".to_string()], false, None).is_err());
        assert!(workspace.select(&[], false, None).is_err());
    }

    #[test]
    fn test_set_install() {
        let temp = TempDir::new().unwrap();
        let mut workspace = init(temp.path(), "repo", RepositorySource::New { origin: None });
        workspace.create_package(PackageInfo::new("tmux"), None).unwrap();

        let spec = InstallSpec::Commands(InstallCommands::new("make install"));
        workspace.set_install("tmux", spec.clone()).unwrap();
        assert_eq!(workspace.config().package("tmux").unwrap().install, spec);
        assert!(workspace.set_install("emacs", spec).is_err());
    }

    #[test]
    fn test_pull_installs_created_and_updates_modified() {
        let temp = TempDir::new().unwrap();
        let origin = bare_origin(temp.path());

        let mut laptop = init(
            temp.path(),
            "laptop",
            RepositorySource::New {
                origin: Some(origin.clone()),
            },
        );
        laptop.save("initial", "master", true).unwrap();

        let mut desktop = init(temp.path(), "desktop", RepositorySource::Clone { url: origin });

        let file = NewFile {
            name: "setup.sh".to_string(),
            executable: false,
        };
        laptop
            .create_package(
                PackageInfo::new("tools")
                    .with_commands(InstallCommands::new("touch installed"))
                    .with_update(UpdateSpec {
                        once: Some("touch updated".to_string()),
                        ..UpdateSpec::default()
                    }),
                Some(&file),
            )
            .unwrap();
        laptop.save("add tools", "master", true).unwrap();

        let report = desktop.pull(&pull_options(true, true)).unwrap();
        assert_eq!(report.outcome, PullOutcome::FastForwarded);
        assert_eq!(report.installed.len(), 1);
        assert!(report.updated.is_empty());
        assert!(desktop.package_dir("tools").join("installed").exists());
        let on_disk = Config::load(desktop.config_path()).unwrap();
        assert_eq!(on_disk.directory, desktop.repository().path().to_path_buf());
        assert_eq!(desktop.config(), &on_disk);

        fs::write(laptop.package_dir("tools").join("setup.sh"), "echo hi").unwrap();
        laptop.save("edit tools", "master", true).unwrap();

        let report = desktop.pull(&pull_options(true, true)).unwrap();
        assert_eq!(report.outcome, PullOutcome::FastForwarded);
        assert!(report.installed.is_empty());
        assert_eq!(report.updated.len(), 1);
        assert!(desktop.repository().modified_in_last("tools"));
        assert!(desktop.package_dir("tools").join("updated").exists());

        let report = desktop.pull(&pull_options(true, true)).unwrap();
        assert_eq!(report.outcome, PullOutcome::UpToDate);
    }

    #[test]
    fn test_pull_up_to_date_keeps_config_file() {
        let temp = TempDir::new().unwrap();
        let origin = bare_origin(temp.path());
        let laptop = init(
            temp.path(),
            "laptop",
            RepositorySource::New {
                origin: Some(origin.clone()),
            },
        );
        laptop.save("initial", "master", true).unwrap();
        let mut desktop = init(temp.path(), "desktop", RepositorySource::Clone { url: origin });

        let mut contents = fs::read_to_string(desktop.config_path()).unwrap();
        contents.push_str("# local note\n");
        fs::write(desktop.config_path(), &contents).unwrap();

        let report = desktop.pull(&pull_options(true, true)).unwrap();

        assert_eq!(report.outcome, PullOutcome::UpToDate);
        assert_eq!(fs::read_to_string(desktop.config_path()).unwrap(), contents);
    }

    #[test]
    fn test_branch_defaults_to_current_environment() {
        let temp = TempDir::new().unwrap();
        let mut workspace = init(temp.path(), "repo", RepositorySource::New { origin: None });
        workspace.save("initial", "master", false).unwrap();

        assert_eq!(workspace.branch_or_current(None).unwrap(), "master");
        workspace.switch_environment("work", true).unwrap();
        assert_eq!(workspace.branch_or_current(None).unwrap(), "work");
        assert_eq!(
            workspace.branch_or_current(Some("master".to_string())).unwrap(),
            "master"
        );
    }
}
