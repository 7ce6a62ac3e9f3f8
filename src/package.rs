use serde::{Deserialize, Serialize};

/// How a package gets installed
///
/// Symlink mode and command mode are mutually exclusive; a package carries
/// exactly one of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallSpec {
    /// Symlink the package into a directory. An `all:` prefix links every
    /// top-level entry of the package instead of the package itself.
    Target(String),
    /// Run commands inside the package directory.
    Commands(InstallCommands),
}

impl Default for InstallSpec {
    fn default() -> Self {
        InstallSpec::Commands(InstallCommands::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallCommands {
    pub pre: Option<String>,
    pub cmd: String,
    pub post: Option<String>,
}

impl InstallCommands {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            pre: None,
            cmd: cmd.into(),
            post: None,
        }
    }

    /// Commands in execution order, skipping unset steps
    pub fn steps(&self) -> Vec<&str> {
        if self.cmd.trim().is_empty() {
            return Vec::new();
        }
        [self.pre.as_deref(), Some(self.cmd.as_str()), self.post.as_deref()]
            .into_iter()
            .flatten()
            .filter(|step| !step.trim().is_empty())
            .collect()
    }
}

/// Commands run while walking a package during update
///
/// Serialized as a map from trigger (`once`, `directory`, `file`) to command,
/// with `ignore_errors` folded into the same map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub once: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub ignore_errors: bool,
}

impl UpdateSpec {
    pub fn is_empty(&self) -> bool {
        self.once.is_none() && self.directory.is_none() && self.file.is_none() && !self.ignore_errors
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A package: a top-level directory of the repository with its recipes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPackage", into = "RawPackage")]
pub struct PackageInfo {
    /// Filled from the config map key, never serialized
    pub name: String,
    pub install: InstallSpec,
    pub update: UpdateSpec,
}

impl PackageInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.install = InstallSpec::Target(target.into());
        self
    }

    pub fn with_commands(mut self, commands: InstallCommands) -> Self {
        self.install = InstallSpec::Commands(commands);
        self
    }

    pub fn with_update(mut self, update: UpdateSpec) -> Self {
        self.update = update;
        self
    }
}

/// On-disk shape of a package entry
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawPackage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    install: Option<RawInstall>,
    #[serde(default, skip_serializing_if = "UpdateSpec::is_empty")]
    update: UpdateSpec,
}

/// `install` is either a bare command string or a `{pre, cmd, post}` map
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum RawInstall {
    Command(String),
    Steps {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pre: Option<String>,
        #[serde(default)]
        cmd: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        post: Option<String>,
    },
}

impl TryFrom<RawPackage> for PackageInfo {
    type Error = String;

    fn try_from(raw: RawPackage) -> Result<Self, Self::Error> {
        let install = match (raw.target, raw.install) {
            (Some(_), Some(_)) => {
                return Err("`target` and `install` are mutually exclusive".to_string())
            }
            (Some(target), None) => InstallSpec::Target(target),
            (None, Some(RawInstall::Command(cmd))) => {
                InstallSpec::Commands(InstallCommands::new(cmd))
            }
            (None, Some(RawInstall::Steps { pre, cmd, post })) => {
                InstallSpec::Commands(InstallCommands { pre, cmd, post })
            }
            (None, None) => InstallSpec::default(),
        };

        Ok(Self {
            name: String::new(),
            install,
            update: raw.update,
        })
    }
}

impl From<PackageInfo> for RawPackage {
    fn from(package: PackageInfo) -> Self {
        let (target, install) = match package.install {
            InstallSpec::Target(target) => (Some(target), None),
            InstallSpec::Commands(InstallCommands {
                pre: None,
                cmd,
                post: None,
            }) => {
                if cmd.is_empty() {
                    (None, None)
                } else {
                    (None, Some(RawInstall::Command(cmd)))
                }
            }
            InstallSpec::Commands(InstallCommands { pre, cmd, post }) => {
                (None, Some(RawInstall::Steps { pre, cmd, post }))
            }
        };

        Self {
            target,
            install,
            update: package.update,
        }
    }
}
