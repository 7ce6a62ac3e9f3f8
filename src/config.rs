use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::package::PackageInfo;
use crate::{Error, Result};

/// Contents of `.hearthrc`: where the repository lives and its packages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub directory: PathBuf,
    #[serde(default)]
    pub packages: BTreeMap<String, PackageInfo>,
}

impl Config {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            packages: BTreeMap::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config {
                path: path.to_path_buf(),
                message: "no config file, run `hearth init` first".to_string(),
            });
        }

        let contents = fs::read_to_string(path).map_err(|err| Error::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let mut config: Config = serde_yaml::from_str(contents)?;
        for (name, package) in config.packages.iter_mut() {
            package.name = name.clone();
        }
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_yaml()?).map_err(|err| Error::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Ok(())
    }

    pub fn package(&self, name: &str) -> Result<&PackageInfo> {
        self.packages.get(name).ok_or_else(|| Error::PackageNotFound {
            name: name.to_string(),
        })
    }

    /// Add or replace a package, keyed by its name
    pub fn insert(&mut self, package: PackageInfo) {
        self.packages.insert(package.name.clone(), package);
    }

    pub fn remove(&mut self, name: &str) -> Option<PackageInfo> {
        self.packages.remove(name)
    }
}
