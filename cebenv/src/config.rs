use std::{
  collections::BTreeMap,
  fs,
  path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Default location of the `eb` CLI project configuration
pub const DEFAULT_LOCAL_CONFIG_PATH: &str = ".elasticbeanstalk/config.yml";

/// Directory, next to the project configuration, where `eb config get` saves configurations
const SAVED_CONFIGS_DIR: &str = "saved_configs";

/// The branch whose default environment is used by `app:deploy`
const DEFAULT_BRANCH: &str = "main";

#[derive(Debug, Deserialize)]
struct Global {
  application_name: String,
}

#[derive(Debug, Deserialize)]
struct BranchDefaults {
  environment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLocalConfig {
  global: Global,
  #[serde(rename = "branch-defaults", default)]
  branch_defaults: BTreeMap<String, BranchDefaults>,
}

/// Project settings written by `eb init`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalConfig {
  pub application_name: String,
  /// Default environment of the `main` branch
  pub environment_name: Option<String>,
}

impl LocalConfig {
  pub fn parse(contents: &str) -> Result<Self> {
    let raw: RawLocalConfig = serde_yaml::from_str(contents)?;
    let environment_name = raw
      .branch_defaults
      .get(DEFAULT_BRANCH)
      .and_then(|branch| branch.environment.to_owned());

    Ok(Self {
      application_name: raw.global.application_name,
      environment_name,
    })
  }

  pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    let contents =
      fs::read_to_string(path).with_context(|| format!("Failed to read local configuration {}", path.display()))?;

    Self::parse(&contents).with_context(|| format!("Failed to parse local configuration {}", path.display()))
  }

  /// Default environment name, required by commands that act on the current environment
  pub fn environment(&self) -> Result<&str> {
    match &self.environment_name {
      Some(name) => Ok(name.as_str()),
      None => Err(
        Error::Configuration(format!(
          "No default environment found under 'branch-defaults.{DEFAULT_BRANCH}.environment'"
        ))
        .into(),
      ),
    }
  }
}

/// Settings resolved once per invocation from flags and environment variables
#[derive(Clone, Debug)]
pub struct Settings {
  pub region: Option<String>,
  pub local_config_path: PathBuf,
  /// Bucket for source bundles; discovered from existing versions when absent
  pub bucket: Option<String>,
  pub color: bool,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      region: None,
      local_config_path: PathBuf::from(DEFAULT_LOCAL_CONFIG_PATH),
      bucket: None,
      color: true,
    }
  }
}

impl Settings {
  pub fn local_config(&self) -> Result<LocalConfig> {
    LocalConfig::read(&self.local_config_path)
  }

  /// Where saved configurations live locally
  pub fn saved_configs_dir(&self) -> PathBuf {
    self
      .local_config_path
      .parent()
      .unwrap_or_else(|| Path::new("."))
      .join(SAVED_CONFIGS_DIR)
  }
}
