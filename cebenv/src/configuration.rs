use std::{
  fs,
  io::{BufRead, Write},
  path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::{debug, info, warn};

use crate::{
  eb::{Beanstalk, ConfigurationSettings},
  prompt::{Page, PageSource, Prompt},
  tag::Tags,
  utils::{command_line, CommandRunner},
  Error,
};

/// Prefix of the line printed by `eb config get`
const SAVED_AT: &str = "Configuration saved at";

/// Block recording when the source configuration was created and modified
const METADATA_KEY: &str = "EnvironmentConfigurationMetadata";

const PLATFORM_KEY: &str = "Platform";
const PLATFORM_ARN_KEY: &str = "PlatformArn";

/// Maximum length of a configuration template name (exclusive)
///
/// https://docs.aws.amazon.com/elasticbeanstalk/latest/api/API_CreateConfigurationTemplate.html
const MAX_TEMPLATE_NAME_LEN: usize = 100;

/// Check a configuration template name: alphanumerics, `-` and `_`, fewer than 100 characters
pub fn is_valid_template_name(name: &str) -> Result<bool> {
  let re = Regex::new(r"^[a-zA-Z0-9_-]+$")?;

  Ok(name.len() < MAX_TEMPLATE_NAME_LEN && re.is_match(name))
}

/// Reject a target configuration name that is malformed or already taken
///
/// Only reads from Elastic Beanstalk, so callers run it before any mutating step
pub async fn check_target_name<B: Beanstalk>(eb: &B, application_name: &str, name: &str) -> Result<()> {
  if !is_valid_template_name(name)? {
    return Err(Error::InvalidName(name.to_owned()).into());
  }

  if eb.describe_template(application_name, name).await?.is_some() {
    return Err(Error::NameConflict(name.to_owned()).into());
  }

  Ok(())
}

/// Extract the file path from the `Configuration saved at: <path>` line printed by `eb config get`
pub fn parse_saved_at(command: &str, output: &str) -> Result<PathBuf> {
  let unexpected = || Error::SubprocessOutput {
    command: command.to_string(),
    output: output.trim().to_string(),
  };

  let (key, path) = output.trim().split_once(':').ok_or_else(unexpected)?;
  let path = path.trim();
  if key.trim() != SAVED_AT || path.is_empty() {
    return Err(unexpected().into());
  }

  Ok(PathBuf::from(path))
}

/// A saved configuration document and where it lives on disk
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedConfiguration {
  pub name: String,
  pub path: PathBuf,
  pub settings: Value,
}

/// Storage for saved configurations
///
/// The Elastic Beanstalk API cannot produce a saved configuration document that it will accept back,
/// so the `eb` CLI implementation is used; a direct API implementation can replace it transparently.
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
  /// Fetch a saved configuration by name
  async fn get(&self, name: &str) -> Result<SavedConfiguration>;

  /// Save the settings under the name, returning the local file written
  async fn put(&self, name: &str, settings: &Value) -> Result<PathBuf>;
}

/// Saved configurations managed through `eb config get` / `eb config put`
#[derive(Debug)]
pub struct EbCli<R> {
  runner: R,
  saved_configs: PathBuf,
}

impl<R: CommandRunner> EbCli<R> {
  pub fn new<P: Into<PathBuf>>(runner: R, saved_configs: P) -> Self {
    Self {
      runner,
      saved_configs: saved_configs.into(),
    }
  }

  /// Local file written for a configuration and handed to `eb config put`
  pub fn path_for(&self, name: &str) -> PathBuf {
    self.saved_configs.join(format!("{name}.cfg.yml"))
  }

  #[cfg(test)]
  pub(crate) fn runner(&self) -> &R {
    &self.runner
  }
}

fn read_settings(path: &Path) -> Result<Value> {
  let contents = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
  serde_yaml::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

#[async_trait]
impl<R: CommandRunner> ConfigurationStore for EbCli<R> {
  async fn get(&self, name: &str) -> Result<SavedConfiguration> {
    let args = ["config", "get", name];
    let command = command_line("eb", &args);
    let output = self.runner.run("eb", &args).await?;

    let path = parse_saved_at(&command, &output)?;
    if !path.exists() {
      return Err(
        Error::SubprocessOutput {
          command,
          output: output.trim().to_string(),
        }
        .into(),
      );
    }
    debug!("Configuration {name} saved at {}", path.display());

    Ok(SavedConfiguration {
      name: name.to_string(),
      settings: read_settings(&path)?,
      path,
    })
  }

  async fn put(&self, name: &str, settings: &Value) -> Result<PathBuf> {
    let dest = self.path_for(name);
    fs::create_dir_all(&self.saved_configs)
      .with_context(|| format!("Failed to create {}", self.saved_configs.display()))?;
    fs::write(&dest, serde_yaml::to_string(settings)?).with_context(|| format!("Failed to write {}", dest.display()))?;
    debug!("Configuration {name} written to {}", dest.display());

    // A bare name is resolved against the working directory's project, not `saved_configs`
    let file = dest.to_string_lossy();
    self.runner.run("eb", &["config", "put", &file]).await?;

    Ok(dest)
  }
}

/// Remove the creation/modification timestamps inherited from the source configuration
pub fn strip_metadata(settings: &mut Value) {
  if let Some(mapping) = settings.as_mapping_mut() {
    mapping.remove(METADATA_KEY);
  }
}

/// Point the configuration at a different platform
pub fn set_platform_arn(settings: &mut Value, platform_arn: &str) -> Result<()> {
  let Some(root) = settings.as_mapping_mut() else {
    anyhow::bail!("Saved configuration is not a mapping");
  };

  let platform = root
    .entry(Value::from(PLATFORM_KEY))
    .or_insert_with(|| Value::Mapping(Mapping::new()));
  let Some(platform) = platform.as_mapping_mut() else {
    anyhow::bail!("'{PLATFORM_KEY}' in saved configuration is not a mapping");
  };
  platform.insert(Value::from(PLATFORM_ARN_KEY), Value::from(platform_arn));

  Ok(())
}

/// Platform ARNs matching a platform name, listed page by page
pub struct PlatformCatalog<'a, B> {
  eb: &'a B,
  name: Option<&'a str>,
}

impl<'a, B: Beanstalk> PlatformCatalog<'a, B> {
  pub fn new(eb: &'a B, name: Option<&'a str>) -> Self {
    Self { eb, name }
  }
}

#[async_trait]
impl<B: Beanstalk> PageSource for PlatformCatalog<'_, B> {
  async fn fetch(&mut self, token: Option<String>) -> Result<Option<Page>> {
    let page = self.eb.list_platform_arns(self.name, token).await?;
    match page.options.is_empty() {
      true => Ok(None),
      false => Ok(Some(page)),
    }
  }
}

/// Resolve the platform ARN to use for the cloned configuration
///
/// An explicit ARN wins; otherwise, when a platform name is given, the user picks from the
/// matching platforms. `None` leaves the platform of the source configuration untouched.
pub async fn resolve_platform_arn<B: Beanstalk, I: BufRead, O: Write>(
  eb: &B,
  prompt: &mut Prompt<I, O>,
  platform_arn: Option<&str>,
  platform_name: Option<&str>,
) -> Result<Option<String>> {
  if let Some(arn) = platform_arn {
    return Ok(Some(arn.to_string()));
  }

  let Some(name) = platform_name else {
    return Ok(None);
  };

  let mut catalog = PlatformCatalog::new(eb, Some(name));
  let selected = prompt.select_one_paged("Choose one:", &mut catalog).await?;
  match &selected {
    Some(arn) => info!("Selected platform {arn}"),
    None => warn!("No platform found matching '{name}' - keeping the platform of the source configuration"),
  }

  Ok(selected)
}

/// Clone an existing saved configuration
#[derive(Clone, Debug, Default)]
pub struct CloneRequest {
  pub application_name: String,
  /// Saved configuration to clone
  pub from: String,
  /// Name of the new saved configuration
  pub save_as: String,
  pub platform_arn: Option<String>,
  /// Not supported by `eb config put`; ignored with a warning
  pub tags: Option<Tags>,
}

/// The cloned configuration as persisted
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClonedConfiguration {
  pub name: String,
  pub path: PathBuf,
  pub settings: Value,
}

/// Clone a saved configuration under a new name, optionally switching its platform
///
/// The new name is validated and checked for availability before anything is fetched or written.
pub async fn clone_configuration<B: Beanstalk, S: ConfigurationStore>(
  eb: &B,
  store: &S,
  request: &CloneRequest,
) -> Result<ClonedConfiguration> {
  if request.tags.as_ref().is_some_and(|tags| !tags.is_empty()) {
    warn!("Tagging saved configuration is currently not supported - tags are ignored");
  }

  check_target_name(eb, &request.application_name, &request.save_as).await?;

  info!("Cloning configuration {} as {}", request.from, request.save_as);
  let mut source = store.get(&request.from).await?;
  strip_metadata(&mut source.settings);
  if let Some(arn) = &request.platform_arn {
    set_platform_arn(&mut source.settings, arn)?;
  }

  let path = store.put(&request.save_as, &source.settings).await?;

  Ok(ClonedConfiguration {
    name: request.save_as.to_owned(),
    settings: read_settings(&path)?,
    path,
  })
}

/// Find a configuration by template name or, failing that, by the environment using it
pub async fn find_configuration<B: Beanstalk>(
  eb: &B,
  application_name: &str,
  template_name: Option<&str>,
  environment_name: Option<&str>,
) -> Result<ConfigurationSettings> {
  if let Some(template) = template_name {
    return match eb.describe_template(application_name, template).await? {
      Some(settings) => Ok(settings),
      None => Err(
        Error::NotFound {
          kind: "Configuration template",
          name: format!("{application_name}/{template}"),
        }
        .into(),
      ),
    };
  }

  if let Some(environment) = environment_name {
    return match eb.describe_environment_configuration(application_name, environment).await? {
      Some(settings) => Ok(settings),
      None => Err(
        Error::NotFound {
          kind: "Environment configuration",
          name: environment.to_string(),
        }
        .into(),
      ),
    };
  }

  Err(Error::Configuration("Require at least a configuration template name or an environment name".to_string()).into())
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use rstest::*;
  use tempfile::TempDir;

  use super::*;
  use crate::{
    tag::product_tags,
    testing::{MockBeanstalk, ScriptedRunner},
  };

  const SOURCE: &str = r#"
EnvironmentConfigurationMetadata:
  DateCreated: '1700000000000'
  DateModified: '1700000000000'
Platform:
  PlatformArn: arn:old
OptionSettings:
  aws:elasticbeanstalk:command:
    DeploymentPolicy: Immutable
"#;

  fn saved_at(path: &Path) -> String {
    format!("Configuration saved at: {}\n", path.display())
  }

  /// `eb config put` for the `new-config` file written under `saved_configs`
  fn put_command(saved_configs: &Path) -> String {
    format!("eb config put {}", saved_configs.join("new-config.cfg.yml").display())
  }

  /// Runner answering `eb config get base` with a source document written to `dir`
  fn runner(dir: &TempDir, source: &str, saved_configs: &Path) -> ScriptedRunner {
    let path = dir.path().join("base.cfg.yml");
    fs::write(&path, source).unwrap();

    ScriptedRunner::default()
      .respond("eb config get base", &saved_at(&path))
      .respond(&put_command(saved_configs), "")
  }

  fn request(platform_arn: Option<&str>) -> CloneRequest {
    CloneRequest {
      application_name: "app".to_string(),
      from: "base".to_string(),
      save_as: "new-config".to_string(),
      platform_arn: platform_arn.map(String::from),
      tags: None,
    }
  }

  #[rstest]
  #[case("base-config", true)]
  #[case("new_config", true)]
  #[case("Node20-2024_v1", true)]
  #[case("a", true)]
  #[case("", false)]
  #[case("with space", false)]
  #[case("with/slash", false)]
  #[case("dot.name", false)]
  #[case("semi;colon", false)]
  #[case("ünicode", false)]
  fn is_valid_template_name_test(#[case] name: &str, #[case] expected: bool) {
    assert_eq!(is_valid_template_name(name).unwrap(), expected);
  }

  #[test]
  fn it_limits_template_name_length() {
    assert!(is_valid_template_name(&"a".repeat(99)).unwrap());
    assert!(!is_valid_template_name(&"a".repeat(100)).unwrap());
  }

  #[rstest]
  #[case("Configuration saved at: /tmp/x.yml", "/tmp/x.yml")]
  #[case("Configuration saved at: /tmp/x.yml\n", "/tmp/x.yml")]
  #[case(
    "  Configuration saved at:   /project/.elasticbeanstalk/saved_configs/base.cfg.yml  \n",
    "/project/.elasticbeanstalk/saved_configs/base.cfg.yml"
  )]
  #[case("Configuration saved at: C:\\project\\base.cfg.yml", "C:\\project\\base.cfg.yml")]
  fn parse_saved_at_test(#[case] output: &str, #[case] expected: &str) {
    let result = parse_saved_at("eb config get base", output).unwrap();
    assert_eq!(result, PathBuf::from(expected));
  }

  #[rstest]
  #[case("")]
  #[case("Configuration saved at:")]
  #[case("Configuration saved at /tmp/x.yml")]
  #[case("ERROR: NotFoundError - Elastic Beanstalk could not find any saved configuration")]
  #[case("Saved at: /tmp/x.yml")]
  fn parse_saved_at_rejects_test(#[case] output: &str) {
    let err = parse_saved_at("eb config get base", output).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::SubprocessOutput { .. })));
  }

  #[test]
  fn it_strips_metadata() {
    let mut settings: Value = serde_yaml::from_str(SOURCE).unwrap();
    strip_metadata(&mut settings);

    assert!(settings.get(METADATA_KEY).is_none());
    assert!(settings.get("OptionSettings").is_some());
  }

  #[test]
  fn it_creates_platform_when_missing() {
    let mut settings: Value = serde_yaml::from_str("OptionSettings: {}").unwrap();
    set_platform_arn(&mut settings, "arn:new").unwrap();

    assert_eq!(settings["Platform"]["PlatformArn"].as_str(), Some("arn:new"));
  }

  #[tokio::test]
  async fn it_clones_configuration_with_platform_override() {
    let dir = TempDir::new().unwrap();
    let eb = MockBeanstalk::default();
    let saved_configs = dir.path().join("saved_configs");
    let runner = runner(&dir, SOURCE, &saved_configs);
    let store = EbCli::new(runner, &saved_configs);

    let cloned = clone_configuration(&eb, &store, &request(Some("arn:new")))
      .await
      .unwrap();

    assert_eq!(cloned.name, "new-config");
    assert_eq!(cloned.path, dir.path().join("saved_configs").join("new-config.cfg.yml"));
    assert_eq!(cloned.settings["Platform"]["PlatformArn"].as_str(), Some("arn:new"));
    assert!(cloned.settings.get(METADATA_KEY).is_none());

    let persisted: Value = serde_yaml::from_str(&fs::read_to_string(&cloned.path).unwrap()).unwrap();
    assert_eq!(persisted, cloned.settings);
    assert_eq!(
      persisted["OptionSettings"]["aws:elasticbeanstalk:command"]["DeploymentPolicy"].as_str(),
      Some("Immutable")
    );

    assert_eq!(
      store.runner.calls(),
      vec!["eb config get base".to_string(), put_command(&saved_configs)]
    );
  }

  #[tokio::test]
  async fn it_puts_the_written_file() {
    let dir = TempDir::new().unwrap();
    let saved_configs = dir.path().join("elsewhere").join(".elasticbeanstalk").join("saved_configs");
    let runner = ScriptedRunner::default().respond(&put_command(&saved_configs), "");
    let store = EbCli::new(runner, &saved_configs);
    let settings: Value = serde_yaml::from_str(SOURCE).unwrap();

    let path = store.put("new-config", &settings).await.unwrap();

    assert_eq!(path, saved_configs.join("new-config.cfg.yml"));
    assert!(path.exists());
    assert_eq!(
      store.runner.calls(),
      vec![format!("eb config put {}", path.display())]
    );
  }

  #[tokio::test]
  async fn it_keeps_platform_without_override() {
    let dir = TempDir::new().unwrap();
    let eb = MockBeanstalk::default();
    let store = EbCli::new(runner(&dir, SOURCE, dir.path()), dir.path());

    let cloned = clone_configuration(&eb, &store, &request(None)).await.unwrap();

    assert_eq!(cloned.settings["Platform"]["PlatformArn"].as_str(), Some("arn:old"));
    assert!(cloned.settings.get(METADATA_KEY).is_none());
  }

  #[tokio::test]
  async fn it_ignores_tags() {
    let dir = TempDir::new().unwrap();
    let eb = MockBeanstalk::default();
    let store = EbCli::new(runner(&dir, SOURCE, dir.path()), dir.path());
    let request = CloneRequest {
      tags: Some(product_tags("XYZ")),
      ..request(None)
    };

    let cloned = clone_configuration(&eb, &store, &request).await.unwrap();
    assert_eq!(cloned.name, "new-config");
  }

  #[tokio::test]
  async fn it_rejects_invalid_name_before_any_call() {
    let dir = TempDir::new().unwrap();
    let eb = MockBeanstalk::default();
    let store = EbCli::new(runner(&dir, SOURCE, dir.path()), dir.path());
    let request = CloneRequest {
      save_as: "new config".to_string(),
      ..request(None)
    };

    let err = clone_configuration(&eb, &store, &request).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::InvalidName(_))));
    assert!(eb.calls().is_empty());
    assert!(store.runner.calls().is_empty());
  }

  #[tokio::test]
  async fn it_rejects_existing_name_before_any_subprocess() {
    let dir = TempDir::new().unwrap();
    let eb = MockBeanstalk {
      templates: vec!["new-config".to_string()],
      ..MockBeanstalk::default()
    };
    let store = EbCli::new(runner(&dir, SOURCE, dir.path()), dir.path());

    let err = clone_configuration(&eb, &store, &request(None)).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NameConflict(_))));
    assert!(store.runner.calls().is_empty());
  }

  #[rstest]
  #[case("new config")]
  #[case("new/config")]
  #[case("")]
  #[tokio::test]
  async fn check_target_name_invalid_test(#[case] name: &str) {
    let eb = MockBeanstalk::default();

    let err = check_target_name(&eb, "app", name).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::InvalidName(_))));
    assert!(eb.calls().is_empty());
  }

  #[tokio::test]
  async fn it_accepts_available_target_name() {
    let eb = MockBeanstalk {
      templates: vec!["base".to_string()],
      ..MockBeanstalk::default()
    };

    check_target_name(&eb, "app", "new-config").await.unwrap();
    assert_eq!(eb.calls(), vec!["DescribeConfigurationSettings".to_string()]);

    let err = check_target_name(&eb, "app", "base").await.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NameConflict(_))));
  }

  #[tokio::test]
  async fn it_fails_when_saved_file_is_missing() {
    let dir = TempDir::new().unwrap();
    let eb = MockBeanstalk::default();
    let missing = dir.path().join("x.yml");
    let runner = ScriptedRunner::default().respond("eb config get base", &saved_at(&missing));
    let store = EbCli::new(runner, dir.path());

    let err = clone_configuration(&eb, &store, &request(None)).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::SubprocessOutput { .. })));
    assert_eq!(store.runner.calls(), vec!["eb config get base".to_string()]);
  }

  #[tokio::test]
  async fn it_fails_when_eb_fails() {
    let dir = TempDir::new().unwrap();
    let eb = MockBeanstalk::default();
    let store = EbCli::new(ScriptedRunner::default(), dir.path());

    let err = clone_configuration(&eb, &store, &request(None)).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Subprocess { .. })));
  }

  #[tokio::test]
  async fn it_uses_explicit_platform_arn() {
    let eb = MockBeanstalk::default();
    let mut prompt = Prompt::new(Cursor::new(Vec::new()), Vec::new(), false);

    let result = resolve_platform_arn(&eb, &mut prompt, Some("arn:explicit"), Some("Node.js"))
      .await
      .unwrap();

    assert_eq!(result.as_deref(), Some("arn:explicit"));
    assert!(eb.calls().is_empty());
  }

  #[tokio::test]
  async fn it_skips_platform_without_hint() {
    let eb = MockBeanstalk::default();
    let mut prompt = Prompt::new(Cursor::new(Vec::new()), Vec::new(), false);

    let result = resolve_platform_arn(&eb, &mut prompt, None, None).await.unwrap();
    assert_eq!(result, None);
    assert!(eb.calls().is_empty());
  }

  #[tokio::test]
  async fn it_selects_platform_interactively() {
    let eb = MockBeanstalk {
      platform_pages: vec![
        Page {
          options: vec!["arn:node18".to_string()],
          next_token: Some("t1".to_string()),
        },
        Page {
          options: vec!["arn:node20".to_string(), "arn:node22".to_string()],
          next_token: None,
        },
      ],
      ..MockBeanstalk::default()
    };
    let mut prompt = Prompt::new(Cursor::new(b"next\n1\n".to_vec()), Vec::new(), false);

    let result = resolve_platform_arn(&eb, &mut prompt, None, Some("Node.js"))
      .await
      .unwrap();

    assert_eq!(result.as_deref(), Some("arn:node22"));
    assert_eq!(
      *eb.platform_requests.lock().unwrap(),
      vec![
        (Some("Node.js".to_string()), None),
        (Some("Node.js".to_string()), Some("t1".to_string())),
      ]
    );
  }

  #[tokio::test]
  async fn it_returns_none_when_no_platform_matches() {
    let eb = MockBeanstalk::default();
    let mut prompt = Prompt::new(Cursor::new(Vec::new()), Vec::new(), false);

    let result = resolve_platform_arn(&eb, &mut prompt, None, Some("Cobol")).await.unwrap();
    assert_eq!(result, None);
  }

  #[tokio::test]
  async fn it_finds_configuration_by_template() {
    let eb = MockBeanstalk {
      templates: vec!["base".to_string()],
      ..MockBeanstalk::default()
    };

    let result = find_configuration(&eb, "app", Some("base"), Some("ignored")).await.unwrap();
    assert_eq!(result.template_name.as_deref(), Some("base"));
  }

  #[tokio::test]
  async fn it_finds_configuration_by_environment() {
    let eb = MockBeanstalk {
      environments: vec!["env-a".to_string()],
      ..MockBeanstalk::default()
    };

    let result = find_configuration(&eb, "app", None, Some("env-a")).await.unwrap();
    assert_eq!(result.environment_name.as_deref(), Some("env-a"));
  }

  #[rstest]
  #[case(Some("missing"), None)]
  #[case(None, Some("missing"))]
  #[tokio::test]
  async fn find_configuration_not_found_test(#[case] template: Option<&str>, #[case] environment: Option<&str>) {
    let eb = MockBeanstalk::default();

    let err = find_configuration(&eb, "app", template, environment).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotFound { .. })));
  }

  #[tokio::test]
  async fn it_requires_template_or_environment() {
    let eb = MockBeanstalk::default();

    let err = find_configuration(&eb, "app", None, None).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Configuration(_))));
  }
}
