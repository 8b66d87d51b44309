//! In-memory stand-ins for the AWS services and the `eb` CLI
use std::{collections::HashMap, sync::Mutex};

use anyhow::Result;
use async_trait::async_trait;

use crate::{
  eb::{
    ApplicationVersion, Beanstalk, ConfigurationSettings, CreateApplicationVersion, CreateEnvironment,
    EnvironmentDescription, SourceBundle,
  },
  prompt::Page,
  s3::ObjectStore,
  utils::{command_line, CommandRunner},
  Error,
};

#[derive(Debug, Default)]
pub struct MockBeanstalk {
  /// Bucket of the latest registered version
  pub bucket: Option<String>,
  /// Registered version labels; grows as versions are created
  pub versions: Mutex<Vec<String>>,
  /// Existing saved configuration names
  pub templates: Vec<String>,
  /// Existing environment names
  pub environments: Vec<String>,
  /// When set, `create_application_version` returns no version
  pub register_nothing: bool,
  pub platform_pages: Vec<Page>,

  pub calls: Mutex<Vec<String>>,
  pub created_versions: Mutex<Vec<CreateApplicationVersion>>,
  pub created_environments: Mutex<Vec<CreateEnvironment>>,
  pub updated_environments: Mutex<Vec<(String, String)>>,
  pub platform_requests: Mutex<Vec<(Option<String>, Option<String>)>>,
}

impl MockBeanstalk {
  fn record(&self, call: &str) {
    self.calls.lock().unwrap().push(call.to_string());
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }
}

#[async_trait]
impl Beanstalk for MockBeanstalk {
  async fn latest_version_bucket(&self, _application_name: &str) -> Result<Option<String>> {
    self.record("DescribeApplicationVersions");
    Ok(self.bucket.clone())
  }

  async fn application_versions(&self, _application_name: &str) -> Result<Vec<String>> {
    self.record("DescribeApplications");
    Ok(self.versions.lock().unwrap().clone())
  }

  async fn create_application_version(&self, input: CreateApplicationVersion) -> Result<Option<ApplicationVersion>> {
    self.record("CreateApplicationVersion");
    self.created_versions.lock().unwrap().push(input.clone());
    if self.register_nothing {
      return Ok(None);
    }

    self.versions.lock().unwrap().push(input.version_label.clone());
    Ok(Some(ApplicationVersion {
      application_name: Some(input.application_name),
      version_label: Some(input.version_label),
      description: None,
      source_bundle: Some(SourceBundle {
        s3_bucket: Some(input.s3_bucket),
        s3_key: Some(input.s3_key),
      }),
      status: Some("UNPROCESSED".to_string()),
    }))
  }

  async fn describe_template(
    &self,
    application_name: &str,
    template_name: &str,
  ) -> Result<Option<ConfigurationSettings>> {
    self.record("DescribeConfigurationSettings");
    Ok(
      self
        .templates
        .iter()
        .find(|t| *t == template_name)
        .map(|t| ConfigurationSettings {
          application_name: Some(application_name.to_string()),
          template_name: Some(t.to_owned()),
          ..ConfigurationSettings::default()
        }),
    )
  }

  async fn describe_environment_configuration(
    &self,
    application_name: &str,
    environment_name: &str,
  ) -> Result<Option<ConfigurationSettings>> {
    self.record("DescribeConfigurationSettings");
    Ok(
      self
        .environments
        .iter()
        .find(|e| *e == environment_name)
        .map(|e| ConfigurationSettings {
          application_name: Some(application_name.to_string()),
          environment_name: Some(e.to_owned()),
          ..ConfigurationSettings::default()
        }),
    )
  }

  async fn list_platform_arns(&self, name_filter: Option<&str>, next_token: Option<String>) -> Result<Page> {
    self.record("ListPlatformVersions");
    let mut requests = self.platform_requests.lock().unwrap();
    let page = self.platform_pages.get(requests.len()).cloned().unwrap_or_default();
    requests.push((name_filter.map(String::from), next_token));
    Ok(page)
  }

  async fn create_environment(&self, input: CreateEnvironment) -> Result<EnvironmentDescription> {
    self.record("CreateEnvironment");
    self.created_environments.lock().unwrap().push(input.clone());
    Ok(EnvironmentDescription {
      environment_name: Some(input.environment_name),
      application_name: Some(input.application_name),
      template_name: Some(input.template_name),
      version_label: Some(input.version_label),
      status: Some("Launching".to_string()),
      ..EnvironmentDescription::default()
    })
  }

  async fn update_environment(&self, environment_name: &str, version_label: &str) -> Result<EnvironmentDescription> {
    self.record("UpdateEnvironment");
    self
      .updated_environments
      .lock()
      .unwrap()
      .push((environment_name.to_string(), version_label.to_string()));
    Ok(EnvironmentDescription {
      environment_name: Some(environment_name.to_string()),
      version_label: Some(version_label.to_string()),
      status: Some("Updating".to_string()),
      ..EnvironmentDescription::default()
    })
  }
}

/// Records every object written
#[derive(Debug, Default)]
pub struct MockObjectStore {
  pub puts: Mutex<Vec<(String, String, Vec<u8>, Option<String>)>>,
}

#[async_trait]
impl ObjectStore for MockObjectStore {
  async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>, tagging: Option<String>) -> Result<()> {
    self
      .puts
      .lock()
      .unwrap()
      .push((bucket.to_string(), key.to_string(), body, tagging));
    Ok(())
  }
}

/// Answers known command lines with canned stdout and fails everything else
#[derive(Debug, Default)]
pub struct ScriptedRunner {
  pub responses: HashMap<String, String>,
  pub calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
  pub fn respond(mut self, command: &str, stdout: &str) -> Self {
    self.responses.insert(command.to_string(), stdout.to_string());
    self
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
  async fn run(&self, program: &str, args: &[&str]) -> Result<String> {
    let command = command_line(program, args);
    self.calls.lock().unwrap().push(command.clone());

    match self.responses.get(&command) {
      Some(stdout) => Ok(stdout.to_owned()),
      None => Err(
        Error::Subprocess {
          command,
          stderr: "ERROR: NotFoundError - unknown command".to_string(),
        }
        .into(),
      ),
    }
  }
}
