use anyhow::Result;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_elasticbeanstalk::{
  config::{self, retry::RetryConfig},
  error::ProvideErrorMetadata,
  types::{self, PlatformFilter},
  Client,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{prompt::Page, tag::Tag};

/// S3 location of an application source bundle
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBundle {
  pub s3_bucket: Option<String>,
  pub s3_key: Option<String>,
}

/// A registered application version
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationVersion {
  pub application_name: Option<String>,
  pub version_label: Option<String>,
  pub description: Option<String>,
  pub source_bundle: Option<SourceBundle>,
  pub status: Option<String>,
}

/// Settings description of a saved configuration or of an environment's live configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationSettings {
  pub application_name: Option<String>,
  pub template_name: Option<String>,
  pub environment_name: Option<String>,
  pub description: Option<String>,
  pub solution_stack_name: Option<String>,
  pub platform_arn: Option<String>,
  pub deployment_status: Option<String>,
}

/// State of an environment as returned by create/update
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentDescription {
  pub environment_name: Option<String>,
  pub environment_id: Option<String>,
  pub application_name: Option<String>,
  pub version_label: Option<String>,
  pub template_name: Option<String>,
  pub platform_arn: Option<String>,
  pub status: Option<String>,
  pub health: Option<String>,
  pub cname: Option<String>,
  pub endpoint_url: Option<String>,
}

/// Input for `CreateEnvironment`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreateEnvironment {
  pub application_name: String,
  pub environment_name: String,
  pub template_name: String,
  pub version_label: String,
  pub tags: Vec<Tag>,
}

/// Input for `CreateApplicationVersion`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreateApplicationVersion {
  pub application_name: String,
  pub version_label: String,
  pub s3_bucket: String,
  pub s3_key: String,
  pub tags: Vec<Tag>,
}

/// The Elastic Beanstalk operations used by the workflows
///
/// Trait wrapper to support testing
#[async_trait]
pub trait Beanstalk: Send + Sync {
  /// S3 bucket of the most recently registered application version
  async fn latest_version_bucket(&self, application_name: &str) -> Result<Option<String>>;

  /// Version labels registered for the application
  async fn application_versions(&self, application_name: &str) -> Result<Vec<String>>;

  async fn create_application_version(&self, input: CreateApplicationVersion) -> Result<Option<ApplicationVersion>>;

  /// Describe a saved configuration; `None` when the template does not exist
  async fn describe_template(&self, application_name: &str, template_name: &str)
    -> Result<Option<ConfigurationSettings>>;

  /// Describe the configuration currently used by an environment
  async fn describe_environment_configuration(
    &self,
    application_name: &str,
    environment_name: &str,
  ) -> Result<Option<ConfigurationSettings>>;

  /// One page of platform ARNs whose platform name contains the filter
  async fn list_platform_arns(&self, name_filter: Option<&str>, next_token: Option<String>) -> Result<Page>;

  async fn create_environment(&self, input: CreateEnvironment) -> Result<EnvironmentDescription>;

  async fn update_environment(&self, environment_name: &str, version_label: &str) -> Result<EnvironmentDescription>;
}

/// Identifies the provider error returned when a configuration template does not exist
pub fn is_template_not_found(message: &str, application_name: &str, template_name: &str) -> bool {
  message == format!("No Configuration Template named '{application_name}/{template_name}' found.")
}

/// Elastic Beanstalk backed by the AWS SDK
#[derive(Clone, Debug)]
pub struct ElasticBeanstalk {
  client: Client,
}

impl ElasticBeanstalk {
  pub fn new(config: &SdkConfig, retries: u32) -> Self {
    Self {
      client: get_client(config, retries),
    }
  }
}

/// Get the Elastic Beanstalk client
pub fn get_client(config: &SdkConfig, retries: u32) -> Client {
  Client::from_conf(
    // Start with the shared environment configuration
    config::Builder::from(config)
      // Set max attempts
      .retry_config(RetryConfig::standard().with_max_attempts(retries))
      .build(),
  )
}

fn to_sdk_tags(tags: Vec<Tag>) -> Option<Vec<types::Tag>> {
  if tags.is_empty() {
    return None;
  }

  Some(
    tags
      .into_iter()
      .map(|tag| types::Tag::builder().key(tag.key).value(tag.value).build())
      .collect(),
  )
}

impl From<&types::ApplicationVersionDescription> for ApplicationVersion {
  fn from(version: &types::ApplicationVersionDescription) -> Self {
    Self {
      application_name: version.application_name().map(String::from),
      version_label: version.version_label().map(String::from),
      description: version.description().map(String::from),
      source_bundle: version.source_bundle().map(|bundle| SourceBundle {
        s3_bucket: bundle.s3_bucket().map(String::from),
        s3_key: bundle.s3_key().map(String::from),
      }),
      status: version.status().map(|s| s.as_str().to_string()),
    }
  }
}

impl From<&types::ConfigurationSettingsDescription> for ConfigurationSettings {
  fn from(settings: &types::ConfigurationSettingsDescription) -> Self {
    Self {
      application_name: settings.application_name().map(String::from),
      template_name: settings.template_name().map(String::from),
      environment_name: settings.environment_name().map(String::from),
      description: settings.description().map(String::from),
      solution_stack_name: settings.solution_stack_name().map(String::from),
      platform_arn: settings.platform_arn().map(String::from),
      deployment_status: settings.deployment_status().map(|s| s.as_str().to_string()),
    }
  }
}

impl From<aws_sdk_elasticbeanstalk::operation::create_environment::CreateEnvironmentOutput> for EnvironmentDescription {
  fn from(env: aws_sdk_elasticbeanstalk::operation::create_environment::CreateEnvironmentOutput) -> Self {
    Self {
      environment_name: env.environment_name().map(String::from),
      environment_id: env.environment_id().map(String::from),
      application_name: env.application_name().map(String::from),
      version_label: env.version_label().map(String::from),
      template_name: env.template_name().map(String::from),
      platform_arn: env.platform_arn().map(String::from),
      status: env.status().map(|s| s.as_str().to_string()),
      health: env.health().map(|h| h.as_str().to_string()),
      cname: env.cname().map(String::from),
      endpoint_url: env.endpoint_url().map(String::from),
    }
  }
}

impl From<aws_sdk_elasticbeanstalk::operation::update_environment::UpdateEnvironmentOutput> for EnvironmentDescription {
  fn from(env: aws_sdk_elasticbeanstalk::operation::update_environment::UpdateEnvironmentOutput) -> Self {
    Self {
      environment_name: env.environment_name().map(String::from),
      environment_id: env.environment_id().map(String::from),
      application_name: env.application_name().map(String::from),
      version_label: env.version_label().map(String::from),
      template_name: env.template_name().map(String::from),
      platform_arn: env.platform_arn().map(String::from),
      status: env.status().map(|s| s.as_str().to_string()),
      health: env.health().map(|h| h.as_str().to_string()),
      cname: env.cname().map(String::from),
      endpoint_url: env.endpoint_url().map(String::from),
    }
  }
}

#[async_trait]
impl Beanstalk for ElasticBeanstalk {
  async fn latest_version_bucket(&self, application_name: &str) -> Result<Option<String>> {
    let response = self
      .client
      .describe_application_versions()
      .application_name(application_name)
      .max_records(1)
      .send()
      .await?;

    Ok(
      response
        .application_versions()
        .first()
        .and_then(|v| v.source_bundle())
        .and_then(|b| b.s3_bucket())
        .map(String::from),
    )
  }

  async fn application_versions(&self, application_name: &str) -> Result<Vec<String>> {
    let response = self
      .client
      .describe_applications()
      .application_names(application_name)
      .send()
      .await?;

    Ok(
      response
        .applications()
        .first()
        .map(|app| app.versions().to_vec())
        .unwrap_or_default(),
    )
  }

  async fn create_application_version(&self, input: CreateApplicationVersion) -> Result<Option<ApplicationVersion>> {
    let bundle = types::S3Location::builder()
      .s3_bucket(input.s3_bucket)
      .s3_key(input.s3_key)
      .build();

    let response = self
      .client
      .create_application_version()
      .application_name(input.application_name)
      .version_label(input.version_label)
      .source_bundle(bundle)
      .set_tags(to_sdk_tags(input.tags))
      .send()
      .await?;

    Ok(response.application_version().map(ApplicationVersion::from))
  }

  async fn describe_template(
    &self,
    application_name: &str,
    template_name: &str,
  ) -> Result<Option<ConfigurationSettings>> {
    let result = self
      .client
      .describe_configuration_settings()
      .application_name(application_name)
      .template_name(template_name)
      .send()
      .await;

    match result {
      Ok(response) => Ok(response.configuration_settings().first().map(ConfigurationSettings::from)),
      Err(err) => {
        let message = err.as_service_error().and_then(|e| e.message()).unwrap_or_default();
        if is_template_not_found(message, application_name, template_name) {
          debug!("Configuration template {application_name}/{template_name} does not exist");
          return Ok(None);
        }
        Err(err.into())
      }
    }
  }

  async fn describe_environment_configuration(
    &self,
    application_name: &str,
    environment_name: &str,
  ) -> Result<Option<ConfigurationSettings>> {
    let response = self
      .client
      .describe_configuration_settings()
      .application_name(application_name)
      .environment_name(environment_name)
      .send()
      .await?;

    Ok(response.configuration_settings().first().map(ConfigurationSettings::from))
  }

  async fn list_platform_arns(&self, name_filter: Option<&str>, next_token: Option<String>) -> Result<Page> {
    let filters = name_filter.map(|name| {
      vec![PlatformFilter::builder()
        .r#type("PlatformName")
        .operator("contains")
        .values(name)
        .build()]
    });

    let response = self
      .client
      .list_platform_versions()
      .set_filters(filters)
      .set_next_token(next_token)
      .send()
      .await?;

    Ok(Page {
      options: response
        .platform_summary_list()
        .iter()
        .filter_map(|summary| summary.platform_arn())
        .map(String::from)
        .collect(),
      next_token: response.next_token().map(String::from),
    })
  }

  async fn create_environment(&self, input: CreateEnvironment) -> Result<EnvironmentDescription> {
    let response = self
      .client
      .create_environment()
      .application_name(input.application_name)
      .environment_name(input.environment_name)
      .template_name(input.template_name)
      .version_label(input.version_label)
      .set_tags(to_sdk_tags(input.tags))
      .send()
      .await?;

    Ok(response.into())
  }

  async fn update_environment(&self, environment_name: &str, version_label: &str) -> Result<EnvironmentDescription> {
    let response = self
      .client
      .update_environment()
      .environment_name(environment_name)
      .version_label(version_label)
      .send()
      .await?;

    Ok(response.into())
  }
}

#[cfg(test)]
mod tests {
  use rstest::*;

  use super::*;

  #[rstest]
  #[case("No Configuration Template named 'app/base' found.", true)]
  #[case("No Configuration Template named 'app/other' found.", false)]
  #[case("No Configuration Template named 'other/base' found.", false)]
  #[case("Access Denied", false)]
  #[case("", false)]
  fn is_template_not_found_test(#[case] message: &str, #[case] expected: bool) {
    assert_eq!(is_template_not_found(message, "app", "base"), expected);
  }

  #[test]
  fn it_skips_empty_tags() {
    assert_eq!(to_sdk_tags(vec![]), None);
  }

  #[test]
  fn it_converts_tags() {
    let tags = to_sdk_tags(vec![Tag {
      key: "Product".to_string(),
      value: "XYZ".to_string(),
    }])
    .unwrap();

    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].key(), Some("Product"));
    assert_eq!(tags[0].value(), Some("XYZ"));
  }
}
