use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
  configuration::{self, CloneRequest, ConfigurationStore},
  eb::{Beanstalk, CreateEnvironment, EnvironmentDescription},
  s3::ObjectStore,
  tag::{self, Tags},
  upload::{self, ExistingVersion, UploadRequest, UploadedVersion},
};

const VERSION_EXISTS_HINT: &str = "Use the 'clone' command instead or add --skip-if-exist";

/// Launch a new environment from a freshly cloned configuration
#[derive(Clone, Debug, Default)]
pub struct LaunchRequest {
  pub clone: CloneRequest,
  pub environment_name: String,
  pub version_label: String,
  /// Applied to the environment at creation
  pub tags: Tags,
}

/// Clone the configuration then create the environment from it
///
/// A clone failure aborts before any environment is created
pub async fn launch_from_template<B: Beanstalk, S: ConfigurationStore>(
  eb: &B,
  store: &S,
  request: &LaunchRequest,
) -> Result<EnvironmentDescription> {
  let cloned = configuration::clone_configuration(eb, store, &request.clone).await?;

  info!(
    "Creating environment {} from configuration {} with version {}",
    request.environment_name, cloned.name, request.version_label
  );
  let input = CreateEnvironment {
    application_name: request.clone.application_name.to_owned(),
    environment_name: request.environment_name.to_owned(),
    template_name: cloned.name,
    version_label: request.version_label.to_owned(),
    tags: tag::to_tag_list(&request.tags),
  };

  eb.create_environment(input).await
}

/// Upload a bundle then launch a new environment running it
#[derive(Clone, Debug, Default)]
pub struct DeployRequest {
  pub file_path: PathBuf,
  /// Bundle bucket; discovered from the latest version when absent
  pub bucket: Option<String>,
  /// Applied to the application version and the stored bundle
  pub version_tags: Tags,
  pub existing: ExistingVersion,
  pub launch: LaunchRequest,
}

/// Resulting output of a deployment
#[derive(Debug, Serialize, Deserialize)]
pub struct Deployment {
  /// `None` when the version was already registered
  pub uploaded: Option<UploadedVersion>,
  pub environment: EnvironmentDescription,
}

/// Validate the target configuration name, upload and register the bundle, then launch
///
/// Nothing is written to S3 or Elastic Beanstalk when the target name is malformed or taken
pub async fn deploy<B: Beanstalk, O: ObjectStore, S: ConfigurationStore>(
  eb: &B,
  objects: &O,
  store: &S,
  request: &DeployRequest,
) -> Result<Deployment> {
  let launch = &request.launch;
  let application_name = &launch.clone.application_name;
  configuration::check_target_name(eb, application_name, &launch.clone.save_as).await?;

  let bucket = upload::resolve_bucket(eb, request.bucket.as_deref(), application_name).await?;
  let upload = UploadRequest {
    file_path: request.file_path.to_owned(),
    bucket,
    key: None,
    application_name: application_name.to_owned(),
    version_label: launch.version_label.to_owned(),
    tags: request.version_tags.to_owned(),
  };
  let uploaded = upload::upload_if_absent(eb, objects, &upload).await?;
  let uploaded = request
    .existing
    .check(uploaded, &launch.version_label, VERSION_EXISTS_HINT)?;

  let environment = launch_from_template(eb, store, launch).await?;

  Ok(Deployment { uploaded, environment })
}

/// Deploy an already registered version to an existing environment
pub async fn update_version<B: Beanstalk>(
  eb: &B,
  environment_name: &str,
  version_label: &str,
) -> Result<EnvironmentDescription> {
  info!("Deploying version {version_label} to environment {environment_name}");
  eb.update_environment(environment_name, version_label).await
}
