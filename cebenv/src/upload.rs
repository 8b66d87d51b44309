use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
  eb::{ApplicationVersion, Beanstalk, CreateApplicationVersion},
  s3::ObjectStore,
  tag::{self, Tags},
  Error,
};

/// What to do when the application version label is already registered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExistingVersion {
  /// Reject the command
  Fail,
  /// Carry on with the version that is already registered
  #[default]
  Skip,
}

impl ExistingVersion {
  pub fn from_skip_flag(skip_if_exist: bool) -> Self {
    match skip_if_exist {
      true => Self::Skip,
      false => Self::Fail,
    }
  }

  /// Apply the policy to the outcome of `upload_if_absent`
  pub fn check(
    self,
    uploaded: Option<UploadedVersion>,
    version_label: &str,
    hint: &'static str,
  ) -> Result<Option<UploadedVersion>> {
    match (uploaded, self) {
      (Some(uploaded), _) => Ok(Some(uploaded)),
      (None, Self::Skip) => {
        info!("Application version {version_label} already exists - skipping upload");
        Ok(None)
      }
      (None, Self::Fail) => Err(
        Error::VersionExists {
          label: version_label.to_string(),
          hint,
        }
        .into(),
      ),
    }
  }
}

/// Bundle to upload and the application version to register for it
#[derive(Clone, Debug, Default)]
pub struct UploadRequest {
  pub file_path: PathBuf,
  pub bucket: String,
  /// Storage key; generated from the current time and the file name when absent
  pub key: Option<String>,
  pub application_name: String,
  pub version_label: String,
  pub tags: Tags,
}

/// The stored bundle and the application version that references it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedVersion {
  pub bucket: String,
  pub storage_key: String,
  pub version: ApplicationVersion,
}

/// Determine the bucket that holds the application source bundles
///
/// An explicit bucket wins; otherwise the bucket of the latest registered version is reused
pub async fn resolve_bucket<B: Beanstalk>(eb: &B, explicit: Option<&str>, application_name: &str) -> Result<String> {
  if let Some(bucket) = explicit {
    return Ok(bucket.to_string());
  }

  debug!("No bucket configured - looking up the latest version of {application_name}");
  match eb.latest_version_bucket(application_name).await? {
    Some(bucket) => Ok(bucket),
    None => Err(
      Error::Configuration(format!(
        "Unable to determine the S3 bucket for application '{application_name}'. Set the `aws_s3_bucket` \
         environment variable or pass --s3-bucket"
      ))
      .into(),
    ),
  }
}

/// Check whether the version label is registered for the application
pub async fn version_exists<B: Beanstalk>(eb: &B, application_name: &str, version_label: &str) -> Result<bool> {
  let versions = eb.application_versions(application_name).await?;
  Ok(versions.iter().any(|v| v == version_label))
}

/// Default storage key: `<epoch millis>-<file name>`
pub fn storage_key(file_path: &Path, epoch_millis: i64) -> String {
  let name = file_path
    .file_name()
    .map(|n| n.to_string_lossy().to_string())
    .unwrap_or_default();

  format!("{epoch_millis}-{name}")
}

/// Upload the bundle and register it as an application version, unless the label already exists
///
/// Returns `None` when the version label is already registered; storage is not touched in that case.
/// If the upload succeeds but registration returns nothing, the uploaded object is left in place and
/// the error names its key.
pub async fn upload_if_absent<B: Beanstalk, S: ObjectStore>(
  eb: &B,
  store: &S,
  request: &UploadRequest,
) -> Result<Option<UploadedVersion>> {
  if !request.file_path.exists() {
    return Err(Error::FileNotFound(request.file_path.to_owned()).into());
  }

  if version_exists(eb, &request.application_name, &request.version_label).await? {
    return Ok(None);
  }

  let key = match &request.key {
    Some(key) => key.to_owned(),
    None => storage_key(&request.file_path, chrono::Utc::now().timestamp_millis()),
  };
  let body = tokio::fs::read(&request.file_path)
    .await
    .with_context(|| format!("Failed to read {}", request.file_path.display()))?;
  let tagging = match request.tags.is_empty() {
    true => None,
    false => Some(tag::to_tag_query(&request.tags)),
  };

  info!("Uploading {} to s3://{}/{key}", request.file_path.display(), request.bucket);
  store.put_object(&request.bucket, &key, body, tagging).await?;

  let input = CreateApplicationVersion {
    application_name: request.application_name.to_owned(),
    version_label: request.version_label.to_owned(),
    s3_bucket: request.bucket.to_owned(),
    s3_key: key.to_owned(),
    tags: tag::to_tag_list(&request.tags),
  };

  match eb.create_application_version(input).await? {
    Some(version) => {
      info!("Created application version {}", request.version_label);
      Ok(Some(UploadedVersion {
        bucket: request.bucket.to_owned(),
        storage_key: key,
        version,
      }))
    }
    None => Err(
      Error::Registration {
        version_label: request.version_label.to_owned(),
        bucket: request.bucket.to_owned(),
        key,
      }
      .into(),
    ),
  }
}
