use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{print_json, Aws};
use crate::{
  config::Settings,
  eb::EnvironmentDescription,
  environment::update_version,
  tag,
  upload::{resolve_bucket, upload_if_absent, ExistingVersion, UploadRequest, UploadedVersion},
};

/// Input arguments for the `app:upload` command
#[derive(Args, Debug, Serialize, Deserialize)]
pub struct Upload {
  /// Application version label (e.g. v1.2.3)
  #[arg(long = "version", value_name = "VERSION")]
  pub version_label: String,

  /// Path to the application ZIP file (e.g. ./build/v1.2.3.zip)
  #[arg(long)]
  pub filepath: PathBuf,

  /// Adds a tag named 'Product' with the given value for the application version
  #[arg(long)]
  pub product: String,

  /// S3 key for the bundle; defaults to `<epoch millis>-<file name>`
  #[arg(long)]
  pub key: Option<String>,

  /// Skip the upload if the application version already exists (the default)
  #[arg(long, conflicts_with = "strict")]
  pub skip_if_exist: bool,

  /// Fail if the application version already exists
  #[arg(long)]
  pub strict: bool,
}

impl Upload {
  /// Lenient unless --strict is given
  pub fn existing_version(&self) -> ExistingVersion {
    match self.strict {
      true => ExistingVersion::Fail,
      false => ExistingVersion::Skip,
    }
  }

  pub async fn exec(&self, settings: &Settings) -> Result<()> {
    let local = settings.local_config()?;
    let aws = Aws::new(settings).await?;

    let bucket = resolve_bucket(&aws.eb, settings.bucket.as_deref(), &local.application_name).await?;
    let request = UploadRequest {
      file_path: self.filepath.to_owned(),
      bucket,
      key: self.key.to_owned(),
      application_name: local.application_name,
      version_label: self.version_label.to_owned(),
      tags: tag::product_tags(&self.product),
    };

    let uploaded = upload_if_absent(&aws.eb, &aws.s3, &request).await?;
    let uploaded = self
      .existing_version()
      .check(uploaded, &self.version_label, "Remove --strict to ignore an existing version")?;

    print_json(&uploaded)
  }
}

/// Input arguments for the `app:deploy` command
#[derive(Args, Debug, Serialize, Deserialize)]
pub struct Deploy {
  /// Application version label (e.g. v1.2.3)
  #[arg(long = "version", value_name = "VERSION")]
  pub version_label: String,

  /// Adds a tag named 'Product' with the given value for the application version
  #[arg(long)]
  pub product: Option<String>,

  /// Path to the application ZIP file to upload before deploying (e.g. ./build/v1.2.3.zip)
  #[arg(long, requires = "product")]
  pub filepath: Option<PathBuf>,

  /// Skip the upload if the application version already exists
  #[arg(long)]
  pub skip_if_exist: bool,
}

/// Resulting output of `app:deploy`
#[derive(Debug, Serialize, Deserialize)]
pub struct AppDeployment {
  /// `None` when nothing was uploaded
  pub uploaded: Option<UploadedVersion>,
  pub environment: EnvironmentDescription,
}

impl Deploy {
  pub async fn exec(&self, settings: &Settings) -> Result<()> {
    let local = settings.local_config()?;
    let environment_name = local.environment()?;
    let aws = Aws::new(settings).await?;

    let uploaded = match (&self.filepath, &self.product) {
      (Some(file_path), Some(product)) => {
        let bucket = resolve_bucket(&aws.eb, settings.bucket.as_deref(), &local.application_name).await?;
        let request = UploadRequest {
          file_path: file_path.to_owned(),
          bucket,
          key: None,
          application_name: local.application_name.to_owned(),
          version_label: self.version_label.to_owned(),
          tags: tag::product_tags(product),
        };

        let uploaded = upload_if_absent(&aws.eb, &aws.s3, &request).await?;
        ExistingVersion::from_skip_flag(self.skip_if_exist).check(
          uploaded,
          &self.version_label,
          "Remove the --filepath option or add --skip-if-exist",
        )?
      }
      (Some(_), None) => anyhow::bail!("The --product option is required when --filepath is provided"),
      (None, _) => {
        info!("No --filepath given - deploying the registered version {}", self.version_label);
        None
      }
    };

    let environment = update_version(&aws.eb, environment_name, &self.version_label).await?;
    print_json(&AppDeployment { uploaded, environment })
  }
}
