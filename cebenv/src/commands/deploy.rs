use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::{Deserialize, Serialize};

use super::{print_json, Aws, PlatformArgs};
use crate::{
  config::Settings,
  configuration::{resolve_platform_arn, CloneRequest, EbCli},
  environment::{deploy, DeployRequest, LaunchRequest},
  prompt::Prompt,
  tag::{self, Tags},
  upload::ExistingVersion,
  utils::Shell,
};

/// Input arguments for the `deploy` command
#[derive(Args, Debug, Serialize, Deserialize)]
#[command(after_help = "Examples:
    $ cebenv deploy \\
    --version v1.2.3 \\
    --filepath ./build/app.zip \\
    --product XYZ \\
    --platform 'Node.js 20' \\
    --from base-config \\
    --save-as new-config \\
    --env-name node-XYZ-test \\
    --env-product 'XYZ Test'")]
pub struct Deploy {
  /// Application version label (e.g. v1.2.3)
  #[arg(long = "version", value_name = "VERSION")]
  pub version_label: String,

  /// Path to the application ZIP file (e.g. ./build/v1.2.3.zip)
  #[arg(long)]
  pub filepath: PathBuf,

  /// Adds a tag named 'Product' with the given value for the application version
  #[arg(long)]
  pub product: String,

  /// Skip the upload if the application version already exists
  #[arg(long)]
  pub skip_if_exist: bool,

  #[clap(flatten)]
  pub platform: PlatformArgs,

  /// Saved configuration name to clone (from `eb config list`)
  #[arg(long)]
  pub from: String,

  /// Name for the new configuration
  #[arg(long)]
  pub save_as: String,

  /// Name of the environment to launch with the new configuration
  #[arg(long)]
  pub env_name: String,

  /// Adds a tag named 'Product' with the given value for the environment. Defaults to --product
  #[arg(long)]
  pub env_product: Option<String>,
}

impl Deploy {
  /// Tags for the environment
  pub fn environment_tags(&self) -> Tags {
    tag::product_tags(self.env_product.as_deref().unwrap_or(&self.product))
  }

  /// Version tags from --product; the saved configuration is cloned untagged
  pub fn deploy_request(
    &self,
    application_name: String,
    bucket: Option<String>,
    platform_arn: Option<String>,
  ) -> DeployRequest {
    DeployRequest {
      file_path: self.filepath.to_owned(),
      bucket,
      version_tags: tag::product_tags(&self.product),
      existing: ExistingVersion::from_skip_flag(self.skip_if_exist),
      launch: LaunchRequest {
        clone: CloneRequest {
          application_name,
          from: self.from.to_owned(),
          save_as: self.save_as.to_owned(),
          platform_arn,
          tags: None,
        },
        environment_name: self.env_name.to_owned(),
        version_label: self.version_label.to_owned(),
        tags: self.environment_tags(),
      },
    }
  }

  pub async fn exec(&self, settings: &Settings) -> Result<()> {
    let local = settings.local_config()?;
    let aws = Aws::new(settings).await?;

    let mut prompt = Prompt::stdio(settings.color);
    let platform_arn = resolve_platform_arn(
      &aws.eb,
      &mut prompt,
      self.platform.platform_arn.as_deref(),
      self.platform.platform.as_deref(),
    )
    .await?;

    let request = self.deploy_request(local.application_name, settings.bucket.to_owned(), platform_arn);

    let store = EbCli::new(Shell, settings.saved_configs_dir());
    let deployment = deploy(&aws.eb, &aws.s3, &store, &request).await?;

    print_json(&deployment)
  }
}
