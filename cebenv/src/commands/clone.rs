use anyhow::Result;
use clap::Args;
use serde::{Deserialize, Serialize};

use super::{print_json, Aws, PlatformArgs};
use crate::{
  config::Settings,
  configuration::{resolve_platform_arn, CloneRequest, EbCli},
  environment::{launch_from_template, LaunchRequest},
  prompt::Prompt,
  tag,
  utils::Shell,
};

/// Input arguments for the `clone` command
#[derive(Args, Debug, Serialize, Deserialize)]
#[command(after_help = "Examples:
    $ cebenv clone \\
    --version v1.2.3 \\
    --platform 'Node.js 20' \\
    --from base-config \\
    --save-as new-config \\
    --env-name node-XYZ-test \\
    --product 'XYZ Test'")]
pub struct CloneEnvironment {
  /// Application version label (e.g. v1.2.3)
  #[arg(long = "version", value_name = "VERSION")]
  pub version_label: String,

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

  /// Adds a tag named 'Product' with the given value for the environment
  #[arg(long)]
  pub product: String,
}

impl CloneEnvironment {
  /// The Product tag goes on the environment only; saved configurations cannot be tagged
  pub fn launch_request(&self, application_name: String, platform_arn: Option<String>) -> LaunchRequest {
    LaunchRequest {
      clone: CloneRequest {
        application_name,
        from: self.from.to_owned(),
        save_as: self.save_as.to_owned(),
        platform_arn,
        tags: None,
      },
      environment_name: self.env_name.to_owned(),
      version_label: self.version_label.to_owned(),
      tags: tag::product_tags(&self.product),
    }
  }

  pub async fn exec(&self, settings: &Settings) -> Result<()> {
    let local = settings.local_config()?;
    let aws = Aws::new(settings).await?;
    let store = EbCli::new(Shell, settings.saved_configs_dir());

    let mut prompt = Prompt::stdio(settings.color);
    let platform_arn = resolve_platform_arn(
      &aws.eb,
      &mut prompt,
      self.platform.platform_arn.as_deref(),
      self.platform.platform.as_deref(),
    )
    .await?;

    let request = self.launch_request(local.application_name, platform_arn);
    let environment = launch_from_template(&aws.eb, &store, &request).await?;
    print_json(&environment)
  }
}
