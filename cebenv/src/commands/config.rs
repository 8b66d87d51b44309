use anyhow::Result;
use clap::Args;
use serde::{Deserialize, Serialize};

use super::{print_json, Aws, PlatformArgs};
use crate::{
  config::Settings,
  configuration::{clone_configuration, find_configuration, resolve_platform_arn, CloneRequest, EbCli},
  prompt::Prompt,
  tag,
  utils::Shell,
};

/// Input arguments for the `config:clone` command
#[derive(Args, Debug, Serialize, Deserialize)]
pub struct CloneConfiguration {
  /// Saved configuration name to clone (from `eb config list`)
  #[arg(long)]
  pub from: String,

  /// Name for the new configuration
  #[arg(long)]
  pub save_as: String,

  #[clap(flatten)]
  pub platform: PlatformArgs,

  /// Adds a tag named 'Product' with the given value
  #[arg(long)]
  pub product: Option<String>,
}

impl CloneConfiguration {
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

    let request = CloneRequest {
      application_name: local.application_name,
      from: self.from.to_owned(),
      save_as: self.save_as.to_owned(),
      platform_arn,
      tags: self.product.as_deref().map(tag::product_tags),
    };

    let store = EbCli::new(Shell, settings.saved_configs_dir());
    let cloned = clone_configuration(&aws.eb, &store, &request).await?;
    print_json(&cloned)
  }
}

/// Input arguments for the `config:describe` command
#[derive(Args, Debug, Serialize, Deserialize)]
#[command(group = clap::ArgGroup::new("target").multiple(true).required(true))]
pub struct DescribeConfiguration {
  /// Saved configuration name
  #[arg(long, group = "target")]
  pub template: Option<String>,

  /// Environment whose live configuration is described; used when --template is absent
  #[arg(long, group = "target")]
  pub env_name: Option<String>,
}

impl DescribeConfiguration {
  pub async fn exec(&self, settings: &Settings) -> Result<()> {
    let local = settings.local_config()?;
    let aws = Aws::new(settings).await?;

    let configuration = find_configuration(
      &aws.eb,
      &local.application_name,
      self.template.as_deref(),
      self.env_name.as_deref(),
    )
    .await?;
    print_json(&configuration)
  }
}
