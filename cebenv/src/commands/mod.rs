pub mod app;
pub mod clone;
pub mod config;
pub mod deploy;

use anyhow::Result;
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{config::Settings, eb::ElasticBeanstalk, get_sdk_config, s3::S3, DEFAULT_RETRIES};

/// Platform selection shared by the commands that clone a configuration
#[derive(Args, Debug, Default, Serialize, Deserialize)]
pub struct PlatformArgs {
  /// Explicit platform ARN to use. See also --platform
  #[arg(long = "platform-arn", alias = "platformArn", value_name = "ARN")]
  pub platform_arn: Option<String>,

  /// Platform name to select an ARN interactively (e.g. Node.js, Node.js 20)
  #[arg(long)]
  pub platform: Option<String>,
}

/// AWS clients used by the commands
struct Aws {
  eb: ElasticBeanstalk,
  s3: S3,
}

impl Aws {
  async fn new(settings: &Settings) -> Result<Self> {
    let config = get_sdk_config(settings.region.to_owned()).await?;

    Ok(Self {
      eb: ElasticBeanstalk::new(&config, DEFAULT_RETRIES),
      s3: S3::new(&config, DEFAULT_RETRIES),
    })
  }
}

/// Write the command result to stdout as JSON
fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
