use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_verbosity_flag::Verbosity;

use crate::{
  commands,
  config::{Settings, DEFAULT_LOCAL_CONFIG_PATH},
};

/// Styles for CLI
fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .literal(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::BrightCyan))),
    )
    .usage(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
}

#[derive(Debug, Parser)]
#[command(author, about, version)]
#[command(styles=get_styles())]
pub struct Cli {
  #[command(subcommand)]
  pub command: Commands,

  #[clap(flatten)]
  pub verbose: Verbosity,

  /// Disable colored output
  #[arg(long, global = true)]
  pub no_color: bool,

  /// AWS region; defaults to `AWS_DEFAULT_REGION` then the default provider chain
  #[arg(long, global = true)]
  pub region: Option<String>,

  /// Path to the local Elastic Beanstalk config file
  #[arg(long, global = true, env = "aws_eb_local_config_path", default_value = DEFAULT_LOCAL_CONFIG_PATH)]
  pub local_config: PathBuf,

  /// S3 bucket used to store application source bundles
  ///
  /// Defaults to the bucket of the latest application version
  /// (see `aws elasticbeanstalk describe-application-versions --application-name <name>`)
  #[arg(long, global = true, env = "aws_s3_bucket")]
  pub s3_bucket: Option<String>,
}

impl Cli {
  /// Settings shared by every command, resolved once per invocation
  pub fn settings(&self) -> Settings {
    Settings {
      region: self.region.to_owned(),
      local_config_path: self.local_config.to_owned(),
      bucket: self.s3_bucket.to_owned(),
      color: !self.no_color,
    }
  }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
  /// Clone a saved configuration, optionally changing its platform, and launch a new environment from it
  #[command(name = "clone")]
  Clone(commands::clone::CloneEnvironment),

  /// Upload an application bundle, clone a saved configuration and launch a new environment from it
  Deploy(commands::deploy::Deploy),

  /// Clone a saved configuration, optionally changing its platform
  #[command(name = "config:clone", alias = "cfg:clone")]
  ConfigClone(commands::config::CloneConfiguration),

  /// Describe a saved configuration or the live configuration of an environment
  #[command(name = "config:describe")]
  ConfigDescribe(commands::config::DescribeConfiguration),

  /// Upload an application bundle and register it as an application version
  #[command(name = "app:upload")]
  AppUpload(commands::app::Upload),

  /// Deploy an application version to the current environment (from `eb list`),
  /// uploading the bundle first when a file is given
  #[command(name = "app:deploy")]
  AppDeploy(commands::app::Deploy),
}
