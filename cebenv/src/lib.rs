pub mod cli;
pub mod commands;
pub mod config;
pub mod configuration;
pub mod eb;
pub mod environment;
pub mod error;
pub mod prompt;
pub mod s3;
pub mod tag;
pub mod upload;
pub mod utils;

#[cfg(test)]
mod testing;

use std::env;

use anyhow::Result;
use aws_config::{meta::region::RegionProviderChain, BehaviorVersion, SdkConfig};
use aws_types::region::Region;
pub use cli::{Cli, Commands};
pub use error::Error;

/// Max attempts for the AWS clients' standard retry strategy
pub const DEFAULT_RETRIES: u32 = 3;

/// Get the configuration to authn/authz with AWS that will be used across AWS clients
pub async fn get_sdk_config(region: Option<String>) -> Result<SdkConfig> {
  let aws_region = match region {
    Some(region) => Some(Region::new(region)),
    None => env::var("AWS_DEFAULT_REGION").ok().map(Region::new),
  };

  let region_provider = RegionProviderChain::first_try(aws_region).or_default_provider();

  Ok(
    aws_config::defaults(BehaviorVersion::latest())
      .region(region_provider)
      .load()
      .await,
  )
}
