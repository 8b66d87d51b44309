use anyhow::Result;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::{
  config::{self, retry::RetryConfig},
  primitives::ByteStream,
  Client,
};

/// Object storage used for application source bundles
///
/// Trait wrapper to support testing
#[async_trait]
pub trait ObjectStore: Send + Sync {
  /// Store `body` under `bucket`/`key`, with an optional URL encoded `Tagging` query
  async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>, tagging: Option<String>) -> Result<()>;
}

/// Amazon S3 backed by the AWS SDK
#[derive(Clone, Debug)]
pub struct S3 {
  client: Client,
}

impl S3 {
  pub fn new(config: &SdkConfig, retries: u32) -> Self {
    let client = Client::from_conf(
      config::Builder::from(config)
        .retry_config(RetryConfig::standard().with_max_attempts(retries))
        .build(),
    );

    Self { client }
  }
}

#[async_trait]
impl ObjectStore for S3 {
  async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>, tagging: Option<String>) -> Result<()> {
    self
      .client
      .put_object()
      .bucket(bucket)
      .key(key)
      .body(ByteStream::from(body))
      .set_tagging(tagging)
      .send()
      .await?;

    Ok(())
  }
}
