use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Name of the tag every command attaches to the resources it creates
pub const PRODUCT_TAG: &str = "Product";

/// Resource tags in the order they were supplied
pub type Tags = IndexMap<String, String>;

/// A single key/value tag as accepted by the Elastic Beanstalk API
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
  pub key: String,
  pub value: String,
}

/// Build the `Product` tag set
pub fn product_tags(product: &str) -> Tags {
  let mut tags = Tags::new();
  tags.insert(PRODUCT_TAG.to_string(), product.to_string());
  tags
}

/// Convert tags into the list form used by `CreateApplicationVersion` and `CreateEnvironment`
pub fn to_tag_list(tags: &Tags) -> Vec<Tag> {
  tags
    .iter()
    .map(|(key, value)| Tag {
      key: key.to_owned(),
      value: value.to_owned(),
    })
    .collect()
}

/// Convert tags into the query string form used by the S3 `Tagging` header
///
/// https://docs.aws.amazon.com/elasticbeanstalk/latest/dg/environment-configuration-savedconfig-tagging.html
pub fn to_tag_query(tags: &Tags) -> String {
  tags
    .iter()
    .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
    .collect::<Vec<String>>()
    .join(",")
}
