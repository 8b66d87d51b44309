use std::path::PathBuf;

use thiserror::Error;

/// Failures that callers may want to tell apart
///
/// Workflows return these wrapped in `anyhow::Error`; use `downcast_ref::<Error>()` to match on them
#[derive(Debug, Error)]
pub enum Error {
  /// The configuration template name is malformed
  #[error(
    "Invalid configuration name '{0}'. Only alphanumeric characters, hyphens (-) and underscores (_) are permitted \
     and the name must be shorter than 100 characters"
  )]
  InvalidName(String),

  /// A configuration template with the requested name already exists
  #[error("The configuration name '{0}' is already used")]
  NameConflict(String),

  /// The saved configuration or environment does not exist
  #[error("{kind} '{name}' not found")]
  NotFound { kind: &'static str, name: String },

  /// An external command could not be spawned or exited with a failure
  #[error("Command `{command}` failed: {stderr}")]
  Subprocess { command: String, stderr: String },

  /// An external command succeeded but printed something unexpected
  #[error("Unexpected output from `{command}`: {output}")]
  SubprocessOutput { command: String, output: String },

  /// A required setting could not be resolved
  #[error("{0}")]
  Configuration(String),

  /// The local application bundle does not exist
  #[error("File not found: {}", .0.display())]
  FileNotFound(PathBuf),

  /// The bundle was uploaded but the application version was not created
  #[error(
    "Failed to create application version '{version_label}'. The bundle was uploaded to s3://{bucket}/{key}; \
     delete it manually if it is no longer needed"
  )]
  Registration {
    version_label: String,
    bucket: String,
    key: String,
  },

  /// The application version label is already registered and skipping was not allowed
  #[error("The application version label '{label}' already exists. {hint}")]
  VersionExists { label: String, hint: &'static str },
}
