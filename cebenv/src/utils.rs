use anyhow::Result;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::Error;

/// Runs external commands and hands back their standard output
///
/// Trait wrapper to support testing
#[async_trait]
pub trait CommandRunner: Send + Sync {
  async fn run(&self, program: &str, args: &[&str]) -> Result<String>;
}

/// Executes commands on the host
#[derive(Clone, Copy, Debug, Default)]
pub struct Shell;

#[async_trait]
impl CommandRunner for Shell {
  async fn run(&self, program: &str, args: &[&str]) -> Result<String> {
    let command = command_line(program, args);
    debug!("Executing `{command}`");

    let output = match Command::new(program).args(args).output().await {
      Ok(output) => output,
      Err(e) => {
        return Err(
          Error::Subprocess {
            command,
            stderr: e.to_string(),
          }
          .into(),
        )
      }
    };

    if !output.status.success() {
      return Err(
        Error::Subprocess {
          command,
          stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
        .into(),
      );
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
  }
}

/// Render a program and its arguments the way it would be typed
pub fn command_line(program: &str, args: &[&str]) -> String {
  std::iter::once(program)
    .chain(args.iter().copied())
    .collect::<Vec<&str>>()
    .join(" ")
}
