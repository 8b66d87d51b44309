use std::process;

use anyhow::Result;
use cebenv::{Cli, Commands};
use clap::Parser;
use tracing_log::AsTrace;
use tracing_subscriber::FmtSubscriber;

#[cfg(not(tarpaulin_include))]
#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  let subscriber = FmtSubscriber::builder()
    .with_max_level(cli.verbose.log_level_filter().as_trace())
    .with_writer(std::io::stderr)
    .without_time()
    .with_ansi(!cli.no_color)
    .finish();
  tracing::subscriber::set_global_default(subscriber).expect("Setting default subscriber failed");

  let settings = cli.settings();
  let result = match &cli.command {
    Commands::Clone(clone) => clone.exec(&settings).await,
    Commands::Deploy(deploy) => deploy.exec(&settings).await,
    Commands::ConfigClone(clone) => clone.exec(&settings).await,
    Commands::ConfigDescribe(describe) => describe.exec(&settings).await,
    Commands::AppUpload(upload) => upload.exec(&settings).await,
    Commands::AppDeploy(deploy) => deploy.exec(&settings).await,
  };

  match result {
    Ok(_) => Ok(()),
    Err(err) => {
      eprintln!("{err:#}");
      process::exit(2);
    }
  }
}
