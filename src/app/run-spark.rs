use std::process::ExitCode;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use log::error;
use sparksort::cmd::driver::Args;
use sparksort::config::BenchmarkConfig;
use sparksort::driver::{Driver, RunSummary};
use sparksort::error::exit_code;
use sparksort::history::HistoryClient;
use sparksort::submit::runner::{DryRunLauncher, ProcessLauncher};

async fn run(config: BenchmarkConfig) -> Result<RunSummary> {
    let history = HistoryClient::new(config.metrics.history_server.clone())?;
    if config.submit.dry_run {
        Driver::new(config, DryRunLauncher, history).run().await
    } else {
        let launcher = ProcessLauncher::new(config.submit.log_dir.clone());
        Driver::new(config, launcher, history).run().await
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Args::parse().resolve() {
        Ok(config) => config,
        Err(e) => Args::command().error(ErrorKind::ValueValidation, e).exit(),
    };

    match run(config).await {
        Ok(summary) => {
            if let Some(metrics) = summary.metrics {
                println!("{}", serde_json::to_string_pretty(&metrics).unwrap_or_default());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}
