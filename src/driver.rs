//! Runs the benchmark stages in order.

use anyhow::{Context, Result};
use log::{info, warn};

use crate::config::BenchmarkConfig;
use crate::error::DriverError;
use crate::history::{extract_app_id, MetricsRecord, MetricsSource};
use crate::submit::{self, runner::Launcher};
use crate::tracking::TrackingSession;
use crate::Stage;

/// What a finished run did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunSummary {
    /// Stages submitted, in order.
    pub stages: Vec<Stage>,
    /// YARN application of the sort stage.
    pub app_id: Option<String>,
    /// Metrics reported for the sort stage.
    pub metrics: Option<MetricsRecord>,
}

/// Drives one benchmark run.
pub struct Driver<L, M> {
    config: BenchmarkConfig,
    launcher: L,
    metrics: M,
}

impl<L: Launcher, M: MetricsSource> Driver<L, M> {
    pub fn new(config: BenchmarkConfig, launcher: L, metrics: M) -> Self {
        Self {
            config,
            launcher,
            metrics,
        }
    }

    /// Submit every selected stage. The first failure ends the run.
    pub async fn run(&self) -> Result<RunSummary> {
        let config = &self.config;
        info!(
            "Terasort of {} TiB ({} bytes): {} mappers of {} bytes, {} executors",
            config.total_tb,
            config.total_data_size,
            config.num_mappers,
            config.input_part_size,
            config.num_executors()
        );
        if config.stages.validate_output && !config.stages.sort {
            warn!(
                "Validating without sorting first; {} may hold output of an earlier run",
                submit::OUTPUT_DIR
            );
        }
        let reporting = !config.submit.dry_run;

        let mut summary = RunSummary::default();
        let mut session: Option<TrackingSession> = None;
        for stage in config.stages.enabled() {
            if stage == Stage::Sort && reporting {
                session = Some(TrackingSession::start(&config.metrics.tracking)?);
            }

            let command = submit::build(config, stage);
            let result = self
                .launcher
                .launch(stage, &command)
                .await
                .with_context(|| format!("running the {} stage", stage))?;
            summary.stages.push(stage);

            if let (Stage::Sort, Some(session)) = (stage, session.as_mut()) {
                let app_id = extract_app_id(&result.stderr)
                    .ok_or(DriverError::NoApplicationId { stage })?
                    .to_string();
                info!("Sort ran as {}", app_id);
                let record = self.metrics.collect(&app_id).await?;
                session.log(&record).await?;
                summary.app_id = Some(app_id);
                summary.metrics = Some(record);
            }
        }

        if let Some(session) = session {
            session.finish().await?;
        }
        Ok(summary)
    }
}
