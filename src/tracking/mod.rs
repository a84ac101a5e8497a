//! Forwards benchmark metrics to the experiment tracker.
//!
//! Reporting happens through a [`TrackingSession`], opened before the sort
//! stage and finished once the run is over. Every record of a session is
//! filed under the same project, entity and run id.

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{info, warn};
use reqwest::Client;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::config::TrackingTarget;
use crate::error::DriverError;
use crate::history::MetricsRecord;

/// Tracker project every run is filed under.
pub const PROJECT: &str = "spark";
/// Tracker entity (team) owning the project.
pub const ENTITY: &str = "raysort";

/// One record as the tracker receives it.
#[derive(Debug, Serialize)]
pub struct TrackingEntry<'a> {
    pub project: &'a str,
    pub entity: &'a str,
    pub run_id: &'a str,
    pub metrics: &'a MetricsRecord,
}

enum Sink {
    Http { client: Client, url: String },
    File(PathBuf),
    Log,
}

/// An open reporting session.
///
/// Call [`finish`](TrackingSession::finish) when the run is over. A session
/// dropped without finishing logs a warning.
pub struct TrackingSession {
    run_id: String,
    sink: Sink,
    logged: usize,
    finished: bool,
}

impl TrackingSession {
    /// Open a session writing to `target`.
    pub fn start(target: &TrackingTarget) -> Result<Self> {
        let sink = match target {
            TrackingTarget::Http(url) => Sink::Http {
                client: Client::builder()
                    .build()
                    .context("building tracking client")?,
                url: url.clone(),
            },
            TrackingTarget::File(path) => Sink::File(path.clone()),
            TrackingTarget::Log => Sink::Log,
        };
        let run_id = Uuid::new_v4().to_string();
        info!("Tracking run {} under {}/{}", run_id, ENTITY, PROJECT);
        Ok(Self {
            run_id,
            sink,
            logged: 0,
            finished: false,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Send one record. Blocks until the tracker has accepted it.
    pub async fn log(&mut self, metrics: &MetricsRecord) -> Result<()> {
        let entry = TrackingEntry {
            project: PROJECT,
            entity: ENTITY,
            run_id: &self.run_id,
            metrics,
        };
        match &self.sink {
            Sink::Http { client, url } => {
                let response = client
                    .post(url)
                    .json(&entry)
                    .send()
                    .await
                    .with_context(|| format!("POST {}", url))?;
                let status = response.status();
                if !status.is_success() {
                    return Err(DriverError::HttpStatus {
                        url: url.clone(),
                        status: status.as_u16(),
                    }
                    .into());
                }
            }
            Sink::File(path) => {
                let mut line = serde_json::to_string(&entry)?;
                line.push('\n');
                let mut file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .await
                    .with_context(|| format!("opening {}", path.display()))?;
                file.write_all(line.as_bytes()).await?;
                file.flush().await?;
            }
            Sink::Log => info!("{}", serde_json::to_string(&entry)?),
        }
        self.logged += 1;
        Ok(())
    }

    /// Close the session.
    pub async fn finish(mut self) -> Result<()> {
        self.finished = true;
        info!("Tracking run {} finished with {} record(s)", self.run_id, self.logged);
        Ok(())
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        if !self.finished {
            warn!(
                "Tracking run {} ended without finishing ({} record(s) sent)",
                self.run_id, self.logged
            );
        }
    }
}
