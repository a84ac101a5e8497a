//! Scrapes job metrics from the Spark history server.
//!
//! After the sort stage finishes, the driver looks up its YARN application
//! on the history server's REST API and folds the per-stage counters into a
//! single [`MetricsRecord`].

use std::sync::OnceLock;

use anyhow::{Context, Result};
use log::info;
use regex::Regex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::DriverError;
use crate::utils::ms_to_secs;

/// What `spark-submit` prints for an application running on YARN.
pub const APP_ID_PATTERN: &str = r"application_\d+_\d+";

/// Find the first YARN application id in `text`.
pub fn extract_app_id(text: &str) -> Option<&str> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(APP_ID_PATTERN).expect("application id pattern is valid"))
        .find(text)
        .map(|m| m.as_str())
}

/////////////////////////////////////////////////////////////////////////////
// Collected metrics
/////////////////////////////////////////////////////////////////////////////

/// Metrics of one sort run, reported as a single flat record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    /// Wall-clock time of the first application attempt, in seconds.
    pub duration: f64,
    pub memory_bytes_spilled: u64,
    pub disk_bytes_spilled: u64,
    pub shuffle_read_bytes: u64,
    pub shuffle_write_bytes: u64,
}

impl MetricsRecord {
    /// Add the counters of one stage.
    pub fn accumulate(&mut self, stage: &StageData) {
        self.memory_bytes_spilled += stage.memory_bytes_spilled;
        self.disk_bytes_spilled += stage.disk_bytes_spilled;
        self.shuffle_read_bytes += stage.shuffle_read_bytes;
        self.shuffle_write_bytes += stage.shuffle_write_bytes;
    }
}

/////////////////////////////////////////////////////////////////////////////
// History server responses
/////////////////////////////////////////////////////////////////////////////

/// `GET /applications/{app_id}`, trimmed to what the driver reads.
#[derive(Clone, Debug, Deserialize)]
pub struct ApplicationInfo {
    #[serde(default)]
    pub attempts: Vec<AttemptInfo>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AttemptInfo {
    /// Milliseconds.
    pub duration: u64,
}

/// One entry of `GET /applications/{app_id}/stages`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StageData {
    pub memory_bytes_spilled: u64,
    pub disk_bytes_spilled: u64,
    pub shuffle_read_bytes: u64,
    pub shuffle_write_bytes: u64,
}

/// Duration of the first attempt of `app`, in seconds.
pub fn attempt_duration(app_id: &str, app: &ApplicationInfo) -> Result<f64, DriverError> {
    app.attempts
        .first()
        .map(|attempt| ms_to_secs(attempt.duration))
        .ok_or_else(|| DriverError::MissingAttempt {
            app_id: app_id.to_string(),
        })
}

/// Combine an application's duration and its stage counters.
pub fn summarize(app_id: &str, app: &ApplicationInfo, stages: &[StageData]) -> Result<MetricsRecord> {
    let mut record = MetricsRecord {
        duration: attempt_duration(app_id, app)?,
        ..MetricsRecord::default()
    };
    for stage in stages {
        record.accumulate(stage);
    }
    Ok(record)
}

/////////////////////////////////////////////////////////////////////////////
// Client
/////////////////////////////////////////////////////////////////////////////

/// Source of metrics for a finished application.
#[allow(async_fn_in_trait)]
pub trait MetricsSource {
    async fn collect(&self, app_id: &str) -> Result<MetricsRecord>;
}

impl<T: MetricsSource + ?Sized> MetricsSource for &T {
    async fn collect(&self, app_id: &str) -> Result<MetricsRecord> {
        (**self).collect(app_id).await
    }
}

/// Client for the history server's `applications` resource.
#[derive(Clone, Debug)]
pub struct HistoryClient {
    base_url: String,
    http_client: Client,
}

impl HistoryClient {
    /// `base_url` points at the `applications` resource, e.g.
    /// `http://localhost:18080/api/v1/applications`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http_client = Client::builder()
            .build()
            .context("building history server client")?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn application_url(&self, app_id: &str) -> String {
        format!("{}/{}", self.base_url, app_id)
    }

    pub fn stages_url(&self, app_id: &str) -> String {
        format!("{}/{}/stages", self.base_url, app_id)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {}", url))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DriverError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }
        let body = response
            .text()
            .await
            .with_context(|| format!("reading response of GET {}", url))?;
        serde_json::from_str(&body).with_context(|| format!("malformed response from GET {}", url))
    }
}

impl MetricsSource for HistoryClient {
    async fn collect(&self, app_id: &str) -> Result<MetricsRecord> {
        info!("Collecting metrics of {} from {}", app_id, self.base_url);
        let app: ApplicationInfo = self.get_json(&self.application_url(app_id)).await?;
        let stages: Vec<StageData> = self.get_json(&self.stages_url(app_id)).await?;
        summarize(app_id, &app, &stages)
    }
}
