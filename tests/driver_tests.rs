use std::cell::{Cell, RefCell};
use std::path::PathBuf;

use anyhow::Result;
use sparksort::config::{
    BenchmarkConfig, MetricsSettings, StageSelection, SubmitSettings, TrackingTarget,
    DEFAULT_HISTORY_SERVER,
};
use sparksort::driver::Driver;
use sparksort::error::{exit_code, DriverError};
use sparksort::history::{MetricsRecord, MetricsSource};
use sparksort::submit::runner::{JobResult, Launcher};
use sparksort::submit::SubmissionCommand;
use sparksort::Stage;

const APP_ID: &str = "application_1699999999_0001";

/// Pretends to be `spark-submit`, failing the stages it is told to.
#[derive(Default)]
struct FakeCluster {
    fail: Option<(Stage, i32)>,
    submitted: RefCell<Vec<(Stage, SubmissionCommand)>>,
}

impl FakeCluster {
    fn failing(stage: Stage, code: i32) -> Self {
        Self {
            fail: Some((stage, code)),
            ..Self::default()
        }
    }

    fn stages(&self) -> Vec<Stage> {
        self.submitted.borrow().iter().map(|(s, _)| *s).collect()
    }
}

impl Launcher for FakeCluster {
    async fn launch(&self, stage: Stage, command: &SubmissionCommand) -> Result<JobResult> {
        self.submitted.borrow_mut().push((stage, command.clone()));
        if let Some((failing, code)) = self.fail {
            if failing == stage {
                return Err(DriverError::StageFailed {
                    stage,
                    command: command.to_string(),
                    code: Some(code),
                }
                .into());
            }
        }
        Ok(JobResult {
            code: Some(0),
            stdout: String::new(),
            stderr: format!("INFO YarnClientImpl: Submitted application {}\n", APP_ID),
        })
    }
}

#[derive(Default)]
struct FakeHistory {
    calls: Cell<usize>,
}

impl MetricsSource for FakeHistory {
    async fn collect(&self, app_id: &str) -> Result<MetricsRecord> {
        assert_eq!(app_id, APP_ID);
        self.calls.set(self.calls.get() + 1);
        Ok(MetricsRecord {
            duration: 42.0,
            memory_bytes_spilled: 30,
            disk_bytes_spilled: 5,
            shuffle_read_bytes: 1_000,
            shuffle_write_bytes: 1_000,
        })
    }
}

fn config(stages: StageSelection, push: bool, tracking: TrackingTarget) -> BenchmarkConfig {
    BenchmarkConfig::new(
        1.0,
        2_500_000_000,
        8,
        8,
        false,
        push,
        stages,
        SubmitSettings {
            spark_submit: "spark-submit".to_string(),
            jar: PathBuf::from("terasort.jar"),
            log_dir: None,
            dry_run: false,
        },
        MetricsSettings {
            history_server: DEFAULT_HISTORY_SERVER.to_string(),
            tracking,
        },
    )
    .unwrap()
}

#[tokio::test]
async fn full_run_reports_sort_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let metrics_file = dir.path().join("metrics.jsonl");
    let cluster = FakeCluster::default();
    let history = FakeHistory::default();
    let config = config(
        StageSelection::resolve(false, false, false),
        false,
        TrackingTarget::File(metrics_file.clone()),
    );

    let driver = Driver::new(config, &cluster, &history);
    let summary = driver.run().await.unwrap();

    assert_eq!(cluster.stages(), Stage::ALL.to_vec());
    assert_eq!(summary.stages, Stage::ALL.to_vec());
    assert_eq!(summary.app_id.as_deref(), Some(APP_ID));
    assert_eq!(history.calls.get(), 1);

    let lines: Vec<serde_json::Value> = std::fs::read_to_string(&metrics_file)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["project"], "spark");
    assert_eq!(lines[0]["entity"], "raysort");
    assert_eq!(lines[0]["metrics"]["duration"], 42.0);
    assert_eq!(lines[0]["metrics"]["memory_bytes_spilled"], 30);
}

#[tokio::test]
async fn failed_sort_skips_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let metrics_file = dir.path().join("metrics.jsonl");
    let cluster = FakeCluster::failing(Stage::Sort, 7);
    let history = FakeHistory::default();
    let config = config(
        StageSelection::all(),
        false,
        TrackingTarget::File(metrics_file.clone()),
    );

    let err = Driver::new(config, &cluster, &history).run().await.unwrap_err();

    assert_eq!(exit_code(&err), 7);
    assert_eq!(history.calls.get(), 0);
    assert_eq!(cluster.stages(), vec![Stage::GenerateInput, Stage::Sort]);
    assert!(!metrics_file.exists());
}

#[tokio::test]
async fn failed_generate_stops_the_run() {
    let cluster = FakeCluster::failing(Stage::GenerateInput, 1);
    let history = FakeHistory::default();
    let config = config(StageSelection::all(), false, TrackingTarget::Log);

    let err = Driver::new(config, &cluster, &history).run().await.unwrap_err();

    assert_eq!(exit_code(&err), 1);
    assert_eq!(cluster.stages(), vec![Stage::GenerateInput]);
    assert_eq!(history.calls.get(), 0);
}

#[tokio::test]
async fn single_stage_runs_alone() {
    let cluster = FakeCluster::default();
    let history = FakeHistory::default();
    let config = config(StageSelection::resolve(false, false, true), false, TrackingTarget::Log);

    let summary = Driver::new(config, &cluster, &history).run().await.unwrap();

    assert_eq!(summary.stages, vec![Stage::ValidateOutput]);
    assert_eq!(summary.metrics, None);
    assert_eq!(history.calls.get(), 0);
}

#[tokio::test]
async fn push_shuffle_reaches_every_submission() {
    let cluster = FakeCluster::default();
    let history = FakeHistory::default();
    let config = config(StageSelection::all(), true, TrackingTarget::Log);

    Driver::new(config, &cluster, &history).run().await.unwrap();

    let submitted = cluster.submitted.borrow();
    assert_eq!(submitted.len(), 3);
    for (stage, command) in submitted.iter() {
        assert!(command.contains("spark.shuffle.service.enabled=true"), "{}", stage);
        assert!(command.contains("spark.shuffle.push.enabled=true"), "{}", stage);
        assert!(command.contains("64"), "{}", stage);
    }
}
