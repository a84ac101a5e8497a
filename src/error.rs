//! Failures that end a benchmark run.
//!
//! Everything is propagated as [`anyhow::Error`]; the variants here exist so
//! the binary can recover the exit code of a failed stage.

use thiserror::Error;

use crate::Stage;

#[derive(Debug, Error)]
pub enum DriverError {
    /// A submission exited unsuccessfully.
    #[error("{stage} stage failed: `{command}` {}", describe_exit(.code))]
    StageFailed {
        stage: Stage,
        command: String,
        code: Option<i32>,
    },

    /// The submission output did not name a YARN application.
    #[error("no application id found in the output of the {stage} stage")]
    NoApplicationId { stage: Stage },

    /// The history server knows the application but reports no attempt.
    #[error("application {app_id} has no attempts on the history server")]
    MissingAttempt { app_id: String },

    #[error("GET {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with code {}", code),
        None => "was terminated by a signal".to_string(),
    }
}

impl DriverError {
    /// Process exit code to report for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            DriverError::StageFailed { code: Some(code), .. } => match u8::try_from(*code) {
                Ok(0) | Err(_) => 1,
                Ok(code) => code,
            },
            _ => 1,
        }
    }
}

/// Exit code for an arbitrary run failure.
///
/// A failed stage propagates the code of the child process; anything else
/// exits with 1.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<DriverError>())
        .map_or(1, DriverError::exit_code)
}
