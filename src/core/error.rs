//! Error taxonomy for a single pipeline execution.

use crate::core::rates::LogicalDate;
use std::fmt::Display;
use thiserror::Error;

/// Failures that end a pipeline execution.
///
/// Every variant is terminal for the current execution. Whether a fresh
/// execution (driven by the scheduler) may succeed is reported by
/// [`is_retryable`](Self::is_retryable).
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Transient upstream failures exhausted the in-client retry budget.
    #[error("Rate source unavailable after {attempts} attempts: {message}")]
    SourceUnavailable { attempts: usize, message: String },

    /// The upstream rejected the request or returned an unusable payload.
    #[error("Rate source error: {0}")]
    SourceError(String),

    /// The quote handed to the normalizer is structurally invalid.
    #[error("Malformed quote: {0}")]
    MalformedQuote(String),

    /// The sink failed while replacing a partition.
    #[error("Failed to write partition {partition}: {source:#}")]
    WriteFailure {
        partition: String,
        #[source]
        source: anyhow::Error,
    },
}

impl PipelineError {
    /// Returns true if re-running the whole unit later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::SourceUnavailable { .. } | PipelineError::WriteFailure { .. }
        )
    }
}

/// Stage of a [`DailyPipelineUnit`](crate::pipeline::DailyPipelineUnit) execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Pending,
    Extracting,
    Transforming,
    Loading,
    Succeeded,
    Failed,
}

impl Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RunState::Pending => "pending",
                RunState::Extracting => "extract",
                RunState::Transforming => "transform",
                RunState::Loading => "load",
                RunState::Succeeded => "succeeded",
                RunState::Failed => "failed",
            }
        )
    }
}

/// A failed execution: which stage broke, for which partition, and why.
#[derive(Error, Debug)]
#[error("{stage} stage failed for base_currency={base_currency} date={date}: {error}")]
pub struct RunFailure {
    pub date: LogicalDate,
    pub base_currency: String,
    pub stage: RunState,
    #[source]
    pub error: PipelineError,
}
