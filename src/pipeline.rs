//! Per-day extract, transform and load unit.
//!
//! [`DailyPipelineUnit::run`] is the only entry point a scheduler needs. It
//! keeps no state between calls, so running it again for the same date and
//! base currency rewrites the same partition with the same content.

use crate::core::error::RunState;
use crate::core::{LogicalDate, PartitionKey, PartitionSink, PipelineError, RateSource, RunFailure};
use crate::normalize::normalize;
use tracing::{error, info, instrument};

/// Summary of a successful execution.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub date: LogicalDate,
    pub base_currency: String,
    /// Date the provider actually quoted. Earlier than `date` on non-trading
    /// days.
    pub effective_date: LogicalDate,
    pub rows: usize,
    pub location: String,
}

pub struct DailyPipelineUnit<S, W>
where
    S: RateSource,
    W: PartitionSink,
{
    source: S,
    sink: W,
}

impl<S, W> DailyPipelineUnit<S, W>
where
    S: RateSource,
    W: PartitionSink,
{
    pub fn new(source: S, sink: W) -> Self {
        Self { source, sink }
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    #[instrument(skip_all, fields(base_currency = %base_currency, date = %date))]
    pub async fn run(
        &self,
        date: LogicalDate,
        base_currency: &str,
    ) -> Result<RunReport, RunFailure> {
        let base_currency = base_currency.trim().to_ascii_uppercase();
        let fail = |stage: RunState, error: PipelineError| {
            error!(%stage, state = %RunState::Failed, "Pipeline failed: {error}");
            RunFailure {
                date,
                base_currency: base_currency.clone(),
                stage,
                error,
            }
        };

        info!(state = %RunState::Pending, "Starting pipeline run");

        info!(state = %RunState::Extracting, "Fetching rates");
        let quote = self
            .source
            .fetch(&base_currency, date)
            .await
            .map_err(|e| fail(RunState::Extracting, e))?;

        info!(state = %RunState::Transforming, "Normalizing quote");
        let rows = normalize(&quote, date).map_err(|e| fail(RunState::Transforming, e))?;
        // Rows are non-empty past normalization
        let effective_date = rows.first().map_or(date, |r| r.effective_date);

        info!(state = %RunState::Loading, rows = rows.len(), "Replacing partition");
        let key = PartitionKey::new(&base_currency, date);
        let location = self
            .sink
            .write(&key, &rows)
            .await
            .map_err(|e| fail(RunState::Loading, e))?;

        info!(
            state = %RunState::Succeeded,
            %effective_date,
            rows = rows.len(),
            "Pipeline run complete"
        );
        Ok(RunReport {
            date,
            base_currency,
            effective_date,
            rows: rows.len(),
            location,
        })
    }
}
