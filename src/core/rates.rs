//! Rate data model and the seams between pipeline stages

use crate::core::error::PipelineError;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::PathBuf;

/// Calendar day a pipeline execution is responsible for.
pub type LogicalDate = NaiveDate;

/// Unmodified provider response for one requested date.
///
/// Fields are optional because the normalizer, not the client, owns the
/// structural validation of a quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawQuote {
    #[serde(default)]
    pub base: Option<String>,
    /// Date the rates actually belong to. Lags the requested date on
    /// non-trading days.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub rates: Option<BTreeMap<String, f64>>,
}

/// Canonical output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRow {
    pub effective_date: NaiveDate,
    pub base_currency: String,
    pub quote_currency: String,
    pub rate: f64,
}

/// Storage key of a partition: base currency first, then requested date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionKey {
    pub base_currency: String,
    pub date: LogicalDate,
}

impl PartitionKey {
    pub fn new(base_currency: &str, date: LogicalDate) -> Self {
        Self {
            base_currency: base_currency.to_string(),
            date,
        }
    }

    /// Hive-style relative location, e.g. `base_currency=USD/date=2024-01-07`.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(format!("base_currency={}", self.base_currency))
            .join(format!("date={}", self.date.format("%Y-%m-%d")))
    }
}

impl Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "base_currency={}/date={}",
            self.base_currency,
            self.date.format("%Y-%m-%d")
        )
    }
}

#[async_trait]
pub trait RateSource: Send + Sync {
    /// Fetches the quote the provider serves for `date`.
    ///
    /// Fails with [`PipelineError::SourceUnavailable`] once transient failures
    /// exhaust the retry budget, or [`PipelineError::SourceError`] on a
    /// rejection that retrying cannot fix.
    async fn fetch(
        &self,
        base_currency: &str,
        date: LogicalDate,
    ) -> Result<RawQuote, PipelineError>;
}

#[async_trait]
pub trait PartitionSink: Send + Sync {
    /// Replaces the whole content of `key` with `rows`. Returns the location
    /// written to.
    async fn write(&self, key: &PartitionKey, rows: &[RateRow]) -> Result<String, PipelineError>;

    /// Reads back a partition, or `None` if nothing was ever written for `key`.
    async fn read(&self, key: &PartitionKey) -> anyhow::Result<Option<Vec<RateRow>>>;
}
