//! Core domain types and abstractions

pub mod config;
pub mod error;
pub mod log;
pub mod rates;

// Re-export main types for cleaner imports
pub use error::{PipelineError, RunFailure};
pub use rates::{LogicalDate, PartitionKey, PartitionSink, RateRow, RateSource, RawQuote};
