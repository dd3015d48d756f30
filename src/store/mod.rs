//! Partition sinks

pub mod memory;
pub mod parquet;
