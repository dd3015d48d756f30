//! Parquet partition store on a local filesystem
//!
//! Partitions follow the Hive layout
//! `<root>/base_currency=<CODE>/date=<YYYY-MM-DD>/data.parquet`. A write goes
//! to a temporary file under `<root>/.staging/` and is renamed over the data
//! file once it is complete and synced, so a partition is always either the
//! previous file or the new one.

use crate::core::{PartitionKey, PartitionSink, PipelineError, RateRow};
use anyhow::{Context, Result};
use arrow::array::{Array, ArrayRef, Date32Array, Float64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Date32Type, Field, Schema};
use arrow::temporal_conversions::date32_to_datetime;
use async_trait::async_trait;
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub const DATA_FILE: &str = "data.parquet";
pub const STAGING_DIR: &str = ".staging";

pub struct ParquetPartitionStore {
    root: PathBuf,
}

impl ParquetPartitionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_file(&self, key: &PartitionKey) -> PathBuf {
        self.root.join(key.relative_path()).join(DATA_FILE)
    }
}

fn rate_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("effective_date", DataType::Date32, false),
        Field::new("base_currency", DataType::Utf8, false),
        Field::new("quote_currency", DataType::Utf8, false),
        Field::new("rate", DataType::Float64, false),
    ]))
}

fn from_epoch_days(days: i32) -> Result<NaiveDate> {
    date32_to_datetime(days)
        .map(|dt| dt.date())
        .with_context(|| format!("Date out of range: {days} days since epoch"))
}

fn to_record_batch(rows: &[RateRow]) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Date32Array::from(
            rows.iter()
                .map(|r| Date32Type::from_naive_date(r.effective_date))
                .collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            rows.iter()
                .map(|r| r.base_currency.as_str())
                .collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            rows.iter()
                .map(|r| r.quote_currency.as_str())
                .collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            rows.iter().map(|r| r.rate).collect::<Vec<_>>(),
        )),
    ];

    RecordBatch::try_new(rate_schema(), columns).context("Failed to create record batch")
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .with_context(|| format!("Missing column: {name}"))?
        .as_any()
        .downcast_ref::<T>()
        .with_context(|| format!("Unexpected type for column: {name}"))
}

fn from_record_batch(batch: &RecordBatch) -> Result<Vec<RateRow>> {
    let dates = column::<Date32Array>(batch, "effective_date")?;
    let bases = column::<StringArray>(batch, "base_currency")?;
    let quotes = column::<StringArray>(batch, "quote_currency")?;
    let rates = column::<Float64Array>(batch, "rate")?;

    (0..batch.num_rows())
        .map(|i| {
            Ok(RateRow {
                effective_date: from_epoch_days(dates.value(i))?,
                base_currency: bases.value(i).to_string(),
                quote_currency: quotes.value(i).to_string(),
                rate: rates.value(i),
            })
        })
        .collect()
}

/// Replaces the partition file for `key` with `rows`.
fn replace_partition(root: &Path, key: &PartitionKey, rows: &[RateRow]) -> Result<PathBuf> {
    let batch = to_record_batch(rows)?;

    let staging_dir = root.join(STAGING_DIR);
    fs::create_dir_all(&staging_dir)
        .with_context(|| format!("Failed to create directory: {}", staging_dir.display()))?;

    // Removed on drop unless persisted
    let mut staged = tempfile::Builder::new()
        .prefix(&format!("{}-{}-", key.base_currency, key.date))
        .suffix(".parquet.tmp")
        .tempfile_in(&staging_dir)
        .with_context(|| format!("Failed to create staging file in {}", staging_dir.display()))?;
    debug!("Staging partition {} at {}", key, staged.path().display());

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(staged.as_file_mut(), batch.schema(), Some(props))
        .context("Failed to create ArrowWriter")?;
    writer.write(&batch).context("Failed to write batch to parquet")?;
    writer.close().context("Failed to close writer")?;
    staged
        .as_file()
        .sync_all()
        .context("Failed to sync staging file")?;

    // Only created once there is a complete file to move into it
    let partition_dir = root.join(key.relative_path());
    fs::create_dir_all(&partition_dir)
        .with_context(|| format!("Failed to create directory: {}", partition_dir.display()))?;
    let target = partition_dir.join(DATA_FILE);
    staged
        .persist(&target)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to move staging file to {}", target.display()))?;

    Ok(target)
}

fn read_partition(path: &Path) -> Result<Option<Vec<RateRow>>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to open {}", path.display()));
        }
    };

    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("Failed to read parquet metadata: {}", path.display()))?
        .build()
        .context("Failed to build parquet reader")?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch.context("Failed to read record batch")?;
        rows.extend(from_record_batch(&batch)?);
    }
    Ok(Some(rows))
}

#[async_trait]
impl PartitionSink for ParquetPartitionStore {
    async fn write(&self, key: &PartitionKey, rows: &[RateRow]) -> Result<String, PipelineError> {
        let root = self.root.clone();
        let owned_key = key.clone();
        let owned_rows = rows.to_vec();

        let target = tokio::task::spawn_blocking(move || {
            replace_partition(&root, &owned_key, &owned_rows)
        })
        .await
        .map_err(anyhow::Error::from)
        .and_then(|result| result)
        .map_err(|source| PipelineError::WriteFailure {
            partition: key.to_string(),
            source,
        })?;

        info!("Wrote {} rows to {}", rows.len(), target.display());
        Ok(target.display().to_string())
    }

    async fn read(&self, key: &PartitionKey) -> Result<Option<Vec<RateRow>>> {
        let path = self.data_file(key);
        tokio::task::spawn_blocking(move || read_partition(&path)).await?
    }
}
