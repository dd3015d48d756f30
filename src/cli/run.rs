use super::ui;
use crate::core::LogicalDate;
use crate::core::config::AppConfig;
use crate::pipeline::{DailyPipelineUnit, RunReport};
use crate::providers::frankfurter::FrankfurterClient;
use crate::store::parquet::ParquetPartitionStore;
use anyhow::Result;

impl RunReport {
    pub fn summary_line(&self) -> String {
        let mut line = format!(
            "{} {} rates for {} -> {}",
            self.rows, self.base_currency, self.date, self.location
        );
        if self.effective_date != self.date {
            line.push_str(&format!(" (effective {})", self.effective_date));
        }
        line
    }
}

/// Runs the pipeline unit once for `date` with the given configuration.
pub async fn execute(config: &AppConfig, date: LogicalDate) -> Result<RunReport> {
    let source = FrankfurterClient::from_config(&config.provider)?;
    let sink = ParquetPartitionStore::new(config.output_root()?);
    let unit = DailyPipelineUnit::new(source, sink);

    Ok(unit.run(date, &config.base_currency).await?)
}

pub async fn run(config: &AppConfig, date: LogicalDate) -> Result<()> {
    let spinner = ui::new_spinner(&format!(
        "Loading {} rates for {date}",
        config.base_currency
    ));

    let result = execute(config, date).await;
    spinner.finish_and_clear();

    match result {
        Ok(report) => {
            println!(
                "{} {}",
                ui::style_text("OK", ui::StyleType::TotalValue),
                report.summary_line()
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {e}", ui::style_text("FAILED", ui::StyleType::Error));
            Err(e)
        }
    }
}
