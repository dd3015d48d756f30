use super::ui;
use crate::core::config::{AppConfig, normalize_currency_code};
use crate::core::{LogicalDate, PartitionKey, PartitionSink, RateRow};
use crate::store::parquet::ParquetPartitionStore;
use anyhow::Result;
use comfy_table::{Cell, CellAlignment};

pub fn rows_as_table(rows: &[RateRow]) -> String {
    let mut table = ui::new_styled_table();

    table.set_header(vec![
        ui::header_cell("Effective date"),
        ui::header_cell("Base"),
        ui::header_cell("Quote"),
        ui::header_cell("Rate"),
    ]);

    for row in rows {
        table.add_row(vec![
            Cell::new(row.effective_date.format("%Y-%m-%d")),
            Cell::new(&row.base_currency),
            Cell::new(&row.quote_currency),
            Cell::new(row.rate).set_alignment(CellAlignment::Right),
        ]);
    }

    table.to_string()
}

/// Prints the stored partition for the configured base currency and `date`.
pub async fn run(config: &AppConfig, date: LogicalDate) -> Result<()> {
    let base = normalize_currency_code(&config.base_currency)?;
    let store = ParquetPartitionStore::new(config.output_root()?);
    let key = PartitionKey::new(&base, date);

    match store.read(&key).await? {
        Some(rows) => {
            println!("{}", ui::style_text(&key.to_string(), ui::StyleType::Title));
            println!("{}", rows_as_table(&rows));
            println!(
                "{}",
                ui::style_text(&format!("{} rows", rows.len()), ui::StyleType::Subtle)
            );
        }
        None => println!(
            "{}",
            ui::style_text(&format!("No data stored for {key}"), ui::StyleType::Subtle)
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_rows_as_table() {
        let rows = vec![RateRow {
            effective_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            base_currency: "USD".into(),
            quote_currency: "EUR".into(),
            rate: 0.9134,
        }];

        let table = rows_as_table(&rows);
        assert!(table.contains("Effective date"));
        assert!(table.contains("2024-01-05"));
        assert!(table.contains("EUR"));
        assert!(table.contains("0.9134"));
    }
}
