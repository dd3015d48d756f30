//! Flattens a provider quote into canonical rate rows.

use crate::core::{LogicalDate, PipelineError, RateRow, RawQuote};
use tracing::debug;

/// Expands `quote` into one [`RateRow`] per quoted currency.
///
/// Rows carry the quote's own effective date and an upper-case base currency. `requested_date` is only used
/// when the provider omitted one. Rates are kept exactly as received.
pub fn normalize(quote: &RawQuote, requested_date: LogicalDate) -> Result<Vec<RateRow>, PipelineError> {
    let base = quote
        .base
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_ascii_uppercase)
        .ok_or_else(|| {
            PipelineError::MalformedQuote(format!("Quote for {requested_date} has no base currency"))
        })?;

    let rates = quote
        .rates
        .as_ref()
        .filter(|r| !r.is_empty())
        .ok_or_else(|| {
            PipelineError::MalformedQuote(format!("No rate data available for {requested_date}"))
        })?;

    let effective_date = quote.date.unwrap_or(requested_date);

    let rows: Vec<RateRow> = rates
        .iter()
        .map(|(currency, rate)| RateRow {
            effective_date,
            base_currency: base.clone(),
            quote_currency: currency.clone(),
            rate: *rate,
        })
        .collect();

    debug!(
        rows = rows.len(),
        %effective_date,
        %requested_date,
        "Normalized quote"
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn date(y: i32, m: u32, d: u32) -> LogicalDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn quote(base: Option<&str>, effective: Option<LogicalDate>, rates: &[(&str, f64)]) -> RawQuote {
        RawQuote {
            base: base.map(str::to_string),
            date: effective,
            rates: Some(
                rates
                    .iter()
                    .map(|(c, r)| (c.to_string(), *r))
                    .collect::<BTreeMap<_, _>>(),
            ),
        }
    }

    #[test]
    fn test_one_row_per_quote_currency() {
        let raw = quote(
            Some("USD"),
            Some(date(2024, 1, 5)),
            &[("EUR", 0.9134), ("GBP", 0.7862), ("JPY", 144.87)],
        );

        let rows = normalize(&raw, date(2024, 1, 5)).unwrap();

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.base_currency == "USD"));
        assert!(rows.iter().all(|r| r.effective_date == date(2024, 1, 5)));
        assert_eq!(
            rows.iter().map(|r| r.quote_currency.as_str()).collect::<Vec<_>>(),
            vec!["EUR", "GBP", "JPY"]
        );
        assert_eq!(rows[2].rate, 144.87);
    }

    #[test]
    fn test_effective_date_comes_from_quote() {
        // Requested a Sunday, provider served Friday
        let raw = quote(Some("USD"), Some(date(2024, 1, 5)), &[("EUR", 0.9134)]);

        let rows = normalize(&raw, date(2024, 1, 7)).unwrap();
        assert_eq!(rows[0].effective_date, date(2024, 1, 5));
    }

    #[test]
    fn test_missing_effective_date_falls_back_to_requested() {
        let raw = quote(Some("USD"), None, &[("EUR", 0.9134)]);

        let rows = normalize(&raw, date(2024, 1, 7)).unwrap();
        assert_eq!(rows[0].effective_date, date(2024, 1, 7));
    }

    #[test]
    fn test_rates_are_not_rounded() {
        let raw = quote(Some("USD"), None, &[("IDR", 15_512.123_456_789)]);

        let rows = normalize(&raw, date(2024, 1, 5)).unwrap();
        assert_eq!(rows[0].rate, 15_512.123_456_789);
    }

    #[test]
    fn test_base_currency_is_upper_cased() {
        let raw = quote(Some(" usd"), Some(date(2024, 1, 5)), &[("EUR", 0.9134), ("GBP", 0.7862)]);

        let rows = normalize(&raw, date(2024, 1, 5)).unwrap();
        assert!(rows.iter().all(|r| r.base_currency == "USD"));
    }

    #[test]
    fn test_missing_base_is_malformed() {
        let raw = quote(None, Some(date(2024, 1, 5)), &[("EUR", 0.9134)]);
        assert!(matches!(
            normalize(&raw, date(2024, 1, 5)),
            Err(PipelineError::MalformedQuote(_))
        ));

        let raw = quote(Some(" "), Some(date(2024, 1, 5)), &[("EUR", 0.9134)]);
        assert!(matches!(
            normalize(&raw, date(2024, 1, 5)),
            Err(PipelineError::MalformedQuote(_))
        ));
    }

    #[test]
    fn test_empty_or_absent_rates_are_malformed() {
        let raw = quote(Some("USD"), Some(date(2024, 1, 5)), &[]);
        let err = normalize(&raw, date(2024, 1, 5)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Malformed quote: No rate data available for 2024-01-05"
        );

        let raw = RawQuote {
            base: Some("USD".into()),
            date: None,
            rates: None,
        };
        assert!(matches!(
            normalize(&raw, date(2024, 1, 5)),
            Err(PipelineError::MalformedQuote(_))
        ));
    }
}
