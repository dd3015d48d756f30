use crate::core::config::{ProviderConfig, normalize_currency_code};
use crate::core::{LogicalDate, PipelineError, RateSource, RawQuote};
use crate::providers::util::{AttemptError, RetryError, RetryPolicy, with_retry};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Client for a Frankfurter-compatible daily reference rate API.
///
/// The provider answers a request for a non-trading day with the latest prior
/// business day's rates and reports that day in the `date` field. The client
/// passes this through untouched.
pub struct FrankfurterClient {
    base_url: String,
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl FrankfurterClient {
    pub fn new(base_url: &str, timeout: Duration, policy: RetryPolicy) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fxlake/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::SourceError(format!("Failed to build HTTP client: {e}")))?;

        Ok(FrankfurterClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            policy,
        })
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self, PipelineError> {
        Self::new(&config.base_url, config.timeout(), config.retry_policy())
    }

    async fn fetch_once(&self, url: &str, base: &str) -> Result<RawQuote, AttemptError<String>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| {
                let message = format!("Request error: {e}");
                if is_transient_request_error(&e) {
                    AttemptError::Transient(message)
                } else {
                    AttemptError::Permanent(message)
                }
            })?;

        let status = response.status();
        debug!(%status, "Received rate response");

        if !status.is_success() {
            let message = format!("HTTP error: {status} for base currency: {base}");
            return Err(if is_transient_status(status) {
                AttemptError::Transient(message)
            } else {
                AttemptError::Permanent(message)
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| AttemptError::Transient(format!("Failed to read response body: {e}")))?;

        serde_json::from_str::<RawQuote>(&text).map_err(|e| {
            AttemptError::Permanent(format!("Failed to parse JSON response for {base}: {e}"))
        })
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Network faults only. A URL that fails to build or a redirect loop will
/// fail the same way on every attempt.
fn is_transient_request_error(error: &reqwest::Error) -> bool {
    !error.is_builder() && !error.is_redirect()
}

#[async_trait]
impl RateSource for FrankfurterClient {
    #[instrument(skip_all, fields(base_currency = %base_currency, date = %date))]
    async fn fetch(
        &self,
        base_currency: &str,
        date: LogicalDate,
    ) -> Result<RawQuote, PipelineError> {
        let base = normalize_currency_code(base_currency)?;
        let url = format!("{}/{}?base={}", self.base_url, date.format("%Y-%m-%d"), base);
        debug!("Requesting rates from {}", url);

        let quote = with_retry(|| self.fetch_once(&url, &base), &self.policy)
            .await
            .map_err(|e| match e {
                RetryError::Exhausted { attempts, last } => PipelineError::SourceUnavailable {
                    attempts,
                    message: last,
                },
                RetryError::Permanent { error, .. } => PipelineError::SourceError(error),
            })?;

        if let Some(returned) = quote.base.as_deref() {
            if !returned.eq_ignore_ascii_case(&base) {
                return Err(PipelineError::SourceError(format!(
                    "Requested base currency {base} but provider returned {returned}"
                )));
            }
        }

        match quote.date {
            Some(effective) if effective != date => info!(
                %effective,
                "Provider served rates from an earlier business day"
            ),
            _ => debug!("Provider served rates for the requested date"),
        }

        Ok(quote)
    }
}
