use crate::core::error::PipelineError;
use crate::providers::util::RetryPolicy;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.frankfurter.app";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> usize {
    5
}

fn default_initial_backoff_ms() -> u64 {
    2_000
}

fn default_max_backoff_ms() -> u64 {
    60_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Upper bound on a single HTTP attempt.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_backoff_ms),
            max_delay: Duration::from_millis(self.max_backoff_ms),
            multiplier: self.backoff_multiplier,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub base_currency: String,
    /// Root of the partitioned output, a path or a `file://` URI.
    pub output_path: String,
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "fxlake", "fxlake")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Applies per-invocation overrides on top of the file values.
    pub fn with_overrides(mut self, base_currency: Option<&str>, output_path: Option<&str>) -> Self {
        if let Some(base) = base_currency {
            self.base_currency = base.to_string();
        }
        if let Some(output) = output_path {
            self.output_path = output.to_string();
        }
        self
    }

    /// Resolves `output_path` to a local directory.
    pub fn output_root(&self) -> Result<PathBuf> {
        resolve_output_root(&self.output_path)
    }
}

/// Upper-cases and validates a three-letter currency code.
pub fn normalize_currency_code(code: &str) -> Result<String, PipelineError> {
    let code = code.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(PipelineError::SourceError(format!(
            "Unsupported currency code: '{code}'"
        )));
    }
    Ok(code.to_ascii_uppercase())
}

fn resolve_output_root(location: &str) -> Result<PathBuf> {
    let location = location.trim();
    if location.is_empty() {
        bail!("Output location is empty");
    }

    match location.split_once("://") {
        None => Ok(PathBuf::from(location)),
        Some(("file", path)) if !path.is_empty() => Ok(PathBuf::from(path)),
        Some((scheme, _)) => bail!("Unsupported output location scheme '{scheme}' in {location}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
base_currency: "USD"
output_path: "/data/lake/fx"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.base_currency, "USD");
        assert_eq!(config.output_path, "/data/lake/fx");
        assert_eq!(config.provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.provider.max_attempts, 5);
        assert_eq!(config.provider.timeout(), Duration::from_secs(30));

        let yaml_str_with_provider = r#"
base_currency: "EUR"
output_path: "file:///tmp/fx"
provider:
  base_url: "http://example.com/rates"
  timeout_secs: 5
  initial_backoff_ms: 10
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str_with_provider).unwrap();
        assert_eq!(config.provider.base_url, "http://example.com/rates");
        assert_eq!(config.provider.timeout_secs, 5);
        assert_eq!(config.provider.initial_backoff_ms, 10);
        // Unspecified keys keep their defaults
        assert_eq!(config.provider.max_backoff_ms, 60_000);
        assert_eq!(config.provider.backoff_multiplier, 2.0);
        assert_eq!(config.output_root().unwrap(), PathBuf::from("/tmp/fx"));
    }

    #[test]
    fn test_missing_required_key_fails() {
        let result: Result<AppConfig, _> = serde_yaml::from_str("base_currency: USD\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let config = AppConfig {
            base_currency: "USD".into(),
            output_path: "/a".into(),
            provider: ProviderConfig::default(),
        }
        .with_overrides(Some("gbp"), None);

        assert_eq!(config.base_currency, "gbp");
        assert_eq!(config.output_path, "/a");
    }

    #[test]
    fn test_output_root_resolution() {
        assert_eq!(
            resolve_output_root("relative/lake").unwrap(),
            PathBuf::from("relative/lake")
        );
        assert_eq!(
            resolve_output_root("file:///srv/lake").unwrap(),
            PathBuf::from("/srv/lake")
        );

        let err = resolve_output_root("gs://bucket/lake").unwrap_err();
        assert!(err.to_string().contains("Unsupported output location scheme 'gs'"));
        assert!(resolve_output_root("  ").is_err());
    }

    #[test]
    fn test_normalize_currency_code() {
        assert_eq!(normalize_currency_code("usd").unwrap(), "USD");
        assert_eq!(normalize_currency_code(" EUR ").unwrap(), "EUR");
        assert!(matches!(
            normalize_currency_code("US"),
            Err(PipelineError::SourceError(_))
        ));
        assert!(normalize_currency_code("U1D").is_err());
    }
}
