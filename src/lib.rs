pub mod cli;
pub mod core;
pub mod normalize;
pub mod pipeline;
pub mod providers;
pub mod store;

use crate::core::LogicalDate;
use crate::core::config::AppConfig;
use anyhow::Result;
use tracing::debug;

pub enum AppCommand {
    /// Materialize one logical date.
    Run { date: LogicalDate },
    /// Print a stored partition.
    Show { date: LogicalDate },
}

/// Per-invocation settings that take precedence over the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub base_currency: Option<String>,
    pub output_path: Option<String>,
}

pub fn load_config(config_path: Option<&str>, overrides: &Overrides) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    }
    .with_overrides(
        overrides.base_currency.as_deref(),
        overrides.output_path.as_deref(),
    );
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

pub async fn run_command(
    command: AppCommand,
    config_path: Option<&str>,
    overrides: &Overrides,
) -> Result<()> {
    let config = load_config(config_path, overrides)?;

    match command {
        AppCommand::Run { date } => cli::run::run(&config, date).await,
        AppCommand::Show { date } => cli::show::run(&config, date).await,
    }
}
