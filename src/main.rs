use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxlake::core::LogicalDate;
use fxlake::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Base currency, overrides the configuration file
    #[arg(short, long, global = true)]
    base: Option<String>,

    /// Output root (path or file:// URI), overrides the configuration file
    #[arg(short, long, global = true)]
    output: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch, normalize and store the rates of one logical date
    Run {
        /// Logical date, YYYY-MM-DD
        #[arg(short, long)]
        date: LogicalDate,
    },
    /// Display the stored partition of one logical date
    Show {
        /// Logical date, YYYY-MM-DD
        #[arg(short, long)]
        date: LogicalDate,
    },
}

impl From<Commands> for fxlake::AppCommand {
    fn from(cmd: Commands) -> fxlake::AppCommand {
        match cmd {
            Commands::Run { date } => fxlake::AppCommand::Run { date },
            Commands::Show { date } => fxlake::AppCommand::Show { date },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let overrides = fxlake::Overrides {
        base_currency: cli.base,
        output_path: cli.output,
    };

    let result = match cli.command {
        Some(Commands::Setup) => fxlake::cli::setup::setup(),
        Some(cmd) => {
            fxlake::run_command(cmd.into(), cli.config_path.as_deref(), &overrides).await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %format!("{e:#}"), "Application failed");
    }
    result
}
