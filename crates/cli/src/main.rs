use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use forecast_core::{AppConfig, ConfigLoader};

mod commands;
mod sources;

use commands::{
    ExportCsvArgs, HistoricalArgs, RecentArgs, RecordArgs, ReportArgs, ResolveArgs,
    ResolvePendingArgs,
};

#[derive(Parser)]
#[command(name = "forecast")]
#[command(
    about = "Track prediction-market forecasts and score them against outcomes",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
struct GlobalArgs {
    /// Config file path (defaults to config/Config.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Profile overlay, loads config/Config.<profile>.toml on top of the base file
    #[arg(long, global = true)]
    profile: Option<String>,
}

impl GlobalArgs {
    fn load_config(&self) -> Result<AppConfig> {
        match (&self.config, &self.profile) {
            (Some(path), _) => ConfigLoader::load_from(path),
            (None, Some(profile)) => ConfigLoader::load_with_profile(profile),
            (None, None) => ConfigLoader::load(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print accuracy, calibration, and scoring metrics for resolved predictions
    Report(ReportArgs),
    /// Record analyzer opportunities from a JSON file as pending predictions
    Record(RecordArgs),
    /// Manually resolve the pending prediction for a market
    Resolve(ResolveArgs),
    /// Resolve pending predictions whose markets have settled
    ResolvePending(ResolvePendingArgs),
    /// Replay the analyzer over closed markets and score the results
    Historical(HistoricalArgs),
    /// Export every prediction to CSV
    ExportCsv(ExportCsvArgs),
    /// Recompute every derived score from the stored inputs
    Rescore,
    /// List predictions made in the last N days
    Recent(RecentArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = cli.global.load_config()?;

    match cli.command {
        Commands::Report(args) => commands::run_report(&config, args),
        Commands::Record(args) => commands::run_record(&config, args),
        Commands::Resolve(args) => commands::run_resolve(&config, args),
        Commands::ResolvePending(args) => commands::run_resolve_pending(&config, args).await,
        Commands::Historical(args) => commands::run_historical(&config, args).await,
        Commands::ExportCsv(args) => commands::run_export_csv(&config, args),
        Commands::Rescore => commands::run_rescore(&config),
        Commands::Recent(args) => commands::run_recent(&config, args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_accepted_after_subcommand() {
        let cli = Cli::try_parse_from([
            "forecast",
            "report",
            "--model-version",
            "v2",
            "--profile",
            "staging",
        ])
        .unwrap();

        assert_eq!(cli.global.profile.as_deref(), Some("staging"));
        assert!(matches!(cli.command, Commands::Report(_)));
    }

    #[test]
    fn resolve_requires_market_and_outcome() {
        assert!(Cli::try_parse_from(["forecast", "resolve", "--market-id", "0x1"]).is_err());
        assert!(Cli::try_parse_from([
            "forecast",
            "resolve",
            "--market-id",
            "0x1",
            "--outcome",
            "yes"
        ])
        .is_ok());
    }
}
