//! CLI commands for prediction tracking.

use anyhow::{anyhow, Result};

pub mod export_csv;
pub mod historical;
pub mod recent;
pub mod record;
pub mod report;
pub mod rescore;
pub mod resolve;

pub use export_csv::{run_export_csv, ExportCsvArgs};
pub use historical::{run_historical, HistoricalArgs};
pub use recent::{run_recent, RecentArgs};
pub use record::{run_record, RecordArgs};
pub use report::{run_report, ReportArgs};
pub use rescore::run_rescore;
pub use resolve::{run_resolve, run_resolve_pending, ResolveArgs, ResolvePendingArgs};

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// Parses an output format from string.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!(
                "Unknown format: '{}'. Valid formats: text, json",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_parse_text() {
        assert_eq!(OutputFormat::parse("text").unwrap(), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("TXT").unwrap(), OutputFormat::Text);
    }

    #[test]
    fn output_format_parse_json() {
        assert_eq!(OutputFormat::parse("JSON").unwrap(), OutputFormat::Json);
    }

    #[test]
    fn output_format_parse_invalid() {
        assert!(OutputFormat::parse("csv").is_err());
        assert!(OutputFormat::parse("").is_err());
    }
}
