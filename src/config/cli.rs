use crate::utils::error::Result;
use crate::utils::validation::{validate_file_extensions, validate_path, Validate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

const DATASET_EXTENSIONS: [&str; 2] = ["json", "csv"];

#[derive(Debug, Clone, Parser)]
#[command(name = "analytics-engine")]
#[command(about = "Analytics microservice: statistics, transforms, charts, forecasts and reconciliation over JSON records")]
pub struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Start the HTTP service (default)
    Serve(ServeArgs),
    /// Reconcile two dataset files and write the report
    Reconcile(ReconcileArgs),
    /// List registered tools
    Tools,
}

#[derive(Debug, Clone, Default, Args)]
pub struct ServeArgs {
    /// Override server.host from config
    #[arg(long)]
    pub host: Option<String>,

    /// Override server.port from config
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Args)]
pub struct ReconcileArgs {
    /// Dataset A (.json array of objects or .csv)
    #[arg(long = "a")]
    pub data_a: String,

    /// Dataset B (.json array of objects or .csv)
    #[arg(long = "b")]
    pub data_b: String,

    #[arg(long)]
    pub key_column_a: Option<String>,

    #[arg(long)]
    pub key_column_b: Option<String>,

    /// Shared key column (defaults to reconcile.default_key_column)
    #[arg(long)]
    pub key_column: Option<String>,

    /// missing_in_a, missing_in_b or intersection
    #[arg(long)]
    pub mode: Option<String>,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,

    #[arg(long, value_enum, default_value = "json")]
    pub format: ReportFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum ReportFormat {
    Json,
    Csv,
}

impl Validate for ReconcileArgs {
    fn validate(&self) -> Result<()> {
        validate_path("a", &self.data_a)?;
        validate_path("b", &self.data_b)?;
        validate_file_extensions("a", &[self.data_a.as_str()], &DATASET_EXTENSIONS)?;
        validate_file_extensions("b", &[self.data_b.as_str()], &DATASET_EXTENSIONS)?;
        if let Some(output) = &self.output {
            validate_path("output", output)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::parse_from(["analytics-engine"]);
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_reconcile() {
        let cli = Cli::parse_from([
            "analytics-engine",
            "reconcile",
            "--a",
            "sap.json",
            "--b",
            "dian.csv",
            "--key-column-a",
            "U_CUFE",
            "--mode",
            "missing_in_b",
            "--format",
            "csv",
            "-v",
        ]);
        assert!(cli.verbose);
        let Some(Command::Reconcile(args)) = cli.command else {
            panic!("expected reconcile command");
        };
        assert_eq!(args.data_a, "sap.json");
        assert_eq!(args.data_b, "dian.csv");
        assert_eq!(args.key_column_a.as_deref(), Some("U_CUFE"));
        assert_eq!(args.mode.as_deref(), Some("missing_in_b"));
        assert_eq!(args.format, ReportFormat::Csv);
    }

    #[test]
    fn test_reconcile_args_validation() {
        let parse = |a: &str, b: &str| {
            let cli = Cli::parse_from(["analytics-engine", "reconcile", "--a", a, "--b", b]);
            match cli.command {
                Some(Command::Reconcile(args)) => args,
                _ => panic!("expected reconcile command"),
            }
        };

        assert!(parse("sap.JSON", "dian.csv").validate().is_ok());
        assert!(parse("sap.xlsx", "dian.csv").validate().is_err());
        assert!(parse("sap.json", "dian").validate().is_err());
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::parse_from(["analytics-engine", "serve", "--port", "9100"]);
        let Some(Command::Serve(args)) = cli.command else {
            panic!("expected serve command");
        };
        assert_eq!(args.port, Some(9100));
        assert!(args.host.is_none());
    }
}
