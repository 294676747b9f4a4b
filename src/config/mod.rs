pub mod cli;
pub mod toml_config;

pub use cli::{Cli, Command, ReconcileArgs, ReportFormat, ServeArgs};
pub use toml_config::AppConfig;
