use analytics_engine::adapters::{load_dataset, render_report, write_output};
use analytics_engine::config::{AppConfig, Cli, Command, ReconcileArgs};
use analytics_engine::core::registry::ToolRegistry;
use analytics_engine::utils::{logger, validation::Validate};
use analytics_engine::{reconcile, server, ReconcileRequest};
use anyhow::Context;
use clap::Parser;
use std::io::Write;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 載入並驗證配置
    let mut config = match AppConfig::load(cli.config.as_deref()).and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(e.severity().exit_code());
        }
    };

    // 初始化日誌
    let level = config.logging.level.clone();
    if cli.json_logs || config.json_logs() {
        logger::init_json_logger(cli.verbose, level.as_deref());
    } else {
        logger::init_cli_logger(cli.verbose, level.as_deref());
    }
    tracing::debug!("Loaded config: {:?}", config);

    let outcome = match cli.command.unwrap_or(Command::Serve(Default::default())) {
        Command::Serve(args) => {
            if let Some(host) = args.host {
                config.server.host = host;
            }
            if let Some(port) = args.port {
                config.server.port = port;
            }
            server::serve(&config).await
        }
        Command::Reconcile(args) => run_reconcile(&config, args),
        Command::Tools => {
            print_tools(&config).context("Failed to write tool list to stdout")?;
            Ok(())
        }
    };

    if let Err(e) = outcome {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        std::process::exit(e.severity().exit_code());
    }

    Ok(())
}

fn run_reconcile(config: &AppConfig, args: ReconcileArgs) -> analytics_engine::Result<()> {
    args.validate()?;
    let data_a = load_dataset(&args.data_a)?;
    let data_b = load_dataset(&args.data_b)?;

    let request = ReconcileRequest {
        key_column_a: args.key_column_a,
        key_column_b: args.key_column_b,
        key_column: args.key_column,
        mode: args.mode,
        ..ReconcileRequest::new(data_a, data_b)
    }
    .with_defaults(&config.reconcile.default_key_column, config.default_mode());

    let result = reconcile(&request)?;
    tracing::info!("✅ {}", result.summary);

    let report = render_report(&result, args.format)?;
    match args.output {
        Some(path) => write_output(&path, &report)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", report)?;
        }
    }
    Ok(())
}

fn print_tools(config: &AppConfig) -> std::io::Result<()> {
    let registry = ToolRegistry::with_reconcile_defaults(
        &config.reconcile.default_key_column,
        config.default_mode(),
    );
    let mut stdout = std::io::stdout().lock();
    for tool in registry.tools() {
        writeln!(stdout, "{:<32} {}", tool.name(), tool.description())?;
    }
    Ok(())
}
