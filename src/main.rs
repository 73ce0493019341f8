//! rsg CLI Entry Point
//!
//! # Usage
//!
//! ```bash
//! # Idle assessment only, findings as JSON on stdout
//! rsg --target ./server
//!
//! # Idle and peak assessment against http://127.0.0.1:8080/ping
//! rsg --target ./server --api-path /ping --api-port 8080 2>/dev/null
//!
//! # OpenMetrics into a file
//! rsg --target ./server --export-findings findings.txt --output openmetrics
//! ```

use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use log::{error, info};

use rsg::error::{EXIT_CONFIG, EXIT_FATAL};
use rsg::{export_findings, run_assessment, Cli, Config, RunError, APP_NAME, VERSION};

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Measures the target and writes the findings.
async fn run(config: &Config) -> Result<(), RunError> {
    info!("{} v{}", APP_NAME, VERSION);

    let findings = run_assessment(config).await?;

    // Export problems never invalidate the measurement itself.
    if let Err(e) = export_findings(
        &findings,
        &config.target_label(),
        config.export_path.as_deref(),
        &config.output_format,
    ) {
        error!("{}", e);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            // clap would exit with 2, which is reserved for launch failures.
            let _ = e.print();
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    setup_logging(cli.verbose);

    let config = match Config::from_cli(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!();
            let _ = Cli::command().print_help();
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    match run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_fatal() => {
            error!("{}", e);
            // The child may never exit; skip waiting on its harness thread.
            std::process::exit(i32::from(EXIT_FATAL));
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
