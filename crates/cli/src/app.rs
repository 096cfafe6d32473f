//! Invocation flow: parse, dispatch, report.
//!
//! Nothing is printed here. The caller gets the complete stdout text or the
//! error that ended the invocation.

use crate::args::{parse_args, usage, Invocation};
use crate::commands::Command;
use crate::{report, Result};
use std::ffi::OsString;
use syswallet_config::{LogConfig, WalletToolConfig};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

/// Successful end of an invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Full text for stdout
    pub stdout: String,
}

/// Parses `args` (program name first) and runs the requested command.
pub fn run<I, T>(args: I) -> Result<Outcome>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    match parse_args(args)? {
        Invocation::Help => Ok(Outcome { stdout: usage() }),
        Invocation::Run { command, config } => {
            init_logging(&config.logging);
            execute(command, &config)
        }
    }
}

/// Runs `command` and renders its report.
pub fn execute(command: Command, config: &WalletToolConfig) -> Result<Outcome> {
    debug!(
        datadir = %config.data_dir.display(),
        network = %config.network,
        "dispatching"
    );
    let output = command.run(config)?;
    Ok(Outcome {
        stdout: report::render(&output),
    })
}

fn filter_directive(logging: &LogConfig) -> String {
    match logging.debug.as_deref() {
        Some("all") => "debug".to_string(),
        Some(category) => format!("info,{category}=debug"),
        None => "info".to_string(),
    }
}

/// Installs the stderr logger when `-debug` or `-printtoconsole` was given.
///
/// `RUST_LOG` takes precedence over the flags.
pub fn init_logging(logging: &LogConfig) {
    if !logging.enabled() {
        return;
    }
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(logging)))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolError;
    use syswallet_config::ConfigError;

    #[test]
    fn test_help_outcome() {
        let outcome = run(["syscoin-wallet", "-help"]).unwrap();
        assert!(outcome.stdout.contains("Usage:"));
    }

    #[test]
    fn test_missing_data_dir() {
        let err = run([
            "syscoin-wallet",
            "-datadir=/nonexistent/syswallet/datadir",
            "info",
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ToolError::Config(ConfigError::MissingDataDir(_))
        ));
        assert_eq!(
            err.to_string(),
            "Error: Specified data directory \"/nonexistent/syswallet/datadir\" does not exist."
        );
    }

    #[test]
    fn test_filter_directives() {
        let mut logging = LogConfig {
            print_to_console: true,
            debug: None,
        };
        assert_eq!(filter_directive(&logging), "info");
        logging.debug = Some("all".into());
        assert_eq!(filter_directive(&logging), "debug");
        logging.debug = Some("syswallet_wallets".into());
        assert_eq!(filter_directive(&logging), "info,syswallet_wallets=debug");
    }
}
