//! syscoin-wallet
//!
//! Offline tool for creating and inspecting wallet files without a running
//! node. The binary is a thin shell around [`run`]: arguments are parsed
//! into a [`Command`] and a `WalletToolConfig`, the command runs against
//! the wallet store and the report is returned as the complete stdout text.

pub mod app;
pub mod args;
pub mod commands;
pub mod report;

pub use app::{execute, init_logging, run, Outcome};
pub use args::{parse_args, Invocation, ToolArgs};
pub use commands::{Command, CommandOutput, InfoReport};

use syswallet_config::ConfigError;
use thiserror::Error;

/// Name of the binary, as shown in usage and error messages
pub const BINARY_NAME: &str = "syscoin-wallet";

/// Result type for tool operations
pub type Result<T> = std::result::Result<T, ToolError>;

/// Everything that ends an invocation early.
///
/// `Display` is the exact line printed to stderr.
#[derive(Error, Debug)]
pub enum ToolError {
    /// A bare token that is not a known command
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// More than one bare token
    #[error("Error: two methods provided ({0} and {1}). Only one method should be provided.")]
    MultipleCommands(String, String),

    #[error("No method provided. Run `{} -help` for valid methods.", BINARY_NAME)]
    MissingCommand,

    /// A flag outside the option registry, echoed as typed
    #[error("Error parsing command line arguments: Invalid parameter {0}")]
    InvalidParameter(String),

    /// A known flag with a value that does not parse
    #[error("Error parsing command line arguments: {0}")]
    InvalidValue(String),

    #[error("Wallet name must be provided when creating a new wallet.")]
    MissingWalletName,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Wallet(#[from] syswallet_wallets::Error),
}

impl ToolError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_single_lines() {
        let errors = [
            ToolError::InvalidCommand("help".into()),
            ToolError::MultipleCommands("info".into(), "create".into()),
            ToolError::MissingCommand,
            ToolError::InvalidParameter("-foo".into()),
            ToolError::MissingWalletName,
            ToolError::Config(ConfigError::ConflictingNetworks),
        ];
        for err in errors {
            assert!(!err.to_string().contains('\n'));
            assert_eq!(err.exit_code(), 1);
        }
    }

    #[test]
    fn test_missing_command_message() {
        assert_eq!(
            ToolError::MissingCommand.to_string(),
            "No method provided. Run `syscoin-wallet -help` for valid methods."
        );
    }
}
