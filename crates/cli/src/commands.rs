//! Wallet tool commands.

use crate::report::TOP_UP_NOTICE;
use crate::{Result, ToolError};
use std::str::FromStr;
use syswallet_config::WalletToolConfig;
use syswallet_persistence::Backend;
use syswallet_wallets::{KeypoolOptions, StoreHandle, WalletStore};
use tracing::debug;

/// Commands understood by the tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Create a new wallet file
    Create,
    /// Show information about an existing wallet file
    Info,
}

impl Command {
    pub const ALL: [Command; 2] = [Command::Create, Command::Info];

    pub fn name(&self) -> &'static str {
        match self {
            Command::Create => "create",
            Command::Info => "info",
        }
    }

    /// One-line description for the usage text
    pub fn about(&self) -> &'static str {
        match self {
            Command::Create => "Create new wallet file",
            Command::Info => "Get wallet info",
        }
    }

    /// Runs the command against the wallet selected by `config`.
    pub fn run(self, config: &WalletToolConfig) -> Result<CommandOutput> {
        debug!(command = self.name(), wallet = %config.wallet_name, "running command");
        match self {
            Command::Create => create(config),
            Command::Info => show_info(config),
        }
    }
}

impl FromStr for Command {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self> {
        Command::ALL
            .into_iter()
            .find(|command| command.name() == s)
            .ok_or_else(|| ToolError::InvalidCommand(s.to_string()))
    }
}

/// Summary shown by `info` and after `create`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfoReport {
    pub encrypted: bool,
    pub hd: bool,
    /// External plus internal keypool keys
    pub keypool_size: usize,
    pub transactions: usize,
    pub address_book: usize,
}

/// Result of a command: notice lines followed by the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub notices: Vec<String>,
    pub report: InfoReport,
}

/// Reads the report of an open wallet. Never writes.
pub fn info<B: Backend>(handle: &StoreHandle<B>) -> InfoReport {
    let wallet = handle.wallet();
    InfoReport {
        encrypted: wallet.is_crypted(),
        hd: wallet.is_hd(),
        keypool_size: wallet.keypool_size(),
        transactions: wallet.tx_count(),
        address_book: wallet.address_book_size(),
    }
}

/// `info`: opens an existing wallet and reports on it.
pub fn show_info(config: &WalletToolConfig) -> Result<CommandOutput> {
    let location = config.wallet_location();
    let handle = WalletStore::open_or_create(&location, false, &KeypoolOptions::from(config))?;
    Ok(CommandOutput {
        notices: Vec::new(),
        report: info(&handle),
    })
}

/// `create`: opens or creates the wallet, then reports on it.
pub fn create(config: &WalletToolConfig) -> Result<CommandOutput> {
    let location = config.wallet_location();
    let handle = WalletStore::open_or_create(&location, true, &KeypoolOptions::from(config))?;
    Ok(output_after_open(&handle))
}

fn output_after_open<B: Backend>(handle: &StoreHandle<B>) -> CommandOutput {
    let mut notices = Vec::new();
    if handle.topped_up() {
        notices.push(TOP_UP_NOTICE.to_string());
    }
    CommandOutput {
        notices,
        report: info(handle),
    }
}
