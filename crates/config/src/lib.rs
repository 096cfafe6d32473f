//! Syscoin Wallet Tool Configuration
//!
//! This crate provides the configuration types shared by the wallet tool
//! crates: network selection, the data directory layout used by the node,
//! and the resolved [`WalletToolConfig`] that the entry point builds once and
//! hands down by reference.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Product name used in user-facing version messages
pub const PACKAGE_NAME: &str = "Syscoin Core";

/// Default number of keys kept ready on each keypool chain
pub const DEFAULT_KEYPOOL_SIZE: u32 = 1000;

/// Name of the data file inside a wallet directory
pub const WALLET_FILE_NAME: &str = "wallet.dat";

/// Optional sub-directory of the network data directory holding wallets
pub const WALLETS_DIR_NAME: &str = "wallets";

/// Name of the default wallet
pub const DEFAULT_WALLET_NAME: &str = "";

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration errors.
///
/// The display strings are shown to the user verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Both `-regtest` and `-testnet` were requested
    #[error("Invalid combination of -regtest and -testnet.")]
    ConflictingNetworks,

    /// The configured data directory is missing
    #[error("Error: Specified data directory \"{0}\" does not exist.")]
    MissingDataDir(String),
}

/// Network a wallet belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Network {
    #[default]
    Main,
    Testnet,
    Regtest,
}

impl Network {
    /// Resolves the network from the `-regtest` / `-testnet` switches.
    pub fn from_flags(regtest: bool, testnet: bool) -> Result<Self> {
        match (regtest, testnet) {
            (true, true) => Err(ConfigError::ConflictingNetworks),
            (true, false) => Ok(Network::Regtest),
            (false, true) => Ok(Network::Testnet),
            (false, false) => Ok(Network::Main),
        }
    }

    /// Sub-directory of the data directory used by this network.
    pub fn data_subdir(&self) -> &'static str {
        match self {
            Network::Main => "",
            Network::Testnet => "testnet3",
            Network::Regtest => "regtest",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Main => write!(f, "main"),
            Network::Testnet => write!(f, "test"),
            Network::Regtest => write!(f, "regtest"),
        }
    }
}

/// What `create` does with the keypool of a wallet that already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum KeypoolTopUp {
    /// Add keys until every chain holds the configured target
    #[default]
    FillToTarget,
    /// Never add keys to an existing wallet
    LeaveExisting,
}

/// Logger configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log to the console (`-printtoconsole`)
    pub print_to_console: bool,
    /// Debug category (`-debug=<category>`), `None` when disabled
    pub debug: Option<String>,
}

impl LogConfig {
    /// Whether any log output was requested.
    pub fn enabled(&self) -> bool {
        self.print_to_console || self.debug.is_some()
    }
}

/// Resolved settings for one wallet tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletToolConfig {
    /// Node data directory
    pub data_dir: PathBuf,
    /// Selected network
    pub network: Network,
    /// Wallet name as given by `-wallet`
    pub wallet_name: String,
    /// Whether `-wallet` was given explicitly
    pub wallet_name_set: bool,
    /// Keypool target per chain
    pub keypool_size: u32,
    /// Keypool policy for existing wallets
    pub top_up: KeypoolTopUp,
    /// Logger configuration
    pub logging: LogConfig,
}

impl Default for WalletToolConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            network: Network::Main,
            wallet_name: DEFAULT_WALLET_NAME.to_string(),
            wallet_name_set: false,
            keypool_size: DEFAULT_KEYPOOL_SIZE,
            top_up: KeypoolTopUp::FillToTarget,
            logging: LogConfig::default(),
        }
    }
}

impl WalletToolConfig {
    /// Fails when the data directory does not exist.
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.is_dir() {
            Ok(())
        } else {
            Err(ConfigError::MissingDataDir(
                self.data_dir.display().to_string(),
            ))
        }
    }

    /// Data directory of the selected network
    pub fn net_data_dir(&self) -> PathBuf {
        match self.network.data_subdir() {
            "" => self.data_dir.clone(),
            subdir => self.data_dir.join(subdir),
        }
    }

    /// Directory holding the wallets of the selected network.
    ///
    /// `<net datadir>/wallets` when it exists, otherwise the network data
    /// directory itself.
    pub fn wallet_dir(&self) -> PathBuf {
        let net_dir = self.net_data_dir();
        let wallets = net_dir.join(WALLETS_DIR_NAME);
        if wallets.is_dir() {
            wallets
        } else {
            net_dir
        }
    }

    /// Location of the wallet named by `-wallet`
    pub fn wallet_location(&self) -> WalletLocation {
        WalletLocation::resolve(&self.wallet_dir(), &self.wallet_name)
    }
}

/// A wallet name together with the data file it resolves to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletLocation {
    name: String,
    path: PathBuf,
}

impl WalletLocation {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Resolves `name` inside `wallet_dir`.
    ///
    /// A name that points at a regular file is used as the data file; any
    /// other name is a wallet directory containing `wallet.dat`.
    pub fn resolve(wallet_dir: &Path, name: &str) -> Self {
        let target = wallet_dir.join(name);
        let path = if target.is_file() {
            target
        } else {
            target.join(WALLET_FILE_NAME)
        };
        Self::new(name, path)
    }

    /// Wallet name used in messages
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the data file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for WalletLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Platform default data directory.
///
/// `~/.syscoin` on Unix-like systems, `<data dir>/Syscoin` elsewhere.
pub fn default_data_dir() -> PathBuf {
    if cfg!(any(windows, target_os = "macos")) {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Syscoin")
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".syscoin")
    }
}
