//! Syscoin Wallets Library
//!
//! This crate provides the wallet side of the wallet tool:
//! - Typed wallet records stored in the persistence record store
//! - BIP32 hardened derivation from an HD seed
//! - Keypool accounting (external and internal chains)
//! - [`WalletStore`], which locks, loads or creates a wallet file
//!
//! The record layout is shared with node-side code, so a wallet created here
//! loads unchanged in anything built on this crate.

pub mod batch;
pub mod hash;
pub mod hd;
pub mod records;
pub mod store;
pub mod wallet;

// Re-export main types
pub use batch::WalletBatch;
pub use records::{HdChain, KeyMetadata, KeyPoolEntry, MasterKey, StoredKey};
pub use store::{KeypoolOptions, StoreHandle, WalletStore};
pub use wallet::Wallet;

use syswallet_config::PACKAGE_NAME;
use syswallet_persistence::Error as StoreError;
use thiserror::Error;

/// Version written to the `version` record
pub const CLIENT_VERSION: u32 = 4_000_000;

/// Wallet feature versions, compared against the `minversion` record
pub mod feature {
    pub const BASE: u32 = 10500;
    pub const WALLETCRYPT: u32 = 40000;
    pub const COMPRPUBKEY: u32 = 60000;
    pub const HD: u32 = 130000;
    pub const HD_SPLIT: u32 = 139900;
    pub const NO_DEFAULT_KEY: u32 = 159900;
    pub const PRE_SPLIT_KEYPOOL: u32 = 169900;
    pub const LATEST: u32 = PRE_SPLIT_KEYPOOL;
}

/// Result type for wallet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wallet-related errors.
///
/// Load and create errors carry the wallet name and display as the exact
/// line the wallet tool prints.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Error: no wallet file at {name}")]
    NoSuchWallet { name: String },

    #[error("Error loading {name}. Is wallet being used by other process?")]
    LoadConflict { name: String },

    #[error("Error loading {name}: Wallet corrupted")]
    Corrupt { name: String, reason: String },

    #[error("Error reading {name}! All keys read correctly, but transaction data or address book entries might be missing or incorrect.")]
    NonCritical { name: String, reason: String },

    #[error("Error loading {name}: Wallet requires newer version of {}", PACKAGE_NAME)]
    TooNew { name: String, version: u32 },

    #[error("Error creating {name}")]
    CreateFailed {
        name: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Error loading {name}: {source}")]
    Store {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("Wallet is locked")]
    WalletLocked,

    #[error("HD seed not found")]
    SeedNotFound,

    #[error("Key derivation failed: {0}")]
    Derivation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<bitcoin::bip32::Error> for Error {
    fn from(err: bitcoin::bip32::Error) -> Self {
        Error::Derivation(err.to_string())
    }
}

impl Error {
    /// Converts a record store failure into the matching load error for
    /// the wallet called `name`.
    pub fn from_store(name: &str, err: StoreError) -> Self {
        let name = name.to_string();
        match err {
            StoreError::NotFound(_) => Error::NoSuchWallet { name },
            StoreError::Locked(_) => Error::LoadConflict { name },
            StoreError::Corrupt(reason) => Error::Corrupt { name, reason },
            StoreError::UnsupportedFormat(version) => Error::TooNew { name, version },
            source => Error::Store { name, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_load_errors_render_exact_messages() {
        let conflict = Error::from_store("wallet.dat", StoreError::Locked(PathBuf::from("x")));
        assert_eq!(
            conflict.to_string(),
            "Error loading wallet.dat. Is wallet being used by other process?"
        );

        let missing = Error::from_store("nonexistent.dat", StoreError::NotFound(PathBuf::from("x")));
        assert_eq!(missing.to_string(), "Error: no wallet file at nonexistent.dat");

        let corrupt = Error::from_store("w", StoreError::Corrupt("checksum mismatch".into()));
        assert_eq!(corrupt.to_string(), "Error loading w: Wallet corrupted");

        let too_new = Error::from_store("w", StoreError::UnsupportedFormat(9));
        assert_eq!(
            too_new.to_string(),
            "Error loading w: Wallet requires newer version of Syscoin Core"
        );
    }
}
