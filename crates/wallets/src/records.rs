//! Typed wallet records.
//!
//! Every record is stored under a [`RecordKey`] whose tag is one of
//! [`tags`]; values are bincode with fixed-width integers.

use crate::Result;
use bincode::Options;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use syswallet_persistence::RecordKey;

/// Record type tags
pub mod tags {
    pub const VERSION: &str = "version";
    pub const MIN_VERSION: &str = "minversion";
    pub const MASTER_KEY: &str = "mkey";
    pub const HD_CHAIN: &str = "hdchain";
    pub const KEY: &str = "key";
    pub const CRYPTED_KEY: &str = "ckey";
    pub const KEY_META: &str = "keymeta";
    pub const POOL: &str = "pool";
    pub const NAME: &str = "name";
    pub const PURPOSE: &str = "purpose";
    pub const TX: &str = "tx";
}

/// Key path of the HD seed in its metadata
pub const SEED_KEY_PATH: &str = "s";

const MAX_VALUE_SIZE: u64 = 16 * 1024 * 1024;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_VALUE_SIZE)
        .reject_trailing_bytes()
}

pub fn encode_value<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Ok(options().serialize(value)?)
}

pub fn decode_value<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(options().deserialize(bytes)?)
}

/// Keypool entry, keyed by its pool index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPoolEntry {
    pub time: i64,
    /// Compressed public key
    pub pubkey: Vec<u8>,
    pub internal: bool,
}

/// HD chain state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HdChain {
    pub version: u32,
    pub external_counter: u32,
    pub internal_counter: u32,
    /// HASH160 of the seed public key
    pub seed_id: [u8; 20],
}

impl HdChain {
    pub const VERSION_HD_BASE: u32 = 1;
    pub const VERSION_HD_CHAIN_SPLIT: u32 = 2;

    pub fn new(seed_id: [u8; 20]) -> Self {
        Self {
            version: Self::VERSION_HD_CHAIN_SPLIT,
            external_counter: 0,
            internal_counter: 0,
            seed_id,
        }
    }

    pub fn supports_split(&self) -> bool {
        self.version >= Self::VERSION_HD_CHAIN_SPLIT
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMetadata {
    pub version: u32,
    /// Unix time in seconds
    pub create_time: i64,
    /// Empty for non-HD keys, `s` for the seed itself
    pub hd_keypath: String,
    pub hd_seed_id: Option<[u8; 20]>,
}

impl KeyMetadata {
    pub const VERSION_BASIC: u32 = 1;
    pub const VERSION_WITH_HDDATA: u32 = 10;

    pub fn basic(create_time: i64) -> Self {
        Self {
            version: Self::VERSION_BASIC,
            create_time,
            hd_keypath: String::new(),
            hd_seed_id: None,
        }
    }

    pub fn hd(create_time: i64, keypath: impl Into<String>, seed_id: [u8; 20]) -> Self {
        Self {
            version: Self::VERSION_WITH_HDDATA,
            create_time,
            hd_keypath: keypath.into(),
            hd_seed_id: Some(seed_id),
        }
    }
}

/// Plaintext private key with a checksum over pubkey and secret
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredKey {
    pub secret: [u8; 32],
    pub checksum: [u8; 32],
}

impl std::fmt::Debug for StoredKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredKey")
            .field("checksum", &hex::encode(self.checksum))
            .finish_non_exhaustive()
    }
}

/// Encrypted wallet master key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterKey {
    pub crypted_key: Vec<u8>,
    pub salt: Vec<u8>,
    pub derivation_method: u32,
    pub derive_iterations: u32,
}

pub fn version_key() -> RecordKey {
    RecordKey::singleton(tags::VERSION)
}

pub fn min_version_key() -> RecordKey {
    RecordKey::singleton(tags::MIN_VERSION)
}

pub fn hd_chain_key() -> RecordKey {
    RecordKey::singleton(tags::HD_CHAIN)
}

pub fn master_key_key(id: u32) -> RecordKey {
    RecordKey::new(tags::MASTER_KEY, id.to_be_bytes().to_vec())
}

pub fn key_key(pubkey: &[u8]) -> RecordKey {
    RecordKey::new(tags::KEY, pubkey.to_vec())
}

pub fn key_meta_key(pubkey: &[u8]) -> RecordKey {
    RecordKey::new(tags::KEY_META, pubkey.to_vec())
}

/// Pool ids are big-endian so entries iterate in index order.
pub fn pool_key(index: i64) -> RecordKey {
    RecordKey::new(tags::POOL, index.to_be_bytes().to_vec())
}

/// Pool index of a pool record id, if well formed.
pub fn pool_index(id: &[u8]) -> Option<i64> {
    let bytes: [u8; 8] = id.try_into().ok()?;
    Some(i64::from_be_bytes(bytes))
}

pub fn name_key(address: &str) -> RecordKey {
    RecordKey::new(tags::NAME, address.as_bytes().to_vec())
}

pub fn purpose_key(address: &str) -> RecordKey {
    RecordKey::new(tags::PURPOSE, address.as_bytes().to_vec())
}

pub fn tx_key(txid: &[u8; 32]) -> RecordKey {
    RecordKey::new(tags::TX, txid.to_vec())
}
