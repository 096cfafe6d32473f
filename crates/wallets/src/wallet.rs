//! Loaded wallet: record scan, read queries and keypool maintenance.

use crate::batch::WalletBatch;
use crate::hash::{hash256_parts, Hash160};
use crate::hd::{self, EXTERNAL_CHAIN, INTERNAL_CHAIN};
use crate::records::{
    self, decode_value, tags, HdChain, KeyMetadata, KeyPoolEntry, MasterKey, StoredKey,
    SEED_KEY_PATH,
};
use crate::{feature, Error, Result, CLIENT_VERSION};
use bitcoin::bip32::Xpriv;
use secp256k1::{PublicKey, SecretKey};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use syswallet_persistence::{Backend, Database, FileBackend, Records};
use tracing::{debug, info};

/// What a record scan found
#[derive(Debug, Clone, Default)]
struct WalletState {
    version: u32,
    min_version: u32,
    master_keys: usize,
    keys: BTreeSet<Vec<u8>>,
    hd_chain: Option<HdChain>,
    external_pool: BTreeSet<i64>,
    internal_pool: BTreeSet<i64>,
    max_pool_index: i64,
    tx_count: usize,
    address_book: usize,
}

/// A wallet loaded from a locked store.
///
/// Read queries reflect the records on disk plus anything staged through
/// this wallet since the last [`Wallet::commit`].
pub struct Wallet<B: Backend = FileBackend> {
    name: String,
    db: Database<B>,
    state: WalletState,
    master: Option<Xpriv>,
}

impl<B: Backend> fmt::Debug for Wallet<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("name", &self.name)
            .field("location", &self.db.location())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<B: Backend> Wallet<B> {
    /// Scans the records of an open store.
    ///
    /// Fails with [`Error::TooNew`] before looking at anything else when the
    /// store needs a newer wallet version, with [`Error::Corrupt`] when a
    /// key, keypool, HD chain or master key record is unreadable and with
    /// [`Error::NonCritical`] when only address-book records are.
    pub fn load(db: Database<B>, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let state = scan(&name, db.records())?;
        debug!(
            wallet = %name,
            keys = state.keys.len(),
            keypool = state.external_pool.len() + state.internal_pool.len(),
            "wallet loaded"
        );
        Ok(Self {
            name,
            db,
            state,
            master: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &Path {
        self.db.location()
    }

    /// Whether the store was created by this handle and not yet committed.
    pub fn is_fresh(&self) -> bool {
        self.db.is_fresh()
    }

    pub fn records(&self) -> &Records {
        self.db.records()
    }

    pub fn version(&self) -> u32 {
        self.state.version
    }

    pub fn min_version(&self) -> u32 {
        self.state.min_version
    }

    pub fn is_crypted(&self) -> bool {
        self.state.master_keys > 0
    }

    pub fn hd_seed_id(&self) -> Option<[u8; 20]> {
        self.state
            .hd_chain
            .as_ref()
            .map(|chain| chain.seed_id)
            .filter(|id| *id != [0u8; 20])
    }

    pub fn is_hd(&self) -> bool {
        self.hd_seed_id().is_some()
    }

    /// Number of private keys, plaintext and encrypted.
    pub fn key_count(&self) -> usize {
        self.state.keys.len()
    }

    pub fn external_keypool_size(&self) -> usize {
        self.state.external_pool.len()
    }

    pub fn internal_keypool_size(&self) -> usize {
        self.state.internal_pool.len()
    }

    pub fn keypool_size(&self) -> usize {
        self.external_keypool_size() + self.internal_keypool_size()
    }

    pub fn tx_count(&self) -> usize {
        self.state.tx_count
    }

    pub fn address_book_size(&self) -> usize {
        self.state.address_book
    }

    /// Empty batch for this wallet.
    pub fn batch(&self) -> WalletBatch {
        WalletBatch::new()
    }

    /// Raises the minimum version; lower values are ignored.
    pub fn set_min_version(&mut self, batch: &mut WalletBatch, version: u32) -> Result<()> {
        if version <= self.state.min_version {
            return Ok(());
        }
        batch.write_min_version(version)?;
        self.state.min_version = version;
        Ok(())
    }

    pub fn write_version(&mut self, batch: &mut WalletBatch) -> Result<()> {
        batch.write_version(CLIENT_VERSION)?;
        self.state.version = CLIENT_VERSION;
        Ok(())
    }

    /// Generates a new HD seed and makes it the wallet's active seed.
    ///
    /// The seed is stored as a plaintext key with key path `s`; the new HD
    /// chain starts both counters at zero.
    pub fn generate_hd_seed(&mut self, batch: &mut WalletBatch) -> Result<[u8; 20]> {
        if self.is_crypted() {
            return Err(Error::WalletLocked);
        }

        let secret = hd::generate_secret();
        let master = hd::master_key(&secret.secret_bytes())?;
        let pubkey = PublicKey::from_secret_key_global(&secret).serialize();
        let seed_id = pubkey.hash160();

        let meta = KeyMetadata::hd(now(), SEED_KEY_PATH, seed_id);
        batch.write_key(&pubkey, &stored_key(&pubkey, &secret), &meta)?;
        let chain = HdChain::new(seed_id);
        batch.write_hd_chain(&chain)?;

        self.state.keys.insert(pubkey.to_vec());
        self.state.hd_chain = Some(chain);
        self.master = Some(master);

        info!(wallet = %self.name, seed_id = %hex::encode(seed_id), "generated HD seed");
        Ok(seed_id)
    }

    /// Stages keys until each keypool chain holds `target` entries.
    ///
    /// Missing internal keys are staged before external ones. Wallets without
    /// a split HD chain only fill the external chain; encrypted wallets are
    /// left alone. Returns the number of keys staged.
    pub fn stage_top_up(&mut self, batch: &mut WalletBatch, target: usize) -> Result<usize> {
        if self.is_crypted() {
            debug!(wallet = %self.name, "wallet is encrypted, keypool not topped up");
            return Ok(0);
        }

        let split = self.is_hd()
            && self.state.min_version >= feature::HD_SPLIT
            && self
                .state
                .hd_chain
                .as_ref()
                .map_or(false, HdChain::supports_split);
        let missing_internal = if split {
            target.saturating_sub(self.state.internal_pool.len())
        } else {
            0
        };
        let missing_external = target.saturating_sub(self.state.external_pool.len());
        let missing = missing_internal + missing_external;
        if missing == 0 {
            return Ok(0);
        }

        let mut source = if self.is_hd() {
            Some(self.chain_keys()?)
        } else {
            None
        };

        let time = now();
        for i in 0..missing {
            let internal = i < missing_internal;
            let pubkey = match source.as_mut() {
                Some(chains) => self.stage_hd_key(batch, chains, internal, time)?,
                None => self.stage_random_key(batch, time)?,
            };

            let index = self.state.max_pool_index + 1;
            batch.write_pool(
                index,
                &KeyPoolEntry {
                    time,
                    pubkey,
                    internal,
                },
            )?;
            self.state.max_pool_index = index;
            if internal {
                self.state.internal_pool.insert(index);
            } else {
                self.state.external_pool.insert(index);
            }
        }

        if let Some(chains) = source {
            batch.write_hd_chain(&chains.chain)?;
            self.state.hd_chain = Some(chains.chain);
        }

        info!(
            wallet = %self.name,
            added = missing,
            external = self.state.external_pool.len(),
            internal = self.state.internal_pool.len(),
            "keypool topped up"
        );
        Ok(missing)
    }

    /// Tops the keypool up to `target` per chain and commits. Returns the
    /// number of keys added.
    pub fn top_up_keypool(&mut self, target: usize) -> Result<usize> {
        let mut batch = self.batch();
        let added = self.stage_top_up(&mut batch, target)?;
        if added > 0 {
            self.commit(batch)?;
        }
        Ok(added)
    }

    /// Writes `batch` in one go and reloads the wallet view from the store.
    ///
    /// On failure the staged view is dropped and the view matches the store
    /// again.
    pub fn commit(&mut self, batch: WalletBatch) -> Result<()> {
        let written = self.db.commit(batch.into_inner());
        if written.is_err() {
            self.master = None;
        }
        self.state = scan(&self.name, self.db.records())?;
        written.map_err(Error::from)
    }

    fn master_key(&mut self) -> Result<Xpriv> {
        if let Some(master) = &self.master {
            return Ok(master.clone());
        }
        if self.is_crypted() {
            return Err(Error::WalletLocked);
        }
        let seed_id = self.hd_seed_id().ok_or(Error::SeedNotFound)?;

        let (_, raw) = self
            .db
            .records()
            .iter_tag(tags::KEY)
            .find(|(pubkey, _)| pubkey.hash160() == seed_id)
            .ok_or(Error::SeedNotFound)?;
        let stored: StoredKey = decode_value(raw)?;
        let master = hd::master_key(&stored.secret)?;
        self.master = Some(master.clone());
        Ok(master)
    }

    fn chain_keys(&mut self) -> Result<ChainKeys> {
        let chain = self.state.hd_chain.clone().ok_or(Error::SeedNotFound)?;
        let master = self.master_key()?;
        Ok(ChainKeys {
            external: hd::chain_key(&master, EXTERNAL_CHAIN)?,
            internal: hd::chain_key(&master, INTERNAL_CHAIN)?,
            chain,
        })
    }

    fn stage_hd_key(
        &mut self,
        batch: &mut WalletBatch,
        chains: &mut ChainKeys,
        internal: bool,
        time: i64,
    ) -> Result<Vec<u8>> {
        let (chain_index, parent) = if internal {
            (INTERNAL_CHAIN, &chains.internal)
        } else {
            (EXTERNAL_CHAIN, &chains.external)
        };

        loop {
            let counter = if internal {
                &mut chains.chain.internal_counter
            } else {
                &mut chains.chain.external_counter
            };
            let index = *counter;
            let child = hd::child_key(parent, index)?;
            *counter += 1;

            let pubkey = PublicKey::from_secret_key_global(&child.private_key).serialize();
            // Already present, e.g. imported; move on to the next index.
            if self.state.keys.contains(pubkey.as_slice()) {
                continue;
            }

            let path = hd::keypool_path(chain_index, index)?;
            let meta = KeyMetadata::hd(time, hd::keypath_string(&path), chains.chain.seed_id);
            batch.write_key(&pubkey, &stored_key(&pubkey, &child.private_key), &meta)?;
            self.state.keys.insert(pubkey.to_vec());
            return Ok(pubkey.to_vec());
        }
    }

    fn stage_random_key(&mut self, batch: &mut WalletBatch, time: i64) -> Result<Vec<u8>> {
        let secret = hd::generate_secret();
        let pubkey = PublicKey::from_secret_key_global(&secret).serialize();
        batch.write_key(&pubkey, &stored_key(&pubkey, &secret), &KeyMetadata::basic(time))?;
        self.state.keys.insert(pubkey.to_vec());
        Ok(pubkey.to_vec())
    }
}

struct ChainKeys {
    external: Xpriv,
    internal: Xpriv,
    chain: HdChain,
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn stored_key(pubkey: &[u8], secret: &SecretKey) -> StoredKey {
    let secret = secret.secret_bytes();
    StoredKey {
        secret,
        checksum: hash256_parts(&[pubkey, &secret[..]]),
    }
}

fn check_plain_key(pubkey: &[u8], raw: &[u8]) -> std::result::Result<(), String> {
    let expected = PublicKey::from_slice(pubkey).map_err(|e| format!("bad public key: {e}"))?;
    let stored: StoredKey = decode_value(raw).map_err(|e| e.to_string())?;
    if hash256_parts(&[pubkey, &stored.secret[..]]) != stored.checksum {
        return Err("key checksum mismatch".to_string());
    }
    let secret = SecretKey::from_slice(&stored.secret).map_err(|e| e.to_string())?;
    if PublicKey::from_secret_key_global(&secret) != expected {
        return Err("private key does not match public key".to_string());
    }
    Ok(())
}

fn scan(name: &str, records: &Records) -> Result<WalletState> {
    let corrupt = |tag: &str, reason: String| {
        debug!(wallet = %name, tag, %reason, "unreadable record");
        Error::Corrupt {
            name: name.to_string(),
            reason: format!("{tag}: {reason}"),
        }
    };

    let mut state = WalletState::default();

    if let Some(raw) = records.get(&records::min_version_key()) {
        let min_version: u32 =
            decode_value(raw).map_err(|e| corrupt(tags::MIN_VERSION, e.to_string()))?;
        if min_version > feature::LATEST {
            return Err(Error::TooNew {
                name: name.to_string(),
                version: min_version,
            });
        }
        state.min_version = min_version;
    }

    let mut noncritical: Option<String> = None;
    for (key, value) in records.iter() {
        let id = key.id();
        match key.tag() {
            tags::MIN_VERSION => {}
            tags::VERSION => {
                state.version =
                    decode_value(value).map_err(|e| corrupt(tags::VERSION, e.to_string()))?;
            }
            tags::MASTER_KEY => {
                if id.len() != 4 {
                    return Err(corrupt(tags::MASTER_KEY, "bad master key id".to_string()));
                }
                decode_value::<MasterKey>(value)
                    .map_err(|e| corrupt(tags::MASTER_KEY, e.to_string()))?;
                state.master_keys += 1;
            }
            tags::HD_CHAIN => {
                let chain: HdChain =
                    decode_value(value).map_err(|e| corrupt(tags::HD_CHAIN, e.to_string()))?;
                state.hd_chain = Some(chain);
            }
            tags::KEY => {
                check_plain_key(id, value).map_err(|reason| corrupt(tags::KEY, reason))?;
                state.keys.insert(id.to_vec());
            }
            tags::CRYPTED_KEY => {
                PublicKey::from_slice(id)
                    .map_err(|e| corrupt(tags::CRYPTED_KEY, e.to_string()))?;
                decode_value::<Vec<u8>>(value)
                    .map_err(|e| corrupt(tags::CRYPTED_KEY, e.to_string()))?;
                state.keys.insert(id.to_vec());
            }
            tags::KEY_META => {
                decode_value::<KeyMetadata>(value)
                    .map_err(|e| corrupt(tags::KEY_META, e.to_string()))?;
            }
            tags::POOL => {
                let index = records::pool_index(id)
                    .ok_or_else(|| corrupt(tags::POOL, "bad pool index".to_string()))?;
                let entry: KeyPoolEntry =
                    decode_value(value).map_err(|e| corrupt(tags::POOL, e.to_string()))?;
                PublicKey::from_slice(&entry.pubkey)
                    .map_err(|e| corrupt(tags::POOL, e.to_string()))?;
                if entry.internal {
                    state.internal_pool.insert(index);
                } else {
                    state.external_pool.insert(index);
                }
                state.max_pool_index = state.max_pool_index.max(index);
            }
            tags::NAME | tags::PURPOSE => {
                let readable = std::str::from_utf8(id).is_ok()
                    && decode_value::<String>(value).is_ok();
                if !readable {
                    debug!(wallet = %name, tag = key.tag(), "unreadable address book record");
                    noncritical.get_or_insert_with(|| format!("{} record", key.tag()));
                } else if key.tag() == tags::NAME {
                    state.address_book += 1;
                }
            }
            tags::TX => state.tx_count += 1,
            other => debug!(wallet = %name, tag = other, "skipping unknown record"),
        }
    }

    if let Some(reason) = noncritical {
        return Err(Error::NonCritical {
            name: name.to_string(),
            reason,
        });
    }
    Ok(state)
}
