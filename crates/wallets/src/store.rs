//! Opening and creating wallet stores.
//!
//! [`WalletStore::open_or_create`] is the single entry point used by the
//! wallet tool. It takes the store lock, loads or initialises the wallet
//! and hands back a [`StoreHandle`] that keeps the lock until dropped.

use crate::wallet::Wallet;
use crate::{feature, Error, Result};
use syswallet_config::{KeypoolTopUp, WalletLocation, WalletToolConfig, DEFAULT_KEYPOOL_SIZE};
use syswallet_persistence::{Backend, Database, FileBackend};
use tracing::{debug, info};

/// Keypool settings applied when opening with `create`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeypoolOptions {
    /// Keys per chain
    pub target: usize,
    pub top_up: KeypoolTopUp,
}

impl Default for KeypoolOptions {
    fn default() -> Self {
        Self {
            target: DEFAULT_KEYPOOL_SIZE as usize,
            top_up: KeypoolTopUp::FillToTarget,
        }
    }
}

impl From<&WalletToolConfig> for KeypoolOptions {
    fn from(config: &WalletToolConfig) -> Self {
        Self {
            target: config.keypool_size as usize,
            top_up: config.top_up,
        }
    }
}

/// Wallet store accessor
pub struct WalletStore;

impl WalletStore {
    /// Opens the wallet file at `location`.
    ///
    /// Without `create` a missing file is [`Error::NoSuchWallet`]. With
    /// `create` a missing file is initialised as a new HD wallet with a full
    /// keypool, written in a single commit; an existing one is opened in
    /// place and never truncated.
    pub fn open_or_create(
        location: &WalletLocation,
        create: bool,
        options: &KeypoolOptions,
    ) -> Result<StoreHandle<FileBackend>> {
        debug!(
            wallet = %location.name(),
            path = %location.path().display(),
            create,
            "opening wallet"
        );
        Self::open_or_create_with(
            FileBackend::new(location.path()),
            location.name(),
            create,
            options,
        )
    }

    /// [`WalletStore::open_or_create`] over any backend.
    pub fn open_or_create_with<B: Backend>(
        backend: B,
        name: &str,
        create: bool,
        options: &KeypoolOptions,
    ) -> Result<StoreHandle<B>> {
        let db = Database::open(backend, create).map_err(|err| Error::from_store(name, err))?;

        if db.is_fresh() {
            let wallet = Wallet::load(db, name)?;
            return initialise(wallet, options)
                .map(|wallet| StoreHandle {
                    wallet,
                    created: true,
                    keys_added: 0,
                })
                .map_err(|source| Error::CreateFailed {
                    name: name.to_string(),
                    source: Box::new(source),
                });
        }

        let mut wallet = Wallet::load(db, name)?;
        let mut keys_added = 0;
        if create && options.top_up == KeypoolTopUp::FillToTarget && !wallet.is_crypted() {
            // A failed commit leaves the stored wallet as it was.
            keys_added = wallet
                .top_up_keypool(options.target)
                .map_err(|err| match err {
                    Error::Persistence(source) => Error::Store {
                        name: name.to_string(),
                        source,
                    },
                    other => other,
                })?;
        }

        Ok(StoreHandle {
            wallet,
            created: false,
            keys_added,
        })
    }
}

/// Sets up a freshly created store. The store is removed again if this
/// fails, since the wallet (and with it the store) is dropped uncommitted.
fn initialise<B: Backend>(mut wallet: Wallet<B>, options: &KeypoolOptions) -> Result<Wallet<B>> {
    let mut batch = wallet.batch();
    wallet.set_min_version(&mut batch, feature::HD_SPLIT)?;
    wallet.write_version(&mut batch)?;
    wallet.generate_hd_seed(&mut batch)?;
    let added = wallet.stage_top_up(&mut batch, options.target)?;
    wallet.commit(batch)?;

    info!(
        wallet = %wallet.name(),
        path = %wallet.location().display(),
        keys = added,
        "created new wallet"
    );
    Ok(wallet)
}

/// An open wallet. The store lock is released on drop.
#[derive(Debug)]
pub struct StoreHandle<B: Backend = FileBackend> {
    wallet: Wallet<B>,
    created: bool,
    keys_added: usize,
}

impl<B: Backend> StoreHandle<B> {
    pub fn wallet(&self) -> &Wallet<B> {
        &self.wallet
    }

    pub fn wallet_mut(&mut self) -> &mut Wallet<B> {
        &mut self.wallet
    }

    pub fn name(&self) -> &str {
        self.wallet.name()
    }

    /// Whether this open created the store.
    pub fn is_new(&self) -> bool {
        self.created
    }

    /// Keys added to an existing store's keypool by this open.
    pub fn keys_added(&self) -> usize {
        self.keys_added
    }

    /// Whether this open filled the keypool, either for a new store or by
    /// adding missing keys to an existing one.
    pub fn topped_up(&self) -> bool {
        self.created || self.keys_added > 0
    }
}
