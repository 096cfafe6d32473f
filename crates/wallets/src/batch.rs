//! Staged wallet writes.

use crate::records::{
    self, encode_value, HdChain, KeyMetadata, KeyPoolEntry, MasterKey, StoredKey,
};
use crate::Result;
use syswallet_persistence::WriteBatch;

/// Typed writes collected for one commit
#[derive(Debug, Default)]
pub struct WalletBatch {
    inner: WriteBatch,
}

impl WalletBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn write_version(&mut self, version: u32) -> Result<()> {
        self.inner.put(records::version_key(), encode_value(&version)?);
        Ok(())
    }

    pub fn write_min_version(&mut self, version: u32) -> Result<()> {
        self.inner
            .put(records::min_version_key(), encode_value(&version)?);
        Ok(())
    }

    pub fn write_master_key(&mut self, id: u32, key: &MasterKey) -> Result<()> {
        self.inner
            .put(records::master_key_key(id), encode_value(key)?);
        Ok(())
    }

    pub fn write_hd_chain(&mut self, chain: &HdChain) -> Result<()> {
        self.inner.put(records::hd_chain_key(), encode_value(chain)?);
        Ok(())
    }

    /// Writes a plaintext key together with its metadata.
    pub fn write_key(&mut self, pubkey: &[u8], key: &StoredKey, meta: &KeyMetadata) -> Result<()> {
        self.inner.put(records::key_key(pubkey), encode_value(key)?);
        self.inner
            .put(records::key_meta_key(pubkey), encode_value(meta)?);
        Ok(())
    }

    pub fn write_pool(&mut self, index: i64, entry: &KeyPoolEntry) -> Result<()> {
        self.inner.put(records::pool_key(index), encode_value(entry)?);
        Ok(())
    }

    /// Address-book label.
    pub fn write_name(&mut self, address: &str, label: &str) -> Result<()> {
        self.inner.put(records::name_key(address), encode_value(label)?);
        Ok(())
    }

    pub fn write_purpose(&mut self, address: &str, purpose: &str) -> Result<()> {
        self.inner
            .put(records::purpose_key(address), encode_value(purpose)?);
        Ok(())
    }

    /// Stores a serialized wallet transaction as-is.
    pub fn write_tx(&mut self, txid: &[u8; 32], raw: &[u8]) {
        self.inner.put(records::tx_key(txid), raw.to_vec());
    }

    pub fn into_inner(self) -> WriteBatch {
        self.inner
    }
}
