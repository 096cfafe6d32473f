//! BIP32 keys of the keypool.
//!
//! Keypool keys live at `m/0'/0'/i'` (external chain) and `m/0'/1'/i'`
//! (internal chain) below the master key of the wallet's HD seed. Only
//! hardened private derivation is used.

use crate::Result;
use bitcoin::bip32::{ChildNumber, DerivationPath, Xpriv};
use bitcoin::Network;
use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::{All, Secp256k1, SecretKey, SECP256K1};
use std::fmt::Write;

/// Account-level chain index of receiving keys
pub const EXTERNAL_CHAIN: u32 = 0;

/// Account-level chain index of change keys
pub const INTERNAL_CHAIN: u32 = 1;

const ACCOUNT: u32 = 0;

fn secp() -> &'static Secp256k1<All> {
    &**SECP256K1
}

/// Master key of an HD seed.
pub fn master_key(seed: &[u8]) -> Result<Xpriv> {
    Ok(Xpriv::new_master(Network::Bitcoin, seed)?)
}

/// Parent of every key on `chain`, `m/0'/chain'`.
pub fn chain_key(master: &Xpriv, chain: u32) -> Result<Xpriv> {
    let path = [
        ChildNumber::from_hardened_idx(ACCOUNT)?,
        ChildNumber::from_hardened_idx(chain)?,
    ];
    Ok(master.derive_priv(secp(), &path)?)
}

/// Hardened child `index` of a chain key. Fails once the hardened range
/// is used up.
pub fn child_key(chain_key: &Xpriv, index: u32) -> Result<Xpriv> {
    let path = [ChildNumber::from_hardened_idx(index)?];
    Ok(chain_key.derive_priv(secp(), &path)?)
}

/// Full path of keypool key `index` on `chain`.
pub fn keypool_path(chain: u32, index: u32) -> Result<DerivationPath> {
    Ok(DerivationPath::from(vec![
        ChildNumber::from_hardened_idx(ACCOUNT)?,
        ChildNumber::from_hardened_idx(chain)?,
        ChildNumber::from_hardened_idx(index)?,
    ]))
}

/// Key path as stored in key metadata, e.g. `m/0'/1'/7'`.
pub fn keypath_string(path: &DerivationPath) -> String {
    let mut out = String::from("m");
    for child in path.as_ref() {
        let _ = write!(out, "/{child}");
    }
    out
}

/// Fresh secret key from the OS RNG.
pub fn generate_secret() -> SecretKey {
    let mut bytes = [0u8; 32];
    loop {
        OsRng.fill_bytes(&mut bytes);
        // Zero and values above the curve order are rejected; retry.
        if let Ok(secret) = SecretKey::from_slice(&bytes) {
            return secret;
        }
    }
}
