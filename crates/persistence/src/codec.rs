//! On-disk image of a record store.
//!
//! Layout (bincode, fixed-width integers, little endian):
//!
//! ```text
//! magic: [u8; 8] | version: u32 | records: Vec<(key, value)> | checksum: [u8; 32]
//! ```
//!
//! The checksum is the SHA-256 of the encoded record list.

use crate::{Error, Records, Result};
use bincode::Options;
use sha2::{Digest, Sha256};

/// File signature
pub const MAGIC: [u8; 8] = *b"SYSWLT\r\n";

/// Current image format version
pub const FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 12;
const MAX_IMAGE_SIZE: u64 = 256 * 1024 * 1024;

type Entries = Vec<(Vec<u8>, Vec<u8>)>;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_IMAGE_SIZE)
        .reject_trailing_bytes()
}

fn checksum(encoded_entries: &[u8]) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(encoded_entries);
    h.finalize().into()
}

/// Encodes `records` into a complete file image.
pub fn encode(records: &Records) -> Result<Vec<u8>> {
    let entries = records.to_entries();
    let encoded_entries = options().serialize(&entries)?;
    let sum = checksum(&encoded_entries);

    let mut out = options().serialize(&(MAGIC, FORMAT_VERSION))?;
    out.extend_from_slice(&encoded_entries);
    out.extend_from_slice(&sum);
    Ok(out)
}

/// Decodes a file image produced by [`encode`].
pub fn decode(bytes: &[u8]) -> Result<Records> {
    if bytes.is_empty() {
        return Err(Error::Corrupt("empty store".to_string()));
    }
    if bytes.len() < HEADER_LEN + 32 {
        return Err(Error::Corrupt("truncated store".to_string()));
    }

    let (magic, version): ([u8; 8], u32) = options()
        .deserialize(&bytes[..HEADER_LEN])
        .map_err(|e| Error::Corrupt(format!("unreadable header: {e}")))?;
    if magic != MAGIC {
        return Err(Error::Corrupt("bad file signature".to_string()));
    }
    if version > FORMAT_VERSION {
        return Err(Error::UnsupportedFormat(version));
    }

    let (body, sum) = bytes[HEADER_LEN..].split_at(bytes.len() - HEADER_LEN - 32);
    if checksum(body) != sum {
        return Err(Error::Corrupt("checksum mismatch".to_string()));
    }

    let entries: Entries = options()
        .deserialize(body)
        .map_err(|e| Error::Corrupt(format!("unreadable records: {e}")))?;
    Ok(Records::from_entries(entries))
}
