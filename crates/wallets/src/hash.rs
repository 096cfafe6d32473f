//! Hash helpers used for key ids and record checksums.

use bitcoin::hashes::{hash160, Hash};
use sha2::Digest;

pub trait Sha256 {
    fn sha256(&self) -> [u8; 32];
}

impl<T: AsRef<[u8]>> Sha256 for T {
    #[inline]
    fn sha256(&self) -> [u8; 32] {
        let mut h = sha2::Sha256::new();
        h.update(self);
        h.finalize().into()
    }
}

/// RIPEMD-160 of SHA-256, the id of a public key
pub trait Hash160 {
    fn hash160(&self) -> [u8; 20];
}

impl<T: AsRef<[u8]>> Hash160 for T {
    #[inline]
    fn hash160(&self) -> [u8; 20] {
        hash160::Hash::hash(self.as_ref()).to_byte_array()
    }
}

/// Double SHA-256
pub trait Hash256 {
    fn hash256(&self) -> [u8; 32];
}

impl<T: AsRef<[u8]>> Hash256 for T {
    #[inline]
    fn hash256(&self) -> [u8; 32] {
        self.sha256().sha256()
    }
}

/// Double SHA-256 over the concatenation of `parts`.
pub fn hash256_parts(parts: &[&[u8]]) -> [u8; 32] {
    let mut h = sha2::Sha256::new();
    for part in parts {
        h.update(part);
    }
    let first: [u8; 32] = h.finalize().into();
    first.sha256()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_empty() {
        assert_eq!(
            hex::encode(b"".sha256()),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_hash256_parts_matches_concatenation() {
        let joined = [b"abc".as_slice(), b"def".as_slice()].concat();
        assert_eq!(hash256_parts(&[b"abc", b"def"]), joined.hash256());
    }

    #[test]
    fn test_hash160_empty() {
        assert_eq!(
            hex::encode(b"".hash160()),
            "b472a266d0bd89c13706a4132ccfb16f7c3b9fcb"
        );
        assert_ne!(b"syscoin".hash160(), b"syscoin!".hash160());
    }
}
