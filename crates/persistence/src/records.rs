//! Record keys and the in-memory record map.

use crate::{BatchOperation, WriteBatch};
use std::collections::BTreeMap;

/// Key of a stored record: a type tag followed by a type-specific id.
///
/// Encoded as `[tag length: u8][tag][id]`, so all records of one tag share a
/// unique byte prefix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    tag: String,
    id: Vec<u8>,
}

impl RecordKey {
    /// Creates a key. Tags longer than 255 bytes are truncated on encode.
    pub fn new(tag: impl Into<String>, id: Vec<u8>) -> Self {
        Self {
            tag: tag.into(),
            id,
        }
    }

    /// Key of a singleton record such as `version`.
    pub fn singleton(tag: impl Into<String>) -> Self {
        Self::new(tag, Vec::new())
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn id(&self) -> &[u8] {
        &self.id
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = tag_prefix(&self.tag);
        out.extend_from_slice(&self.id);
        out
    }

    /// Decodes an encoded key; `None` when the bytes are not a valid key.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let (&len, rest) = bytes.split_first()?;
        let len = len as usize;
        if rest.len() < len {
            return None;
        }
        let tag = std::str::from_utf8(&rest[..len]).ok()?;
        Some(Self::new(tag, rest[len..].to_vec()))
    }
}

fn tag_prefix(tag: &str) -> Vec<u8> {
    let bytes = tag.as_bytes();
    let len = bytes.len().min(u8::MAX as usize);
    let mut out = Vec::with_capacity(1 + len);
    out.push(len as u8);
    out.extend_from_slice(&bytes[..len]);
    out
}

/// Sorted map of encoded keys to raw values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Records {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl Records {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_entries(entries: Vec<(Vec<u8>, Vec<u8>)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub(crate) fn to_entries(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn get(&self, key: &RecordKey) -> Option<&[u8]> {
        self.entries.get(&key.encode()).map(Vec::as_slice)
    }

    /// Iterates `(id, value)` pairs of every record with `tag`, in key order.
    pub fn iter_tag<'a>(&'a self, tag: &str) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + 'a {
        let prefix = tag_prefix(tag);
        let skip = prefix.len();
        self.entries
            .range(prefix.clone()..)
            .take_while(move |(key, _)| key.starts_with(&prefix))
            .map(move |(key, value)| (&key[skip..], value.as_slice()))
    }

    /// Number of records with `tag`.
    pub fn count_tag(&self, tag: &str) -> usize {
        self.iter_tag(tag).count()
    }

    /// Iterates every record as a decoded key and raw value.
    ///
    /// Keys that do not decode are skipped.
    pub fn iter(&self) -> impl Iterator<Item = (RecordKey, &[u8])> + '_ {
        self.entries
            .iter()
            .filter_map(|(key, value)| RecordKey::decode(key).map(|k| (k, value.as_slice())))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn apply(&mut self, batch: &WriteBatch) {
        for operation in batch.operations() {
            match operation {
                BatchOperation::Put { key, value } => {
                    self.entries.insert(key.clone(), value.clone());
                }
                BatchOperation::Delete { key } => {
                    self.entries.remove(key);
                }
            }
        }
    }
}
