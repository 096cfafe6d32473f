//! Locked, loaded record store.

use crate::backend::{Backend, FileBackend};
use crate::{codec, Error, Records, Result, WriteBatch};
use std::path::Path;
use tracing::{debug, warn};

/// An open store.
///
/// The backend lock is held for the lifetime of the value. A store created
/// by [`Database::open`] only appears with its first successful
/// [`Database::commit`]; dropped before that, it leaves nothing behind.
#[derive(Debug)]
pub struct Database<B: Backend = FileBackend> {
    backend: B,
    records: Records,
    fresh: bool,
}

impl<B: Backend> Database<B> {
    /// Locks and loads the store, creating an empty one when `create` is set
    /// and none exists.
    pub fn open(mut backend: B, create: bool) -> Result<Self> {
        let exists = backend.exists();
        if !exists && !create {
            return Err(Error::NotFound(backend.location().to_path_buf()));
        }

        let fresh = !exists;
        backend.try_acquire_lock(fresh)?;

        let records = if fresh {
            Records::new()
        } else {
            codec::decode(&backend.read()?)?
        };

        debug!(
            path = %backend.location().display(),
            records = records.len(),
            fresh,
            "store opened"
        );

        Ok(Self {
            backend,
            records,
            fresh,
        })
    }

    pub fn location(&self) -> &Path {
        self.backend.location()
    }

    pub fn records(&self) -> &Records {
        &self.records
    }

    /// Whether the store was created by this handle and not yet committed.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Applies `batch` and writes the resulting image in one go.
    ///
    /// On failure both the stored image and the in-memory records are left
    /// as they were.
    pub fn commit(&mut self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() && !self.fresh {
            return Ok(());
        }

        let mut next = self.records.clone();
        next.apply(&batch);
        let image = codec::encode(&next)?;
        self.backend.write(&image)?;

        debug!(
            path = %self.backend.location().display(),
            operations = batch.len(),
            bytes = image.len(),
            "store committed"
        );

        self.records = next;
        self.fresh = false;
        Ok(())
    }
}

impl<B: Backend> Drop for Database<B> {
    fn drop(&mut self) {
        if self.fresh {
            if let Err(err) = self.backend.discard() {
                warn!(
                    path = %self.backend.location().display(),
                    error = %err,
                    "failed to remove uncommitted store"
                );
            }
        }
    }
}
