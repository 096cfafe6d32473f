//! Storage backends.
//!
//! A backend stores one opaque image and owns the exclusive lock that keeps
//! a second process (typically a running node) away from the same store.
//! Locks are non-blocking and are released when the backend is dropped.

use crate::{Error, Result};
use fs2::FileExt;
use parking_lot::Mutex;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Lock file kept in every directory that holds wallet files
pub const LOCK_FILE_NAME: &str = ".walletlock";

/// Raw storage with an exclusive lock
pub trait Backend {
    /// Location used in logs and errors
    fn location(&self) -> &Path;

    /// Whether the store exists.
    fn exists(&self) -> bool;

    /// Takes the exclusive lock without waiting.
    ///
    /// With `create` set the store must not exist yet; it comes into
    /// existence with the first [`Backend::write`]. Fails with
    /// [`Error::Locked`] when another holder has the lock and with
    /// [`Error::NotFound`] when the store is missing and `create` is off.
    fn try_acquire_lock(&mut self, create: bool) -> Result<()>;

    /// Reads the whole stored image.
    fn read(&mut self) -> Result<Vec<u8>>;

    /// Replaces the stored image. Either the new image is stored completely
    /// or the previous one is left as it was.
    fn write(&mut self, image: &[u8]) -> Result<()>;

    /// Removes a store created by this handle and releases the lock.
    fn discard(&mut self) -> Result<()>;
}

/// Single-file backend.
///
/// The lock is an advisory OS lock on [`LOCK_FILE_NAME`] in the store's
/// directory, so every wallet file in one directory shares it. Writes go to
/// a sibling temporary file that is synced and then renamed over the store.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    lock: Option<File>,
    created_dirs: Vec<PathBuf>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: None,
            created_dirs: Vec::new(),
        }
    }

    /// Directory holding the store and its lock file.
    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn lock_path(&self) -> PathBuf {
        self.dir().join(LOCK_FILE_NAME)
    }

    /// Where the next image is staged before it replaces the store.
    pub(crate) fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn ensure_locked(&self) -> Result<()> {
        if self.lock.is_some() {
            return Ok(());
        }
        Err(Error::Io(io::Error::new(
            ErrorKind::Other,
            "store accessed before the lock was taken",
        )))
    }

    fn create_parent_dirs(&mut self) -> Result<()> {
        let Some(parent) = self.path.parent() else {
            return Ok(());
        };
        let missing: Vec<PathBuf> = parent
            .ancestors()
            .take_while(|dir| !dir.as_os_str().is_empty() && !dir.exists())
            .map(Path::to_path_buf)
            .collect();
        if !missing.is_empty() {
            fs::create_dir_all(parent)?;
            debug!(dir = %parent.display(), "created wallet directory");
        }
        self.created_dirs = missing;
        Ok(())
    }

    /// Removes the directories made by [`FileBackend::create_parent_dirs`],
    /// innermost first, together with the lock file inside them.
    fn remove_created_dirs(&mut self) {
        if self.created_dirs.first().map(PathBuf::as_path) == Some(self.dir()) {
            if let Err(err) = fs::remove_file(self.lock_path()) {
                if err.kind() != ErrorKind::NotFound {
                    warn!(path = %self.lock_path().display(), error = %err, "could not remove lock file");
                }
            }
        }
        for dir in self.created_dirs.drain(..) {
            if let Err(err) = fs::remove_dir(&dir) {
                warn!(dir = %dir.display(), error = %err, "could not remove wallet directory");
            }
        }
    }

    fn open_lock_file(&self) -> Result<File> {
        let lock_path = self.lock_path();
        let opened = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&lock_path);
        match opened {
            Ok(file) => Ok(file),
            Err(err) if err.kind() == ErrorKind::PermissionDenied && self.exists() => {
                debug!(
                    path = %lock_path.display(),
                    "lock file not writable, locking the store file"
                );
                Ok(File::open(&self.path)?)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn lock(&mut self, create: bool) -> Result<()> {
        if !create && !self.exists() {
            return Err(Error::NotFound(self.path.clone()));
        }

        let lock = self.open_lock_file()?;
        match lock.try_lock_exclusive() {
            Ok(()) => {}
            Err(err) if is_contended(&err) => return Err(Error::Locked(self.path.clone())),
            Err(err) => return Err(err.into()),
        }

        // The store may have come or gone while the lock was held elsewhere.
        match (create, self.exists()) {
            (true, true) => Err(Error::Io(io::Error::new(
                ErrorKind::AlreadyExists,
                "store already exists",
            ))),
            (false, false) => Err(Error::NotFound(self.path.clone())),
            _ => {
                debug!(path = %self.path.display(), "store lock acquired");
                self.lock = Some(lock);
                Ok(())
            }
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

fn write_synced(path: &Path, image: &[u8]) -> io::Result<()> {
    #[cfg(unix)]
    use std::os::unix::fs::OpenOptionsExt;

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(image)?;
    file.sync_all()
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

impl Backend for FileBackend {
    fn location(&self) -> &Path {
        &self.path
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn try_acquire_lock(&mut self, create: bool) -> Result<()> {
        if create {
            self.create_parent_dirs()?;
        }
        let locked = self.lock(create);
        if locked.is_err() {
            self.remove_created_dirs();
        }
        locked
    }

    fn read(&mut self) -> Result<Vec<u8>> {
        self.ensure_locked()?;
        Ok(fs::read(&self.path)?)
    }

    fn write(&mut self, image: &[u8]) -> Result<()> {
        self.ensure_locked()?;
        let temp = self.temp_path();
        let replaced = write_synced(&temp, image).and_then(|()| fs::rename(&temp, &self.path));
        if let Err(err) = replaced {
            if let Err(cleanup) = fs::remove_file(&temp) {
                debug!(path = %temp.display(), error = %cleanup, "temporary image not removed");
            }
            return Err(err.into());
        }
        // The new image is in place; only its directory entry may be unsynced.
        if let Err(err) = sync_dir(self.dir()) {
            warn!(dir = %self.dir().display(), error = %err, "could not sync wallet directory");
        }
        Ok(())
    }

    fn discard(&mut self) -> Result<()> {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != ErrorKind::NotFound {
                return Err(err.into());
            }
        }
        drop(self.lock.take());
        self.remove_created_dirs();
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemorySlot {
    image: Option<Vec<u8>>,
    locked: bool,
}

/// In-memory backend; handles created with [`MemoryBackend::handle`] share
/// the same store and contend for the same lock.
#[derive(Debug)]
pub struct MemoryBackend {
    location: PathBuf,
    slot: Arc<Mutex<MemorySlot>>,
    holds_lock: bool,
}

impl MemoryBackend {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            slot: Arc::new(Mutex::new(MemorySlot::default())),
            holds_lock: false,
        }
    }

    /// Another handle to the same store, not holding the lock.
    pub fn handle(&self) -> Self {
        Self {
            location: self.location.clone(),
            slot: Arc::clone(&self.slot),
            holds_lock: false,
        }
    }

    /// Stored image, if any.
    pub fn image(&self) -> Option<Vec<u8>> {
        self.slot.lock().image.clone()
    }

    /// Replaces the stored image without taking the lock.
    pub fn set_image(&self, image: Vec<u8>) {
        self.slot.lock().image = Some(image);
    }

    fn missing(&self) -> Error {
        Error::NotFound(self.location.clone())
    }
}

impl Backend for MemoryBackend {
    fn location(&self) -> &Path {
        &self.location
    }

    fn exists(&self) -> bool {
        self.slot.lock().image.is_some()
    }

    fn try_acquire_lock(&mut self, create: bool) -> Result<()> {
        let mut slot = self.slot.lock();
        if slot.locked {
            return Err(Error::Locked(self.location.clone()));
        }
        match (create, slot.image.is_some()) {
            (true, true) => {
                return Err(Error::Io(io::Error::new(
                    ErrorKind::AlreadyExists,
                    "store already exists",
                )))
            }
            (false, false) => return Err(self.missing()),
            _ => {}
        }
        slot.locked = true;
        self.holds_lock = true;
        Ok(())
    }

    fn read(&mut self) -> Result<Vec<u8>> {
        self.slot.lock().image.clone().ok_or_else(|| self.missing())
    }

    fn write(&mut self, image: &[u8]) -> Result<()> {
        self.slot.lock().image = Some(image.to_vec());
        Ok(())
    }

    fn discard(&mut self) -> Result<()> {
        let mut slot = self.slot.lock();
        slot.image = None;
        if self.holds_lock {
            slot.locked = false;
            self.holds_lock = false;
        }
        Ok(())
    }
}

impl Drop for MemoryBackend {
    fn drop(&mut self) {
        if self.holds_lock {
            self.slot.lock().locked = false;
        }
    }
}
