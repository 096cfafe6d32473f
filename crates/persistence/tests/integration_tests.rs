//! Integration tests for the file-backed record store.

use std::fs;
use syswallet_persistence::*;
use tempfile::TempDir;

fn put(db: &mut Database, tag: &str, id: &[u8], value: &[u8]) {
    let mut batch = WriteBatch::new();
    batch.put(RecordKey::new(tag, id.to_vec()), value.to_vec());
    db.commit(batch).unwrap();
}

#[test]
fn test_store_lifecycle_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("wallets").join("foo").join("wallet.dat");

    let mut db = Database::open(FileBackend::new(&path), true).unwrap();
    put(&mut db, "name", b"addr1", b"first");
    put(&mut db, "name", b"addr2", b"second");
    put(&mut db, "tx", &[3; 32], b"raw");
    drop(db);

    let image = fs::read(&path).unwrap();
    assert_eq!(&image[..8], &MAGIC);

    let db = Database::open(FileBackend::new(&path), false).unwrap();
    assert_eq!(db.records().count_tag("name"), 2);
    assert_eq!(db.records().count_tag("tx"), 1);
    assert_eq!(
        db.records().get(&RecordKey::new("name", b"addr2".to_vec())),
        Some(&b"second"[..])
    );
}

#[test]
fn test_second_open_reports_lock_conflict() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("wallet.dat");

    let mut holder = Database::open(FileBackend::new(&path), true).unwrap();
    put(&mut holder, "version", b"", &[1, 0, 0, 0]);

    assert!(matches!(
        Database::open(FileBackend::new(&path), false),
        Err(Error::Locked(_))
    ));
    assert!(matches!(
        Database::open(FileBackend::new(&path), true),
        Err(Error::Locked(_))
    ));

    drop(holder);
    assert!(Database::open(FileBackend::new(&path), false).is_ok());
}

#[test]
fn test_failed_initialisation_leaves_nothing_behind() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("fresh");
    let path = dir.join("wallet.dat");

    let db = Database::open(FileBackend::new(&path), true).unwrap();
    assert!(dir.join(LOCK_FILE_NAME).is_file());
    assert!(!path.exists());
    drop(db);

    assert!(!path.exists());
    assert!(!dir.exists());
}

#[test]
fn test_interrupted_commit_leaves_previous_image_readable() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("wallet.dat");

    let mut db = Database::open(FileBackend::new(&path), true).unwrap();
    put(&mut db, "name", b"addr1", b"first");
    drop(db);

    // What a crash between staging and renaming leaves behind.
    let staged = temp_dir.path().join("wallet.dat.tmp");
    fs::write(&staged, b"half-written image").unwrap();

    let mut db = Database::open(FileBackend::new(&path), false).unwrap();
    assert_eq!(db.records().count_tag("name"), 1);

    // Staging fails outright when the temporary path cannot be written.
    fs::remove_file(&staged).unwrap();
    fs::create_dir(&staged).unwrap();
    let mut batch = WriteBatch::new();
    batch.put(RecordKey::new("name", b"addr2".to_vec()), b"second".to_vec());
    assert!(matches!(db.commit(batch), Err(Error::Io(_))));
    drop(db);

    let db = Database::open(FileBackend::new(&path), false).unwrap();
    assert_eq!(db.records().count_tag("name"), 1);
    assert_eq!(
        db.records().get(&RecordKey::new("name", b"addr1".to_vec())),
        Some(&b"first"[..])
    );
}

#[test]
fn test_truncated_file_is_corrupt() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("wallet.dat");

    let mut db = Database::open(FileBackend::new(&path), true).unwrap();
    put(&mut db, "tx", &[9; 32], &[0; 64]);
    drop(db);

    let image = fs::read(&path).unwrap();
    fs::write(&path, &image[..image.len() - 10]).unwrap();

    assert!(matches!(
        Database::open(FileBackend::new(&path), false),
        Err(Error::Corrupt(_))
    ));
}
