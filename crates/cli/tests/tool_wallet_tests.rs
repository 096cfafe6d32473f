//! End-to-end tests of the syscoin-wallet binary

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use syswallet_config::WalletLocation;
use syswallet_wallets::{KeypoolOptions, StoreHandle, WalletStore};
use tempfile::TempDir;

const FIXTURE_INFO: &str = "\
Wallet info
===========
Encrypted: no
HD (hd seed available): yes
Keypool Size: 2
Transactions: 0
Address Book: 3
";

/// Regtest data dir with a default wallet holding one key per keypool chain
/// and three address-book entries.
struct Fixture {
    data_dir: TempDir,
}

impl Fixture {
    fn new() -> Result<Self> {
        let data_dir = TempDir::new()?;
        let fixture = Self { data_dir };
        fs::create_dir_all(fixture.wallets_dir())?;

        let mut handle = fixture.open(true, 1)?;
        let wallet = handle.wallet_mut();
        let mut batch = wallet.batch();
        for (address, label) in [("addr1", ""), ("addr2", "savings"), ("addr3", "change")] {
            batch.write_name(address, label)?;
        }
        wallet.commit(batch)?;
        Ok(fixture)
    }

    fn wallets_dir(&self) -> PathBuf {
        self.data_dir.path().join("regtest").join("wallets")
    }

    fn wallet_file(&self) -> PathBuf {
        self.wallets_dir().join("wallet.dat")
    }

    fn open(&self, create: bool, target: usize) -> Result<StoreHandle> {
        let location = WalletLocation::new("wallet.dat", self.wallet_file());
        let options = KeypoolOptions {
            target,
            ..KeypoolOptions::default()
        };
        Ok(WalletStore::open_or_create(&location, create, &options)?)
    }

    fn tool(&self) -> Command {
        let mut cmd = Command::cargo_bin("syscoin-wallet").expect("binary is built");
        cmd.arg(datadir_arg(self.data_dir.path())).arg("-regtest");
        cmd
    }
}

fn datadir_arg(path: &Path) -> String {
    format!("-datadir={}", path.display())
}

fn assert_tool_error(cmd: &mut Command, message: &str) {
    cmd.assert()
        .failure()
        .code(1)
        .stdout("")
        .stderr(format!("{message}\n"));
}

#[test]
fn test_invalid_tool_commands_and_args() -> Result<()> {
    let fixture = Fixture::new()?;

    assert_tool_error(fixture.tool().arg("foo"), "Invalid command: foo");
    // `help` is not a command; use `-help`.
    assert_tool_error(fixture.tool().arg("help"), "Invalid command: help");
    assert_tool_error(
        fixture.tool().args(["info", "create"]),
        "Error: two methods provided (info and create). Only one method should be provided.",
    );
    assert_tool_error(
        fixture.tool().arg("-foo"),
        "Error parsing command line arguments: Invalid parameter -foo",
    );
    assert_tool_error(
        fixture.tool().args(["-wallet=nonexistent.dat", "info"]),
        "Error: no wallet file at nonexistent.dat",
    );
    assert_tool_error(
        fixture.tool().arg("create"),
        "Wallet name must be provided when creating a new wallet.",
    );
    assert_tool_error(
        fixture.tool().args(["-testnet", "info"]),
        "Invalid combination of -regtest and -testnet.",
    );
    assert_tool_error(
        &mut fixture.tool(),
        "No method provided. Run `syscoin-wallet -help` for valid methods.",
    );
    assert!(!fixture.wallets_dir().join("nonexistent.dat").exists());
    Ok(())
}

#[test]
fn test_locked_wallet_is_reported() -> Result<()> {
    let fixture = Fixture::new()?;
    let _held = fixture.open(false, 1)?;

    assert_tool_error(
        fixture.tool().args(["-wallet=wallet.dat", "info"]),
        "Error loading wallet.dat. Is wallet being used by other process?",
    );
    assert_tool_error(
        fixture.tool().args(["-wallet=wallet.dat", "create"]),
        "Error loading wallet.dat. Is wallet being used by other process?",
    );
    Ok(())
}

#[test]
fn test_info_does_not_modify_the_wallet() -> Result<()> {
    let fixture = Fixture::new()?;
    let before = fs::read(fixture.wallet_file())?;

    for _ in 0..2 {
        fixture
            .tool()
            .arg("info")
            .assert()
            .success()
            .stdout(FIXTURE_INFO)
            .stderr("");
    }

    assert_eq!(fs::read(fixture.wallet_file())?, before);
    Ok(())
}

#[test]
fn test_info_counts_new_transactions() -> Result<()> {
    let fixture = Fixture::new()?;
    {
        let mut handle = fixture.open(false, 1)?;
        let wallet = handle.wallet_mut();
        let mut batch = wallet.batch();
        batch.write_tx(&[0x42; 32], b"serialized wallet tx");
        wallet.commit(batch)?;
    }

    fixture
        .tool()
        .arg("info")
        .assert()
        .success()
        .stdout(FIXTURE_INFO.replace("Transactions: 0", "Transactions: 1"));
    Ok(())
}

#[test]
fn test_create_new_wallet() -> Result<()> {
    let fixture = Fixture::new()?;

    fixture
        .tool()
        .args(["-wallet=foo", "create"])
        .assert()
        .success()
        .stdout(
            "Topping up keypool...\n\
             Wallet info\n\
             ===========\n\
             Encrypted: no\n\
             HD (hd seed available): yes\n\
             Keypool Size: 2000\n\
             Transactions: 0\n\
             Address Book: 0\n",
        )
        .stderr("");

    let location = WalletLocation::new("foo", fixture.wallets_dir().join("foo").join("wallet.dat"));
    let handle = WalletStore::open_or_create(&location, false, &KeypoolOptions::default())?;
    let wallet = handle.wallet();
    assert_eq!(wallet.external_keypool_size(), 1000);
    assert_eq!(wallet.internal_keypool_size(), 1000);
    assert!(wallet.hd_seed_id().is_some());
    Ok(())
}

#[test]
fn test_create_with_keypool_target() -> Result<()> {
    let fixture = Fixture::new()?;

    fixture
        .tool()
        .args(["-wallet=small", "-keypool=10", "create"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Keypool Size: 20\n"));

    // Creating again opens the existing wallet; nothing is missing.
    fixture
        .tool()
        .args(["-wallet=small", "-keypool=10", "create"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Wallet info\n"));

    fixture
        .tool()
        .args(["-wallet=small", "-keypool=15", "create"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Topping up keypool...\n"))
        .stdout(predicate::str::contains("Keypool Size: 30\n"));
    Ok(())
}

#[test]
fn test_failed_top_up_keeps_existing_wallet() -> Result<()> {
    let fixture = Fixture::new()?;
    fixture
        .tool()
        .args(["-wallet=foo", "-keypool=100", "create"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Keypool Size: 200\n"));

    let wallet_file = fixture.wallets_dir().join("foo").join("wallet.dat");
    let before = fs::read(&wallet_file)?;
    let staging = fixture.wallets_dir().join("foo").join("wallet.dat.tmp");
    fs::create_dir(&staging)?;

    fixture
        .tool()
        .args(["-wallet=foo", "-keypool=500", "create"])
        .assert()
        .failure()
        .code(1)
        .stdout("")
        .stderr(predicate::str::starts_with("Error loading foo: "));
    assert_eq!(fs::read(&wallet_file)?, before);

    fs::remove_dir(&staging)?;
    fixture
        .tool()
        .args(["-wallet=foo", "info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Keypool Size: 200\n"));
    Ok(())
}

#[test]
fn test_corrupt_wallet_is_reported() -> Result<()> {
    let fixture = Fixture::new()?;
    let broken = fixture.wallets_dir().join("broken");
    fs::create_dir_all(&broken)?;
    fs::write(broken.join("wallet.dat"), b"garbage")?;

    assert_tool_error(
        fixture.tool().args(["-wallet=broken", "info"]),
        "Error loading broken: Wallet corrupted",
    );
    Ok(())
}

#[test]
fn test_help_prints_usage() -> Result<()> {
    let fixture = Fixture::new()?;
    fixture
        .tool()
        .args(["-help", "info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("-wallet=<name>"))
        .stderr("");
    Ok(())
}

#[test]
fn test_missing_data_dir() -> Result<()> {
    let data_dir = TempDir::new()?;
    let missing = data_dir.path().join("missing");

    let message = format!(
        "Error: Specified data directory \"{}\" does not exist.",
        missing.display()
    );
    for method in ["info", "foo"] {
        let mut cmd = Command::cargo_bin("syscoin-wallet")?;
        cmd.arg(datadir_arg(&missing)).arg(method);
        assert_tool_error(&mut cmd, &message);
    }
    Ok(())
}

#[test]
fn test_debug_logging_goes_to_stderr() -> Result<()> {
    let fixture = Fixture::new()?;
    fixture
        .tool()
        .args(["-debug", "info"])
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .stdout(FIXTURE_INFO)
        .stderr(predicate::str::is_empty().not());
    Ok(())
}
