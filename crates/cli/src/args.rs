//! Command-line parsing.
//!
//! Options use the node's single-dash style (`-name`, `-name=value`,
//! `-noname`). Tokens are first classified into flags and bare command
//! tokens; flags are checked against the option registry defined by
//! [`ToolArgs`] and then handed to clap in its `--name=value` form.

use crate::commands::Command;
use crate::{Result, ToolError, BINARY_NAME};
use clap::{CommandFactory, Parser};
use std::convert::Infallible;
use std::ffi::OsString;
use std::fmt::Write as _;
use std::path::PathBuf;
use syswallet_config::{default_data_dir, LogConfig, Network, WalletToolConfig};

/// Flags that request the usage text
const HELP_FLAGS: [&str; 3] = ["help", "h", "?"];

/// Options that take no value in the usage text
const SWITCHES: [&str; 3] = ["testnet", "regtest", "printtoconsole"];

/// Option registry of the wallet tool
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(
    name = BINARY_NAME,
    no_binary_name = true,
    disable_help_flag = true,
    disable_version_flag = true,
    args_override_self = true
)]
pub struct ToolArgs {
    /// Specify data directory
    #[arg(long, value_name = "dir")]
    pub datadir: Option<PathBuf>,

    /// Specify wallet name, resolved inside the wallet directory
    #[arg(long, value_name = "name")]
    pub wallet: Option<String>,

    /// Use the test chain
    #[arg(long, num_args = 0..=1, default_missing_value = "1", value_parser = parse_switch)]
    pub testnet: Option<bool>,

    /// Use the regression test chain
    #[arg(long, num_args = 0..=1, default_missing_value = "1", value_parser = parse_switch)]
    pub regtest: Option<bool>,

    /// Keys to keep ready on each keypool chain when creating a wallet
    #[arg(long, value_name = "n")]
    pub keypool: Option<u32>,

    /// Output debugging information, optionally for one category
    #[arg(long, value_name = "category", num_args = 0..=1, default_missing_value = "1")]
    pub debug: Option<String>,

    /// Send trace/debug info to the console
    #[arg(long, num_args = 0..=1, default_missing_value = "1", value_parser = parse_switch)]
    pub printtoconsole: Option<bool>,
}

/// Boolean switch value: empty or a non-zero number is `true`.
fn parse_switch(value: &str) -> std::result::Result<bool, Infallible> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(true);
    }
    let digits: String = value
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+')))
        .map(|(_, c)| c)
        .collect();
    Ok(digits.parse::<i64>().map_or(false, |n| n != 0))
}

/// What the command line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Print the usage text and exit successfully
    Help,
    /// Run `command` with `config`
    Run {
        command: Command,
        config: WalletToolConfig,
    },
}

/// A classified command-line token
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// `-name[=value]`; `raw` is the token without its value
    Flag {
        raw: String,
        name: String,
        value: Option<String>,
    },
    Bare(String),
}

fn classify(token: String) -> Token {
    if !token.starts_with('-') {
        return Token::Bare(token);
    }
    // `--name` is accepted as a synonym of `-name`.
    let body = token
        .strip_prefix("--")
        .or_else(|| token.strip_prefix('-'))
        .unwrap_or(&token);
    let (name, value) = match body.split_once('=') {
        Some((name, value)) => (name.to_string(), Some(value.to_string())),
        None => (body.to_string(), None),
    };
    let raw = match token.split_once('=') {
        Some((raw, _)) => raw.to_string(),
        None => token.clone(),
    };
    Token::Flag { raw, name, value }
}

fn registry() -> Vec<String> {
    ToolArgs::command()
        .get_arguments()
        .filter_map(|arg| arg.get_long().map(str::to_string))
        .collect()
}

/// Rewrites a single-dash flag into the clap form, resolving `-noname`.
fn normalize(name: &str, value: Option<&str>, known: &[String]) -> Option<String> {
    if known.iter().any(|k| k == name) {
        return Some(match value {
            Some(value) => format!("--{name}={value}"),
            None => format!("--{name}"),
        });
    }
    let negated = name.strip_prefix("no")?;
    if !known.iter().any(|k| k == negated) {
        return None;
    }
    let enabled = value.map_or(true, |v| parse_switch(v).unwrap_or(false));
    Some(format!("--{negated}={}", if enabled { "0" } else { "1" }))
}

fn clap_detail(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let first = rendered.lines().next().unwrap_or_default();
    first.strip_prefix("error: ").unwrap_or(first).to_string()
}

/// Parses the process arguments, program name first.
///
/// Checks run in order: flags, help, network selection, data directory,
/// number of commands, command name, wallet name.
pub fn parse_args<I, T>(args: I) -> Result<Invocation>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let known = registry();
    let mut flags = Vec::new();
    let mut methods = Vec::new();
    let mut help = false;

    for arg in args.into_iter().skip(1) {
        let token = arg
            .into()
            .into_string()
            .map_err(|raw| ToolError::InvalidParameter(raw.to_string_lossy().into_owned()))?;
        match classify(token) {
            Token::Bare(method) => methods.push(method),
            Token::Flag { name, .. } if HELP_FLAGS.contains(&name.as_str()) => help = true,
            Token::Flag { raw, name, value } => {
                let normalized = normalize(&name, value.as_deref(), &known)
                    .ok_or(ToolError::InvalidParameter(raw))?;
                flags.push(normalized);
            }
        }
    }

    let parsed = ToolArgs::try_parse_from(&flags)
        .map_err(|err| ToolError::InvalidValue(clap_detail(&err)))?;

    if help {
        return Ok(Invocation::Help);
    }

    let network = Network::from_flags(
        parsed.regtest.unwrap_or(false),
        parsed.testnet.unwrap_or(false),
    )?;
    let config = build_config(parsed, network);
    config.validate()?;

    let method = match methods.as_slice() {
        [] => return Err(ToolError::MissingCommand),
        [method] => method,
        [first, second, ..] => {
            return Err(ToolError::MultipleCommands(first.clone(), second.clone()))
        }
    };
    let command: Command = method.parse()?;

    if command == Command::Create && !config.wallet_name_set {
        return Err(ToolError::MissingWalletName);
    }

    Ok(Invocation::Run { command, config })
}

fn build_config(parsed: ToolArgs, network: Network) -> WalletToolConfig {
    let defaults = WalletToolConfig::default();
    let debug = parsed.debug.filter(|category| category != "0").map(|category| {
        if category.is_empty() || category == "1" {
            "all".to_string()
        } else {
            category
        }
    });

    WalletToolConfig {
        data_dir: parsed.datadir.unwrap_or_else(default_data_dir),
        network,
        wallet_name_set: parsed.wallet.is_some(),
        wallet_name: parsed.wallet.unwrap_or(defaults.wallet_name),
        keypool_size: parsed.keypool.unwrap_or(defaults.keypool_size),
        top_up: defaults.top_up,
        logging: LogConfig {
            print_to_console: parsed.printtoconsole.unwrap_or(false),
            debug,
        },
    }
}

/// Usage text printed for `-help`
pub fn usage() -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{BINARY_NAME} is an offline tool for creating and interacting with wallet files."
    );
    let _ = writeln!(
        out,
        "By default {BINARY_NAME} will act on wallets in the default mainnet wallet directory in the datadir."
    );
    let _ = writeln!(
        out,
        "To change the target wallet, use the -datadir, -wallet and -testnet/-regtest arguments."
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Usage:");
    let _ = writeln!(out, "  {BINARY_NAME} [options] <command>");
    let _ = writeln!(out);
    let _ = writeln!(out, "Options:");
    let _ = writeln!(out, "  {:<22}{}", "-?", "Print this help message and exit");

    let command = ToolArgs::command();
    for arg in command.get_arguments() {
        let Some(long) = arg.get_long() else {
            continue;
        };
        let value = arg
            .get_value_names()
            .and_then(|names| names.first())
            .map_or_else(|| "value".to_string(), ToString::to_string);
        let flag = if SWITCHES.contains(&long) {
            format!("-{long}")
        } else if arg.get_num_args().map_or(false, |n| n.min_values() == 0) {
            format!("-{long}[=<{value}>]")
        } else {
            format!("-{long}=<{value}>")
        };
        let help = arg.get_help().map(ToString::to_string).unwrap_or_default();
        let _ = writeln!(out, "  {flag:<22}{help}");
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Commands:");
    for command in Command::ALL {
        let _ = writeln!(out, "  {:<22}{}", command.name(), command.about());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use syswallet_config::ConfigError;

    /// Parses `args` behind a `-datadir` that exists; a later `-datadir`
    /// in `args` wins.
    fn parse(args: &[&str]) -> Result<Invocation> {
        let datadir = format!("-datadir={}", std::env::temp_dir().display());
        let argv = [BINARY_NAME, datadir.as_str()]
            .into_iter()
            .chain(args.iter().copied());
        parse_args(argv)
    }

    fn run_config(args: &[&str]) -> (Command, WalletToolConfig) {
        match parse(args).unwrap() {
            Invocation::Run { command, config } => (command, config),
            Invocation::Help => panic!("unexpected help"),
        }
    }

    #[test]
    fn test_info_with_options() {
        let data_dir = tempfile::TempDir::new().unwrap();
        let datadir = format!("-datadir={}", data_dir.path().display());
        let (command, config) = run_config(&[&datadir, "-regtest", "-wallet=foo", "info"]);
        assert_eq!(command, Command::Info);
        assert_eq!(config.data_dir, data_dir.path());
        assert_eq!(config.network, Network::Regtest);
        assert_eq!(config.wallet_name, "foo");
        assert!(config.wallet_name_set);
        assert_eq!(config.keypool_size, 1000);
        assert!(!config.logging.enabled());
    }

    #[test]
    fn test_default_wallet_for_info() {
        let (_, config) = run_config(&["info"]);
        assert_eq!(config.wallet_name, "");
        assert!(!config.wallet_name_set);
        assert_eq!(config.network, Network::Main);
    }

    #[test]
    fn test_flags_may_follow_the_command() {
        let (command, config) = run_config(&["create", "-wallet=foo", "-keypool=5"]);
        assert_eq!(command, Command::Create);
        assert_eq!(config.keypool_size, 5);
    }

    #[test]
    fn test_negated_and_valued_switches() {
        let (_, config) = run_config(&["-regtest", "-noregtest", "-testnet=1", "info"]);
        assert_eq!(config.network, Network::Testnet);

        let (_, config) = run_config(&["-regtest=0", "info"]);
        assert_eq!(config.network, Network::Main);
    }

    #[test]
    fn test_logging_flags() {
        let (_, config) = run_config(&["-debug", "-printtoconsole", "info"]);
        assert_eq!(config.logging.debug.as_deref(), Some("all"));
        assert!(config.logging.print_to_console);

        let (_, config) = run_config(&["-debug=syswallet_wallets", "info"]);
        assert_eq!(config.logging.debug.as_deref(), Some("syswallet_wallets"));

        let (_, config) = run_config(&["-debug", "-nodebug", "info"]);
        assert!(!config.logging.enabled());
    }

    #[test]
    fn test_unknown_flag_is_echoed_without_value() {
        let err = parse(&["-foo"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error parsing command line arguments: Invalid parameter -foo"
        );
        let err = parse(&["-foo=bar", "info"]).unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameter(ref flag) if flag == "-foo"));
    }

    #[test]
    fn test_malformed_value() {
        let err = parse(&["-keypool=abc", "info"]).unwrap_err();
        assert!(matches!(err, ToolError::InvalidValue(_)));
        assert!(err
            .to_string()
            .starts_with("Error parsing command line arguments: "));
    }

    #[test]
    fn test_help_flags() {
        for flag in ["-help", "-h", "-?", "--help"] {
            assert_eq!(parse(&[flag]).unwrap(), Invocation::Help);
        }
        assert_eq!(parse(&["info", "create", "-help"]).unwrap(), Invocation::Help);
        assert!(matches!(
            parse(&["-help", "-foo"]),
            Err(ToolError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_help_is_not_a_command() {
        let err = parse(&["help"]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid command: help");
    }

    #[test]
    fn test_two_methods() {
        let err = parse(&["info", "create"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error: two methods provided (info and create). Only one method should be provided."
        );
        assert!(matches!(
            parse(&["info", "info"]),
            Err(ToolError::MultipleCommands(ref a, ref b)) if a == "info" && b == "info"
        ));
    }

    #[test]
    fn test_no_method() {
        assert!(matches!(parse(&["-regtest"]), Err(ToolError::MissingCommand)));
    }

    #[test]
    fn test_conflicting_networks_checked_before_commands() {
        let err = parse(&["-regtest", "-testnet", "foo", "bar"]).unwrap_err();
        assert!(matches!(
            err,
            ToolError::Config(ConfigError::ConflictingNetworks)
        ));
        assert_eq!(err.to_string(), "Invalid combination of -regtest and -testnet.");
    }

    #[test]
    fn test_missing_data_dir_checked_before_commands() {
        let missing = std::env::temp_dir().join("syswallet-missing-datadir");
        let datadir = format!("-datadir={}", missing.display());
        for args in [vec![datadir.as_str(), "foo"], vec![datadir.as_str(), "info", "create"]] {
            let err = parse(&args).unwrap_err();
            assert!(matches!(err, ToolError::Config(ConfigError::MissingDataDir(_))));
        }

        let err = parse(&[&datadir, "-regtest", "-testnet", "info"]).unwrap_err();
        assert!(matches!(err, ToolError::Config(ConfigError::ConflictingNetworks)));
        assert_eq!(parse(&[&datadir, "-help"]).unwrap(), Invocation::Help);
    }

    #[test]
    fn test_create_requires_wallet_name() {
        let err = parse(&["create"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Wallet name must be provided when creating a new wallet."
        );
        assert!(parse(&["-wallet=", "create"]).is_ok());
    }

    #[test]
    fn test_usage_lists_options_and_commands() {
        let text = usage();
        assert!(text.contains("-datadir=<dir>"));
        assert!(text.contains("-debug[=<category>]"));
        assert!(text.contains("-keypool=<n>"));
        assert!(text.contains("-wallet=<name>"));
        assert!(text.contains("-regtest"));
        assert!(text.contains("create"));
        assert!(text.contains("info"));
        assert!(!text.contains("--"));
    }

    proptest! {
        #[test]
        fn prop_unknown_bare_token_is_invalid_command(token in "[a-zA-Z0-9_.]{1,16}") {
            prop_assume!(token != "create" && token != "info");
            let err = parse(&[token.as_str()]).unwrap_err();
            prop_assert_eq!(err.to_string(), format!("Invalid command: {token}"));
        }

        #[test]
        fn prop_first_two_methods_are_reported(
            first in "[a-z]{1,8}",
            second in "[a-z]{1,8}",
            rest in proptest::collection::vec("[a-z]{1,8}", 0..3),
        ) {
            let mut args = vec![first.as_str(), second.as_str()];
            args.extend(rest.iter().map(String::as_str));
            let is_multiple = matches!(
                parse(&args),
                Err(ToolError::MultipleCommands(ref a, ref b)) if *a == first && *b == second
            );
            prop_assert!(is_multiple);
        }
    }
}
