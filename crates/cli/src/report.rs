//! Text written to stdout.

use crate::commands::{CommandOutput, InfoReport};
use std::fmt;

/// Printed before the report when keys were added to the keypool
pub const TOP_UP_NOTICE: &str = "Topping up keypool...";

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

impl fmt::Display for InfoReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Wallet info")?;
        writeln!(f, "===========")?;
        writeln!(f, "Encrypted: {}", yes_no(self.encrypted))?;
        writeln!(f, "HD (hd seed available): {}", yes_no(self.hd))?;
        writeln!(f, "Keypool Size: {}", self.keypool_size)?;
        writeln!(f, "Transactions: {}", self.transactions)?;
        writeln!(f, "Address Book: {}", self.address_book)
    }
}

/// Complete stdout text of a command: notices, then the report.
pub fn render(output: &CommandOutput) -> String {
    let mut out = String::new();
    for notice in &output.notices {
        out.push_str(notice);
        out.push('\n');
    }
    out.push_str(&output.report.to_string());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> InfoReport {
        InfoReport {
            encrypted: false,
            hd: true,
            keypool_size: 2,
            transactions: 1,
            address_book: 3,
        }
    }

    #[test]
    fn test_report_block() {
        assert_eq!(
            report().to_string(),
            "Wallet info\n\
             ===========\n\
             Encrypted: no\n\
             HD (hd seed available): yes\n\
             Keypool Size: 2\n\
             Transactions: 1\n\
             Address Book: 3\n"
        );
    }

    #[test]
    fn test_notices_precede_report() {
        let output = CommandOutput {
            notices: vec![TOP_UP_NOTICE.to_string()],
            report: InfoReport {
                encrypted: true,
                hd: false,
                keypool_size: 2000,
                transactions: 0,
                address_book: 0,
            },
        };
        let text = render(&output);
        assert!(text.starts_with("Topping up keypool...\nWallet info\n"));
        assert!(text.contains("Encrypted: yes\nHD (hd seed available): no\n"));
        assert!(text.ends_with("Address Book: 0\n"));
    }
}
