//! End-to-end tests of the `beanval` binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const CONFIG: &str = r#"{"Assets:Inv": ["INVU", "Equity:PnL"]}"#;

/// Deliberately out of order: the deposit comes before the seeding balance.
const LEDGER: &str = r#"[
  {"Transaction": {
    "date": "2024-01-10", "flag": "*", "narration": "Deposit",
    "postings": [
      {"account": "Assets:Bank", "units": {"Complete": {"number": "-500", "currency": "USD"}}},
      {"account": "Assets:Inv", "units": {"Complete": {"number": "500", "currency": "USD"}}}
    ]
  }},
  {"Balance": {
    "date": "2024-01-01", "account": "Assets:Inv",
    "amount": {"number": "1000", "currency": "USD"}
  }},
  {"Custom": {
    "date": "2024-02-01", "custom_type": "valuation",
    "values": [{"Account": "Assets:Inv"}, {"Amount": {"number": "1800", "currency": "USD"}}]
  }}
]"#;

fn write_ledger(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("ledger.json");
    std::fs::write(&path, contents).unwrap();
    path
}

fn beanval(args: &[&str], file: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_beanval"))
        .args(args)
        .arg(file)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run beanval")
}

#[test]
fn test_text_output_prices_units() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_ledger(dir.path(), LEDGER);

    let output = beanval(&["--config", CONFIG], &file);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{stdout}");

    // Anchored at the last directive after sorting.
    assert!(stdout.contains("2024-02-01 commodity INVU"));
    assert!(stdout.contains("2024-01-01 price INVU 1 USD"));
    assert!(stdout.contains("2024-02-01 price INVU 1.2 USD"));
    assert!(stdout.contains("500.0000000 INVU @ 1 USD"));
    assert!(!stdout.contains("balance Assets:Inv"));
}

#[test]
fn test_json_output_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_ledger(dir.path(), LEDGER);

    let output = beanval(&["--config", CONFIG, "--format", "json"], &file);
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let directives = json["directives"].as_array().unwrap();
    // valuation, commodity, two prices, the deposit
    assert_eq!(directives.len(), 5);
    assert!(json["errors"].as_array().unwrap().is_empty());
}

#[test]
fn test_no_sort_reports_sequencing_error() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_ledger(dir.path(), LEDGER);

    // The deposit seeds the unit on first use, so the later balance re-seeds.
    let output = beanval(&["--config", CONFIG, "--no-sort"], &file);
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("error[sequencing]"), "{stdout}");

    let quiet = beanval(&["--config", CONFIG, "--no-sort", "--quiet"], &file);
    assert_eq!(quiet.status.code(), Some(1));
    assert!(!String::from_utf8_lossy(&quiet.stdout).contains("error["));
}

#[test]
fn test_bad_config_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_ledger(dir.path(), LEDGER);

    let output = beanval(&["--config", "[1, 2]"], &file);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("error:"));
}

#[test]
fn test_missing_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let output = beanval(&[], &dir.path().join("absent.json"));
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read"));
}
