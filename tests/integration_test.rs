use std::collections::HashMap;
use std::io::Write;
use std::process::{Command, Output};

use anyhow::{anyhow, Result};
use tempfile::NamedTempFile;

fn create_temporary_csv(header: &str, rows: &[&str]) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;

    writeln!(file, "{header}")?;

    for row in rows {
        writeln!(file, "{row}")?;
    }

    file.flush()?;

    Ok(file)
}

fn run_cli(accounts: &[&str], transactions: &[&str], envs: &[(&str, &str)]) -> Result<Output> {
    let accounts_csv = create_temporary_csv("account,balance,owner", accounts)?;
    let transactions_csv = create_temporary_csv("type,origin,destination,amount", transactions)?;

    let output = Command::new(env!("CARGO_BIN_EXE_ledger-engine"))
        .arg(accounts_csv.path())
        .arg(transactions_csv.path())
        .envs(envs.iter().copied())
        .output()?;

    Ok(output)
}

fn balances(output: &Output) -> Result<HashMap<String, String>> {
    let stdout = String::from_utf8(output.stdout.clone())?;
    let mut lines = stdout.lines();

    if lines.next() != Some("account,balance") {
        return Err(anyhow!("Unexpected header in output: {stdout}"));
    }

    let mut results = HashMap::new();

    for line in lines {
        let (account, balance) = line.split_once(',')
            .ok_or_else(|| anyhow!("Malformed output line: {line}"))?;
        results.insert(account.to_string(), balance.to_string());
    }

    Ok(results)
}

#[test]
fn test_cli_outputs_correct_final_balances() -> Result<()> {
    let output = run_cli(
        &["100,100.00,alice", "200,0.00,bob", "300,5.00,carol"],
        &[
            "deposit,100,,50.00",
            "withdrawal,100,,150.00",
            "withdrawal,100,,500.00",
            "transfer,300,200,5.00",
            "withdrawal,200,,-10.00"
        ],
        &[]
    )?;

    assert!(output.status.success());

    let results = balances(&output)?;

    assert_eq!(results.len(), 3);
    assert_eq!(results.get("100").map(String::as_str), Some("0.00"));
    assert_eq!(results.get("200").map(String::as_str), Some("5.00"));
    assert_eq!(results.get("300").map(String::as_str), Some("0.00"));

    Ok(())
}

#[test]
fn test_cli_output_is_sorted_by_account_number() -> Result<()> {
    let output = run_cli(&["300,1.00,c", "100,1.00,a", "200,1.00,b"], &[], &[])?;

    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    let accounts: Vec<&str> = stdout.lines().skip(1).filter_map(|line| line.split(',').next()).collect();

    assert_eq!(accounts, vec!["100", "200", "300"]);

    Ok(())
}

#[test]
fn test_cli_concurrent_withdrawals_never_overdraw() -> Result<()> {
    for lock_mode in ["keyed", "row"] {
        let output = run_cli(
            &["100,100.00,alice"],
            &["withdrawal,100,,100.00"; 5],
            &[("LEDGER_LOCK_MODE", lock_mode), ("LEDGER_MAX_IN_FLIGHT", "8")]
        )?;

        assert!(output.status.success());
        assert_eq!(balances(&output)?.get("100").map(String::as_str), Some("0.00"));
    }

    Ok(())
}

#[test]
fn test_cli_balances_follow_file_order_per_account() -> Result<()> {
    let mut rows = Vec::new();
    for _ in 0..50 {
        rows.push("deposit,100,,1.00");
        rows.push("withdrawal,100,,1.00");
        rows.push("deposit,200,,2.00");
    }
    rows.push("transfer,200,100,100.00");
    rows.push("withdrawal,100,,100.00");

    for lock_mode in ["keyed", "row"] {
        let output = run_cli(&["100,0.00,alice", "200,0.00,bob"], &rows, &[("LEDGER_LOCK_MODE", lock_mode)])?;

        assert!(output.status.success());

        let results = balances(&output)?;

        assert_eq!(results.get("100").map(String::as_str), Some("0.00"));
        assert_eq!(results.get("200").map(String::as_str), Some("0.00"));
    }

    Ok(())
}

#[test]
fn test_cli_rejects_zero_amounts_when_configured() -> Result<()> {
    let output = run_cli(
        &["100,10.00,alice"],
        &["withdrawal,100,,0.00", "deposit,100,,1.00"],
        &[("LEDGER_ALLOW_ZERO_AMOUNT", "false")]
    )?;

    assert!(output.status.success());
    assert_eq!(balances(&output)?.get("100").map(String::as_str), Some("11.00"));

    Ok(())
}

#[test]
fn test_cli_fails_without_required_arguments() -> Result<()> {
    let output = Command::new(env!("CARGO_BIN_EXE_ledger-engine")).output()?;

    assert!(!output.status.success());
    assert!(String::from_utf8(output.stderr)?.contains("Usage"));

    Ok(())
}

#[test]
fn test_cli_fails_for_missing_accounts_file() -> Result<()> {
    let transactions_csv = create_temporary_csv("type,origin,destination,amount", &[])?;

    let output = Command::new(env!("CARGO_BIN_EXE_ledger-engine"))
        .arg("missing_accounts.csv")
        .arg(transactions_csv.path())
        .output()?;

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());

    Ok(())
}
