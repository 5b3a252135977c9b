use super::async_engine::EngineReport;
use super::ordering::OrderingTable;
use super::{load_accounts, AsyncEngine};

use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tempfile::NamedTempFile;
use tokio::time::{sleep, timeout};

use crate::locks::{build_lock_manager, LockKeys, LockMode};
use crate::processor::LedgerProcessor;
use crate::storage::{Gateway, MemoryStore};
use crate::types::AccountNumber;

fn create_temporary_csv(header: &str, rows: &[&str]) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;

    writeln!(file, "{header}")?;

    for row in rows {
        writeln!(file, "{row}")?;
    }

    file.flush()?;

    Ok(file)
}

fn number(value: &str) -> Result<AccountNumber> {
    Ok(AccountNumber::from_str(value)?)
}

fn path_of(file: &NamedTempFile) -> String {
    file.path().to_string_lossy().to_string()
}

async fn seeded(mode: LockMode, accounts: &[&str]) -> Result<(MemoryStore, AsyncEngine)> {
    let store = MemoryStore::for_lock_mode(mode);

    let accounts_csv = create_temporary_csv("account,balance,owner", accounts)?;
    load_accounts(&store, &path_of(&accounts_csv)).await?;

    let processor = LedgerProcessor::new(Arc::new(store.clone()), build_lock_manager(mode))?;
    let engine = AsyncEngine::new(Arc::new(processor));

    Ok((store, engine))
}

async fn balance_of(store: &MemoryStore, account_number: &str) -> Result<String> {
    let account = store.fetch(&AccountNumber::from_str(account_number)?).await?
        .ok_or_else(|| anyhow!("Account [{account_number}] missing from storage"))?;

    Ok(account.balance.to_string())
}

#[tokio::test]
async fn test_engine_processes_valid_csv_stream_successfully() -> Result<()> {
    let (store, engine) = seeded(LockMode::Keyed, &["100,100.00,alice", "200,0.00,bob"]).await?;

    let transactions = create_temporary_csv("type,origin,destination,amount", &[
        "deposit,100,,50.00",
        "withdrawal,100,,20",
        "transfer,100,200,30.50"
    ])?;

    let report = engine.run(&path_of(&transactions)).await?;

    assert_eq!(report.committed, 3);
    assert_eq!(report.rejected_total(), 0);
    assert_eq!(balance_of(&store, "100").await?, "99.50");
    assert_eq!(balance_of(&store, "200").await?, "30.50");
    assert_eq!(store.journal().await?.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_engine_counts_rejections_by_code() -> Result<()> {
    let (store, engine) = seeded(LockMode::Keyed, &["100,100.00,alice"]).await?;

    let transactions = create_temporary_csv("type,origin,destination,amount", &[
        "withdrawal,100,,150.00",
        "withdrawal,100,,-10.00",
        "deposit,999,,10.00",
        "transfer,100,,10.00",
        "deposit,100,200,10.00"
    ])?;

    let report = engine.run(&path_of(&transactions)).await?;

    assert_eq!(report.committed, 0);
    assert_eq!(report.rejected.get("insufficient_balance"), Some(&1));
    assert_eq!(report.rejected.get("negative_amount"), Some(&1));
    assert_eq!(report.rejected.get("account_not_found"), Some(&1));
    assert_eq!(report.rejected.get("missing_destination"), Some(&1));
    assert_eq!(report.rejected.get("unexpected_destination"), Some(&1));
    assert_eq!(balance_of(&store, "100").await?, "100.00");

    Ok(())
}

#[tokio::test]
async fn test_engine_gracefully_skips_malformed_csv_input() -> Result<()> {
    let (store, engine) = seeded(LockMode::Keyed, &["100,0.00,alice"]).await?;

    let transactions = create_temporary_csv("type,origin,destination,amount", &[
        "deposit,100,,10.00",
        "refund,100,,1.00",
        "deposit,1x0,,1.00",
        "deposit,100,,1.001",
        "deposit,100,,5.00"
    ])?;

    let report = engine.run(&path_of(&transactions)).await?;

    assert_eq!(report.malformed, 3);
    assert_eq!(report.committed, 2);
    assert_eq!(balance_of(&store, "100").await?, "15.00");

    Ok(())
}

#[tokio::test]
async fn test_engine_handles_missing_csv_file_without_error() -> Result<()> {
    let (store, engine) = seeded(LockMode::Keyed, &["100,1.00,alice"]).await?;

    let report = engine.run("missing.csv").await?;

    assert_eq!(report, EngineReport::default());
    assert_eq!(balance_of(&store, "100").await?, "1.00");

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_engine_concurrent_withdrawals_never_overdraw() -> Result<()> {
    for mode in [LockMode::Keyed, LockMode::Row] {
        let (store, engine) = seeded(mode, &["100,100.00,alice"]).await?;
        let rows = vec!["withdrawal,100,,100.00"; 5];
        let transactions = create_temporary_csv("type,origin,destination,amount", &rows)?;

        let report = engine.with_max_in_flight(5).run(&path_of(&transactions)).await?;

        assert_eq!(report.committed, 1);
        assert_eq!(report.rejected.get("insufficient_balance"), Some(&4));
        assert_eq!(balance_of(&store, "100").await?, "0.00");
    }

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_engine_crossing_transfers_conserve_total() -> Result<()> {
    let (store, engine) = seeded(LockMode::Keyed, &["100,1000.00,alice", "200,1000.00,bob", "300,1000.00,carol"]).await?;

    let mut rows = Vec::new();
    for index in 0..300 {
        rows.push(match index % 3 {
            0 => "transfer,100,200,3.00",
            1 => "transfer,200,300,2.00",
            _ => "transfer,300,100,1.00"
        });
    }

    let transactions = create_temporary_csv("type,origin,destination,amount", &rows)?;
    let report = engine.with_max_in_flight(32).run(&path_of(&transactions)).await?;

    assert_eq!(report.committed, 300);

    let total: i64 = store.accounts().await?.iter().map(|account| account.balance.cents()).sum();
    assert_eq!(total, 300_000);
    assert_eq!(balance_of(&store, "100").await?, "800.00");
    assert_eq!(balance_of(&store, "200").await?, "1100.00");
    assert_eq!(balance_of(&store, "300").await?, "1100.00");

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_engine_keeps_file_order_on_a_shared_account() -> Result<()> {
    let mut rows = Vec::new();
    for _ in 0..50 {
        rows.push("deposit,100,,1.00");
        rows.push("withdrawal,100,,1.00");
    }

    let transactions = create_temporary_csv("type,origin,destination,amount", &rows)?;

    for mode in [LockMode::Keyed, LockMode::Row] {
        for _ in 0..10 {
            let (store, engine) = seeded(mode, &["100,0.00,alice"]).await?;
            let report = engine.run(&path_of(&transactions)).await?;

            assert_eq!(report.committed, 100);
            assert_eq!(report.rejected_total(), 0);
            assert_eq!(balance_of(&store, "100").await?, "0.00");
        }
    }

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_engine_keeps_file_order_across_chained_transfers() -> Result<()> {
    let mut rows = Vec::new();
    for _ in 0..30 {
        rows.push("transfer,100,200,10.00");
        rows.push("transfer,200,300,10.00");
        rows.push("transfer,300,100,10.00");
    }

    let transactions = create_temporary_csv("type,origin,destination,amount", &rows)?;

    for _ in 0..10 {
        let (store, engine) = seeded(LockMode::Keyed, &["100,10.00,alice", "200,0.00,bob", "300,0.00,carol"]).await?;
        let report = engine.run(&path_of(&transactions)).await?;

        assert_eq!(report.committed, 90);
        assert_eq!(balance_of(&store, "100").await?, "10.00");
        assert_eq!(balance_of(&store, "200").await?, "0.00");
        assert_eq!(balance_of(&store, "300").await?, "0.00");
    }

    Ok(())
}

#[test]
fn test_ordering_table_chains_only_shared_accounts() -> Result<()> {
    let mut table = OrderingTable::new();

    let (first, none) = table.enqueue(&LockKeys::new(&[number("100")?]));
    let (second, disjoint) = table.enqueue(&LockKeys::new(&[number("200")?]));
    let (third, both) = table.enqueue(&LockKeys::new(&[number("200")?, number("100")?]));

    assert!(none.is_empty());
    assert!(disjoint.is_empty());
    assert_eq!(both.len(), 2);
    assert_eq!(table.tracked_accounts(), 2);

    drop(first);
    drop(second);

    let (fourth, behind_third) = table.enqueue(&LockKeys::new(&[number("100")?]));
    assert_eq!(behind_third.len(), 1);

    drop(third);
    drop(fourth);
    table.prune();

    assert_eq!(table.tracked_accounts(), 0);

    Ok(())
}

#[tokio::test]
async fn test_predecessors_resolve_when_earlier_request_finishes() -> Result<()> {
    let mut table = OrderingTable::new();

    let (turn, _) = table.enqueue(&LockKeys::new(&[number("100")?]));
    let (_next, predecessors) = table.enqueue(&LockKeys::new(&[number("100")?]));

    let waiting = tokio::spawn(predecessors.wait());

    sleep(Duration::from_millis(50)).await;
    assert!(!waiting.is_finished());

    drop(turn);

    timeout(Duration::from_secs(1), waiting).await??;

    Ok(())
}

#[tokio::test]
async fn test_load_accounts_skips_invalid_rows() -> Result<()> {
    let store = MemoryStore::new();
    let accounts = create_temporary_csv("account,balance,owner", &[
        "100,10.00,alice",
        "100,20.00,duplicate",
        "200,-1.00,negative",
        "12,5.00,short",
        "300,7.5,"
    ])?;

    let opened = load_accounts(&store, &path_of(&accounts)).await?;

    assert_eq!(opened, 2);

    let stored = store.accounts().await?;
    let numbers: Vec<&str> = stored.iter().map(|account| account.account_number.as_str()).collect();

    assert_eq!(numbers, vec!["100", "300"]);
    assert_eq!(stored[0].owner_ref, "alice");
    assert_eq!(stored[1].balance.to_string(), "7.50");

    Ok(())
}

#[tokio::test]
async fn test_load_accounts_fails_for_missing_file() {
    let store = MemoryStore::new();

    assert!(load_accounts(&store, "missing_accounts.csv").await.is_err());
}
