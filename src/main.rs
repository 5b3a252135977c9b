mod balance;
mod config;
mod engine;
mod locks;
mod models;
mod processor;
mod storage;
mod types;

use std::io::{stderr, stdout, BufWriter, Write};
use std::process::exit;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tracing::{info, warn};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use crate::config::{parse_log_level, LedgerConfig};
use crate::engine::{load_accounts, AsyncEngine};
use crate::locks::build_lock_manager;
use crate::processor::LedgerProcessor;
use crate::storage::MemoryStore;

#[tokio::main]
async fn main() -> Result<()> {
    //NOTE: If I was making a much more sophisticated CLI application, I would have used the clap crate
    //      to handle the CLI parsing and execution.
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: ledger-engine [accounts].csv [transactions].csv [log_level:optional] > [balances].csv");
        eprintln!("Available log levels: error, warn, info, debug, trace (default: error)");
        exit(1);
    }

    let config = LedgerConfig::load()?;

    let log_level = args.get(3)
        .map(|s| parse_log_level(s))
        .unwrap_or_else(|| config.level_filter());

    setup_logging(log_level);

    let store = MemoryStore::for_lock_mode(config.lock_mode);

    let locks = build_lock_manager(config.lock_mode);
    let lock_name = locks.name();

    let opened = load_accounts(&store, &args[1]).await?;
    info!("Opened [{opened}] accounts");

    let processor = LedgerProcessor::new(Arc::new(store.clone()), locks)?
        .with_lock_timeout(config.lock_timeout())
        .with_amount_policy(config.amount_policy());

    info!("Using [{lock_name}] lock manager with a [{:?}] lock timeout", processor.lock_timeout());

    let engine = AsyncEngine::new(Arc::new(processor))
        .with_max_in_flight(config.max_in_flight());

    let timer = Instant::now();
    let report = engine.run(&args[2]).await?;
    let duration = timer.elapsed();

    info!("Processed transactions in: {duration:?}");
    info!(
        "Committed [{}], rejected [{}] {:?} of which retryable [{}], malformed [{}], crashed [{}]",
        report.committed,
        report.rejected_total(),
        report.rejected,
        report.retryable,
        report.malformed,
        report.crashed
    );

    let journal = store.journal().await?;

    if journal.len() == report.committed {
        info!("Journal holds [{}] entries", journal.len());
    } else {
        warn!("Journal holds [{}] entries but [{}] requests committed", journal.len(), report.committed);
    }

    write_results_to_stdout(&store).await?;
    store.close();

    Ok(())
}

fn setup_logging(level: LevelFilter) {
    //NOTE: Because we are doing stdout redirection, we will need to utilize stderr to display logging
    let terminal_log = fmt::layer()
        .with_target(false)
        .with_writer(stderr)
        .with_filter(level);

    tracing_subscriber::registry()
        .with(terminal_log)
        .init();
}

async fn write_results_to_stdout(store: &MemoryStore) -> Result<()> {
    let accounts = store.accounts().await?;
    let mut output = BufWriter::new(stdout().lock());

    writeln!(output, "account,balance")?;

    for account in accounts {
        writeln!(output, "{},{}", account.account_number, account.balance)?;
    }

    output.flush()?;

    Ok(())
}
