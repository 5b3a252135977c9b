use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use anyhow::anyhow;
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{spawn_blocking, JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, trace, warn};

use crate::engine::ordering::OrderingTable;
use crate::locks::LockKeys;
use crate::models::{Account, LedgerError, Transaction, TransactionRequest};
use crate::processor::LedgerProcessor;
use crate::storage::MemoryStore;
use crate::types::{AccountNumber, Monetary};

const DEFAULT_MAX_IN_FLIGHT: usize = 64;
const ORDERING_PRUNE_THRESHOLD: usize = 4_096;

/// Outcome counts of one engine run.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct EngineReport {
    pub committed: usize,
    /// Rejections keyed by `LedgerError::code`.
    pub rejected: BTreeMap<&'static str, usize>,
    /// Rejections that may be resubmitted unchanged, also counted in `rejected`.
    pub retryable: usize,
    /// Rows that could not be deserialized into a request.
    pub malformed: usize,
    pub crashed: usize
}

impl EngineReport {
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }

    fn record(&mut self, joined: Result<Result<Transaction, LedgerError>, JoinError>) {
        match joined {
            Ok(Ok(_)) => self.committed += 1,
            Ok(Err(error)) => {
                if error.is_retryable() {
                    self.retryable += 1;
                }

                *self.rejected.entry(error.code()).or_default() += 1;
            }
            Err(error) => {
                error!("A processing task did not finish: {error}");
                self.crashed += 1;
            }
        }
    }
}

/// Streams transaction requests from a CSV file through the ledger processor.
pub struct AsyncEngine {
    processor: Arc<LedgerProcessor>,
    max_in_flight: usize,
    backpressure: usize
}

impl AsyncEngine {
    pub fn new(processor: Arc<LedgerProcessor>) -> Self {
        Self {
            processor,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            backpressure: 256
        }
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    /// Orchestrates the end-to-end processing pipeline for a CSV file.
    ///
    /// A missing or unreadable file is logged and yields an empty report.
    pub async fn run(&self, path: &str) -> anyhow::Result<EngineReport> {
        let (sender, receiver) = mpsc::channel::<TransactionRequest>(self.backpressure);
        let csv_handle = self.spawn_csv_reader(path.to_string(), sender);
        let mut report = self.process_requests(receiver).await;

        match csv_handle.await {
            Ok(malformed) => report.malformed = malformed,
            Err(error) => error!("CSV ingestion failed: {error}")
        }

        Ok(report)
    }

    fn spawn_csv_reader(&self, path: String, sender: mpsc::Sender<TransactionRequest>) -> JoinHandle<usize> {
        spawn_blocking(move || {
            let file = match File::open(&path) {
                Ok(file) => file,
                Err(error) => {
                    error!("Error opening CSV at path: {path} | {error}");
                    return 0;
                }
            };

            let mut reader = ReaderBuilder::new()
                .trim(Trim::All)
                .flexible(true)
                .from_reader(BufReader::new(file));

            let mut malformed = 0;

            for result in reader.deserialize::<TransactionRequest>() {
                match result {
                    Ok(request) => {
                        if sender.blocking_send(request).is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        error!("CSV deserialization error: {error}");
                        malformed += 1;
                    }
                }
            }

            malformed
        })
    }

    async fn process_requests(&self, mut receiver: mpsc::Receiver<TransactionRequest>) -> EngineReport {
        let semaphore = Arc::new(Semaphore::new(self.max_in_flight));
        let mut ordering = OrderingTable::new();
        let mut tasks = JoinSet::new();
        let mut report = EngineReport::default();

        //NOTE: Requests sharing an account keep their file order, everything else runs concurrently
        while let Some(request) = receiver.recv().await {
            //NOTE: The permit is taken before spawning so the reader feels backpressure through the channel
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };

            let (turn, predecessors) = ordering.enqueue(&LockKeys::for_request(&request));
            let processor = self.processor.clone();

            tasks.spawn(async move {
                if !predecessors.is_empty() {
                    trace!("[{:?}] on account [{}] queued behind [{}] request(s)", request.transaction_type, request.origin, predecessors.len());
                }

                predecessors.wait().await;
                let result = processor.process(&request).await;
                drop(turn);
                drop(permit);
                result
            });

            while let Some(joined) = tasks.try_join_next() {
                report.record(joined);
            }

            if ordering.tracked_accounts() > ORDERING_PRUNE_THRESHOLD {
                ordering.prune();
            }
        }

        while let Some(joined) = tasks.join_next().await {
            report.record(joined);
        }

        debug!("Engine drained: [{}] committed, [{}] rejected", report.committed, report.rejected_total());

        report
    }
}

#[derive(Debug, Deserialize)]
struct AccountSeed {
    account: AccountNumber,
    balance: Monetary,
    #[serde(default)]
    owner: String
}

/// Seeds the store from an `account,balance,owner` CSV and returns how many accounts were opened.
///
/// Rows that are malformed, negative or duplicated are logged and skipped.
///
/// # Errors
/// Returns an error if the file cannot be opened.
pub async fn load_accounts(store: &MemoryStore, path: &str) -> anyhow::Result<usize> {
    let owned_path = path.to_string();

    let seeds = spawn_blocking(move || -> anyhow::Result<Vec<AccountSeed>> {
        let file = File::open(&owned_path)
            .map_err(|error| anyhow!("Error opening accounts CSV at path: {owned_path} | {error}"))?;

        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(BufReader::new(file));

        let mut seeds = Vec::new();

        for result in reader.deserialize::<AccountSeed>() {
            match result {
                Ok(seed) => seeds.push(seed),
                Err(error) => error!("Accounts CSV deserialization error: {error}")
            }
        }

        Ok(seeds)
    }).await??;

    let mut opened = 0;

    for seed in seeds {
        if seed.balance.is_negative() {
            warn!("Account [{}] skipped, opening balance [{}] is negative", seed.account, seed.balance);
            continue;
        }

        let account = Account::new(seed.account, seed.balance, seed.owner);

        match store.open_account(&account).await {
            Ok(()) => opened += 1,
            Err(error) => warn!("Account [{}] skipped: {error}", account.account_number)
        }
    }

    Ok(opened)
}
