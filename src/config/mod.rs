
use std::time::Duration;

use serde::Deserialize;
use tracing::level_filters::LevelFilter;

use crate::balance::AmountPolicy;
use crate::locks::LockMode;

const DEFAULT_CONFIG_FILE: &str = "config/ledger";

/// Runtime settings, read from an optional TOML file then `LEDGER_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub lock_mode: LockMode,
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    #[serde(default = "default_allow_zero_amount")]
    pub allow_zero_amount: bool,
    /// Upper bound on requests being processed at the same time.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}

fn default_allow_zero_amount() -> bool {
    true
}

fn default_max_in_flight() -> usize {
    64
}

fn default_log_level() -> String {
    "error".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_mode: LockMode::default(),
            lock_timeout_ms: default_lock_timeout_ms(),
            allow_zero_amount: default_allow_zero_amount(),
            max_in_flight: default_max_in_flight(),
            log_level: default_log_level()
        }
    }
}

impl LedgerConfig {
    /// Loads `config/ledger.toml` if present, overridden by the environment.
    ///
    /// # Errors
    /// Returns an error if a source cannot be parsed or a value has the wrong type.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    pub fn load_from(file: &str) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(config::Environment::with_prefix("LEDGER").try_parsing(true))
            .build()?;

        config.try_deserialize()
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn amount_policy(&self) -> AmountPolicy {
        if self.allow_zero_amount {
            AmountPolicy::AllowZero
        } else {
            AmountPolicy::RejectZero
        }
    }

    //NOTE: Zero would stall the engine on its first request
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.max(1)
    }

    pub fn level_filter(&self) -> LevelFilter {
        parse_log_level(&self.log_level)
    }
}

pub fn parse_log_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => {
            eprintln!("Invalid log level '{}', defaulting to 'error'", level);
            LevelFilter::ERROR
        }
    }
}
