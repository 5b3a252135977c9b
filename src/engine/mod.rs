mod async_engine;
mod ordering;
#[cfg(test)]
mod tests;

pub use async_engine::{load_accounts, AsyncEngine};
