mod ledger_processor;
mod stage;

pub use ledger_processor::LedgerProcessor;
pub use stage::Stage;
