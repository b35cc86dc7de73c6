//! Services module for usage-ledger.

pub mod database;
pub mod ledger;
pub mod metrics;
pub mod store;

pub use database::MongoDb;
pub use ledger::UsageLedger;
pub use store::{MemoryUsageStore, MongoUsageStore, UsageStore};
