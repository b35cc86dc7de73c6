//! Domain models for usage-ledger.

mod usage;

pub use usage::{
    EventQuery, RecordUsage, UsageDetail, UsageEvent, UsageKind, UsageSummary, UsageTypeRegistry,
};
