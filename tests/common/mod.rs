//! Common test utilities for usage-ledger integration tests.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::{Arc, Once};
use usage_ledger::models::{RecordUsage, UsageTypeRegistry};
use usage_ledger::services::{MemoryUsageStore, UsageLedger};

static INIT: Once = Once::new();

/// Initialize tracing and metrics for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,usage_ledger=debug")
            .with_test_writer()
            .try_init()
            .ok();
        usage_ledger::services::metrics::init_metrics();
    });
}

/// Ledger over a fresh in-memory store with the standard registry.
pub fn spawn_ledger() -> UsageLedger {
    init_tracing();
    UsageLedger::new(
        Arc::new(MemoryUsageStore::new()),
        UsageTypeRegistry::standard(),
    )
}

/// Fixed instant used as the anchor for deterministic interval math.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

/// Open-ended resource usage input beginning at `begin_time`.
pub fn resource_usage(
    login: &str,
    resource_id: &str,
    size: &str,
    begin_time: DateTime<Utc>,
) -> RecordUsage {
    RecordUsage {
        login: login.to_string(),
        resource_id: Some(resource_id.to_string()),
        usage_type: "resource_usage".to_string(),
        begin_time,
        end_time: None,
        resource_size: Some(size.to_string()),
        additional_storage_gb: None,
    }
}

/// Open-ended additional storage input beginning at `begin_time`.
pub fn additional_storage(
    login: &str,
    resource_id: &str,
    gb: i64,
    begin_time: DateTime<Utc>,
) -> RecordUsage {
    RecordUsage {
        login: login.to_string(),
        resource_id: Some(resource_id.to_string()),
        usage_type: "additional_storage".to_string(),
        begin_time,
        end_time: None,
        resource_size: None,
        additional_storage_gb: Some(gb),
    }
}

/// Close an input at `end_time`.
pub fn closed(mut input: RecordUsage, end_time: DateTime<Utc>) -> RecordUsage {
    input.end_time = Some(end_time);
    input
}
