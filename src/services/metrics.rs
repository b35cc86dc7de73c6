//! Metrics module for usage-ledger.
//! Provides Prometheus metrics for store queries and event volume.

use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec,
    IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Store query duration histogram
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!("usage_db_query_duration_seconds", "Usage store query duration"),
        &["operation"]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Usage events recorded counter
pub static USAGE_EVENTS_RECORDED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Usage events deleted counter
pub static USAGE_EVENTS_DELETED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Call once at startup.
pub fn init_metrics() {
    USAGE_EVENTS_RECORDED_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "usage_events_recorded_total",
                "Total usage events recorded by usage type"
            ),
            &["usage_type"]
        )
        .expect("Failed to register USAGE_EVENTS_RECORDED_TOTAL")
    });

    USAGE_EVENTS_DELETED_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "usage_events_deleted_total",
                "Total usage events deleted by teardown scope"
            ),
            &["scope"]
        )
        .expect("Failed to register USAGE_EVENTS_DELETED_TOTAL")
    });

    // Force initialization of lazy statics
    let _ = &*DB_QUERY_DURATION;
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");
    String::from_utf8(buffer).expect("Failed to convert metrics to string")
}

/// Record a stored usage event.
pub fn record_event_recorded(usage_type: &str) {
    if let Some(counter) = USAGE_EVENTS_RECORDED_TOTAL.get() {
        counter.with_label_values(&[usage_type]).inc();
    }
}

/// Record a bulk deletion.
pub fn record_events_deleted(scope: &str, count: u64) {
    if let Some(counter) = USAGE_EVENTS_DELETED_TOTAL.get() {
        counter.with_label_values(&[scope]).inc_by(count);
    }
}
