use axum::http::StatusCode;
use once_cell::sync::Lazy;
use prometheus::{register_int_counter, Encoder, IntCounter, TextEncoder};

// Prometheus metrics (default registry)
pub static FLAG_READS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "project_flags_reads_total",
        "Total project flag map reads served"
    )
    .expect("register reads_total")
});

pub static FLAG_WRITES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "project_flags_writes_total",
        "Total project flag updates persisted"
    )
    .expect("register writes_total")
});

pub static FLAG_WRITE_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "project_flags_write_failures_total",
        "Total project flag updates that failed internally"
    )
    .expect("register write_failures_total")
});

pub static FLAG_REJECTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "project_flags_rejected_total",
        "Total project flag updates rejected as invalid"
    )
    .expect("register rejected_total")
});

/// Force registration so every series shows up before its first increment.
pub fn init() {
    Lazy::force(&FLAG_READS_TOTAL);
    Lazy::force(&FLAG_WRITES_TOTAL);
    Lazy::force(&FLAG_WRITE_FAILURES_TOTAL);
    Lazy::force(&FLAG_REJECTED_TOTAL);
}

pub fn encode_metrics() -> (StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (StatusCode::OK, String::from_utf8(buffer).unwrap_or_default())
}
