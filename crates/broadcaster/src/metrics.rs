//! Prometheus metrics for the broadcaster
//!
//! Tick outcomes on the data plane and request handling on the control plane.

use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, Encoder, IntCounter,
    IntCounterVec, IntGauge, TextEncoder,
};

const LABEL_OUTCOME: &str = "outcome";
const LABEL_RESULT: &str = "result";

/// Ticks by outcome: sent, skipped_<source error kind>, encode_failed, send_failed
static TICKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tickercast_ticks_total",
        "Broadcast ticks by outcome",
        &[LABEL_OUTCOME]
    )
    .expect("Failed to register ticks_total metric")
});

/// Size of the last published datagram
static SNAPSHOT_BYTES: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "tickercast_snapshot_bytes",
        "Size in bytes of the last published snapshot datagram"
    )
    .expect("Failed to register snapshot_bytes metric")
});

/// Price samples cut to fit the datagram bound
static SAMPLES_DROPPED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "tickercast_samples_dropped_total",
        "Oldest price samples dropped to fit the datagram bound"
    )
    .expect("Failed to register samples_dropped_total metric")
});

/// Control requests by result: applied, rejected
static CONTROL_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tickercast_control_requests_total",
        "Ticker-change requests by result",
        &[LABEL_RESULT]
    )
    .expect("Failed to register control_requests_total metric")
});

/// Open control connections
static CONTROL_CONNECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "tickercast_control_connections",
        "Currently open control-plane connections"
    )
    .expect("Failed to register control_connections metric")
});

pub fn inc_tick(outcome: &str) {
    TICKS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_published(bytes: usize, samples_dropped: usize) {
    SNAPSHOT_BYTES.set(bytes as i64);
    if samples_dropped > 0 {
        SAMPLES_DROPPED_TOTAL.inc_by(samples_dropped as u64);
    }
}

pub fn inc_control_request(result: &str) {
    CONTROL_REQUESTS_TOTAL.with_label_values(&[result]).inc();
}

pub fn control_connection_opened() {
    CONTROL_CONNECTIONS.inc();
}

pub fn control_connection_closed() {
    CONTROL_CONNECTIONS.dec();
}

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| {
        prometheus::Error::Msg(format!("Failed to encode metrics as UTF-8: {}", e))
    })
}
