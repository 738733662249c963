//! Prometheus metrics for the trading loop.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use tracing::debug;

use crate::exchange::types::Side;

/// Loop iterations counter metric name.
pub const METRIC_ITERATIONS: &str = "strategy_iterations_total";
/// Orders placed counter metric name.
pub const METRIC_ORDERS_PLACED: &str = "orders_placed_total";
/// Orders cancelled counter metric name.
pub const METRIC_ORDERS_CANCELLED: &str = "orders_cancelled_total";
/// Failed placements counter metric name.
pub const METRIC_ORDERS_FAILED: &str = "orders_failed_total";
/// Cancel retries counter metric name.
pub const METRIC_CANCEL_RETRIES: &str = "cancel_retries_total";
/// Gate skips counter metric name.
pub const METRIC_GATE_SKIPS: &str = "gate_skips_total";
/// Order book fetch latency metric name.
pub const METRIC_BOOK_FETCH_LATENCY: &str = "book_fetch_latency_ms";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_counter!(METRIC_ITERATIONS, "Total strategy loop iterations per side");
    describe_counter!(METRIC_ORDERS_PLACED, "Total orders placed");
    describe_counter!(METRIC_ORDERS_CANCELLED, "Total orders cancelled");
    describe_counter!(METRIC_ORDERS_FAILED, "Total placements that failed");
    describe_counter!(
        METRIC_CANCEL_RETRIES,
        "Total cancellation retries after an unconfirmed cancel"
    );
    describe_counter!(
        METRIC_GATE_SKIPS,
        "Total iterations skipped by a gate, labelled by gate"
    );
    describe_histogram!(
        METRIC_BOOK_FETCH_LATENCY,
        "Order book fetch latency in milliseconds"
    );

    debug!("metrics initialized");
}

/// Increment the iteration counter for one side.
pub fn inc_iterations(side: Side) {
    counter!(METRIC_ITERATIONS, "side" => side.to_string()).increment(1);
}

/// Increment the orders placed counter.
pub fn inc_orders_placed() {
    counter!(METRIC_ORDERS_PLACED).increment(1);
}

/// Increment the orders cancelled counter.
pub fn inc_orders_cancelled() {
    counter!(METRIC_ORDERS_CANCELLED).increment(1);
}

/// Increment the failed placements counter.
pub fn inc_orders_failed() {
    counter!(METRIC_ORDERS_FAILED).increment(1);
}

/// Increment the cancel retries counter.
pub fn inc_cancel_retries() {
    counter!(METRIC_CANCEL_RETRIES).increment(1);
}

/// Increment the gate skip counter for the named gate.
pub fn inc_gate_skips(gate: &'static str) {
    counter!(METRIC_GATE_SKIPS, "gate" => gate).increment(1);
}

/// Record order book fetch latency.
pub fn record_book_fetch_latency(start: Instant) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_BOOK_FETCH_LATENCY).record(latency_ms);
}
