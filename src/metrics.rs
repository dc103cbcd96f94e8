//! Prometheus metrics for queuewarden.
//!
//! Exposed on `/metrics` when a metrics port is configured.
//!
//! - `queue_events_total{event}` - Upstream events dispatched by kind
//! - `queue_event_duration_seconds{event}` - Dispatch latency histogram
//! - `queue_reconcile_total{outcome}` - Reconciliation outcomes
//! - `queue_annotations_applied_total{annotation}` - Reactions placed
//! - `queue_active_scopes` / `queue_tracked_entities` - Current state size

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use queuewarden_proto::Annotation;
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters (monotonic increasing)
// ========================================================================

/// Upstream events dispatched, by kind.
pub static EVENTS: OnceLock<IntCounterVec> = OnceLock::new();

/// Dispatched events that failed, by error code.
pub static EVENT_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Reconciliation outcomes (`changed`, `unchanged`, `rejected`).
pub static RECONCILE: OnceLock<IntCounterVec> = OnceLock::new();

/// Annotation reactions placed on items.
pub static ANNOTATIONS_APPLIED: OnceLock<IntCounterVec> = OnceLock::new();

/// Item references found stale (deleted or forbidden upstream).
pub static STALE_ITEMS: OnceLock<IntCounter> = OnceLock::new();

/// Entities removed by reclamation.
pub static ENTITIES_RECLAIMED: OnceLock<IntCounter> = OnceLock::new();

// ========================================================================
// Gauges (can increase/decrease)
// ========================================================================

/// Scopes currently considered active.
pub static ACTIVE_SCOPES: OnceLock<IntGauge> = OnceLock::new();

/// Entities currently held in the table.
pub static TRACKED_ENTITIES: OnceLock<IntGauge> = OnceLock::new();

// ========================================================================
// Histograms
// ========================================================================

/// Event dispatch latency by kind.
pub static EVENT_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at startup before any metrics are recorded. Recording
/// before `init` is a silent no-op.
pub fn init() {
    let r = registry();

    // Helper macro to register metric
    macro_rules! register {
        ($metric:ident, $init:expr) => {
            let m = $init.expect(concat!(stringify!($metric), " creation failed"));
            if let Err(e) = r.register(Box::new(m.clone())) {
                tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
            }
            let _ = $metric.set(m);
        };
    }

    register!(EVENTS, IntCounterVec::new(Opts::new("queue_events_total", "Upstream events dispatched by kind"), &["event"]));
    register!(EVENT_ERRORS, IntCounterVec::new(Opts::new("queue_event_errors_total", "Dispatched events that failed"), &["error"]));
    register!(RECONCILE, IntCounterVec::new(Opts::new("queue_reconcile_total", "Reconciliation outcomes"), &["outcome"]));
    register!(ANNOTATIONS_APPLIED, IntCounterVec::new(Opts::new("queue_annotations_applied_total", "Annotation reactions placed"), &["annotation"]));
    register!(STALE_ITEMS, IntCounter::new("queue_stale_items_total", "Item references found stale upstream"));
    register!(ENTITIES_RECLAIMED, IntCounter::new("queue_entities_reclaimed_total", "Entities removed by reclamation"));
    register!(ACTIVE_SCOPES, IntGauge::new("queue_active_scopes", "Scopes currently active"));
    register!(TRACKED_ENTITIES, IntGauge::new("queue_tracked_entities", "Entities currently tracked"));
    register!(EVENT_LATENCY, HistogramVec::new(
        HistogramOpts::new("queue_event_duration_seconds", "Event dispatch latency by kind")
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["event"]));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Record a dispatched event with its latency.
#[inline]
pub fn record_event(event: &str, duration_secs: f64) {
    if let Some(c) = EVENTS.get() {
        c.with_label_values(&[event]).inc();
    }
    if let Some(h) = EVENT_LATENCY.get() {
        h.with_label_values(&[event]).observe(duration_secs);
    }
}

#[inline]
pub fn record_event_error(error: &str) {
    if let Some(c) = EVENT_ERRORS.get() {
        c.with_label_values(&[error]).inc();
    }
}

#[inline]
pub fn record_reconcile(outcome: &str) {
    if let Some(c) = RECONCILE.get() {
        c.with_label_values(&[outcome]).inc();
    }
}

#[inline]
pub fn record_annotation(annotation: Annotation) {
    if let Some(c) = ANNOTATIONS_APPLIED.get() {
        c.with_label_values(&[annotation.as_str()]).inc();
    }
}

#[inline]
pub fn record_stale_item() {
    if let Some(c) = STALE_ITEMS.get() {
        c.inc();
    }
}

#[inline]
pub fn record_reclaimed() {
    if let Some(c) = ENTITIES_RECLAIMED.get() {
        c.inc();
    }
}

#[inline]
pub fn set_active_scopes(count: usize) {
    if let Some(g) = ACTIVE_SCOPES.get() {
        g.set(count as i64);
    }
}

#[inline]
pub fn set_tracked_entities(count: usize) {
    if let Some(g) = TRACKED_ENTITIES.get() {
        g.set(count as i64);
    }
}
