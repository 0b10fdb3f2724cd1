//! Common types for metrics and observability event definitions.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
}

impl MetricType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "Counter",
            MetricType::Gauge => "Gauge",
            MetricType::Histogram => "Histogram",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MetricDef {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub description: &'static str,
}

/// A fire-and-forget observability event.
///
/// Events are counters incremented by a fixed severity weight. Emission
/// goes through the `metrics` facade: with no recorder installed it is a
/// no-op, and the StatsD recorder queues in the background, so emitting
/// can never block or fail the calling flow.
#[derive(Debug, Clone, Copy)]
pub struct EventDef {
    pub name: &'static str,
    /// Fixed severity weight the event counter is incremented by.
    pub weight: u64,
    pub description: &'static str,
}

/// Emit an event.
pub fn emit(event: &EventDef) {
    metrics::counter!(event.name).increment(event.weight);
}

/// Emit an event with a single tag, e.g. the backend name.
pub fn emit_tagged(event: &EventDef, tag_key: &'static str, tag_value: String) {
    metrics::counter!(event.name, tag_key => tag_value).increment(event.weight);
}
