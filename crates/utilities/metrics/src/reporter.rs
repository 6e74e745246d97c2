/// A component that publishes gauges describing its current state.
///
/// Called periodically by a metric worker, so implementations should be cheap and must not
/// fail: errors are logged and the report skipped.
pub trait MetricsReporter {
    /// Samples the current state and records it.
    fn report_metrics(&self);
}
