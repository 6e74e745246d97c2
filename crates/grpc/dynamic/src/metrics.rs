//! Metrics for the dynamic client.

/// Container for metrics.
#[derive(Debug, Clone)]
pub(crate) struct Metrics;

impl Metrics {
    /// Identifier for the counter of successful unary calls. Labels: `method`.
    pub(crate) const GRPC_CALLS_SUCCESS_TOTAL: &'static str = "grpc_dynamic_calls_success_total";
    /// Identifier for the counter of failed unary calls. Labels: `method`.
    pub(crate) const GRPC_CALLS_ERROR_TOTAL: &'static str = "grpc_dynamic_calls_error_total";
    /// Identifier for the histogram of unary call durations, type loads included. Labels: `method`.
    pub(crate) const GRPC_CALL_DURATION_SECONDS: &'static str =
        "grpc_dynamic_call_duration_seconds";
    /// Identifier for the counter of reflection loads. Labels: `outcome`.
    pub(crate) const REFLECTION_LOADS_TOTAL: &'static str = "grpc_reflection_loads_total";
    /// Identifier for the counter of types declared from reflection responses.
    pub(crate) const REGISTRY_TYPES_DECLARED_TOTAL: &'static str = "grpc_registry_types_declared_total";

    pub(crate) const OUTCOME_LOADED: &'static str = "loaded";
    pub(crate) const OUTCOME_FAILED: &'static str = "failed";

    /// Initializes metrics for the dynamic client.
    ///
    /// Describes the metrics and zeroes the label-free ones so they can be queried immediately.
    /// Per-method series appear on first use since methods are only known at runtime.
    pub(crate) fn init() {
        Self::describe();
        Self::zero();
    }

    fn describe() {
        metrics::describe_counter!(
            Self::GRPC_CALLS_SUCCESS_TOTAL,
            metrics::Unit::Count,
            "Total number of successful dynamic unary calls"
        );
        metrics::describe_counter!(
            Self::GRPC_CALLS_ERROR_TOTAL,
            metrics::Unit::Count,
            "Total number of failed dynamic unary calls"
        );
        metrics::describe_histogram!(
            Self::GRPC_CALL_DURATION_SECONDS,
            metrics::Unit::Seconds,
            "Duration of dynamic unary calls including on-demand type loads"
        );
        metrics::describe_counter!(
            Self::REFLECTION_LOADS_TOTAL,
            metrics::Unit::Count,
            "Total number of reflection symbol loads"
        );
        metrics::describe_counter!(
            Self::REGISTRY_TYPES_DECLARED_TOTAL,
            metrics::Unit::Count,
            "Total number of types declared in the registry"
        );
    }

    fn zero() {
        for outcome in [Self::OUTCOME_LOADED, Self::OUTCOME_FAILED] {
            metrics::counter!(Self::REFLECTION_LOADS_TOTAL, "outcome" => outcome).increment(0);
        }
        metrics::counter!(Self::REGISTRY_TYPES_DECLARED_TOTAL).increment(0);
    }

    pub(crate) fn record_load(loaded: bool, declared: usize) {
        let outcome = if loaded { Self::OUTCOME_LOADED } else { Self::OUTCOME_FAILED };
        metrics::counter!(Self::REFLECTION_LOADS_TOTAL, "outcome" => outcome).increment(1);
        metrics::counter!(Self::REGISTRY_TYPES_DECLARED_TOTAL).increment(declared as u64);
    }
}
