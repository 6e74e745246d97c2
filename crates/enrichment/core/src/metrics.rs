/// Container for enrichment pipeline metrics.
#[derive(Debug, Clone)]
pub(crate) struct Metrics;

impl Metrics {
    /// Resolution attempts. Labels: `trigger`, `outcome`.
    pub(crate) const RESOLUTIONS_TOTAL: &'static str = "chainlens_enrichment_resolutions_total";
    /// Duration of resolver calls. Labels: `trigger`.
    pub(crate) const RESOLUTION_DURATION_SECONDS: &'static str =
        "chainlens_enrichment_resolution_duration_seconds";

    pub(crate) const RPC_REQUESTS_SUCCESS_TOTAL: &'static str =
        "chainlens_enrichment_rpc_requests_success_total";
    pub(crate) const RPC_REQUESTS_ERROR_TOTAL: &'static str =
        "chainlens_enrichment_rpc_requests_error_total";
    pub(crate) const RPC_REQUEST_DURATION_SECONDS: &'static str =
        "chainlens_enrichment_rpc_request_duration_seconds";

    pub(crate) const RPC_METHOD_ENQUEUE: &'static str = "enqueue";
    pub(crate) const RPC_METHOD_ESCALATE: &'static str = "escalate";
    pub(crate) const RPC_METHOD_RESOLVED: &'static str = "resolved";
    pub(crate) const RPC_METHOD_PENDING: &'static str = "pending";

    const TRIGGERS: [&'static str; 3] = ["sweep", "new_work", "escalation"];
    const OUTCOMES: [&'static str; 3] = ["resolved", "failed", "skipped"];

    /// Describes the processor metrics and zeroes every label combination.
    pub(crate) fn init_processor() {
        metrics::describe_counter!(
            Self::RESOLUTIONS_TOTAL,
            metrics::Unit::Count,
            "Enrichment resolution attempts by trigger and outcome"
        );
        metrics::describe_histogram!(
            Self::RESOLUTION_DURATION_SECONDS,
            metrics::Unit::Seconds,
            "Duration of enrichment resolver calls"
        );

        for trigger in Self::TRIGGERS {
            for outcome in Self::OUTCOMES {
                metrics::counter!(
                    Self::RESOLUTIONS_TOTAL,
                    "trigger" => trigger,
                    "outcome" => outcome
                )
                .increment(0);
            }
        }
    }

    /// Describes the RPC metrics and zeroes every method.
    pub(crate) fn init_rpc() {
        metrics::describe_counter!(
            Self::RPC_REQUESTS_SUCCESS_TOTAL,
            metrics::Unit::Count,
            "Total number of successful enrichment RPC requests"
        );
        metrics::describe_counter!(
            Self::RPC_REQUESTS_ERROR_TOTAL,
            metrics::Unit::Count,
            "Total number of failed enrichment RPC requests"
        );
        metrics::describe_histogram!(
            Self::RPC_REQUEST_DURATION_SECONDS,
            metrics::Unit::Seconds,
            "Duration of enrichment RPC requests"
        );

        for method in [
            Self::RPC_METHOD_ENQUEUE,
            Self::RPC_METHOD_ESCALATE,
            Self::RPC_METHOD_RESOLVED,
            Self::RPC_METHOD_PENDING,
        ] {
            metrics::counter!(Self::RPC_REQUESTS_SUCCESS_TOTAL, "method" => method).increment(0);
            metrics::counter!(Self::RPC_REQUESTS_ERROR_TOTAL, "method" => method).increment(0);
            metrics::histogram!(Self::RPC_REQUEST_DURATION_SECONDS, "method" => method).record(0.0);
        }
    }
}
