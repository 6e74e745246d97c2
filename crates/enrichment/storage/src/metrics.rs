/// Container for EnrichmentDb metrics.
#[derive(Debug, Clone)]
pub(crate) struct Metrics;

impl Metrics {
    pub(crate) const STORAGE_REQUESTS_SUCCESS_TOTAL: &'static str =
        "chainlens_enrichment_storage_success_total";
    pub(crate) const STORAGE_REQUESTS_ERROR_TOTAL: &'static str =
        "chainlens_enrichment_storage_error_total";
    pub(crate) const STORAGE_REQUEST_DURATION_SECONDS: &'static str =
        "chainlens_enrichment_storage_duration_seconds";

    pub(crate) const BACKLOG_ENTRIES: &'static str = "chainlens_enrichment_backlog_entries";

    pub(crate) const STORAGE_METHOD_GET_PENDING: &'static str = "get_pending";
    pub(crate) const STORAGE_METHOD_SELECT_DUE: &'static str = "select_due";
    pub(crate) const STORAGE_METHOD_INSERT_PENDING: &'static str = "insert_pending";
    pub(crate) const STORAGE_METHOD_RECORD_FAILURE: &'static str = "record_failure";
    pub(crate) const STORAGE_METHOD_COMPLETE_RESOLUTION: &'static str = "complete_resolution";
    pub(crate) const STORAGE_METHOD_IS_RESOLVED: &'static str = "is_resolved";
    pub(crate) const STORAGE_METHOD_GET_RESOLVED: &'static str = "get_resolved";
    pub(crate) const STORAGE_METHOD_UPSERT_RESOLVED: &'static str = "upsert_resolved";

    const METHODS: [&'static str; 8] = [
        Self::STORAGE_METHOD_GET_PENDING,
        Self::STORAGE_METHOD_SELECT_DUE,
        Self::STORAGE_METHOD_INSERT_PENDING,
        Self::STORAGE_METHOD_RECORD_FAILURE,
        Self::STORAGE_METHOD_COMPLETE_RESOLUTION,
        Self::STORAGE_METHOD_IS_RESOLVED,
        Self::STORAGE_METHOD_GET_RESOLVED,
        Self::STORAGE_METHOD_UPSERT_RESOLVED,
    ];

    pub(crate) fn init() {
        Self::describe();
        Self::zero();
    }

    fn describe() {
        metrics::describe_counter!(
            Self::STORAGE_REQUESTS_SUCCESS_TOTAL,
            metrics::Unit::Count,
            "Total number of successful enrichment storage requests"
        );
        metrics::describe_counter!(
            Self::STORAGE_REQUESTS_ERROR_TOTAL,
            metrics::Unit::Count,
            "Total number of failed enrichment storage requests"
        );
        metrics::describe_histogram!(
            Self::STORAGE_REQUEST_DURATION_SECONDS,
            metrics::Unit::Seconds,
            "Duration of enrichment storage requests"
        );
        metrics::describe_gauge!(
            Self::BACKLOG_ENTRIES,
            metrics::Unit::Count,
            "Enrichment backlog entries by state"
        );
    }

    fn zero() {
        for method in Self::METHODS {
            metrics::counter!(Self::STORAGE_REQUESTS_SUCCESS_TOTAL, "method" => method)
                .increment(0);
            metrics::counter!(Self::STORAGE_REQUESTS_ERROR_TOTAL, "method" => method).increment(0);
            metrics::histogram!(Self::STORAGE_REQUEST_DURATION_SECONDS, "method" => method)
                .record(0.0);
        }
    }
}
