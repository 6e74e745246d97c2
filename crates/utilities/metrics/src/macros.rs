/// Times `$block` and records its outcome.
///
/// Increments `$success_metric` or `$error_metric` depending on whether the block returned `Ok`,
/// and records the elapsed seconds in `$duration_metric`. All three carry a `method` label plus
/// any extra `key => value` labels.
#[macro_export]
macro_rules! observe_metrics_for_result {
    (
        $success_metric:expr,
        $error_metric:expr,
        $duration_metric:expr,
        $method_name:expr,
        $block:expr $(, $tag_key:expr => $tag_val:expr )*
    ) => {{
        let start_time = std::time::Instant::now();
        let result = $block;
        $crate::__record_outcome!(
            result.is_ok(),
            start_time,
            $success_metric,
            $error_metric,
            $duration_metric,
            $method_name
            $(, $tag_key => $tag_val )*
        );
        result
    }};
}

/// Async variant of [`observe_metrics_for_result`]: `$block` is a future and is awaited.
#[macro_export]
macro_rules! observe_metrics_for_result_async {
    (
        $success_metric:expr,
        $error_metric:expr,
        $duration_metric:expr,
        $method_name:expr,
        $block:expr $(, $tag_key:expr => $tag_val:expr )*
    ) => {{
        let start_time = std::time::Instant::now();
        let result = $block.await;
        $crate::__record_outcome!(
            result.is_ok(),
            start_time,
            $success_metric,
            $error_metric,
            $duration_metric,
            $method_name
            $(, $tag_key => $tag_val )*
        );
        result
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __record_outcome {
    (
        $ok:expr,
        $start_time:expr,
        $success_metric:expr,
        $error_metric:expr,
        $duration_metric:expr,
        $method_name:expr
        $(, $tag_key:expr => $tag_val:expr )*
    ) => {{
        let outcome_metric = if $ok { $success_metric } else { $error_metric };
        let method_label = $method_name;
        $crate::metrics::counter!(
            outcome_metric,
            "method" => method_label.clone()
            $(, $tag_key => $tag_val )*
        )
        .increment(1);
        $crate::metrics::histogram!(
            $duration_metric,
            "method" => method_label
            $(, $tag_key => $tag_val )*
        )
        .record($start_time.elapsed().as_secs_f64());
    }};
}
