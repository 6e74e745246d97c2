use crate::actors::EnricherActor;
use async_trait::async_trait;
use chainlens_metrics::MetricsReporter;
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Periodically asks every reporter to publish its gauges.
#[derive(Debug, derive_more::Constructor)]
pub struct MetricWorker<R> {
    interval: Duration,
    reporters: Vec<Arc<R>>,
    cancel_token: CancellationToken,
}

#[async_trait]
impl<R> EnricherActor for MetricWorker<R>
where
    R: MetricsReporter + Send + Sync + 'static,
{
    type Error = Infallible;

    async fn start(self) -> Result<(), Self::Error> {
        info!(
            target: "enricher::metric_worker",
            interval = ?self.interval,
            reporters = self.reporters.len(),
            "Starting metric worker"
        );

        loop {
            if self.cancel_token.is_cancelled() {
                info!(target: "enricher::metric_worker", "Metric worker stopping");
                break;
            }

            for reporter in &self.reporters {
                reporter.report_metrics();
            }

            tokio::select! {
                _ = self.cancel_token.cancelled() => {}
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;

    mock! (
        #[derive(Debug)]
        pub Reporter {}

        impl MetricsReporter for Reporter {
            fn report_metrics(&self);
        }
    );

    #[tokio::test]
    async fn test_metric_worker_reports_metrics_and_stops_on_cancel() {
        let mut mock_reporter = MockReporter::new();
        mock_reporter.expect_report_metrics().times(1..).return_const(());

        let cancel_token = CancellationToken::new();
        let worker = MetricWorker::new(
            Duration::from_millis(50),
            vec![Arc::new(mock_reporter)],
            cancel_token.clone(),
        );

        let handle = tokio::spawn(worker.start());

        tokio::time::sleep(Duration::from_millis(120)).await;
        cancel_token.cancel();

        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_metric_worker_stops_immediately_on_cancel() {
        let mut mock_reporter = MockReporter::new();
        mock_reporter.expect_report_metrics().times(0);

        let cancel_token = CancellationToken::new();
        let worker = MetricWorker::new(
            Duration::from_secs(60),
            vec![Arc::new(mock_reporter)],
            cancel_token.clone(),
        );

        cancel_token.cancel();

        assert!(worker.start().await.is_ok());
    }

    #[tokio::test]
    async fn test_metric_worker_wakes_on_cancel_while_sleeping() {
        let mut mock_reporter = MockReporter::new();
        mock_reporter.expect_report_metrics().times(1).return_const(());

        let cancel_token = CancellationToken::new();
        let worker = MetricWorker::new(
            Duration::from_secs(3600),
            vec![Arc::new(mock_reporter)],
            cancel_token.clone(),
        );

        let handle = tokio::spawn(worker.start());
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel_token.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap().unwrap();
    }
}
