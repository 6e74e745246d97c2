//! Metric observation helpers shared by chainlens crates.

mod macros;

mod reporter;
pub use reporter::MetricsReporter;

#[doc(hidden)]
pub use metrics;
