//! Per-client timing/volume counters and their aggregation into a mode summary.
mod aggregate;
mod types;


pub use aggregate::{aggregate, record_latency};
pub use types::{ClientMetrics, Summary};
