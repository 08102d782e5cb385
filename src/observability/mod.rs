//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout log stream
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID (x-request-id) is attached by the HTTP layer and shows up in
//!   the request span
//! - Metrics are cheap and optional

pub mod logging;
pub mod metrics;
