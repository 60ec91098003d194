//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request handling produces:
//!     → structured log events (tracing, initialized in main)
//!     → counters and histograms (metrics.rs)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Metrics are cheap (atomic increments); safe on the hot path
//! - Histogram labels use route patterns, not raw URIs, to bound
//!   cardinality

pub mod metrics;
