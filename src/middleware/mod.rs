//! Middleware composition harness.
//!
//! # Data Flow
//! ```text
//! Middleware implementations (priority, wrapping step)
//!     → compose() sorts by priority and wraps the axum Router
//!     → the lowest priority value runs outermost
//! ```

pub mod access_log;

pub use access_log::{AccessLogMetrics, MatchedRoute};

/// Composition priority of [`AccessLogMetrics`].
pub const PRIORITY_ACCESS_LOG_METRICS: i32 = 0;

/// One cross-cutting concern wrapping the request pipeline.
pub trait Middleware {
    /// Position in the chain; lower values wrap further out.
    fn priority(&self) -> i32;

    /// Wrap the router with this middleware's layer.
    fn apply(&self, router: axum::Router) -> axum::Router;
}

/// Applies `middlewares` to `router` ordered by priority: the first
/// after sorting sees requests first and responses last.
///
/// axum runs the last-added layer outermost, so the chain is applied
/// in reverse.
pub fn compose(mut middlewares: Vec<Box<dyn Middleware>>, mut router: axum::Router) -> axum::Router {
    middlewares.sort_by_key(|m| m.priority());

    for middleware in middlewares.iter().rev() {
        router = middleware.apply(router);
    }
    router
}
