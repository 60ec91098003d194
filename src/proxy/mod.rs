//! Reverse-proxy subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → server.rs (dispatch: resolve method + path)
//!         hit  → forward.rs (rewrite URI, relay to backend)
//!         tsr  → 301 with the trailing slash toggled
//!         miss → case-insensitive repair → 301, else 404
//! ```

pub mod forward;
pub mod server;

pub use forward::{Backend, X_FORWARDED_HOST};
pub use server::{GatewayError, GatewayServer};
