//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build router → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     SIGINT or trigger() → stop accepting → drain in-flight → exit
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
