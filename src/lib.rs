//! HTTP reverse-proxy gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │                 API GATEWAY                  │
//!                    │                                              │
//!   Client Request   │  ┌─────────┐   ┌──────────┐   ┌───────────┐ │
//!   ─────────────────┼─▶│  proxy  │──▶│  router  │──▶│   proxy   │ │
//!                    │  │ server  │   │  (radix  │   │  forward  │─┼──▶ Backend
//!                    │  └─────────┘   │   tree)  │   └───────────┘ │
//!                    │                └──────────┘                  │
//!                    │  ┌────────────────────────────────────────┐ │
//!                    │  │         Cross-Cutting Concerns         │ │
//!                    │  │  ┌────────┐ ┌────────────┐ ┌─────────┐ │ │
//!                    │  │  │ config │ │ middleware │ │ metrics │ │ │
//!                    │  │  │        │ │ (acc. log) │ │  + logs │ │ │
//!                    │  │  └────────┘ └────────────┘ └─────────┘ │ │
//!                    │  └────────────────────────────────────────┘ │
//!                    └──────────────────────────────────────────────┘
//! ```
//!
//! Requests are matched to backends by a compressed prefix-tree (radix)
//! router supporting named parameters (`:name`) and catch-alls (`*name`),
//! then rewritten and forwarded to the configured upstream.

// Core subsystems
pub mod config;
pub mod proxy;
pub mod router;

// Cross-cutting concerns
pub mod lifecycle;
pub mod middleware;
pub mod observability;

pub use config::GatewayConfig;
pub use lifecycle::Shutdown;
pub use proxy::GatewayServer;
pub use router::{InsertError, PathParams, Router};
