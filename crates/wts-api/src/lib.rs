//! HTTP API for the world turn clock.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Read endpoints** for the current turn and its frozen snapshot
//! - **Command endpoints** for clock navigation, DEFCON changes, news
//!   submission, and guarded phase advance
//! - **`GET /health`** for liveness probes
//!
//! # Architecture
//!
//! Handlers are a thin boundary. Request bodies are decoded into the typed
//! commands from `wts-types`; anything that fails to decode is rejected by
//! Axum before reaching the core. Decoded commands go straight to the
//! [`ControlActionExecutor`](wts_core::ControlActionExecutor) or the
//! [`BreakingNewsLog`](wts_core::BreakingNewsLog), and every successful
//! response is the turn's boundary projection.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
