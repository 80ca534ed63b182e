//! Shared type definitions for the WTS turn clock.
//!
//! This crate is the single source of truth for the shapes that cross the
//! workspace: the singleton [`Turn`] aggregate, its boundary projection
//! [`ApiResponse`], and the inbound command payloads. Boundary types flow
//! downstream to `TypeScript` via `ts-rs` for the browser client.
//!
//! # Modules
//!
//! - [`phase`] -- Range-checked phase newtype (1 through 10)
//! - [`enums`] -- Nations, DEFCON levels, and control actions
//! - [`structs`] -- The turn aggregate, news items, and the DEFCON board
//! - [`commands`] -- Inbound command payloads
//! - [`error`] -- Decoding errors for the range-checked types

pub mod commands;
pub mod enums;
pub mod error;
pub mod phase;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use commands::{AdvanceRequest, ControlCommand, DefconUpdate, NewsSubmission};
pub use enums::{ControlAction, DefconStatus, Nation};
pub use error::TypeError;
pub use phase::Phase;
pub use structs::{ApiResponse, Defcon, NewsItem, TURN_ID, Turn, TurnVersion};
