//! Core turn-clock logic for the world turn simulation.
//!
//! This crate owns everything that decides how the shared game clock
//! moves, independent of how it is stored or served:
//!
//! - [`clock`] -- pure phase and turn transitions
//! - [`schedule`] -- how long each phase lasts
//! - [`store`] -- the persistence contract and an in-memory store
//! - [`control`] -- guarded control actions (compare-and-swap writes)
//! - [`news`] -- the append-only breaking-news log
//! - [`defcon`] -- per-nation alert level updates
//! - [`config`] -- YAML configuration with environment overrides

pub mod clock;
pub mod config;
pub mod control;
pub mod defcon;
pub mod news;
pub mod schedule;
pub mod store;

pub use clock::TurnClock;
pub use config::{ConfigError, GameConfig};
pub use control::{ConflictReason, ControlActionExecutor, ControlOutcome};
pub use news::BreakingNewsLog;
pub use schedule::{ConfiguredSchedule, FixedSchedule, PhaseSchedule, ScheduleError};
pub use store::{
    ControlState, MemoryTurnStore, StoreError, TurnPatch, TurnStore, UpdateOutcome, WriteOutcome,
};
