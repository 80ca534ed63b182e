//! `PostgreSQL` persistence for the world turn simulation.
//!
//! The whole game state is a single row. This crate provides the pool,
//! the migrations that create that row's table, and [`PgTurnStore`], the
//! production implementation of [`wts_core::TurnStore`].
//!
//! # Modules
//!
//! - [`postgres`] -- Pool setup from the infrastructure config
//! - [`turn_store`] -- The singleton turn record and its guarded writes
//! - [`error`] -- Shared error types

pub mod error;
pub mod postgres;
pub mod turn_store;

// Re-export primary types for convenience.
pub use error::DbError;
pub use postgres::PostgresPool;
pub use turn_store::{PgTurnStore, TurnRow};
