//! The turn store contract and an in-memory implementation.
//!
//! The store is the only synchronization point between clients. It holds
//! exactly one [`Turn`] and offers two kinds of write:
//!
//! - a conditional write guarded by a [`ControlState`], used by control
//!   actions (compare-and-swap on every clock-owned field), and
//! - an unconditioned atomic append to the news log.
//!
//! [`TurnStore`] abstracts the storage technology. `wts-db` provides the
//! `PostgreSQL` implementation; [`MemoryTurnStore`] backs tests and local
//! runs without a database.

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use wts_types::{Defcon, NewsItem, Phase, Turn, TurnVersion};

use crate::clock::TurnClock;

/// Errors surfaced by a [`TurnStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An upsert was combined with a version precondition.
    ///
    /// Upsert is for first-time creation only; a version precondition is
    /// for guarded mutation of an existing record. Asking for both is a
    /// programming error and is rejected before the store is touched.
    #[error("cannot upsert with an expected version ({expected})")]
    InvalidStateTransition {
        /// The version that was supplied alongside `upsert`.
        expected: TurnVersion,
    },

    /// The backing store could not be reached or the operation failed in
    /// transit.
    #[error("turn store unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// The stored record could not be decoded into a [`Turn`].
    #[error("corrupt turn record: {message}")]
    Corrupt {
        /// Description of what failed to decode.
        message: String,
    },
}

/// The clock-owned fields of a turn, as a reader saw them.
///
/// Guarded writes compare all of these against the stored record. A DEFCON
/// change or a pause leaves the [`TurnVersion`] alone, so comparing the
/// version token by itself would let such a write go unnoticed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    /// Turn number at read time.
    pub turn_number: u32,
    /// Phase at read time.
    pub phase: Phase,
    /// Phase deadline at read time.
    pub phase_end: DateTime<Utc>,
    /// Whether the clock was running.
    pub active: bool,
    /// Alert levels at read time.
    pub defcon: Defcon,
}

impl ControlState {
    /// Capture the clock-owned fields of `turn`.
    pub const fn of(turn: &Turn) -> Self {
        Self {
            turn_number: turn.turn_number,
            phase: turn.phase,
            phase_end: turn.phase_end,
            active: turn.active,
            defcon: turn.defcon,
        }
    }

    /// The `(turn_number, phase)` token of this state.
    pub const fn version(&self) -> TurnVersion {
        TurnVersion {
            turn_number: self.turn_number,
            phase: self.phase,
        }
    }
}

/// A mutation of the singleton turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnPatch {
    /// Overwrite the clock-owned fields: turn number, phase, phase end,
    /// active flag, and DEFCON board. The news log and the frozen snapshot
    /// are left as stored. When upserting into an empty store the whole
    /// turn is inserted.
    Set(Turn),
    /// Append one item to the end of the news log.
    PushNews(NewsItem),
}

/// Result of [`TurnStore::update_turn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Whether a record satisfied the write's precondition and was written.
    pub matched: bool,
}

/// Result of a guarded write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The stored control fields still matched and the candidate was written.
    Matched,
    /// Another control write landed first; nothing was written.
    Conflict,
}

/// Reject the one combination of write modes that is never valid.
///
/// # Errors
///
/// Returns [`StoreError::InvalidStateTransition`] if `upsert` is set and an
/// expected state is supplied.
pub const fn check_write_mode(
    upsert: bool,
    expected: Option<&ControlState>,
) -> Result<(), StoreError> {
    match (upsert, expected) {
        (true, Some(state)) => Err(StoreError::InvalidStateTransition {
            expected: state.version(),
        }),
        _ => Ok(()),
    }
}

/// Persistence gateway for the singleton turn.
///
/// Implementations must apply each write as a single atomic operation on
/// the record and must not hold a connection across calls.
#[async_trait::async_trait]
pub trait TurnStore: Send + Sync {
    /// Fetch the turn, creating and persisting the initial turn if the
    /// store is empty. Never reports "not found".
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on transport failure or
    /// [`StoreError::Corrupt`] if the stored record cannot be decoded.
    async fn get_current_turn(&self) -> Result<Turn, StoreError>;

    /// Apply `patch` to the turn.
    ///
    /// With `expected` set, the write only happens if the stored
    /// clock-owned fields all equal it; otherwise nothing changes and
    /// `matched` is `false`. With `upsert` set, a missing record is
    /// created from a [`TurnPatch::Set`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidStateTransition`] for `upsert` combined
    /// with `expected`, before any I/O, or [`StoreError::Unavailable`] on
    /// transport failure.
    async fn update_turn(
        &self,
        patch: TurnPatch,
        upsert: bool,
        expected: Option<ControlState>,
    ) -> Result<UpdateOutcome, StoreError>;

    /// Write `candidate` if the stored control fields still equal `expected`.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`update_turn`](Self::update_turn).
    async fn write(
        &self,
        candidate: Turn,
        expected: ControlState,
    ) -> Result<WriteOutcome, StoreError> {
        let outcome = self
            .update_turn(TurnPatch::Set(candidate), false, Some(expected))
            .await?;
        Ok(if outcome.matched {
            WriteOutcome::Matched
        } else {
            WriteOutcome::Conflict
        })
    }
}

/// A [`TurnStore`] held in process memory.
///
/// Every operation takes one lock for its whole unit of work, which gives
/// the same single-record atomicity as the database.
#[derive(Debug)]
pub struct MemoryTurnStore {
    clock: TurnClock,
    slot: Mutex<Option<Turn>>,
}

impl MemoryTurnStore {
    /// Create an empty store. The first read initializes it.
    pub fn new(clock: TurnClock) -> Self {
        Self {
            clock,
            slot: Mutex::new(None),
        }
    }

    /// Create a store already holding `turn`.
    pub fn with_turn(clock: TurnClock, turn: Turn) -> Self {
        Self {
            clock,
            slot: Mutex::new(Some(turn)),
        }
    }

    /// The stored turn, without initializing an empty store.
    pub async fn peek(&self) -> Option<Turn> {
        self.slot.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl TurnStore for MemoryTurnStore {
    async fn get_current_turn(&self) -> Result<Turn, StoreError> {
        let mut slot = self.slot.lock().await;
        let turn = slot.get_or_insert_with(|| {
            tracing::info!("Initializing turn store with the opening turn");
            self.clock.initial_turn(Utc::now())
        });
        Ok(turn.clone())
    }

    async fn update_turn(
        &self,
        patch: TurnPatch,
        upsert: bool,
        expected: Option<ControlState>,
    ) -> Result<UpdateOutcome, StoreError> {
        check_write_mode(upsert, expected.as_ref())?;

        let mut slot = self.slot.lock().await;
        let Some(stored) = slot.as_mut() else {
            return Ok(match patch {
                TurnPatch::Set(turn) if upsert => {
                    *slot = Some(turn);
                    UpdateOutcome { matched: true }
                }
                _ => UpdateOutcome { matched: false },
            });
        };

        if expected.is_some_and(|state| state != ControlState::of(stored)) {
            return Ok(UpdateOutcome { matched: false });
        }

        match patch {
            TurnPatch::Set(turn) => {
                stored.turn_number = turn.turn_number;
                stored.phase = turn.phase;
                stored.phase_end = turn.phase_end;
                stored.active = turn.active;
                stored.defcon = turn.defcon;
            }
            TurnPatch::PushNews(item) => stored.breaking_news.push(item),
        }

        Ok(UpdateOutcome { matched: true })
    }
}
