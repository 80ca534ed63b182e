//! Turn clock state transitions.
//!
//! The clock is the single source of truth for how a [`Turn`] moves
//! through its phases. Every function here is pure: it takes a turn by
//! value plus the current instant and returns the next turn. Nothing reads
//! the system time or touches storage, so every transition is
//! reproducible in tests.
//!
//! # Design Principles
//!
//! - The phase deadline is derived from `(turn_number, phase)` through the
//!   injected [`PhaseSchedule`] and recomputed only when one of them
//!   changes, or when a transition is committed while the clock is paused.
//! - Rewinds never leave the `1..=10` phase range or drop below turn 1.
//!   At the start of the game they clamp instead of wrapping.
//! - Turn arithmetic saturates; nothing here can fail.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use wts_types::{ApiResponse, Defcon, Phase, TURN_ID, Turn};

use crate::schedule::PhaseSchedule;

/// Number of phases in one turn.
pub const PHASES_PER_TURN: u8 = Phase::LAST.get();

/// The turn state machine, parameterized by a phase-length policy.
#[derive(Debug, Clone)]
pub struct TurnClock {
    schedule: Arc<dyn PhaseSchedule>,
}

impl TurnClock {
    /// Create a clock using the given phase-length policy.
    pub fn new(schedule: Arc<dyn PhaseSchedule>) -> Self {
        Self { schedule }
    }

    /// The deadline of `phase` in `turn_number` if it started at `now`.
    pub fn compute_phase_end(
        &self,
        turn_number: u32,
        phase: Phase,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let length = self.schedule.phase_length(turn_number, phase);
        now.checked_add_signed(length)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// The record created on first access to an empty store.
    ///
    /// Turn 1, phase 1, paused, the opening DEFCON board, no news, and a
    /// frozen snapshot of itself.
    pub fn initial_turn(&self, now: DateTime<Utc>) -> Turn {
        let mut turn = Turn {
            id: TURN_ID.to_owned(),
            turn_number: 1,
            phase: Phase::FIRST,
            phase_end: self.compute_phase_end(1, Phase::FIRST, now),
            active: false,
            breaking_news: Vec::new(),
            defcon: Defcon::default(),
            frozen_turn: None,
        };
        turn.frozen_turn = Some(to_api_response(&turn, true));
        turn
    }

    /// Advance one phase, rolling into the next turn after phase 10.
    pub fn tick_turn(&self, mut turn: Turn, now: DateTime<Utc>) -> Turn {
        if let Some(next) = turn.phase.next() {
            turn.phase = next;
        } else {
            turn.phase = Phase::FIRST;
            turn.turn_number = turn.turn_number.saturating_add(1);
        }
        self.rearm(turn, now)
    }

    /// Advance to phase 1 of the next turn, whatever the starting phase.
    pub fn forward_turn(&self, turn: Turn, now: DateTime<Utc>) -> Turn {
        let start = turn.turn_number;
        let mut next = self.tick_turn(turn, now);
        // Bounded so a saturated turn counter cannot spin forever.
        for _ in 1..PHASES_PER_TURN {
            if next.turn_number != start {
                break;
            }
            next = self.tick_turn(next, now);
        }
        next
    }

    /// Rewind one phase.
    ///
    /// From phase 1 of turn `n > 1` this rolls back to phase 10 of turn
    /// `n - 1`. Phase 1 of turn 1 is returned unchanged.
    pub fn back_a_phase(&self, mut turn: Turn, now: DateTime<Utc>) -> Turn {
        if let Some(prev) = turn.phase.prev() {
            turn.phase = prev;
        } else if turn.turn_number > 1 {
            turn.turn_number = turn.turn_number.saturating_sub(1);
            turn.phase = Phase::LAST;
        } else {
            return turn;
        }
        self.rearm(turn, now)
    }

    /// Rewind to phase 1 of the previous turn.
    ///
    /// On turn 1 the turn number stays at 1 and only the phase resets.
    /// Phase 1 of turn 1 is returned unchanged.
    pub fn back_a_turn(&self, mut turn: Turn, now: DateTime<Utc>) -> Turn {
        if turn.turn_number > 1 {
            turn.turn_number = turn.turn_number.saturating_sub(1);
        } else if turn.phase.is_first() {
            return turn;
        }
        turn.phase = Phase::FIRST;
        self.rearm(turn, now)
    }

    /// Start or stop the clock, re-arming the phase timer from `now`.
    pub fn pause_resume(&self, turn: Turn, active: bool, now: DateTime<Utc>) -> Turn {
        self.rearm(set_active(turn, active), now)
    }

    /// Normalize a transition before it is persisted.
    ///
    /// A paused turn always carries a freshly armed deadline so the timer
    /// shown to clients is consistent; a running turn keeps whatever
    /// deadline its transition produced.
    pub fn commit_transition(&self, turn: Turn, now: DateTime<Utc>) -> Turn {
        if turn.active {
            turn
        } else {
            self.rearm(turn, now)
        }
    }

    fn rearm(&self, mut turn: Turn, now: DateTime<Utc>) -> Turn {
        turn.phase_end = self.compute_phase_end(turn.turn_number, turn.phase, now);
        turn
    }
}

/// Set the running flag and nothing else.
pub fn set_active(mut turn: Turn, active: bool) -> Turn {
    turn.active = active;
    turn
}

/// Whether two turns carry the same `(turn_number, phase)` version.
pub fn turn_matches(a: &Turn, b: &Turn) -> bool {
    a.version() == b.version()
}

/// Project a turn into its boundary shape.
///
/// With `frozen` set the projection is the immutable snapshot stored in
/// `frozen_turn`: a frozen clock is never reported as running.
pub fn to_api_response(turn: &Turn, frozen: bool) -> ApiResponse {
    ApiResponse {
        turn_number: turn.turn_number,
        phase: turn.phase,
        breaking_news: turn.breaking_news.clone(),
        active: turn.active && !frozen,
        phase_end: turn.phase_end.timestamp_millis(),
        defcon: turn.defcon,
    }
}
