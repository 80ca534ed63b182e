//! Per-nation DEFCON board updates.

use wts_types::{DefconStatus, Nation, Turn};

/// Replace one nation's alert level, leaving the other seven untouched.
///
/// Changing the board does not move the clock, so the phase deadline is
/// left for [`TurnClock::commit_transition`](crate::clock::TurnClock::commit_transition)
/// to handle.
pub fn set_status(mut turn: Turn, nation: Nation, status: DefconStatus) -> Turn {
    turn.defcon = turn.defcon.with_status(nation, status);
    turn
}
