//! Control actions: guarded state transitions against the shared turn.
//!
//! A control action is one round trip through the store:
//!
//! ```text
//! read turn ──> transform ──> commit_transition ──> CAS write on control fields
//!     │                                                  │
//!     └── ControlState as read                           ├─ matched  -> Applied(candidate)
//!                                                        └─ mismatch -> Conflict
//! ```
//!
//! There is no lock and no retry. When two callers race on the same read
//! exactly one write lands, whether or not either action changes the
//! `(turn, phase)` version; the other gets
//! [`ControlOutcome::Conflict`] and must re-read before trying again.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use wts_types::{ControlAction, DefconStatus, Nation, Turn, TurnVersion};

use crate::clock::TurnClock;
use crate::defcon;
use crate::store::{ControlState, StoreError, TurnStore, WriteOutcome};

/// Why a control action was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConflictReason {
    /// The stored control fields changed between the read and the write.
    #[error("Failed to get lock")]
    LockLost,
}

/// Result of a control action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlOutcome {
    /// The candidate was written and is now the authoritative turn.
    Applied(Turn),
    /// Another writer got there first; the store is unchanged.
    Conflict(ConflictReason),
}

impl ControlOutcome {
    /// Convert into a `Result`, treating a conflict as the error case.
    ///
    /// # Errors
    ///
    /// Returns the [`ConflictReason`] if the action was not applied.
    pub fn into_result(self) -> Result<Turn, ConflictReason> {
        match self {
            Self::Applied(turn) => Ok(turn),
            Self::Conflict(reason) => Err(reason),
        }
    }
}

/// Runs control actions against a [`TurnStore`].
#[derive(Clone)]
pub struct ControlActionExecutor {
    store: Arc<dyn TurnStore>,
    clock: TurnClock,
}

impl ControlActionExecutor {
    /// Create an executor over the given store and clock.
    pub fn new(store: Arc<dyn TurnStore>, clock: TurnClock) -> Self {
        Self { store, clock }
    }

    /// Read, transform, commit, and conditionally write the turn.
    ///
    /// `transform` receives the clock, the current turn and the instant the
    /// action started. Whatever it returns is normalized with
    /// [`TurnClock::commit_transition`] before being written against the
    /// control fields that were read.
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError`] from the read or the write unchanged.
    pub async fn run_control_action<F>(&self, transform: F) -> Result<ControlOutcome, StoreError>
    where
        F: FnOnce(&TurnClock, Turn, DateTime<Utc>) -> Turn + Send,
    {
        let turn = self.store.get_current_turn().await?;
        let expected = ControlState::of(&turn);
        let now = Utc::now();

        let candidate = self
            .clock
            .commit_transition(transform(&self.clock, turn, now), now);

        match self.store.write(candidate.clone(), expected).await? {
            WriteOutcome::Matched => {
                tracing::debug!(
                    from = %expected.version(),
                    to = %candidate.version(),
                    active = candidate.active,
                    "Control action applied"
                );
                Ok(ControlOutcome::Applied(candidate))
            }
            WriteOutcome::Conflict => {
                tracing::warn!(
                    turn_number = expected.turn_number,
                    phase = expected.phase.get(),
                    "Control action lost the race for the turn"
                );
                Ok(ControlOutcome::Conflict(ConflictReason::LockLost))
            }
        }
    }

    /// Apply a wire-level control action.
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError`].
    pub async fn apply(&self, action: ControlAction) -> Result<ControlOutcome, StoreError> {
        tracing::info!(%action, "Running control action");
        match action {
            ControlAction::Pause => self.pause().await,
            ControlAction::Play => self.resume().await,
            ControlAction::BackTurn => self.back_turn().await,
            ControlAction::BackPhase => self.back_phase().await,
            ControlAction::ForwardPhase => self.forward_phase().await,
            ControlAction::ForwardTurn => self.forward_turn().await,
        }
    }

    /// Stop the clock.
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError`].
    pub async fn pause(&self) -> Result<ControlOutcome, StoreError> {
        self.run_control_action(|clock, turn, now| clock.pause_resume(turn, false, now))
            .await
    }

    /// Start the clock.
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError`].
    pub async fn resume(&self) -> Result<ControlOutcome, StoreError> {
        self.run_control_action(|clock, turn, now| clock.pause_resume(turn, true, now))
            .await
    }

    /// Rewind to phase 1 of the previous turn.
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError`].
    pub async fn back_turn(&self) -> Result<ControlOutcome, StoreError> {
        self.run_control_action(TurnClock::back_a_turn).await
    }

    /// Rewind one phase.
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError`].
    pub async fn back_phase(&self) -> Result<ControlOutcome, StoreError> {
        self.run_control_action(TurnClock::back_a_phase).await
    }

    /// Advance one phase.
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError`].
    pub async fn forward_phase(&self) -> Result<ControlOutcome, StoreError> {
        self.run_control_action(TurnClock::tick_turn).await
    }

    /// Advance to phase 1 of the next turn.
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError`].
    pub async fn forward_turn(&self) -> Result<ControlOutcome, StoreError> {
        self.run_control_action(TurnClock::forward_turn).await
    }

    /// Change one nation's alert level.
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError`].
    pub async fn update_defcon_status(
        &self,
        nation: Nation,
        status: DefconStatus,
    ) -> Result<ControlOutcome, StoreError> {
        tracing::info!(?nation, %status, "Updating DEFCON status");
        self.run_control_action(move |_clock, turn, _now| defcon::set_status(turn, nation, status))
            .await
    }

    /// Advance one phase, but only if the clock is still at `expected`.
    ///
    /// Used by clients whose phase deadline has passed. If the stored
    /// version has already moved on, or another caller wins the write,
    /// the current stored turn is returned instead.
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError`].
    pub async fn advance_if_current(&self, expected: TurnVersion) -> Result<Turn, StoreError> {
        let turn = self.store.get_current_turn().await?;
        if turn.version() != expected {
            tracing::debug!(
                stored = %turn.version(),
                %expected,
                "Turn already advanced"
            );
            return Ok(turn);
        }

        let read = ControlState::of(&turn);
        let next = self.clock.tick_turn(turn, Utc::now());
        match self.store.write(next.clone(), read).await? {
            WriteOutcome::Matched => Ok(next),
            WriteOutcome::Conflict => self.store.get_current_turn().await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::TimeDelta;
    use tokio::sync::Barrier;
    use wts_types::Phase;

    use super::*;
    use crate::schedule::FixedSchedule;
    use crate::store::{MemoryTurnStore, TurnPatch, UpdateOutcome};

    fn clock() -> TurnClock {
        TurnClock::new(Arc::new(FixedSchedule::new(TimeDelta::minutes(30))))
    }

    fn setup() -> (Arc<MemoryTurnStore>, ControlActionExecutor) {
        let store = Arc::new(MemoryTurnStore::new(clock()));
        let executor = ControlActionExecutor::new(Arc::clone(&store) as Arc<dyn TurnStore>, clock());
        (store, executor)
    }

    fn applied(outcome: ControlOutcome) -> Turn {
        match outcome {
            ControlOutcome::Applied(turn) => turn,
            ControlOutcome::Conflict(reason) => panic!("unexpected conflict: {reason}"),
        }
    }

    /// Store wrapper that holds the first `n` readers until all of them
    /// have arrived, so concurrent actions are guaranteed to read the same
    /// turn. Later reads pass straight through.
    struct GatedStore {
        inner: Arc<MemoryTurnStore>,
        gate: Barrier,
        gated_reads: AtomicUsize,
    }

    impl GatedStore {
        fn new(inner: Arc<MemoryTurnStore>, racers: usize) -> Self {
            Self {
                inner,
                gate: Barrier::new(racers),
                gated_reads: AtomicUsize::new(racers),
            }
        }
    }

    #[async_trait::async_trait]
    impl TurnStore for GatedStore {
        async fn get_current_turn(&self) -> Result<Turn, StoreError> {
            let turn = self.inner.get_current_turn().await;
            let gated = self
                .gated_reads
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if gated {
                self.gate.wait().await;
            }
            turn
        }

        async fn update_turn(
            &self,
            patch: TurnPatch,
            upsert: bool,
            expected: Option<ControlState>,
        ) -> Result<UpdateOutcome, StoreError> {
            self.inner.update_turn(patch, upsert, expected).await
        }
    }

    #[tokio::test]
    async fn forward_phase_persists_candidate() {
        let (store, executor) = setup();
        let turn = applied(executor.forward_phase().await.unwrap());
        assert_eq!(turn.phase.get(), 2);
        assert_eq!(store.peek().await, Some(turn));
    }

    #[tokio::test]
    async fn forward_turn_from_any_phase() {
        let (store, executor) = setup();
        for _ in 0..6 {
            applied(executor.forward_phase().await.unwrap());
        }
        let before = store.peek().await.unwrap();
        assert_eq!(before.phase.get(), 7);

        let turn = applied(executor.forward_turn().await.unwrap());
        assert_eq!(turn.turn_number, before.turn_number + 1);
        assert_eq!(turn.phase, Phase::FIRST);
    }

    #[tokio::test]
    async fn back_phase_then_forward_phase() {
        let (_store, executor) = setup();
        applied(executor.forward_phase().await.unwrap());
        applied(executor.forward_phase().await.unwrap());
        let back = applied(executor.back_phase().await.unwrap());
        assert_eq!(back.phase.get(), 2);
        let again = applied(executor.forward_phase().await.unwrap());
        assert_eq!(again.phase.get(), 3);
    }

    #[tokio::test]
    async fn back_turn_at_game_start_is_a_no_op_on_the_version() {
        let (_store, executor) = setup();
        let turn = applied(executor.back_turn().await.unwrap());
        assert_eq!(turn.turn_number, 1);
        assert_eq!(turn.phase, Phase::FIRST);
    }

    #[tokio::test]
    async fn pause_and_resume() {
        let (store, executor) = setup();
        let running = applied(executor.apply(ControlAction::Play).await.unwrap());
        assert!(running.active);
        assert!(store.peek().await.unwrap().active);

        let paused = applied(executor.apply(ControlAction::Pause).await.unwrap());
        assert!(!paused.active);
        assert_eq!(paused.version(), running.version());
    }

    #[tokio::test]
    async fn paused_actions_rearm_the_timer() {
        let (store, executor) = setup();
        let initial = store.get_current_turn().await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let turn = applied(
            executor
                .update_defcon_status(Nation::China, DefconStatus::Defcon1)
                .await
                .unwrap(),
        );
        assert!(!turn.active);
        assert!(turn.phase_end > initial.phase_end);
    }

    #[tokio::test]
    async fn defcon_update_changes_one_nation() {
        let (store, executor) = setup();
        let before = store.get_current_turn().await.unwrap();

        let after = applied(
            executor
                .update_defcon_status(Nation::Pakistan, DefconStatus::Defcon2)
                .await
                .unwrap(),
        );
        assert_eq!(after.defcon.get(Nation::Pakistan), DefconStatus::Defcon2);
        for nation in Nation::ALL.into_iter().filter(|n| *n != Nation::Pakistan) {
            assert_eq!(after.defcon.get(nation), before.defcon.get(nation));
        }
        assert_eq!(after.version(), before.version());
    }

    #[tokio::test]
    async fn racing_actions_have_exactly_one_winner() {
        let (inner, executor) = gated_executor(2);

        // Neither action moves the (turn, phase) version.
        let (pause, defcon) = tokio::join!(
            executor.pause(),
            executor.update_defcon_status(Nation::France, DefconStatus::Defcon2),
        );
        let (winners, conflicts) = split([pause.unwrap(), defcon.unwrap()]);
        assert_eq!(winners.len(), 1);
        assert_eq!(conflicts, 1);

        // No field-level merge: the stored turn is the winner's candidate.
        let stored = inner.peek().await.unwrap();
        assert_eq!(Some(&stored), winners.first());
    }

    fn gated_executor(racers: usize) -> (Arc<MemoryTurnStore>, ControlActionExecutor) {
        let inner = Arc::new(MemoryTurnStore::new(clock()));
        let gated: Arc<dyn TurnStore> = Arc::new(GatedStore::new(Arc::clone(&inner), racers));
        (inner, ControlActionExecutor::new(gated, clock()))
    }

    fn split(outcomes: [ControlOutcome; 2]) -> (Vec<Turn>, usize) {
        let conflicts = outcomes
            .iter()
            .filter(|o| matches!(o, ControlOutcome::Conflict(ConflictReason::LockLost)))
            .count();
        let winners = outcomes
            .into_iter()
            .filter_map(|o| match o {
                ControlOutcome::Applied(turn) => Some(turn),
                ControlOutcome::Conflict(_) => None,
            })
            .collect();
        (winners, conflicts)
    }

    #[tokio::test]
    async fn defcon_update_racing_forward_phase_is_not_lost() {
        let (inner, executor) = gated_executor(2);

        let (defcon, forward) = tokio::join!(
            executor.update_defcon_status(Nation::Russia, DefconStatus::Defcon1),
            executor.forward_phase(),
        );
        let (winners, conflicts) = split([defcon.unwrap(), forward.unwrap()]);
        assert_eq!(winners.len(), 1);
        assert_eq!(conflicts, 1);

        // Whatever the store holds must be exactly one action's result.
        let stored = inner.peek().await.unwrap();
        assert_eq!(Some(&stored), winners.first());
        let raised = stored.defcon.get(Nation::Russia) == DefconStatus::Defcon1;
        let advanced = stored.phase.get() == 2;
        assert!(raised != advanced);
    }

    #[tokio::test]
    async fn pause_racing_forward_phase_is_not_lost() {
        let (inner, executor) = gated_executor(2);
        // Start the clock through the inner store so the gate stays armed
        // for the racers.
        let opening = inner.get_current_turn().await.unwrap();
        let running = clock().pause_resume(opening.clone(), true, Utc::now());
        inner
            .write(running, ControlState::of(&opening))
            .await
            .unwrap();

        let (pause, forward) = tokio::join!(executor.pause(), executor.forward_phase());
        let (winners, conflicts) = split([pause.unwrap(), forward.unwrap()]);
        assert_eq!(winners.len(), 1);
        assert_eq!(conflicts, 1);

        let stored = inner.peek().await.unwrap();
        assert_eq!(Some(&stored), winners.first());
        // Either the pause landed and the phase did not move, or the
        // forward landed and the clock is still running.
        assert!(stored.active == (stored.phase.get() == 2));
    }

    #[tokio::test]
    async fn advance_if_current_loses_to_a_defcon_write() {
        let (inner, executor) = gated_executor(2);
        let start = inner.get_current_turn().await.unwrap().version();

        let (defcon, advanced) = tokio::join!(
            executor.update_defcon_status(Nation::India, DefconStatus::Defcon2),
            executor.advance_if_current(start),
        );
        let defcon = defcon.unwrap();
        let advanced = advanced.unwrap();

        let stored = inner.peek().await.unwrap();
        match defcon {
            ControlOutcome::Applied(turn) => {
                // The tick lost and reports the stored turn instead.
                assert_eq!(stored, turn);
                assert_eq!(advanced, turn);
                assert_eq!(stored.phase, Phase::FIRST);
            }
            ControlOutcome::Conflict(_) => {
                assert_eq!(stored, advanced);
                assert_eq!(stored.phase.get(), 2);
                assert_eq!(stored.defcon.get(Nation::India), DefconStatus::Defcon3);
            }
        }
    }

    #[tokio::test]
    async fn many_racers_on_one_version_yield_one_write() {
        const RACERS: usize = 8;
        let (inner, executor) = gated_executor(RACERS);

        let outcomes =
            futures::future::join_all((0..RACERS).map(|_| executor.forward_turn())).await;
        let applied = outcomes
            .into_iter()
            .map(Result::unwrap)
            .filter(|o| matches!(o, ControlOutcome::Applied(_)))
            .count();

        assert_eq!(applied, 1);
        assert_eq!(inner.peek().await.unwrap().turn_number, 2);
    }

    #[tokio::test]
    async fn conflict_leaves_store_untouched() {
        let (store, executor) = setup();
        let current = store.get_current_turn().await.unwrap();
        let stale = ControlState::of(&current);

        applied(executor.forward_phase().await.unwrap());
        let after_first = store.peek().await.unwrap();

        let outcome = store
            .write(clock().back_a_turn(current, Utc::now()), stale)
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Conflict);
        assert_eq!(store.peek().await.unwrap(), after_first);
    }

    #[tokio::test]
    async fn conflict_message_matches_wire_text() {
        assert_eq!(ConflictReason::LockLost.to_string(), "Failed to get lock");
        let outcome = ControlOutcome::Conflict(ConflictReason::LockLost);
        assert_eq!(outcome.into_result(), Err(ConflictReason::LockLost));
    }

    #[tokio::test]
    async fn advance_if_current_advances_once() {
        let (store, executor) = setup();
        let start = store.get_current_turn().await.unwrap().version();

        let first = executor.advance_if_current(start).await.unwrap();
        assert_eq!(first.phase.get(), 2);

        // A second client with the same stale view sees the advanced turn.
        let second = executor.advance_if_current(start).await.unwrap();
        assert_eq!(second.version(), first.version());
        assert_eq!(store.peek().await.unwrap().phase.get(), 2);
    }
}
