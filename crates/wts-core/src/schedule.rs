//! Phase-length policy.
//!
//! How long a phase lasts is a tunable of the game, not of the state
//! machine. The clock asks a [`PhaseSchedule`] for the length of a
//! `(turn_number, phase)` pair and adds it to "now" to arm the deadline.

use std::collections::BTreeMap;

use chrono::TimeDelta;
use wts_types::Phase;

use crate::config::ClockConfig;

/// Errors raised while building a schedule from configuration.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// A phase override names a phase outside `1..=10`.
    #[error("phase override for phase {phase} is outside 1..=10")]
    UnknownPhase {
        /// The offending key.
        phase: u8,
    },

    /// A configured length is zero.
    #[error("phase length must be at least one minute ({context})")]
    ZeroLength {
        /// Which setting was zero.
        context: String,
    },
}

/// A pure mapping from `(turn_number, phase)` to the length of that phase.
pub trait PhaseSchedule: Send + Sync + core::fmt::Debug {
    /// Length of the given phase.
    fn phase_length(&self, turn_number: u32, phase: Phase) -> TimeDelta;
}

/// Every phase of every turn lasts the same amount of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSchedule {
    length: TimeDelta,
}

impl FixedSchedule {
    /// Create a schedule where every phase lasts `length`.
    pub const fn new(length: TimeDelta) -> Self {
        Self { length }
    }
}

impl PhaseSchedule for FixedSchedule {
    fn phase_length(&self, _turn_number: u32, _phase: Phase) -> TimeDelta {
        self.length
    }
}

/// Schedule built from [`ClockConfig`]: a default length, per-phase
/// overrides, and extra time for every phase of the opening turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredSchedule {
    default_length: TimeDelta,
    overrides: BTreeMap<Phase, TimeDelta>,
    first_turn_bonus: TimeDelta,
}

impl ConfiguredSchedule {
    /// Build a schedule from the clock section of the game configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError`] if an override names an unknown phase or
    /// any length is zero.
    pub fn from_config(config: &ClockConfig) -> Result<Self, ScheduleError> {
        if config.default_phase_minutes == 0 {
            return Err(ScheduleError::ZeroLength {
                context: "default_phase_minutes".to_owned(),
            });
        }

        let overrides = config
            .phase_minutes
            .iter()
            .map(|(&raw, &minutes)| {
                let phase =
                    Phase::new(raw).map_err(|_err| ScheduleError::UnknownPhase { phase: raw })?;
                if minutes == 0 {
                    return Err(ScheduleError::ZeroLength {
                        context: format!("phase_minutes.{raw}"),
                    });
                }
                Ok((phase, TimeDelta::minutes(i64::from(minutes))))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(Self {
            default_length: TimeDelta::minutes(i64::from(config.default_phase_minutes)),
            overrides,
            first_turn_bonus: TimeDelta::minutes(i64::from(config.first_turn_bonus_minutes)),
        })
    }
}

impl PhaseSchedule for ConfiguredSchedule {
    fn phase_length(&self, turn_number: u32, phase: Phase) -> TimeDelta {
        let base = self
            .overrides
            .get(&phase)
            .copied()
            .unwrap_or(self.default_length);
        if turn_number <= 1 {
            base.checked_add(&self.first_turn_bonus).unwrap_or(base)
        } else {
            base
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn phase(n: u8) -> Phase {
        Phase::new(n).unwrap()
    }

    #[test]
    fn fixed_schedule_ignores_position() {
        let schedule = FixedSchedule::new(TimeDelta::minutes(15));
        assert_eq!(schedule.phase_length(1, phase(1)), TimeDelta::minutes(15));
        assert_eq!(schedule.phase_length(40, phase(10)), TimeDelta::minutes(15));
    }

    #[test]
    fn configured_schedule_applies_overrides_and_bonus() {
        let config = ClockConfig {
            default_phase_minutes: 30,
            phase_minutes: BTreeMap::from([(10, 60)]),
            first_turn_bonus_minutes: 10,
        };
        let schedule = ConfiguredSchedule::from_config(&config).unwrap();

        assert_eq!(schedule.phase_length(2, phase(3)), TimeDelta::minutes(30));
        assert_eq!(schedule.phase_length(2, phase(10)), TimeDelta::minutes(60));
        assert_eq!(schedule.phase_length(1, phase(3)), TimeDelta::minutes(40));
        assert_eq!(schedule.phase_length(1, phase(10)), TimeDelta::minutes(70));
    }

    #[test]
    fn configured_schedule_rejects_bad_overrides() {
        let config = ClockConfig {
            phase_minutes: BTreeMap::from([(11, 5)]),
            ..ClockConfig::default()
        };
        assert!(matches!(
            ConfiguredSchedule::from_config(&config),
            Err(ScheduleError::UnknownPhase { phase: 11 })
        ));

        let config = ClockConfig {
            phase_minutes: BTreeMap::from([(2, 0)]),
            ..ClockConfig::default()
        };
        assert!(matches!(
            ConfiguredSchedule::from_config(&config),
            Err(ScheduleError::ZeroLength { .. })
        ));

        let config = ClockConfig {
            default_phase_minutes: 0,
            ..ClockConfig::default()
        };
        assert!(ConfiguredSchedule::from_config(&config).is_err());
    }
}
