//! The phase sub-step within a turn.
//!
//! A turn is divided into ten phases. [`Phase`] can only hold a value in
//! `1..=10`; every constructor and the serde decoder enforce the range so a
//! well-formed turn never carries an out-of-range phase.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::TypeError;

/// A phase number in `1..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(try_from = "u8", into = "u8")]
#[ts(export, export_to = "bindings/")]
pub struct Phase(u8);

impl Phase {
    /// The first phase of every turn.
    pub const FIRST: Self = Self(1);

    /// The last phase of every turn.
    pub const LAST: Self = Self(10);

    /// Create a phase, rejecting values outside `1..=10`.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::PhaseOutOfRange`] for 0 or anything above 10.
    pub const fn new(value: u8) -> Result<Self, TypeError> {
        if value >= Self::FIRST.0 && value <= Self::LAST.0 {
            Ok(Self(value))
        } else {
            Err(TypeError::PhaseOutOfRange(widen(value)))
        }
    }

    /// Return the raw phase number.
    pub const fn get(self) -> u8 {
        self.0
    }

    /// The following phase, or `None` when this is the last phase.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).and_then(|v| Self::new(v).ok())
    }

    /// The preceding phase, or `None` when this is the first phase.
    pub fn prev(self) -> Option<Self> {
        self.0.checked_sub(1).and_then(|v| Self::new(v).ok())
    }

    /// Whether this is the first phase of a turn.
    pub const fn is_first(self) -> bool {
        self.0 == Self::FIRST.0
    }
}

/// Lossless `u8` to `i64` that can run in a `const fn`.
const fn widen(value: u8) -> i64 {
    i64::from_le_bytes([value, 0, 0, 0, 0, 0, 0, 0])
}

impl Default for Phase {
    fn default() -> Self {
        Self::FIRST
    }
}

impl TryFrom<u8> for Phase {
    type Error = TypeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i64> for Phase {
    type Error = TypeError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_err| TypeError::PhaseOutOfRange(value))
            .and_then(Self::new)
    }
}

impl From<Phase> for u8 {
    fn from(phase: Phase) -> Self {
        phase.0
    }
}

impl From<Phase> for i16 {
    fn from(phase: Phase) -> Self {
        Self::from(phase.0)
    }
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
