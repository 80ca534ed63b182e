//! Enumeration types for the turn clock.

use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ts_rs::TS;

use crate::error::TypeError;

// ---------------------------------------------------------------------------
// Nations
// ---------------------------------------------------------------------------

/// One of the eight nations tracked on the DEFCON board.
///
/// The serialized names are the keys of the `defcon` object on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Nation {
    /// China.
    China,
    /// France.
    France,
    /// Russia.
    Russia,
    /// United States.
    UnitedStates,
    /// United Kingdom.
    UnitedKingdom,
    /// Pakistan.
    Pakistan,
    /// India.
    India,
    /// Israel. Starts the game with its status hidden.
    Israel,
}

impl Nation {
    /// Every nation, in board order.
    pub const ALL: [Self; 8] = [
        Self::China,
        Self::France,
        Self::Russia,
        Self::UnitedStates,
        Self::UnitedKingdom,
        Self::Pakistan,
        Self::India,
        Self::Israel,
    ];

    /// The nation whose status is hidden on a fresh board.
    pub const INITIALLY_HIDDEN: Self = Self::Israel;
}

// ---------------------------------------------------------------------------
// DEFCON levels
// ---------------------------------------------------------------------------

/// A nation's alert level.
///
/// On the wire this is the string `"hidden"` or one of the integers
/// `1`, `2`, `3`. Ordering follows the board layout: hidden first, then
/// the most severe level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DefconStatus {
    /// The nation's level is not shown to players.
    Hidden,
    /// DEFCON 1 (most severe).
    Defcon1,
    /// DEFCON 2.
    Defcon2,
    /// DEFCON 3 (starting level).
    Defcon3,
}

impl DefconStatus {
    /// Every status, in board order.
    pub const ALL: [Self; 4] = [Self::Hidden, Self::Defcon1, Self::Defcon2, Self::Defcon3];

    /// The numeric level, or `None` when hidden.
    pub const fn level(self) -> Option<u8> {
        match self {
            Self::Hidden => None,
            Self::Defcon1 => Some(1),
            Self::Defcon2 => Some(2),
            Self::Defcon3 => Some(3),
        }
    }

    /// Build a status from a numeric level.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::UnknownDefconStatus`] unless `level` is 1, 2 or 3.
    pub fn from_level(level: u64) -> Result<Self, TypeError> {
        match level {
            1 => Ok(Self::Defcon1),
            2 => Ok(Self::Defcon2),
            3 => Ok(Self::Defcon3),
            other => Err(TypeError::UnknownDefconStatus(other.to_string())),
        }
    }
}

impl FromStr for DefconStatus {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hidden" => Ok(Self::Hidden),
            "1" => Ok(Self::Defcon1),
            "2" => Ok(Self::Defcon2),
            "3" => Ok(Self::Defcon3),
            other => Err(TypeError::UnknownDefconStatus(other.to_owned())),
        }
    }
}

impl core::fmt::Display for DefconStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.level() {
            Some(level) => write!(f, "{level}"),
            None => f.write_str("hidden"),
        }
    }
}

impl Serialize for DefconStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.level() {
            Some(level) => serializer.serialize_u8(level),
            None => serializer.serialize_str("hidden"),
        }
    }
}

struct DefconStatusVisitor;

impl Visitor<'_> for DefconStatusVisitor {
    type Value = DefconStatus;

    fn expecting(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(r#""hidden", 1, 2 or 3"#)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        DefconStatus::from_level(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        let level = u64::try_from(v).map_err(|_err| E::custom(TypeError::UnknownDefconStatus(v.to_string())))?;
        self.visit_u64(level)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        // Numeric strings are not accepted; only the literal "hidden".
        if v == "hidden" {
            Ok(DefconStatus::Hidden)
        } else {
            Err(E::custom(TypeError::UnknownDefconStatus(v.to_owned())))
        }
    }
}

impl<'de> Deserialize<'de> for DefconStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DefconStatusVisitor)
    }
}

// ---------------------------------------------------------------------------
// Control actions
// ---------------------------------------------------------------------------

/// A clock navigation command submitted by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum ControlAction {
    /// Stop the clock.
    Pause,
    /// Start the clock.
    Play,
    /// Rewind to the start of the previous turn.
    BackTurn,
    /// Rewind one phase.
    BackPhase,
    /// Advance one phase.
    ForwardPhase,
    /// Advance to the first phase of the next turn.
    ForwardTurn,
}

impl ControlAction {
    /// The wire name of the action.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Play => "play",
            Self::BackTurn => "back-turn",
            Self::BackPhase => "back-phase",
            Self::ForwardPhase => "forward-phase",
            Self::ForwardTurn => "forward-turn",
        }
    }
}

impl core::fmt::Display for ControlAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
