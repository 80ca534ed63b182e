//! The turn aggregate and the values it carries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{DefconStatus, Nation};
use crate::phase::Phase;

/// Key of the one and only turn record.
pub const TURN_ID: &str = "first-contact-2023";

// ---------------------------------------------------------------------------
// News
// ---------------------------------------------------------------------------

/// A breaking news entry, stamped with the turn and phase it was posted in.
///
/// Never mutated or removed once appended to a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NewsItem {
    /// Headline text.
    #[serde(rename = "newsText")]
    pub text: String,
    /// When the item was posted.
    #[serde(rename = "date")]
    pub timestamp: DateTime<Utc>,
    /// Turn number at posting time.
    #[serde(rename = "turn")]
    pub turn_number: u32,
    /// Phase at posting time.
    pub phase: Phase,
}

// ---------------------------------------------------------------------------
// DEFCON board
// ---------------------------------------------------------------------------

/// Alert level of every nation.
///
/// One field per [`Nation`], so a board can never be missing a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "PascalCase")]
#[ts(export, export_to = "bindings/")]
#[allow(missing_docs)]
pub struct Defcon {
    #[ts(type = r#""hidden" | 1 | 2 | 3"#)]
    pub china: DefconStatus,
    #[ts(type = r#""hidden" | 1 | 2 | 3"#)]
    pub france: DefconStatus,
    #[ts(type = r#""hidden" | 1 | 2 | 3"#)]
    pub russia: DefconStatus,
    #[ts(type = r#""hidden" | 1 | 2 | 3"#)]
    pub united_states: DefconStatus,
    #[ts(type = r#""hidden" | 1 | 2 | 3"#)]
    pub united_kingdom: DefconStatus,
    #[ts(type = r#""hidden" | 1 | 2 | 3"#)]
    pub pakistan: DefconStatus,
    #[ts(type = r#""hidden" | 1 | 2 | 3"#)]
    pub india: DefconStatus,
    #[ts(type = r#""hidden" | 1 | 2 | 3"#)]
    pub israel: DefconStatus,
}

impl Defcon {
    /// A board with every nation at the same status.
    pub const fn uniform(status: DefconStatus) -> Self {
        Self {
            china: status,
            france: status,
            russia: status,
            united_states: status,
            united_kingdom: status,
            pakistan: status,
            india: status,
            israel: status,
        }
    }

    /// The status of one nation.
    pub const fn get(&self, nation: Nation) -> DefconStatus {
        match nation {
            Nation::China => self.china,
            Nation::France => self.france,
            Nation::Russia => self.russia,
            Nation::UnitedStates => self.united_states,
            Nation::UnitedKingdom => self.united_kingdom,
            Nation::Pakistan => self.pakistan,
            Nation::India => self.india,
            Nation::Israel => self.israel,
        }
    }

    /// Return a copy of the board with one nation's status replaced.
    #[must_use]
    pub const fn with_status(mut self, nation: Nation, status: DefconStatus) -> Self {
        let slot = match nation {
            Nation::China => &mut self.china,
            Nation::France => &mut self.france,
            Nation::Russia => &mut self.russia,
            Nation::UnitedStates => &mut self.united_states,
            Nation::UnitedKingdom => &mut self.united_kingdom,
            Nation::Pakistan => &mut self.pakistan,
            Nation::India => &mut self.india,
            Nation::Israel => &mut self.israel,
        };
        *slot = status;
        self
    }

    /// Iterate over `(nation, status)` pairs in board order.
    pub fn iter(&self) -> impl Iterator<Item = (Nation, DefconStatus)> + '_ {
        Nation::ALL.into_iter().map(move |n| (n, self.get(n)))
    }

    /// Nations bucketed by status. Every status has an entry, possibly empty.
    pub fn grouped(&self) -> BTreeMap<DefconStatus, Vec<Nation>> {
        let mut groups: BTreeMap<DefconStatus, Vec<Nation>> =
            DefconStatus::ALL.into_iter().map(|s| (s, Vec::new())).collect();
        for (nation, status) in self.iter() {
            groups.entry(status).or_default().push(nation);
        }
        groups
    }
}

impl Default for Defcon {
    /// The opening board: everyone at DEFCON 3 except the hidden nation.
    fn default() -> Self {
        Self::uniform(DefconStatus::Defcon3)
            .with_status(Nation::INITIALLY_HIDDEN, DefconStatus::Hidden)
    }
}

// ---------------------------------------------------------------------------
// Version token
// ---------------------------------------------------------------------------

/// The `(turn_number, phase)` pair a writer observed.
///
/// Used as the precondition for conditional writes: any advance or rewind
/// changes it, so a stale reader's token stops matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct TurnVersion {
    /// Turn number.
    pub turn_number: u32,
    /// Phase within the turn.
    pub phase: Phase,
}

impl core::fmt::Display for TurnVersion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "turn {} phase {}", self.turn_number, self.phase)
    }
}

// ---------------------------------------------------------------------------
// Boundary projection
// ---------------------------------------------------------------------------

/// The externally visible shape of a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ApiResponse {
    /// Turn number.
    pub turn_number: u32,
    /// Phase within the turn.
    pub phase: Phase,
    /// Every news item posted so far, oldest first.
    pub breaking_news: Vec<NewsItem>,
    /// Whether the clock is running.
    pub active: bool,
    /// Phase deadline as milliseconds since the Unix epoch.
    #[ts(type = "number")]
    pub phase_end: i64,
    /// Alert levels.
    pub defcon: Defcon,
}

// ---------------------------------------------------------------------------
// Turn aggregate
// ---------------------------------------------------------------------------

/// The singleton game clock record.
///
/// Serializes to the persisted document shape: `_id`, `phaseEnd` as an
/// RFC 3339 string, and the nullable `frozenTurn` snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    /// Always [`TURN_ID`].
    #[serde(rename = "_id")]
    pub id: String,
    /// Turn number, starting at 1.
    pub turn_number: u32,
    /// Phase within the turn.
    pub phase: Phase,
    /// Deadline of the current phase.
    pub phase_end: DateTime<Utc>,
    /// Whether the clock is running.
    pub active: bool,
    /// Append-only news log.
    pub breaking_news: Vec<NewsItem>,
    /// Alert levels.
    pub defcon: Defcon,
    /// Snapshot captured when the record was first created.
    pub frozen_turn: Option<ApiResponse>,
}

impl Turn {
    /// The version token of this turn.
    pub const fn version(&self) -> TurnVersion {
        TurnVersion {
            turn_number: self.turn_number,
            phase: self.phase,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn default_board_hides_one_nation() {
        let board = Defcon::default();
        for (nation, status) in board.iter() {
            if nation == Nation::INITIALLY_HIDDEN {
                assert_eq!(status, DefconStatus::Hidden);
            } else {
                assert_eq!(status, DefconStatus::Defcon3);
            }
        }
    }

    #[test]
    fn with_status_touches_one_entry() {
        let before = Defcon::default();
        let after = before.with_status(Nation::Russia, DefconStatus::Defcon1);
        assert_eq!(after.get(Nation::Russia), DefconStatus::Defcon1);
        for nation in Nation::ALL.into_iter().filter(|n| *n != Nation::Russia) {
            assert_eq!(after.get(nation), before.get(nation));
        }
    }

    #[test]
    fn grouped_buckets_every_nation_once() {
        let board = Defcon::default().with_status(Nation::India, DefconStatus::Defcon2);
        let groups = board.grouped();
        assert_eq!(groups.len(), 4);
        assert_eq!(groups[&DefconStatus::Hidden], vec![Nation::Israel]);
        assert_eq!(groups[&DefconStatus::Defcon2], vec![Nation::India]);
        assert!(groups[&DefconStatus::Defcon1].is_empty());
        assert_eq!(groups.values().map(Vec::len).sum::<usize>(), 8);
    }

    #[test]
    fn defcon_wire_keys() {
        let json = serde_json::to_value(Defcon::default()).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 8);
        assert_eq!(obj["UnitedStates"], 3);
        assert_eq!(obj["Israel"], "hidden");
    }

    #[test]
    fn defcon_rejects_missing_key() {
        let mut json = serde_json::to_value(Defcon::default()).unwrap();
        json.as_object_mut().unwrap().remove("France");
        assert!(serde_json::from_value::<Defcon>(json).is_err());
    }

    #[test]
    fn news_item_wire_names() {
        let item = NewsItem {
            text: String::from("Talks collapse"),
            timestamp: Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0).unwrap(),
            turn_number: 2,
            phase: Phase::new(4).unwrap(),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["newsText"], "Talks collapse");
        assert_eq!(json["turn"], 2);
        assert_eq!(json["phase"], 4);
        assert!(json["date"].as_str().unwrap().starts_with("2023-05-01T12:00:00"));
    }

    #[test]
    fn turn_serializes_as_persisted_record() {
        let turn = Turn {
            id: TURN_ID.to_owned(),
            turn_number: 1,
            phase: Phase::FIRST,
            phase_end: Utc.with_ymd_and_hms(2023, 1, 1, 0, 30, 0).unwrap(),
            active: false,
            breaking_news: Vec::new(),
            defcon: Defcon::default(),
            frozen_turn: None,
        };
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["_id"], TURN_ID);
        assert!(json["phaseEnd"].is_string());
        assert!(json["frozenTurn"].is_null());

        let back: Turn = serde_json::from_value(json).unwrap();
        assert_eq!(back, turn);
        assert_eq!(back.version().to_string(), "turn 1 phase 1");
    }
}
