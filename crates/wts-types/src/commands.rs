//! Inbound command payloads.
//!
//! These mirror the request bodies the browser client and admin tools send.
//! Decoding one of these is the whole of the boundary validation: a body
//! that does not deserialize never reaches the clock.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ControlAction, DefconStatus, Nation};
use crate::phase::Phase;
use crate::structs::TurnVersion;

/// Body of a clock navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ControlCommand {
    /// The action to apply.
    pub action: ControlAction,
}

/// Body of a DEFCON change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct DefconUpdate {
    /// Nation whose level changes.
    pub state_name: Nation,
    /// The new level.
    #[ts(type = r#""hidden" | 1 | 2 | 3"#)]
    pub new_status: DefconStatus,
}

/// Body of a news submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct NewsSubmission {
    /// Headline text.
    pub breaking_news: String,
}

/// Body of a guarded single-phase advance.
///
/// Carries the version the client last saw; the advance only happens if the
/// clock is still there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct AdvanceRequest {
    /// Turn number the client observed.
    pub turn_number: u32,
    /// Phase the client observed.
    pub phase: Phase,
}

impl From<AdvanceRequest> for TurnVersion {
    fn from(req: AdvanceRequest) -> Self {
        Self {
            turn_number: req.turn_number,
            phase: req.phase,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn decode_control_command() {
        let cmd: ControlCommand = serde_json::from_str(r#"{"action":"forward-turn"}"#).unwrap();
        assert_eq!(cmd.action, ControlAction::ForwardTurn);
        assert!(serde_json::from_str::<ControlCommand>(r#"{"action":"rewind"}"#).is_err());
        assert!(serde_json::from_str::<ControlCommand>("{}").is_err());
    }

    #[test]
    fn decode_defcon_update() {
        let cmd: DefconUpdate =
            serde_json::from_str(r#"{"stateName":"Pakistan","newStatus":"hidden"}"#).unwrap();
        assert_eq!(cmd.state_name, Nation::Pakistan);
        assert_eq!(cmd.new_status, DefconStatus::Hidden);

        let cmd: DefconUpdate =
            serde_json::from_str(r#"{"stateName":"India","newStatus":1}"#).unwrap();
        assert_eq!(cmd.new_status, DefconStatus::Defcon1);

        assert!(
            serde_json::from_str::<DefconUpdate>(r#"{"stateName":"Atlantis","newStatus":1}"#)
                .is_err()
        );
    }

    #[test]
    fn decode_news_submission() {
        let cmd: NewsSubmission =
            serde_json::from_str(r#"{"breakingNews":"Border skirmish reported"}"#).unwrap();
        assert_eq!(cmd.breaking_news, "Border skirmish reported");
        assert!(serde_json::from_str::<NewsSubmission>(r#"{"breakingNews":3}"#).is_err());
    }

    #[test]
    fn advance_request_into_version() {
        let req: AdvanceRequest = serde_json::from_str(r#"{"turnNumber":3,"phase":10}"#).unwrap();
        let version = TurnVersion::from(req);
        assert_eq!(version.turn_number, 3);
        assert_eq!(version.phase, Phase::LAST);
        assert!(serde_json::from_str::<AdvanceRequest>(r#"{"turnNumber":3,"phase":11}"#).is_err());
    }
}
