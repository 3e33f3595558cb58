#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **riftline-types** – Shared data model for the Riftline pipeline.
//!
//! The crate is dependency-light and sits at the very bottom of the crate
//! graph so that every other crate can depend on it without causing cycles.
//! It defines the inbound event envelope with its per-type payload shapes,
//! the records kept in player histories, and the assembled state views
//! returned by the read path. It makes no assumptions about I/O, brokers,
//! or storage.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod view;

//─────────────────────────────
//  Event type tag
//─────────────────────────────

/// Wire-level event type tag.
///
/// Unrecognized tags never fail: they degrade to [`EventType::Unknown`],
/// which downstream dispatch treats as a silent drop. This keeps a single
/// malformed producer from poisoning the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// A match has started; carries the full fixture and rosters.
    #[serde(rename = "MATCH_START")]
    MatchStart,
    /// A player killed a minion.
    #[serde(rename = "MINION_KILL")]
    MinionKill,
    /// A player killed another player.
    #[serde(rename = "PLAYER_KILL")]
    PlayerKill,
    /// A player killed a dragon.
    #[serde(rename = "DRAGON_KILL")]
    DragonKill,
    /// A turret was destroyed.
    #[serde(rename = "TURRET_DESTROY")]
    TurretDestroy,
    /// The match has ended; carries the winning team.
    #[serde(rename = "MATCH_END")]
    MatchEnd,
    /// Anything we do not recognize.
    #[serde(other, rename = "UNKNOWN")]
    Unknown,
}

impl EventType {
    /// Parse a wire tag, degrading unrecognized values to `Unknown`.
    pub fn parse(tag: &str) -> Self {
        match tag {
            "MATCH_START" => Self::MatchStart,
            "MINION_KILL" => Self::MinionKill,
            "PLAYER_KILL" => Self::PlayerKill,
            "DRAGON_KILL" => Self::DragonKill,
            "TURRET_DESTROY" => Self::TurretDestroy,
            "MATCH_END" => Self::MatchEnd,
            _ => Self::Unknown,
        }
    }

    /// The wire spelling of this tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MatchStart => "MATCH_START",
            Self::MinionKill => "MINION_KILL",
            Self::PlayerKill => "PLAYER_KILL",
            Self::DragonKill => "DRAGON_KILL",
            Self::TurretDestroy => "TURRET_DESTROY",
            Self::MatchEnd => "MATCH_END",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//─────────────────────────────
//  Payload shapes
//─────────────────────────────

/// Fixture metadata carried by a match-start event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureMetadata {
    /// Start time of the match (ISO-8601).
    pub start_time: String,
    /// Title of the match.
    pub title: String,
    /// Current game number within the series.
    pub series_current: i64,
    /// Maximum number of games in the series.
    pub series_max: i64,
    /// Type of the series (e.g. best-of).
    pub series_type: String,
}

/// One player on a match-start roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterPlayer {
    /// Unique identifier for the player.
    #[serde(rename = "playerID")]
    pub player_id: String,
    /// Starting gold.
    pub gold: i64,
    /// Whether the player is alive at match start.
    pub alive: bool,
    /// Display name of the player.
    pub name: String,
}

/// One team on a match-start roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRoster {
    /// Unique identifier for the team.
    #[serde(rename = "teamID")]
    pub team_id: String,
    /// The team's players.
    pub players: Vec<RosterPlayer>,
}

/// Payload of a `MATCH_START` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchStartPayload {
    /// Fixture metadata.
    pub fixture: FixtureMetadata,
    /// Teams taking part in the match.
    pub teams: Vec<TeamRoster>,
}

/// Payload of a `MINION_KILL` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinionKillPayload {
    /// The player that made the kill.
    #[serde(rename = "playerID")]
    pub player_id: String,
    /// Gold granted for the kill, when the feed reports it.
    #[serde(rename = "goldGranted")]
    pub gold_granted: Option<i64>,
}

/// Payload of a `PLAYER_KILL` event.
///
/// Every field is optional on the wire; processors skip the mutations whose
/// inputs are absent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerKillPayload {
    /// The killer, when known.
    #[serde(rename = "killerID")]
    pub killer_id: Option<String>,
    /// The victim, when known.
    #[serde(rename = "victimID")]
    pub victim_id: Option<String>,
    /// Gold granted to the killer.
    #[serde(rename = "goldGranted")]
    pub gold_granted: Option<i64>,
    /// Players credited with an assist.
    pub assistants: Option<Vec<String>>,
    /// Gold granted to each assistant.
    #[serde(rename = "assistGold")]
    pub assist_gold: Option<i64>,
}

/// Payload of a `DRAGON_KILL` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragonKillPayload {
    /// The player that made the kill.
    #[serde(rename = "killerID")]
    pub killer_id: String,
    /// Which dragon was slain.
    #[serde(rename = "dragonType")]
    pub dragon_type: Option<String>,
    /// Gold granted for the kill.
    #[serde(rename = "goldGranted")]
    pub gold_granted: Option<i64>,
}

/// Payload of a `TURRET_DESTROY` event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TurretDestroyPayload {
    /// The player that destroyed the turret, when known.
    #[serde(rename = "killerID")]
    pub killer_id: Option<String>,
    /// The destroying player's team.
    #[serde(rename = "killerTeamID")]
    pub killer_team_id: Option<String>,
    /// Tier of the destroyed turret.
    #[serde(rename = "turretTier")]
    pub turret_tier: Option<i64>,
    /// Lane of the destroyed turret.
    #[serde(rename = "turretLane")]
    pub turret_lane: Option<String>,
    /// Gold granted to the destroying player.
    #[serde(rename = "playerGoldGranted")]
    pub player_gold_granted: Option<i64>,
    /// Gold granted to each of the destroying player's teammates.
    #[serde(rename = "teamGoldGranted")]
    pub team_gold_granted: Option<i64>,
}

/// Payload of a `MATCH_END` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEndPayload {
    /// The team that won the match.
    #[serde(rename = "winningTeamID")]
    pub winning_team_id: String,
}

//─────────────────────────────
//  Event envelope
//─────────────────────────────

/// Typed payload, discriminated by the envelope's [`EventType`].
///
/// Dispatch over this enum is exhaustive; `Unknown` carries no data and is
/// dropped by the processor stage.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// `MATCH_START` payload.
    MatchStart(MatchStartPayload),
    /// `MINION_KILL` payload.
    MinionKill(MinionKillPayload),
    /// `PLAYER_KILL` payload.
    PlayerKill(PlayerKillPayload),
    /// `DRAGON_KILL` payload.
    DragonKill(DragonKillPayload),
    /// `TURRET_DESTROY` payload.
    TurretDestroy(TurretDestroyPayload),
    /// `MATCH_END` payload.
    MatchEnd(MatchEndPayload),
    /// Unrecognized event type; no payload is decoded.
    Unknown,
}

impl EventPayload {
    /// Decode a payload value against a type tag.
    ///
    /// Required fields missing from the value fail with
    /// [`EventParseError::InvalidPayload`]; an `Unknown` tag decodes to
    /// [`EventPayload::Unknown`] without touching the value at all.
    pub fn from_value(
        event_type: EventType,
        value: serde_json::Value,
    ) -> Result<Self, EventParseError> {
        let invalid = |source| EventParseError::InvalidPayload { kind: event_type, source };
        Ok(match event_type {
            EventType::MatchStart => {
                Self::MatchStart(serde_json::from_value(value).map_err(invalid)?)
            }
            EventType::MinionKill => {
                Self::MinionKill(serde_json::from_value(value).map_err(invalid)?)
            }
            EventType::PlayerKill => {
                Self::PlayerKill(serde_json::from_value(value).map_err(invalid)?)
            }
            EventType::DragonKill => {
                Self::DragonKill(serde_json::from_value(value).map_err(invalid)?)
            }
            EventType::TurretDestroy => {
                Self::TurretDestroy(serde_json::from_value(value).map_err(invalid)?)
            }
            EventType::MatchEnd => {
                Self::MatchEnd(serde_json::from_value(value).map_err(invalid)?)
            }
            EventType::Unknown => Self::Unknown,
        })
    }
}

/// A fully decoded game event, ready for processor dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct GameEvent {
    /// The match this event belongs to. Absent on some payloads; processors
    /// that need it resolve the match through the player registry instead.
    pub match_id: Option<String>,
    /// The discriminating type tag.
    pub event_type: EventType,
    /// Event timestamp as the ISO-8601 string from the feed.
    pub timestamp: Option<String>,
    /// The typed payload.
    pub payload: EventPayload,
}

impl GameEvent {
    /// Decode an event from the flat field map the ingress stage persisted.
    ///
    /// The map holds the original top-level wire fields (`matchID`, `type`,
    /// `timestamp`) as scalars plus the `payload` re-encoded as a JSON
    /// string. The type tag degrades to `UNKNOWN` when absent or
    /// unrecognized; a missing or malformed payload is an error.
    pub fn from_stored(fields: &HashMap<String, String>) -> Result<Self, EventParseError> {
        let event_type = fields
            .get("type")
            .map(|tag| EventType::parse(tag))
            .unwrap_or(EventType::Unknown);

        let raw_payload = fields
            .get("payload")
            .ok_or(EventParseError::MissingPayload)?;
        let value: serde_json::Value =
            serde_json::from_str(raw_payload).map_err(EventParseError::PayloadJson)?;
        let payload = EventPayload::from_value(event_type, value)?;

        Ok(Self {
            match_id: fields.get("matchID").cloned(),
            event_type,
            timestamp: fields.get("timestamp").cloned(),
            payload,
        })
    }
}

//─────────────────────────────
//  History records
//─────────────────────────────

/// Classification of a kill stored in a player's kill history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KillType {
    /// A minion kill.
    Minion,
    /// A player (human) kill. Only these count toward killing sprees.
    Human,
    /// A dragon kill.
    Dragon,
}

/// One member of a player's kill-history sorted set.
///
/// Serialized as JSON and scored by `timestamp`, so ascending range reads
/// yield chronological order regardless of ingestion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KillRecord {
    /// Kill time as epoch seconds.
    pub timestamp: f64,
    /// What was killed.
    pub kill_type: KillType,
}

/// One entry of the `teams` index stored on the match hash: a team and the
/// identifiers of its players, in roster order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamIndexEntry {
    /// The team.
    pub team_id: String,
    /// The team's players.
    pub players: Vec<String>,
}

//─────────────────────────────
//  Errors
//─────────────────────────────

/// Errors produced while decoding a stored event back into a [`GameEvent`].
#[derive(Debug, thiserror::Error)]
pub enum EventParseError {
    /// The stored event hash has no `payload` field.
    #[error("stored event has no payload field")]
    MissingPayload,
    /// The stored `payload` field is not valid JSON.
    #[error("stored payload is not valid JSON: {0}")]
    PayloadJson(#[source] serde_json::Error),
    /// The payload JSON does not satisfy the shape its type tag requires.
    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        /// The type tag the payload was validated against.
        kind: EventType,
        /// The underlying decode failure.
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(fields: &[(&str, &str)]) -> HashMap<String, String> {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn unknown_type_tag_degrades() {
        assert_eq!(EventType::parse("BARON_KILL"), EventType::Unknown);
        assert_eq!(EventType::parse(""), EventType::Unknown);
        assert_eq!(EventType::parse("PLAYER_KILL"), EventType::PlayerKill);
    }

    #[test]
    fn unknown_type_tag_deserializes_via_serde() {
        let parsed: EventType = serde_json::from_str("\"NEXUS_DESTROY\"").unwrap();
        assert_eq!(parsed, EventType::Unknown);
    }

    #[test]
    fn decodes_stored_player_kill() {
        let fields = stored(&[
            ("matchID", "match_1"),
            ("type", "PLAYER_KILL"),
            ("timestamp", "2024-01-01T12:00:00Z"),
            (
                "payload",
                r#"{"killerID":"p1","victimID":"p2","goldGranted":300,"assistants":["p4"],"assistGold":150}"#,
            ),
        ]);

        let event = GameEvent::from_stored(&fields).unwrap();
        assert_eq!(event.match_id.as_deref(), Some("match_1"));
        assert_eq!(event.event_type, EventType::PlayerKill);
        match event.payload {
            EventPayload::PlayerKill(p) => {
                assert_eq!(p.killer_id.as_deref(), Some("p1"));
                assert_eq!(p.victim_id.as_deref(), Some("p2"));
                assert_eq!(p.gold_granted, Some(300));
                assert_eq!(p.assistants.as_deref(), Some(&["p4".to_string()][..]));
                assert_eq!(p.assist_gold, Some(150));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let fields = stored(&[("type", "PLAYER_KILL"), ("payload", "{}")]);
        let event = GameEvent::from_stored(&fields).unwrap();
        assert_eq!(
            event.payload,
            EventPayload::PlayerKill(PlayerKillPayload::default())
        );
    }

    #[test]
    fn missing_required_field_is_rejected() {
        // MATCH_END requires winningTeamID.
        let fields = stored(&[("type", "MATCH_END"), ("payload", "{}")]);
        let err = GameEvent::from_stored(&fields).unwrap_err();
        assert!(matches!(
            err,
            EventParseError::InvalidPayload { kind: EventType::MatchEnd, .. }
        ));
    }

    #[test]
    fn unknown_event_keeps_payload_undecoded() {
        let fields = stored(&[("type", "BARON_KILL"), ("payload", r#"{"anything":1}"#)]);
        let event = GameEvent::from_stored(&fields).unwrap();
        assert_eq!(event.event_type, EventType::Unknown);
        assert_eq!(event.payload, EventPayload::Unknown);
    }

    #[test]
    fn malformed_payload_json_is_an_error() {
        let fields = stored(&[("type", "MINION_KILL"), ("payload", "{not json")]);
        assert!(matches!(
            GameEvent::from_stored(&fields),
            Err(EventParseError::PayloadJson(_))
        ));
    }

    #[test]
    fn match_start_roster_uses_wire_names() {
        let payload: MatchStartPayload = serde_json::from_str(
            r#"{
                "fixture": {
                    "startTime": "2024-01-01T12:00:00Z",
                    "title": "Grand Final",
                    "seriesCurrent": 1,
                    "seriesMax": 5,
                    "seriesType": "bestOf"
                },
                "teams": [
                    {"teamID": "team_1", "players": [
                        {"playerID": "p1", "gold": 500, "alive": true, "name": "Ada"}
                    ]}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(payload.fixture.series_max, 5);
        assert_eq!(payload.teams[0].team_id, "team_1");
        assert_eq!(payload.teams[0].players[0].player_id, "p1");
    }

    #[test]
    fn kill_record_round_trips() {
        let record = KillRecord { timestamp: 1704110465.0, kill_type: KillType::Human };
        let encoded = serde_json::to_string(&record).unwrap();
        assert!(encoded.contains("\"kill_type\":\"human\""));
        let decoded: KillRecord = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, record);
    }
}
