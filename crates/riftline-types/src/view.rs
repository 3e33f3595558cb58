//! Assembled state views returned by the read path.
//!
//! These mirror the records the pipeline materializes in the store, nested
//! into one structure per match. Maps are ordered so serialized output is
//! stable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The assembled per-match view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Match identifier.
    pub match_id: String,
    /// Title of the match.
    pub title: String,
    /// Start time of the match (ISO-8601, as received at match start).
    pub start_time: String,
    /// Type of the series.
    pub series_type: String,
    /// Current game number within the series.
    pub series_current: i64,
    /// Maximum number of games in the series.
    pub series_max: i64,
    /// The winning team, set at match end.
    pub winning_team_id: String,
    /// Earliest observed player-kill timestamp, rendered as ISO-8601 UTC,
    /// or the `-1` sentinel when no kill was observed.
    pub first_blood: String,
    /// Per-team state, keyed by team identifier.
    pub teams: BTreeMap<String, TeamState>,
}

/// Per-team aggregate counters and roster state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamState {
    /// Team identifier.
    pub team_id: String,
    /// Number of dragon kills credited to the team.
    pub dragon_kills: i64,
    /// Number of turret (tower) kills credited to the team.
    pub tower_kills: i64,
    /// Per-player state, keyed by player identifier.
    pub players: BTreeMap<String, PlayerState>,
}

/// Per-player aggregate counters and end-of-match recognitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Player identifier.
    pub player_id: String,
    /// Display name.
    pub name: String,
    /// Whether the player was alive at match start.
    pub alive: bool,
    /// Accumulated gold.
    pub gold: i64,
    /// Player (human) kills.
    pub human_kills: i64,
    /// Assists on player kills.
    pub human_kills_assists: i64,
    /// Minion kills.
    pub minion_kills: i64,
    /// Multi-kill labels computed at match end.
    pub kill_streaks: Vec<String>,
    /// Killing-spree label computed at match end; absent below the
    /// three-kill threshold.
    pub max_killing_spree: Option<String>,
}
