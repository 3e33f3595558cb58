//! State read path.
//!
//! Assembles the nested per-match [`GameState`] view back out of the flat
//! store records: match hash → teams index → team hashes → player hashes,
//! with first blood rendered back to ISO-8601 and the killing-spree count
//! mapped to its label.

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;

use riftline_store_core::StateStore;
use riftline_types::view::{GameState, PlayerState, TeamState};
use riftline_types::TeamIndexEntry;

use crate::keys::KeySchema;
use crate::{derive, time, StateError, FIRST_BLOOD_SENTINEL};

/// Load and assemble the state view for `match_id`.
///
/// Fails with [`StateError::MatchNotFound`] when nothing is stored for the
/// match and with [`StateError::MatchNotFinished`] until the match's
/// `MATCH_END` has been processed; callers polling for a final state retry
/// on the latter. Counter fields that are missing or unparseable read as
/// zero, and a missing `max_killing_spree` renders as no label.
pub async fn load_game_state(
    store: &dyn StateStore,
    keys: &KeySchema,
    match_id: &str,
) -> Result<GameState> {
    let match_key = keys.match_state(match_id);
    let match_fields = store.hgetall(&match_key).await?;
    if match_fields.is_empty() {
        return Err(StateError::MatchNotFound(match_id.to_string()).into());
    }

    let winning_team_id = match_fields
        .get("winning_team_id")
        .cloned()
        .ok_or_else(|| StateError::MatchNotFinished(match_id.to_string()))?;

    let teams_raw = match_fields.get("teams").map(String::as_str).unwrap_or("[]");
    let teams_index: Vec<TeamIndexEntry> = serde_json::from_str(teams_raw).map_err(|err| {
        StateError::MalformedRecord { key: match_key.clone(), reason: err.to_string() }
    })?;

    let mut teams = BTreeMap::new();
    for entry in teams_index {
        let team_fields = store.hgetall(&keys.team_state(match_id, &entry.team_id)).await?;

        let mut players = BTreeMap::new();
        for player_id in &entry.players {
            let player_key = keys.player_state(match_id, player_id);
            let player_fields = store.hgetall(&player_key).await?;
            players.insert(
                player_id.clone(),
                assemble_player(player_id, &player_key, &player_fields)?,
            );
        }

        teams.insert(
            entry.team_id.clone(),
            TeamState {
                team_id: entry.team_id,
                dragon_kills: int_field(&team_fields, "dragon_kills"),
                tower_kills: int_field(&team_fields, "tower_kills"),
                players,
            },
        );
    }

    let first_blood = render_first_blood(&match_key, match_fields.get("first_blood"))?;

    Ok(GameState {
        match_id: match_fields
            .get("match_id")
            .cloned()
            .unwrap_or_else(|| match_id.to_string()),
        title: str_field(&match_fields, "title"),
        start_time: str_field(&match_fields, "start_time"),
        series_type: str_field(&match_fields, "series_type"),
        series_current: int_field(&match_fields, "series_current"),
        series_max: int_field(&match_fields, "series_max"),
        winning_team_id,
        first_blood,
        teams,
    })
}

fn assemble_player(
    player_id: &str,
    player_key: &str,
    fields: &HashMap<String, String>,
) -> Result<PlayerState> {
    let kill_streaks = match fields.get("kill_streaks") {
        Some(raw) => serde_json::from_str(raw).map_err(|err| StateError::MalformedRecord {
            key: player_key.to_string(),
            reason: err.to_string(),
        })?,
        None => Vec::new(),
    };

    Ok(PlayerState {
        player_id: fields
            .get("player_id")
            .cloned()
            .unwrap_or_else(|| player_id.to_string()),
        name: str_field(fields, "name"),
        alive: int_field(fields, "alive") != 0,
        gold: int_field(fields, "gold"),
        human_kills: int_field(fields, "human_kills"),
        human_kills_assists: int_field(fields, "human_kills_assists"),
        minion_kills: int_field(fields, "minion_kills"),
        kill_streaks,
        max_killing_spree: derive::spree_label(int_field(fields, "max_killing_spree"))
            .map(str::to_string),
    })
}

fn render_first_blood(match_key: &str, raw: Option<&String>) -> Result<String> {
    match raw.map(String::as_str) {
        None => Ok(FIRST_BLOOD_SENTINEL.to_string()),
        Some(sentinel) if sentinel == FIRST_BLOOD_SENTINEL => Ok(sentinel.to_string()),
        Some(stored) => {
            let epoch = stored.parse::<f64>().map_err(|err| StateError::MalformedRecord {
                key: match_key.to_string(),
                reason: err.to_string(),
            })?;
            Ok(time::from_epoch(epoch)?)
        }
    }
}

fn str_field(fields: &HashMap<String, String>, name: &str) -> String {
    fields.get(name).cloned().unwrap_or_default()
}

fn int_field(fields: &HashMap<String, String>, name: &str) -> i64 {
    fields.get(name).and_then(|value| value.parse().ok()).unwrap_or(0)
}
