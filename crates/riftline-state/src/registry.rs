//! In-memory player registry.
//!
//! Populated by the match-start processor and consulted by every other
//! processor to resolve store keys without re-reading the store. Single
//! writer in steady state; not persisted. The system assumes one long-lived
//! process serving the whole match, so the registry is rebuilt from nothing
//! on restart and surviving a crash mid-match is not supported.

use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Assignment {
    match_id: String,
    team_id: String,
}

/// Index from player to (match, team) and from team to match.
///
/// Owned state behind a narrow interface; the pipeline wraps it in
/// `Arc<RwLock<_>>` and injects it into the processors.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: HashMap<String, Assignment>,
    teams: HashMap<String, String>,
}

impl PlayerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a player with their match and team. Also records the team's
    /// match, so repeated calls per roster are idempotent.
    pub fn register(&mut self, player_id: &str, match_id: &str, team_id: &str) {
        self.players.insert(
            player_id.to_string(),
            Assignment { match_id: match_id.to_string(), team_id: team_id.to_string() },
        );
        self.teams.insert(team_id.to_string(), match_id.to_string());
    }

    /// The match a player is registered to.
    pub fn match_for_player(&self, player_id: &str) -> Option<&str> {
        self.players.get(player_id).map(|a| a.match_id.as_str())
    }

    /// The match a team is registered to.
    pub fn match_for_team(&self, team_id: &str) -> Option<&str> {
        self.teams.get(team_id).map(String::as_str)
    }

    /// The team a player is registered to.
    pub fn team_for_player(&self, player_id: &str) -> Option<&str> {
        self.players.get(player_id).map(|a| a.team_id.as_str())
    }

    /// All players registered to a team, in stable (sorted) order.
    pub fn players_for_team(&self, team_id: &str) -> Vec<String> {
        let mut players: Vec<String> = self
            .players
            .iter()
            .filter(|(_, a)| a.team_id == team_id)
            .map(|(player_id, _)| player_id.clone())
            .collect();
        players.sort();
        players
    }

    /// All players registered to a match, in stable (sorted) order.
    pub fn players_for_match(&self, match_id: &str) -> Vec<String> {
        let mut players: Vec<String> = self
            .players
            .iter()
            .filter(|(_, a)| a.match_id == match_id)
            .map(|(player_id, _)| player_id.clone())
            .collect();
        players.sort();
        players
    }

    /// Remove a player.
    pub fn unregister_player(&mut self, player_id: &str) {
        self.players.remove(player_id);
    }

    /// Remove a team. Players registered through it are left untouched.
    pub fn unregister_team(&mut self, team_id: &str) {
        self.teams.remove(team_id);
    }
}
