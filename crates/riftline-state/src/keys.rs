//! Store key schema.
//!
//! Every record family the pipeline touches is addressed by one of these
//! composite keys. The two namespaces are configurable so several
//! deployments can share one store.

/// Key builder over the raw-event and state namespaces.
#[derive(Debug, Clone)]
pub struct KeySchema {
    events_ns: String,
    state_ns: String,
}

impl KeySchema {
    /// Build a schema over the given namespaces.
    pub fn new(events_ns: impl Into<String>, state_ns: impl Into<String>) -> Self {
        Self { events_ns: events_ns.into(), state_ns: state_ns.into() }
    }

    /// Hash holding a raw buffered event.
    pub fn event(&self, event_id: &str) -> String {
        format!("{}:event:{}", self.events_ns, event_id)
    }

    /// Hash holding per-match state.
    pub fn match_state(&self, match_id: &str) -> String {
        format!("{}:game:{}", self.state_ns, match_id)
    }

    /// Hash holding per-team state within a match.
    pub fn team_state(&self, match_id: &str, team_id: &str) -> String {
        format!("{}:game:{}:team:{}", self.state_ns, match_id, team_id)
    }

    /// Hash holding per-player state within a match.
    pub fn player_state(&self, match_id: &str, player_id: &str) -> String {
        format!("{}:game:{}:player:{}", self.state_ns, match_id, player_id)
    }

    /// Sorted set holding a player's kill history.
    pub fn kill_history(&self, match_id: &str, player_id: &str) -> String {
        format!("{}:game:{}:player:{}:kill_history", self.state_ns, match_id, player_id)
    }

    /// Sorted set holding a player's death history.
    pub fn death_history(&self, match_id: &str, player_id: &str) -> String {
        format!("{}:game:{}:player:{}:death_history", self.state_ns, match_id, player_id)
    }
}

impl Default for KeySchema {
    fn default() -> Self {
        Self::new("game_events", "game_state")
    }
}
