//! Per-event-type processors.
//!
//! Each processor translates one decoded event into a set of independent
//! single-key store updates. Counter mutations go through `hincrby` and are
//! commutative; the one read-modify-write (first blood) is monotone-down,
//! so redeliveries and late observers converge on the minimum timestamp.
//!
//! Processors resolve store keys through the injected [`PlayerRegistry`];
//! an event that references an unregistered player or team fails with a
//! [`StateError`], which the consumer treats as drop-and-acknowledge.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;

use riftline_store_core::StateStore;
use riftline_types::{
    EventPayload, EventType, GameEvent, KillRecord, KillType, TeamIndexEntry,
};

use crate::derive;
use crate::keys::KeySchema;
use crate::registry::PlayerRegistry;
use crate::time;
use crate::{StateError, FIRST_BLOOD_SENTINEL};

//─────────────────────────────
//  Shared context
//─────────────────────────────

/// Handles shared by every processor: the store, the player registry, the
/// key schema, and the streak window.
pub struct StateContext {
    store: Arc<dyn StateStore>,
    registry: Arc<RwLock<PlayerRegistry>>,
    keys: KeySchema,
    streak_window: u64,
}

impl StateContext {
    /// Bundle the shared handles.
    pub fn new(
        store: Arc<dyn StateStore>,
        registry: Arc<RwLock<PlayerRegistry>>,
        keys: KeySchema,
        streak_window: u64,
    ) -> Self {
        Self { store, registry, keys, streak_window }
    }

    async fn match_for_player(&self, player_id: &str) -> Result<String, StateError> {
        self.registry
            .read()
            .await
            .match_for_player(player_id)
            .map(str::to_string)
            .ok_or_else(|| StateError::UnregisteredPlayer(player_id.to_string()))
    }

    async fn team_for_player(&self, player_id: &str) -> Result<String, StateError> {
        self.registry
            .read()
            .await
            .team_for_player(player_id)
            .map(str::to_string)
            .ok_or_else(|| StateError::UnregisteredPlayer(player_id.to_string()))
    }

    async fn player_state_key(&self, player_id: &str) -> Result<String, StateError> {
        let match_id = self.match_for_player(player_id).await?;
        Ok(self.keys.player_state(&match_id, player_id))
    }

    async fn team_state_key(&self, team_id: &str) -> Result<String, StateError> {
        let match_id = self
            .registry
            .read()
            .await
            .match_for_team(team_id)
            .map(str::to_string)
            .ok_or_else(|| StateError::UnregisteredTeam(team_id.to_string()))?;
        Ok(self.keys.team_state(&match_id, team_id))
    }

    /// Append a kill to a player's history, scored by its timestamp.
    async fn add_kill(&self, player_id: &str, timestamp: f64, kill_type: KillType) -> Result<()> {
        let match_id = self.match_for_player(player_id).await?;
        let key = self.keys.kill_history(&match_id, player_id);
        let member = serde_json::to_string(&KillRecord { timestamp, kill_type })?;
        self.store.zadd(&key, &member, timestamp).await
    }

    async fn load_kill_history(
        &self,
        match_id: &str,
        player_id: &str,
    ) -> Result<Vec<KillRecord>> {
        let key = self.keys.kill_history(match_id, player_id);
        let members = self.store.zrange_all(&key).await?;
        members
            .iter()
            .map(|member| {
                serde_json::from_str(member).map_err(|err| {
                    StateError::MalformedRecord { key: key.clone(), reason: err.to_string() }
                        .into()
                })
            })
            .collect()
    }

    async fn load_death_history(&self, match_id: &str, player_id: &str) -> Result<Vec<f64>> {
        let key = self.keys.death_history(match_id, player_id);
        let members = self.store.zrange_all(&key).await?;
        members
            .iter()
            .map(|member| {
                member.parse::<f64>().map_err(|err| {
                    StateError::MalformedRecord { key: key.clone(), reason: err.to_string() }
                        .into()
                })
            })
            .collect()
    }
}

/// Resolve the event timestamp, if usable. A malformed timestamp is
/// treated like an absent one: the timestamp-dependent mutations (history
/// appends, first blood) are skipped with a warning while the rest of the
/// event still applies.
fn event_timestamp(event: &GameEvent) -> Option<f64> {
    let raw = event.timestamp.as_deref()?;
    match time::to_epoch(raw) {
        Ok(epoch) => Some(epoch),
        Err(err) => {
            warn!(%err, "ignoring unparseable event timestamp");
            None
        }
    }
}

//─────────────────────────────
//  Processor trait and dispatch
//─────────────────────────────

/// One processor per event type: translate an event into store updates.
#[async_trait]
pub trait EventProcessor: Send + Sync {
    /// Apply `event` to the aggregate state.
    async fn process(&self, event: &GameEvent) -> Result<()>;
}

/// Type-tag-keyed processor lookup.
pub struct ProcessorSet {
    processors: HashMap<EventType, Box<dyn EventProcessor>>,
}

impl ProcessorSet {
    /// Build the full processor set over one shared context.
    pub fn new(
        store: Arc<dyn StateStore>,
        registry: Arc<RwLock<PlayerRegistry>>,
        keys: KeySchema,
        streak_window: u64,
    ) -> Self {
        let ctx = Arc::new(StateContext::new(store, registry, keys, streak_window));
        let mut processors: HashMap<EventType, Box<dyn EventProcessor>> = HashMap::new();
        processors.insert(
            EventType::MatchStart,
            Box::new(MatchStartProcessor { ctx: ctx.clone() }),
        );
        processors.insert(
            EventType::MinionKill,
            Box::new(MinionKillProcessor { ctx: ctx.clone() }),
        );
        processors.insert(
            EventType::PlayerKill,
            Box::new(PlayerKillProcessor { ctx: ctx.clone() }),
        );
        processors.insert(
            EventType::DragonKill,
            Box::new(DragonKillProcessor { ctx: ctx.clone() }),
        );
        processors.insert(
            EventType::TurretDestroy,
            Box::new(TurretDestroyProcessor { ctx: ctx.clone() }),
        );
        processors.insert(EventType::MatchEnd, Box::new(MatchEndProcessor { ctx }));
        Self { processors }
    }

    /// Dispatch an event to the processor for its type tag. Unknown types
    /// are logged and dropped.
    pub async fn dispatch(&self, event: &GameEvent) -> Result<()> {
        match self.processors.get(&event.event_type) {
            Some(processor) => processor.process(event).await,
            None => {
                warn!(event_type = %event.event_type, "no processor for event type, dropping");
                Ok(())
            }
        }
    }
}

//─────────────────────────────
//  Match start
//─────────────────────────────

/// Creates match, team, and player records and populates the registry.
pub struct MatchStartProcessor {
    ctx: Arc<StateContext>,
}

#[async_trait]
impl EventProcessor for MatchStartProcessor {
    async fn process(&self, event: &GameEvent) -> Result<()> {
        let EventPayload::MatchStart(payload) = &event.payload else {
            return Err(StateError::PayloadMismatch { expected: EventType::MatchStart }.into());
        };
        let match_id = event.match_id.as_deref().ok_or(StateError::MissingMatchId)?;

        let teams_index: Vec<TeamIndexEntry> = payload
            .teams
            .iter()
            .map(|team| TeamIndexEntry {
                team_id: team.team_id.clone(),
                players: team.players.iter().map(|p| p.player_id.clone()).collect(),
            })
            .collect();

        let match_fields = vec![
            ("match_id".to_string(), match_id.to_string()),
            ("start_time".to_string(), payload.fixture.start_time.clone()),
            ("title".to_string(), payload.fixture.title.clone()),
            ("series_current".to_string(), payload.fixture.series_current.to_string()),
            ("series_max".to_string(), payload.fixture.series_max.to_string()),
            ("series_type".to_string(), payload.fixture.series_type.clone()),
            ("teams".to_string(), serde_json::to_string(&teams_index)?),
            ("first_blood".to_string(), FIRST_BLOOD_SENTINEL.to_string()),
        ];
        self.ctx
            .store
            .hset(&self.ctx.keys.match_state(match_id), &match_fields)
            .await?;

        for team in &payload.teams {
            self.ctx
                .store
                .hset(
                    &self.ctx.keys.team_state(match_id, &team.team_id),
                    &[
                        ("dragon_kills".to_string(), "0".to_string()),
                        ("tower_kills".to_string(), "0".to_string()),
                    ],
                )
                .await?;
        }

        {
            let mut registry = self.ctx.registry.write().await;
            for team in &payload.teams {
                for player in &team.players {
                    registry.register(&player.player_id, match_id, &team.team_id);
                }
            }
        }

        for team in &payload.teams {
            for player in &team.players {
                let team_members: Vec<&str> = team
                    .players
                    .iter()
                    .filter(|p| p.player_id != player.player_id)
                    .map(|p| p.player_id.as_str())
                    .collect();
                let player_fields = vec![
                    ("player_id".to_string(), player.player_id.clone()),
                    ("gold".to_string(), player.gold.to_string()),
                    ("alive".to_string(), i64::from(player.alive).to_string()),
                    ("name".to_string(), player.name.clone()),
                    ("minion_kills".to_string(), "0".to_string()),
                    ("human_kills".to_string(), "0".to_string()),
                    ("human_kills_assists".to_string(), "0".to_string()),
                    ("team_members".to_string(), serde_json::to_string(&team_members)?),
                ];
                self.ctx
                    .store
                    .hset(
                        &self.ctx.keys.player_state(match_id, &player.player_id),
                        &player_fields,
                    )
                    .await?;
            }
        }

        Ok(())
    }
}

//─────────────────────────────
//  Minion kill
//─────────────────────────────

/// Credits minion-kill gold and appends to the kill history.
pub struct MinionKillProcessor {
    ctx: Arc<StateContext>,
}

#[async_trait]
impl EventProcessor for MinionKillProcessor {
    async fn process(&self, event: &GameEvent) -> Result<()> {
        let EventPayload::MinionKill(payload) = &event.payload else {
            return Err(StateError::PayloadMismatch { expected: EventType::MinionKill }.into());
        };
        let Some(gold) = payload.gold_granted else {
            return Ok(());
        };

        let player_key = self.ctx.player_state_key(&payload.player_id).await?;
        self.ctx.store.hincrby(&player_key, "gold", gold).await?;
        self.ctx.store.hincrby(&player_key, "minion_kills", 1).await?;

        if let Some(timestamp) = event_timestamp(event) {
            self.ctx
                .add_kill(&payload.player_id, timestamp, KillType::Minion)
                .await?;
        }
        Ok(())
    }
}

//─────────────────────────────
//  Player kill
//─────────────────────────────

/// Credits the killer and assistants, records the victim's death, and
/// maintains the match's first-blood timestamp.
pub struct PlayerKillProcessor {
    ctx: Arc<StateContext>,
}

#[async_trait]
impl EventProcessor for PlayerKillProcessor {
    async fn process(&self, event: &GameEvent) -> Result<()> {
        let EventPayload::PlayerKill(payload) = &event.payload else {
            return Err(StateError::PayloadMismatch { expected: EventType::PlayerKill }.into());
        };
        let timestamp = event_timestamp(event);

        if let Some(killer_id) = payload.killer_id.as_deref() {
            let killer_key = self.ctx.player_state_key(killer_id).await?;
            if let Some(gold) = payload.gold_granted {
                self.ctx.store.hincrby(&killer_key, "gold", gold).await?;
            }
            self.ctx.store.hincrby(&killer_key, "human_kills", 1).await?;
            if let Some(timestamp) = timestamp {
                self.ctx.add_kill(killer_id, timestamp, KillType::Human).await?;
            }
        }

        if let Some(assistants) = payload.assistants.as_deref() {
            for assistant_id in assistants {
                let assistant_key = self.ctx.player_state_key(assistant_id).await?;
                if let Some(gold) = payload.assist_gold {
                    self.ctx.store.hincrby(&assistant_key, "gold", gold).await?;
                }
                self.ctx
                    .store
                    .hincrby(&assistant_key, "human_kills_assists", 1)
                    .await?;
            }
        }

        if let (Some(victim_id), Some(timestamp)) = (payload.victim_id.as_deref(), timestamp) {
            let match_id = self.ctx.match_for_player(victim_id).await?;
            let death_key = self.ctx.keys.death_history(&match_id, victim_id);
            self.ctx
                .store
                .zadd(&death_key, &timestamp.to_string(), timestamp)
                .await?;
        }

        if let Some(timestamp) = timestamp {
            let Some(reference) = payload
                .killer_id
                .as_deref()
                .or(payload.victim_id.as_deref())
            else {
                return Ok(());
            };
            self.update_first_blood(reference, timestamp).await?;
        }

        Ok(())
    }
}

impl PlayerKillProcessor {
    /// Monotone-min update of the match's first-blood timestamp.
    ///
    /// The read and write are not atomic. Under the single-consumer
    /// contract the only writers are ordered behind each other, and every
    /// write only ever lowers the value, so the field converges on the
    /// minimum timestamp observed.
    async fn update_first_blood(&self, reference_player: &str, timestamp: f64) -> Result<()> {
        let match_id = self.ctx.match_for_player(reference_player).await?;
        let match_key = self.ctx.keys.match_state(&match_id);
        let current = self.ctx.store.hget(&match_key, "first_blood").await?;

        let overwrite = match current.as_deref() {
            None => true,
            Some(sentinel) if sentinel == FIRST_BLOOD_SENTINEL => true,
            Some(existing) => existing
                .parse::<f64>()
                .map(|existing| timestamp < existing)
                .unwrap_or(true),
        };

        if overwrite {
            self.ctx
                .store
                .hset(
                    &match_key,
                    &[("first_blood".to_string(), timestamp.to_string())],
                )
                .await?;
        }
        Ok(())
    }
}

//─────────────────────────────
//  Dragon kill
//─────────────────────────────

/// Credits dragon-kill gold and the killer's team counter.
pub struct DragonKillProcessor {
    ctx: Arc<StateContext>,
}

#[async_trait]
impl EventProcessor for DragonKillProcessor {
    async fn process(&self, event: &GameEvent) -> Result<()> {
        let EventPayload::DragonKill(payload) = &event.payload else {
            return Err(StateError::PayloadMismatch { expected: EventType::DragonKill }.into());
        };
        let Some(gold) = payload.gold_granted else {
            return Ok(());
        };

        let killer_key = self.ctx.player_state_key(&payload.killer_id).await?;
        self.ctx.store.hincrby(&killer_key, "gold", gold).await?;

        if let Some(timestamp) = event_timestamp(event) {
            self.ctx
                .add_kill(&payload.killer_id, timestamp, KillType::Dragon)
                .await?;
        }

        let team_id = self.ctx.team_for_player(&payload.killer_id).await?;
        let team_key = self.ctx.team_state_key(&team_id).await?;
        self.ctx.store.hincrby(&team_key, "dragon_kills", 1).await?;
        Ok(())
    }
}

//─────────────────────────────
//  Turret destroy
//─────────────────────────────

/// Credits the team's tower counter and distributes turret gold.
pub struct TurretDestroyProcessor {
    ctx: Arc<StateContext>,
}

#[async_trait]
impl EventProcessor for TurretDestroyProcessor {
    async fn process(&self, event: &GameEvent) -> Result<()> {
        let EventPayload::TurretDestroy(payload) = &event.payload else {
            return Err(StateError::PayloadMismatch { expected: EventType::TurretDestroy }.into());
        };
        let Some(killer_id) = payload.killer_id.as_deref() else {
            return Ok(());
        };
        let team_id = payload
            .killer_team_id
            .as_deref()
            .ok_or(StateError::MissingEventField("killerTeamID"))?;

        let team_key = self.ctx.team_state_key(team_id).await?;
        self.ctx.store.hincrby(&team_key, "tower_kills", 1).await?;

        let players = self.ctx.registry.read().await.players_for_team(team_id);
        for player_id in players {
            let granted = if player_id == killer_id {
                payload.player_gold_granted
            } else {
                payload.team_gold_granted
            };
            if let Some(gold) = granted {
                let player_key = self.ctx.player_state_key(&player_id).await?;
                self.ctx.store.hincrby(&player_key, "gold", gold).await?;
            }
        }
        Ok(())
    }
}

//─────────────────────────────
//  Match end
//─────────────────────────────

/// Records the winner and runs the end-of-match batch derivations.
pub struct MatchEndProcessor {
    ctx: Arc<StateContext>,
}

#[async_trait]
impl EventProcessor for MatchEndProcessor {
    async fn process(&self, event: &GameEvent) -> Result<()> {
        let EventPayload::MatchEnd(payload) = &event.payload else {
            return Err(StateError::PayloadMismatch { expected: EventType::MatchEnd }.into());
        };
        let match_id = event.match_id.as_deref().ok_or(StateError::MissingMatchId)?;

        self.ctx
            .store
            .hset(
                &self.ctx.keys.match_state(match_id),
                &[("winning_team_id".to_string(), payload.winning_team_id.clone())],
            )
            .await?;

        self.write_kill_streaks(match_id).await?;
        self.write_max_killing_sprees(match_id).await?;
        Ok(())
    }
}

impl MatchEndProcessor {
    async fn write_kill_streaks(&self, match_id: &str) -> Result<()> {
        let players = self.ctx.registry.read().await.players_for_match(match_id);
        for player_id in players {
            let history = self.ctx.load_kill_history(match_id, &player_id).await?;
            let timestamps: Vec<f64> = history.iter().map(|record| record.timestamp).collect();
            let streaks = derive::kill_streaks(&timestamps, self.ctx.streak_window);
            self.ctx
                .store
                .hset(
                    &self.ctx.keys.player_state(match_id, &player_id),
                    &[("kill_streaks".to_string(), serde_json::to_string(&streaks)?)],
                )
                .await?;
        }
        Ok(())
    }

    async fn write_max_killing_sprees(&self, match_id: &str) -> Result<()> {
        let players = self.ctx.registry.read().await.players_for_match(match_id);
        for player_id in players {
            let kill_history = self.ctx.load_kill_history(match_id, &player_id).await?;
            let death_history = self.ctx.load_death_history(match_id, &player_id).await?;
            let spree = derive::max_killing_spree(&kill_history, &death_history);
            self.ctx
                .store
                .hset(
                    &self.ctx.keys.player_state(match_id, &player_id),
                    &[("max_killing_spree".to_string(), spree.to_string())],
                )
                .await?;
        }
        Ok(())
    }
}
