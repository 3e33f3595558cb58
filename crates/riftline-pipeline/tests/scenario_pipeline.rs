//! End-to-end scenarios: raw event bodies published to the events queue,
//! run through both consumers over the in-memory drivers, and asserted
//! through the read path, the same shape as driving the deployed pipeline.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use riftline_pipeline::{Pipeline, PipelineConfig, EVENTS_QUEUE, STATE_UPDATES_QUEUE};
use riftline_queue_core::{InMemoryQueue, MessageQueue};
use riftline_state::{load_game_state, KeySchema};
use riftline_store_memory::MemoryStore;
use riftline_types::view::GameState;

const MATCH: &str = "game_1";

struct Deployment {
    queue: Arc<InMemoryQueue>,
    store: Arc<MemoryStore>,
    keys: KeySchema,
    pipeline: Pipeline,
}

fn deploy() -> Deployment {
    let config = PipelineConfig::default();
    let queue = Arc::new(InMemoryQueue::new());
    let store = Arc::new(MemoryStore::new());
    let keys = KeySchema::new(
        config.events_namespace.clone(),
        config.state_namespace.clone(),
    );
    let pipeline = Pipeline::spawn(&config, queue.clone(), store.clone());
    Deployment { queue, store, keys, pipeline }
}

async fn publish(deployment: &Deployment, event: &serde_json::Value) {
    deployment
        .queue
        .publish(EVENTS_QUEUE, &serde_json::to_vec(event).unwrap())
        .await
        .unwrap();
}

/// Poll until both queues are fully drained and the read path assembles a
/// final state, like the test harness against the deployed system does.
/// Consumers acknowledge only after every store write for a message has
/// landed, so drained queues mean the state is complete.
async fn final_state(deployment: &Deployment) -> GameState {
    for _ in 0..500 {
        let drained = deployment.queue.ready_len(EVENTS_QUEUE).await == 0
            && deployment.queue.unacked_len(EVENTS_QUEUE).await == 0
            && deployment.queue.ready_len(STATE_UPDATES_QUEUE).await == 0
            && deployment.queue.unacked_len(STATE_UPDATES_QUEUE).await == 0;
        if drained {
            if let Ok(state) =
                load_game_state(deployment.store.as_ref(), &deployment.keys, MATCH).await
            {
                return state;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for the final state of {MATCH}");
}

fn match_start() -> serde_json::Value {
    json!({
        "matchID": MATCH,
        "type": "MATCH_START",
        "timestamp": "2024-01-01T12:00:00Z",
        "payload": {
            "fixture": {
                "startTime": "2024-01-01T12:00:00Z",
                "title": "Grand Final",
                "seriesCurrent": 1,
                "seriesMax": 5,
                "seriesType": "bestOf"
            },
            "teams": [
                {"teamID": "team_1", "players": [
                    {"playerID": "player_1", "gold": 500, "alive": true, "name": "Ada"},
                    {"playerID": "player_2", "gold": 500, "alive": true, "name": "Brook"}
                ]},
                {"teamID": "team_2", "players": [
                    {"playerID": "player_3", "gold": 500, "alive": true, "name": "Cleo"},
                    {"playerID": "player_4", "gold": 500, "alive": true, "name": "Dana"}
                ]}
            ]
        }
    })
}

fn match_end(winner: &str) -> serde_json::Value {
    json!({
        "matchID": MATCH,
        "type": "MATCH_END",
        "timestamp": "2024-01-01T13:00:00Z",
        "payload": {"winningTeamID": winner}
    })
}

#[tokio::test]
async fn full_match_scenario() {
    let deployment = deploy();

    publish(&deployment, &match_start()).await;

    for second in 1..=3 {
        publish(
            &deployment,
            &json!({
                "matchID": MATCH,
                "type": "MINION_KILL",
                "timestamp": format!("2024-01-01T12:00:0{second}Z"),
                "payload": {"playerID": "player_1", "goldGranted": 20}
            }),
        )
        .await;
    }

    // The later kill arrives first; first blood must still settle on the
    // earlier timestamp.
    publish(
        &deployment,
        &json!({
            "matchID": MATCH,
            "type": "PLAYER_KILL",
            "timestamp": "2024-01-01T12:05:00Z",
            "payload": {"killerID": "player_1", "victimID": "player_3", "goldGranted": 300}
        }),
    )
    .await;
    publish(
        &deployment,
        &json!({
            "matchID": MATCH,
            "type": "PLAYER_KILL",
            "timestamp": "2024-01-01T12:01:00Z",
            "payload": {"killerID": "player_3", "victimID": "player_1", "goldGranted": 300}
        }),
    )
    .await;

    publish(
        &deployment,
        &json!({
            "matchID": MATCH,
            "type": "DRAGON_KILL",
            "timestamp": "2024-01-01T12:10:00Z",
            "payload": {"killerID": "player_2", "dragonType": "fire", "goldGranted": 250}
        }),
    )
    .await;

    publish(
        &deployment,
        &json!({
            "matchID": MATCH,
            "type": "TURRET_DESTROY",
            "timestamp": "2024-01-01T12:20:00Z",
            "payload": {
                "killerID": "player_2",
                "killerTeamID": "team_1",
                "turretTier": 1,
                "turretLane": "mid",
                "playerGoldGranted": 200,
                "teamGoldGranted": 50
            }
        }),
    )
    .await;

    publish(&deployment, &match_end("team_1")).await;

    let state = final_state(&deployment).await;

    assert_eq!(state.winning_team_id, "team_1");
    assert_eq!(state.first_blood, "2024-01-01T12:01:00+00:00");
    assert_eq!(state.title, "Grand Final");
    assert_eq!(state.series_max, 5);

    let team_1 = &state.teams["team_1"];
    assert_eq!(team_1.dragon_kills, 1);
    assert_eq!(team_1.tower_kills, 1);

    let p1 = &team_1.players["player_1"];
    assert_eq!(p1.name, "Ada");
    assert_eq!(p1.minion_kills, 3);
    assert_eq!(p1.human_kills, 1);
    // 500 start + 60 minions + 300 kill + 50 turret share.
    assert_eq!(p1.gold, 910);
    // Three minion kills a second apart form a triple within the window.
    assert_eq!(p1.kill_streaks, vec!["Triple Kill at 2024-01-01 12:00:03"]);
    assert_eq!(p1.max_killing_spree, None);

    let p2 = &team_1.players["player_2"];
    // 500 start + 250 dragon + 200 turret as the destroyer.
    assert_eq!(p2.gold, 950);

    let p3 = &state.teams["team_2"].players["player_3"];
    assert_eq!(p3.human_kills, 1);
    assert_eq!(p3.gold, 800);

    deployment.pipeline.shutdown().await.unwrap();
}

#[tokio::test]
async fn malformed_messages_are_dropped_without_stalling() {
    let deployment = deploy();

    publish_raw(&deployment, b"{definitely not json").await;
    publish(&deployment, &match_start()).await;
    publish(&deployment, &match_end("team_2")).await;

    let state = final_state(&deployment).await;
    assert_eq!(state.winning_team_id, "team_2");

    // The malformed body was never buffered: two raw events plus the match
    // hash, two team hashes, and four player hashes.
    assert_eq!(deployment.store.hash_count().await, 2 + 1 + 2 + 4);

    deployment.pipeline.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_event_types_are_buffered_then_ignored() {
    let deployment = deploy();

    publish(&deployment, &match_start()).await;
    publish(
        &deployment,
        &json!({
            "matchID": MATCH,
            "type": "NEXUS_EXPLODED",
            "timestamp": "2024-01-01T12:30:00Z",
            "payload": {"whatever": true}
        }),
    )
    .await;
    publish(&deployment, &match_end("team_1")).await;

    let state = final_state(&deployment).await;
    assert_eq!(state.winning_team_id, "team_1");

    // The unknown event is stored raw (three raw events) but produced no
    // state mutation beyond the match records.
    assert_eq!(deployment.store.hash_count().await, 3 + 1 + 2 + 4);
    for team in state.teams.values() {
        assert_eq!(team.dragon_kills, 0);
        assert_eq!(team.tower_kills, 0);
    }

    deployment.pipeline.shutdown().await.unwrap();
}

#[tokio::test]
async fn events_queue_drains_into_state_updates_queue() {
    let deployment = deploy();

    publish(&deployment, &match_start()).await;
    publish(&deployment, &match_end("team_1")).await;
    final_state(&deployment).await;

    // Both queues fully consumed and acknowledged.
    assert_eq!(deployment.queue.ready_len(EVENTS_QUEUE).await, 0);
    assert_eq!(deployment.queue.unacked_len(EVENTS_QUEUE).await, 0);

    deployment.pipeline.shutdown().await.unwrap();
}

async fn publish_raw(deployment: &Deployment, body: &[u8]) {
    deployment.queue.publish(EVENTS_QUEUE, body).await.unwrap();
}
