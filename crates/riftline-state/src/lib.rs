#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **riftline-state** – Aggregate state layer of the Riftline pipeline.
//!
//! Everything between a decoded [`GameEvent`](riftline_types::GameEvent) and
//! the store lives here: the key schema the records are addressed by, the
//! in-memory player registry, one processor per event type translating an
//! event into single-key store updates, the end-of-match derivations
//! (multi-kill streaks and killing sprees), and the read path that
//! assembles the nested per-match view back out of the store.
//!
//! All writes are independent single-key operations; ordering and
//! idempotence requirements are carried by the pipeline layer above.

use riftline_types::EventType;

pub mod derive;
pub mod keys;
pub mod processors;
pub mod read;
pub mod registry;
pub mod time;

pub use keys::KeySchema;
pub use processors::{ProcessorSet, StateContext};
pub use read::load_game_state;
pub use registry::PlayerRegistry;

/// Value of the match `first_blood` field until the first kill is observed.
pub const FIRST_BLOOD_SENTINEL: &str = "-1";

//─────────────────────────────
//  Error types
//─────────────────────────────

/// Errors raised by processors and the read path.
///
/// Every variant is a drop-the-event condition for the consumer: the event
/// (or read) is at fault, not the store, so the pipeline acknowledges and
/// moves on rather than triggering redelivery.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// A processor referenced a player that was never registered. Only
    /// expected for events arriving before their match's `MATCH_START`.
    #[error("player {0} is not registered to any match")]
    UnregisteredPlayer(String),
    /// A processor referenced a team that was never registered.
    #[error("team {0} is not registered to any match")]
    UnregisteredTeam(String),
    /// The event needs a match identifier but its envelope carries none.
    #[error("event has no match identifier")]
    MissingMatchId,
    /// The event payload is missing a field this processor cannot work
    /// without.
    #[error("event payload is missing required field {0}")]
    MissingEventField(&'static str),
    /// The event timestamp is not a parseable ISO-8601 string.
    #[error("invalid event timestamp {0:?}")]
    InvalidTimestamp(String),
    /// A processor was dispatched an event whose payload variant does not
    /// match its type tag. Indicates a wiring bug, not bad input.
    #[error("payload does not match event type {expected}")]
    PayloadMismatch {
        /// The event type the processor handles.
        expected: EventType,
    },
    /// The read path found no state for the requested match.
    #[error("no stored state for match {0}")]
    MatchNotFound(String),
    /// The read path ran before the match's `MATCH_END` was processed.
    #[error("match {0} has no winning team recorded yet")]
    MatchNotFinished(String),
    /// A stored record could not be decoded.
    #[error("malformed stored record at {key}: {reason}")]
    MalformedRecord {
        /// The store key holding the record.
        key: String,
        /// Why decoding failed.
        reason: String,
    },
}
