//! Conflict resolution between local and server versions of one record.
//!
//! Resolution is deterministic: given the same [`ConflictItem`] and the same
//! [`ConflictStrategy`], [`ConflictResolver::resolve`] always picks the same
//! side. The only state the resolver keeps is the queue of conflicts waiting
//! for a manual decision.
//!
//! # Strategies
//!
//! - `LastWriteWins`: strictly newer timestamp wins; an exact tie goes to the
//!   server, the canonical source of truth
//! - `ServerWins` / `LocalWins`: fixed side
//! - `Manual`: the conflict is queued and no payload is returned

use crate::{error::Result, Error, RecordId, Revision, Timestamp};
use serde::{Deserialize, Serialize};

/// Strategy used to pick the winning version of a conflicting record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    /// Newer timestamp wins, ties go to the server (default)
    #[default]
    LastWriteWins,
    /// Server version always wins
    ServerWins,
    /// Local version always wins
    LocalWins,
    /// Queue for the user to decide
    Manual,
}

impl ConflictStrategy {
    /// Parse a strategy name. Unknown or empty names fall back to
    /// [`ConflictStrategy::LastWriteWins`] instead of failing.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "server_wins" => ConflictStrategy::ServerWins,
            "local_wins" => ConflictStrategy::LocalWins,
            "manual" => ConflictStrategy::Manual,
            _ => ConflictStrategy::LastWriteWins,
        }
    }
}

/// One side of a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Local,
    Server,
}

/// The side a user picks when resolving a queued conflict.
pub type ManualChoice = Side;

/// Divergent local and server versions of one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictItem {
    /// Id of the conflicting record
    pub id: RecordId,
    /// Local payload
    pub local_version: serde_json::Value,
    /// Server payload
    pub server_version: serde_json::Value,
    /// Local last-modified time
    pub local_timestamp: Timestamp,
    /// Server last-modified time
    pub server_timestamp: Timestamp,
    /// Server revision of `server_version`
    pub server_revision: Revision,
    /// Whether a winner has been assigned
    pub resolved: bool,
    /// Strategy that assigned the winner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ConflictStrategy>,
}

impl ConflictItem {
    /// Create an unresolved conflict.
    pub fn new(
        id: impl Into<RecordId>,
        local_version: serde_json::Value,
        server_version: serde_json::Value,
        local_timestamp: Timestamp,
        server_timestamp: Timestamp,
        server_revision: Revision,
    ) -> Self {
        Self {
            id: id.into(),
            local_version,
            server_version,
            local_timestamp,
            server_timestamp,
            server_revision,
            resolved: false,
            resolution: None,
        }
    }

    fn version(&self, side: Side) -> &serde_json::Value {
        match side {
            Side::Local => &self.local_version,
            Side::Server => &self.server_version,
        }
    }
}

/// An automatic resolution: which side won and its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    /// Winning side
    pub winner: Side,
    /// Winning payload
    pub payload: serde_json::Value,
    /// Strategy that decided
    pub strategy: ConflictStrategy,
}

/// Outcome of resolving a queued conflict by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualResolution {
    /// The conflict, now marked resolved
    pub item: ConflictItem,
    /// Winning side
    pub winner: Side,
    /// Winning payload
    pub payload: serde_json::Value,
}

/// Last-write-wins: strictly greater timestamp wins, server on a tie.
pub fn last_write_wins(conflict: &ConflictItem) -> Side {
    if conflict.local_timestamp > conflict.server_timestamp {
        Side::Local
    } else {
        Side::Server
    }
}

/// Decides conflicts and owns the queue of conflicts awaiting a manual choice.
#[derive(Debug, Clone, Default)]
pub struct ConflictResolver {
    strategy: ConflictStrategy,
    /// Unresolved manual conflicts, oldest first
    queue: Vec<ConflictItem>,
}

impl ConflictResolver {
    /// Create a resolver using [`ConflictStrategy::LastWriteWins`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver with a specific strategy.
    pub fn with_strategy(strategy: ConflictStrategy) -> Self {
        Self {
            strategy,
            queue: Vec::new(),
        }
    }

    /// Current strategy.
    pub fn strategy(&self) -> ConflictStrategy {
        self.strategy
    }

    /// Change the strategy for all later resolutions. Already queued manual
    /// conflicts stay queued.
    pub fn set_strategy(&mut self, strategy: ConflictStrategy) {
        self.strategy = strategy;
    }

    /// Resolve a conflict with the current strategy.
    ///
    /// Returns `None` under [`ConflictStrategy::Manual`]; the conflict is then
    /// appended to the queue and the caller must not apply any payload.
    pub fn resolve(&mut self, conflict: ConflictItem) -> Option<Decision> {
        let winner = match self.strategy {
            ConflictStrategy::LastWriteWins => last_write_wins(&conflict),
            ConflictStrategy::ServerWins => Side::Server,
            ConflictStrategy::LocalWins => Side::Local,
            ConflictStrategy::Manual => {
                self.queue.push(conflict);
                return None;
            }
        };

        Some(Decision {
            winner,
            payload: conflict.version(winner).clone(),
            strategy: self.strategy,
        })
    }

    /// Snapshot of the unresolved queue.
    pub fn get_conflicts(&self) -> Vec<ConflictItem> {
        self.queue.clone()
    }

    /// Number of unresolved conflicts.
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Whether an unresolved conflict for `id` is queued.
    pub fn is_queued(&self, id: &str) -> bool {
        self.queue.iter().any(|c| c.id == id)
    }

    /// Resolve the oldest queued conflict for `id` with the given side.
    ///
    /// The conflict leaves the queue and is returned marked resolved. Fails
    /// with [`Error::ConflictNotFound`] when nothing is queued for `id`, which
    /// covers both stale ids and conflicts resolved by an earlier call.
    pub fn resolve_manually(&mut self, id: &str, choice: ManualChoice) -> Result<ManualResolution> {
        let position = self
            .queue
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| Error::ConflictNotFound(id.to_string()))?;

        let mut item = self.queue.remove(position);
        item.resolved = true;
        item.resolution = Some(match choice {
            Side::Server => ConflictStrategy::ServerWins,
            Side::Local => ConflictStrategy::LocalWins,
        });
        let payload = item.version(choice).clone();

        Ok(ManualResolution {
            item,
            winner: choice,
            payload,
        })
    }

    /// Replace the server side of a queued conflict with a newer server
    /// version. Returns `false` when nothing is queued for `id`.
    pub fn refresh(
        &mut self,
        id: &str,
        server_version: serde_json::Value,
        server_timestamp: Timestamp,
        server_revision: Revision,
    ) -> bool {
        match self.queue.iter_mut().find(|c| c.id == id) {
            Some(item) => {
                item.server_version = server_version;
                item.server_timestamp = server_timestamp;
                item.server_revision = server_revision;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn conflict(id: &str, local_ts: Timestamp, server_ts: Timestamp) -> ConflictItem {
        ConflictItem::new(
            id,
            json!({"side": "local"}),
            json!({"side": "server"}),
            local_ts,
            server_ts,
            10,
        )
    }

    #[test]
    fn lww_newer_server_wins() {
        let mut resolver = ConflictResolver::new();

        let decision = resolver.resolve(conflict("a", 500, 600)).unwrap();

        assert_eq!(decision.winner, Side::Server);
        assert_eq!(decision.payload, json!({"side": "server"}));
        assert_eq!(decision.strategy, ConflictStrategy::LastWriteWins);
    }

    #[test]
    fn lww_newer_local_wins() {
        let mut resolver = ConflictResolver::new();

        let decision = resolver.resolve(conflict("a", 700, 600)).unwrap();

        assert_eq!(decision.winner, Side::Local);
        assert_eq!(decision.payload, json!({"side": "local"}));
    }

    #[test]
    fn lww_tie_goes_to_server() {
        let mut resolver = ConflictResolver::new();

        let decision = resolver.resolve(conflict("a", 600, 600)).unwrap();

        assert_eq!(decision.winner, Side::Server);
    }

    #[test]
    fn fixed_side_strategies() {
        let mut resolver = ConflictResolver::with_strategy(ConflictStrategy::ServerWins);
        let decision = resolver.resolve(conflict("a", 900, 100)).unwrap();
        assert_eq!(decision.winner, Side::Server);

        resolver.set_strategy(ConflictStrategy::LocalWins);
        let decision = resolver.resolve(conflict("a", 100, 900)).unwrap();
        assert_eq!(decision.winner, Side::Local);
        assert_eq!(decision.payload, json!({"side": "local"}));
    }

    #[test]
    fn manual_queues_exactly_one_entry() {
        let mut resolver = ConflictResolver::with_strategy(ConflictStrategy::Manual);

        assert!(resolver.resolve(conflict("a", 100, 200)).is_none());

        let queued = resolver.get_conflicts();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].id, "a");
        assert!(!queued[0].resolved);
        assert_eq!(queued[0].local_version, json!({"side": "local"}));
    }

    #[test]
    fn get_conflicts_is_a_copy() {
        let mut resolver = ConflictResolver::with_strategy(ConflictStrategy::Manual);
        resolver.resolve(conflict("a", 100, 200));

        let mut snapshot = resolver.get_conflicts();
        snapshot[0].resolved = true;
        snapshot.clear();

        assert_eq!(resolver.pending_count(), 1);
        assert!(!resolver.get_conflicts()[0].resolved);
    }

    #[test]
    fn strategy_change_is_not_retroactive() {
        let mut resolver = ConflictResolver::with_strategy(ConflictStrategy::Manual);
        resolver.resolve(conflict("a", 100, 200));

        resolver.set_strategy(ConflictStrategy::ServerWins);

        assert_eq!(resolver.pending_count(), 1);
        assert!(resolver.resolve(conflict("b", 100, 200)).is_some());
        assert_eq!(resolver.pending_count(), 1);
    }

    #[test]
    fn resolve_manually_marks_resolved() {
        let mut resolver = ConflictResolver::with_strategy(ConflictStrategy::Manual);
        resolver.resolve(conflict("a", 100, 200));

        let resolution = resolver.resolve_manually("a", Side::Local).unwrap();

        assert!(resolution.item.resolved);
        assert_eq!(resolution.item.resolution, Some(ConflictStrategy::LocalWins));
        assert_eq!(resolution.winner, Side::Local);
        assert_eq!(resolution.payload, json!({"side": "local"}));
        assert!(resolver.get_conflicts().is_empty());
    }

    #[test]
    fn resolve_manually_unknown_id_is_not_found() {
        let mut resolver = ConflictResolver::with_strategy(ConflictStrategy::Manual);
        resolver.resolve(conflict("a", 100, 200));

        let err = resolver.resolve_manually("missing", Side::Server).unwrap_err();
        assert_eq!(err, Error::ConflictNotFound("missing".into()));

        resolver.resolve_manually("a", Side::Server).unwrap();
        let err = resolver.resolve_manually("a", Side::Server).unwrap_err();
        assert_eq!(err, Error::ConflictNotFound("a".into()));
    }

    #[test]
    fn refresh_updates_server_side() {
        let mut resolver = ConflictResolver::with_strategy(ConflictStrategy::Manual);
        resolver.resolve(conflict("a", 100, 200));

        assert!(resolver.refresh("a", json!({"side": "newer"}), 300, 11));
        assert!(!resolver.refresh("b", json!({}), 300, 11));

        let queued = resolver.get_conflicts();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].server_version, json!({"side": "newer"}));
        assert_eq!(queued[0].server_timestamp, 300);
        assert_eq!(queued[0].server_revision, 11);
    }

    #[test]
    fn unknown_strategy_name_falls_back() {
        assert_eq!(ConflictStrategy::from_name("manual"), ConflictStrategy::Manual);
        assert_eq!(
            ConflictStrategy::from_name("SERVER_WINS"),
            ConflictStrategy::ServerWins
        );
        assert_eq!(
            ConflictStrategy::from_name("merge"),
            ConflictStrategy::LastWriteWins
        );
        assert_eq!(ConflictStrategy::from_name(""), ConflictStrategy::LastWriteWins);
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_lww_deterministic(local_ts in 0u64..10_000, server_ts in 0u64..10_000) {
                let mut first = ConflictResolver::new();
                let mut second = ConflictResolver::new();

                let a = first.resolve(conflict("a", local_ts, server_ts)).unwrap();
                let b = second.resolve(conflict("a", local_ts, server_ts)).unwrap();

                prop_assert_eq!(a, b);
            }

            #[test]
            fn prop_lww_server_wins_unless_local_strictly_newer(
                local_ts in 0u64..10_000,
                server_ts in 0u64..10_000,
            ) {
                let mut resolver = ConflictResolver::new();
                let decision = resolver.resolve(conflict("a", local_ts, server_ts)).unwrap();

                let expected = if local_ts > server_ts { Side::Local } else { Side::Server };
                prop_assert_eq!(decision.winner, expected);
            }

            #[test]
            fn prop_manual_never_returns_payload(count in 1usize..20) {
                let mut resolver = ConflictResolver::with_strategy(ConflictStrategy::Manual);
                for i in 0..count {
                    let id = format!("r{}", i);
                    prop_assert!(resolver.resolve(conflict(&id, 1, 2)).is_none());
                }
                prop_assert_eq!(resolver.pending_count(), count);
            }
        }
    }
}
