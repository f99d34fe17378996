//! # fieldsync Engine
//!
//! The deterministic core of the fieldsync synchronization engine.
//!
//! This crate holds everything about sync that can be decided without touching
//! a network, a disk or a clock: the record/outbox model, conflict resolution,
//! the sync log with its running statistics, configuration validation and the
//! wire protocol shared by the device client and the server.
//!
//! ## Design Principles
//!
//! - **No IO**: timestamps and ids are passed in, never read from the system
//! - **Deterministic**: the same conflict always resolves the same way
//! - **Explicit ownership**: the resolver and logger are plain values owned by
//!   whoever drives sync, never process-wide globals
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`SyncableRecord`] is one sensor sample or session row tagged with a
//! [`SyncStatus`]. Only `pending` records are eligible for push; the set of
//! pending records is the outbox.
//!
//! ### Conflicts
//!
//! When the local and server versions of a record diverge, a [`ConflictItem`]
//! is handed to the [`ConflictResolver`], which picks a winner according to
//! its [`ConflictStrategy`]:
//! - [`ConflictStrategy::LastWriteWins`] - strictly newer timestamp wins, ties go to the server (default)
//! - [`ConflictStrategy::ServerWins`] / [`ConflictStrategy::LocalWins`] - fixed side
//! - [`ConflictStrategy::Manual`] - queue the conflict for the user
//!
//! ### Sync log
//!
//! Every push, pull, conflict and error is appended to the [`SyncLogger`] as a
//! [`SyncLog`]; [`SyncStatistics`] are maintained incrementally.
//!
//! ## Quick Start
//!
//! ```rust
//! use fieldsync_engine::{ConflictItem, ConflictResolver, ConflictStrategy, Side};
//! use serde_json::json;
//!
//! let mut resolver = ConflictResolver::new();
//! let conflict = ConflictItem::new(
//!     "sample-1",
//!     json!({"x": 0.1}),
//!     json!({"x": 0.2}),
//!     500,
//!     600,
//!     7,
//! );
//!
//! let decision = resolver.resolve(conflict).unwrap();
//! assert_eq!(decision.winner, Side::Server);
//! assert_eq!(decision.payload, json!({"x": 0.2}));
//!
//! resolver.set_strategy(ConflictStrategy::Manual);
//! ```

pub mod config;
pub mod conflict;
pub mod error;
pub mod logger;
pub mod protocol;
pub mod record;
pub mod snapshot;

// Re-export main types at crate root
pub use config::{
    RetriggerPolicy, SyncConfiguration, DEFAULT_BATCH_SIZE, DEFAULT_MAX_PULL_PAGES,
    DEFAULT_SYNC_INTERVAL_MS, MIN_SYNC_INTERVAL_MS,
};
pub use conflict::{
    ConflictItem, ConflictResolver, ConflictStrategy, Decision, ManualChoice, ManualResolution,
    Side,
};
pub use error::Error;
pub use logger::{SyncLog, SyncLogType, SyncLogger, SyncStatistics};
pub use protocol::{
    classify_push, PullQuery, PullResponse, PushDecision, PushRequest, PushResponse, PushResult,
    RecordOutcome, ServerRecord,
};
pub use record::{sort_oldest_first, RecordKind, SyncStatus, SyncableRecord};
pub use snapshot::{StoreSnapshot, SNAPSHOT_FORMAT_VERSION};

/// Type aliases for clarity
pub type RecordId = String;
pub type DeviceId = String;
/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;
/// Server-assigned, monotonically increasing version of a record.
pub type Revision = u64;
/// Opaque server cursor marking the last successfully pulled point.
pub type Checkpoint = String;
