//! # fieldsync Client
//!
//! Device side of fieldsync: the [`SyncOrchestrator`] that keeps a local
//! [`RecordStore`] consistent with the sync server over a [`Transport`].
//!
//! The orchestrator owns its [`ConflictResolver`](fieldsync_engine::ConflictResolver)
//! and [`SyncLogger`](fieldsync_engine::SyncLogger); hosts plug in the store,
//! the transport and a [`NetworkObserver`].
//!
//! ```rust,no_run
//! use fieldsync_client::{
//!     HttpTransport, MemoryStore, SharedNetworkState, SyncOrchestrator, TriggerReason,
//! };
//! use fieldsync_engine::SyncConfiguration;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new("device-1"));
//! let transport = Arc::new(HttpTransport::new("http://localhost:3000", "device-1")?);
//! let network = Arc::new(SharedNetworkState::default());
//!
//! let sync = SyncOrchestrator::new(store, transport, network);
//! sync.start(SyncConfiguration::default().with_wifi_only(true)).await?;
//! sync.trigger_sync(TriggerReason::Manual).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod http;
pub mod network;
pub mod orchestrator;
pub mod pass;
pub mod store;
pub mod transport;

pub use error::{Result, StoreError, SyncError, TransportError};
pub use http::HttpTransport;
pub use network::{ConnectionType, NetworkObserver, SharedNetworkState};
pub use orchestrator::{OrchestratorStatus, SyncOrchestrator};
pub use pass::{PassOutcome, PassReport, PassState, TriggerOutcome, TriggerReason};
pub use store::{MemoryStore, RecordStore};
pub use transport::{PullBatch, PushReport, Transport};
