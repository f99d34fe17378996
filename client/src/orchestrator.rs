//! The sync orchestrator.
//!
//! Drives push → pull → reconcile passes against a [`RecordStore`] and a
//! [`Transport`], schedules them on a timer, and coalesces triggers so that at
//! most one pass is ever in flight.
//!
//! A pass never fails its caller: transport and store failures end the pass
//! (or the pull step) with an `error` entry in the sync log and leave the
//! affected records `pending` for the next pass.

use crate::error::{Result, StoreError, SyncError, TransportError};
use crate::network::NetworkObserver;
use crate::pass::{PassOutcome, PassReport, PassState, TriggerOutcome, TriggerReason};
use crate::store::RecordStore;
use crate::transport::Transport;
use fieldsync_engine::{
    sort_oldest_first, Checkpoint, ConflictItem, ConflictResolver, ConflictStrategy,
    ManualChoice, ManualResolution, RecordKind, RecordOutcome, RetriggerPolicy, Revision,
    ServerRecord, Side, SyncConfiguration, SyncLog, SyncLogType, SyncLogger, SyncStatistics,
    SyncStatus, SyncableRecord,
};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Point-in-time view of the orchestrator for status displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorStatus {
    /// `start` succeeded and `stop` has not been called since
    pub armed: bool,
    /// Periodic passes are scheduled
    pub scheduled: bool,
    pub state: PassState,
    pub in_flight: bool,
    /// A trigger was coalesced and has not been served yet
    pub retrigger_pending: bool,
    pub last_report: Option<PassReport>,
    pub checkpoint: Option<Checkpoint>,
    pub unresolved_conflicts: usize,
}

/// Handle to the periodic pass loop.
struct Scheduler {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// A step failure, waiting to be written to the sync log.
struct StepError {
    error: SyncError,
    items: usize,
}

impl From<StoreError> for StepError {
    fn from(err: StoreError) -> Self {
        Self {
            error: err.into(),
            items: 0,
        }
    }
}

impl From<TransportError> for StepError {
    fn from(err: TransportError) -> Self {
        Self {
            error: err.into(),
            items: 0,
        }
    }
}

/// A conflict found during push or pull, awaiting reconciliation.
struct PendingConflict {
    item: ConflictItem,
    kind: RecordKind,
}

impl PendingConflict {
    fn new(local: &SyncableRecord, server: &ServerRecord) -> Self {
        Self {
            item: ConflictItem::new(
                local.id.clone(),
                local.payload.clone(),
                server.payload.clone(),
                local.updated_at,
                server.updated_at,
                server.revision,
            ),
            kind: local.kind,
        }
    }
}

/// Keep one conflict per record, preferring the newest server version.
fn add_conflict(conflicts: &mut Vec<PendingConflict>, conflict: PendingConflict) {
    match conflicts.iter_mut().find(|c| c.item.id == conflict.item.id) {
        Some(existing) if existing.item.server_revision <= conflict.item.server_revision => {
            *existing = conflict;
        }
        Some(_) => {}
        None => conflicts.push(conflict),
    }
}

/// Resets the in-flight flag when a pass ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn now_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

struct Inner {
    store: Arc<dyn RecordStore>,
    transport: Arc<dyn Transport>,
    network: Arc<dyn NetworkObserver>,
    resolver: Mutex<ConflictResolver>,
    logger: Mutex<SyncLogger>,
    /// Active configuration; `None` until started and after stop
    config: RwLock<Option<SyncConfiguration>>,
    in_flight: AtomicBool,
    retrigger: AtomicBool,
    state: watch::Sender<PassState>,
    last_report: Mutex<Option<PassReport>>,
    scheduler: Mutex<Option<Scheduler>>,
}

/// Coordinates sync passes for one device.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct SyncOrchestrator {
    inner: Arc<Inner>,
}

impl SyncOrchestrator {
    /// Create an orchestrator with a last-write-wins resolver and an
    /// unbounded sync log.
    pub fn new(
        store: Arc<dyn RecordStore>,
        transport: Arc<dyn Transport>,
        network: Arc<dyn NetworkObserver>,
    ) -> Self {
        Self::with_components(
            store,
            transport,
            network,
            ConflictResolver::new(),
            SyncLogger::new(),
        )
    }

    pub fn with_components(
        store: Arc<dyn RecordStore>,
        transport: Arc<dyn Transport>,
        network: Arc<dyn NetworkObserver>,
        resolver: ConflictResolver,
        logger: SyncLogger,
    ) -> Self {
        let (state, _) = watch::channel(PassState::Idle);

        Self {
            inner: Arc::new(Inner {
                store,
                transport,
                network,
                resolver: Mutex::new(resolver),
                logger: Mutex::new(logger),
                config: RwLock::new(None),
                in_flight: AtomicBool::new(false),
                retrigger: AtomicBool::new(false),
                state,
                last_report: Mutex::new(None),
                scheduler: Mutex::new(None),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Validate `config`, arm the orchestrator and, with `auto_sync`, schedule
    /// periodic passes starting with one right away.
    ///
    /// Calling `start` again replaces the configuration and the schedule.
    pub async fn start(&self, config: SyncConfiguration) -> Result<()> {
        config.validate().map_err(SyncError::Config)?;

        let mut scheduler = self.inner.scheduler.lock().await;
        if let Some(previous) = scheduler.take() {
            tracing::debug!("Replacing existing sync schedule");
            let _ = previous.shutdown.send(true);
        }

        *self.inner.config.write().await = Some(config.clone());

        if config.auto_sync {
            *scheduler = Some(self.spawn_scheduler(config.interval()));
        }

        tracing::info!(
            auto_sync = config.auto_sync,
            interval_ms = config.sync_interval,
            wifi_only = config.wifi_only,
            batch_size = config.batch_size,
            "Sync started"
        );
        Ok(())
    }

    /// Cancel scheduled passes and disarm. A pass already in flight runs to
    /// completion.
    pub async fn stop(&self) {
        if let Some(scheduler) = self.inner.scheduler.lock().await.take() {
            let _ = scheduler.shutdown.send(true);
        }

        let was_armed = self.inner.config.write().await.take().is_some();
        if was_armed && !self.inner.in_flight.load(Ordering::Acquire) {
            self.set_state(PassState::Aborted);
        }

        tracing::info!("Sync stopped");
    }

    pub async fn is_started(&self) -> bool {
        self.inner.config.read().await.is_some()
    }

    /// Active configuration, if started.
    pub async fn config(&self) -> Option<SyncConfiguration> {
        self.inner.config.read().await.clone()
    }

    fn spawn_scheduler(&self, period: Duration) -> Scheduler {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut reason = TriggerReason::Startup;

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        let Some(strong) = inner.upgrade() else { break };
                        let orchestrator = SyncOrchestrator { inner: strong };

                        match orchestrator.trigger_sync(reason).await {
                            Ok(TriggerOutcome::Coalesced) => {
                                tracing::debug!("Scheduled pass coalesced into running pass");
                            }
                            Ok(TriggerOutcome::Completed(_)) => {}
                            Err(e) => {
                                tracing::debug!(error = %e, "Sync schedule ended");
                                break;
                            }
                        }
                        reason = TriggerReason::Scheduled;
                    }
                }
            }

            tracing::debug!("Sync scheduler exited");
        });

        Scheduler { shutdown, handle }
    }

    // ------------------------------------------------------------------
    // Triggers
    // ------------------------------------------------------------------

    /// Request one pass.
    ///
    /// Fails only when sync is not started. If a pass is already running the
    /// request is coalesced into it; what happens next depends on the
    /// configured [`RetriggerPolicy`].
    pub async fn trigger_sync(&self, reason: TriggerReason) -> Result<TriggerOutcome> {
        let mut config = self
            .inner
            .config
            .read()
            .await
            .clone()
            .ok_or(SyncError::NotStarted)?;

        if !self.try_begin_pass() {
            self.inner.retrigger.store(true, Ordering::SeqCst);
            // Under the immediate policy the running pass may have released
            // the flag before seeing our request; serve it here then.
            let immediate = config.retrigger == RetriggerPolicy::Immediate;
            if !(immediate && self.try_begin_pass()) {
                tracing::debug!(reason = %reason, "Sync pass in flight, coalescing trigger");
                return Ok(TriggerOutcome::Coalesced);
            }
        }
        let mut guard = InFlightGuard(&self.inner.in_flight);

        loop {
            // This pass serves every trigger coalesced so far
            self.inner.retrigger.store(false, Ordering::SeqCst);

            let report = self.run_pass(reason, &config).await;
            *self.inner.last_report.lock().await = Some(report.clone());

            let immediate = config.retrigger == RetriggerPolicy::Immediate;
            if !(immediate && self.inner.retrigger.swap(false, Ordering::SeqCst)) {
                drop(guard);
                // A trigger coalesced between the check above and the release
                if !immediate
                    || !self.inner.retrigger.load(Ordering::SeqCst)
                    || !self.try_begin_pass()
                {
                    return Ok(TriggerOutcome::Completed(report));
                }
                guard = InFlightGuard(&self.inner.in_flight);
            }

            match self.inner.config.read().await.clone() {
                Some(current) => config = current,
                None => return Ok(TriggerOutcome::Completed(report)),
            }
            tracing::debug!(reason = %reason, "Running follow-up pass for coalesced trigger");
        }
    }

    fn try_begin_pass(&self) -> bool {
        self.inner
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// React to a connectivity change reported by the host.
    ///
    /// Runs a pass only when started with `auto_sync` and the device is
    /// online; returns `None` otherwise.
    pub async fn notify_connectivity_changed(&self) -> Option<TriggerOutcome> {
        let auto_sync = self
            .inner
            .config
            .read()
            .await
            .as_ref()
            .is_some_and(|config| config.auto_sync);

        if !auto_sync {
            return None;
        }
        if !self.inner.network.is_connected() {
            tracing::debug!("Connectivity changed to offline, not syncing");
            return None;
        }

        self.trigger_sync(TriggerReason::NetworkChange).await.ok()
    }

    // ------------------------------------------------------------------
    // The pass
    // ------------------------------------------------------------------

    async fn run_pass(&self, reason: TriggerReason, config: &SyncConfiguration) -> PassReport {
        let started = Instant::now();
        let mut report = PassReport::new(reason);
        tracing::info!(reason = %reason, "Sync pass started");

        self.set_state(PassState::Checking);
        if let Some(why) = self.network_blocker(config) {
            tracing::debug!(reason = %reason, why, "Skipping sync pass");
            self.log(Self::entry(SyncLogType::Push).with_duration(elapsed_ms(started)))
                .await;
            report.outcome = PassOutcome::Skipped;
            return self.finish(report, started).await;
        }

        let mut conflicts = Vec::new();

        if let Err(failure) = self.push_step(config, &mut report, &mut conflicts).await {
            self.record_failure(failure, started).await;
            report.outcome = PassOutcome::Error;
            return self.finish(report, started).await;
        }

        if let Err(failure) = self.pull_step(config, &mut report, &mut conflicts).await {
            let is_transport = matches!(failure.error, SyncError::Transport(_));
            self.record_failure(failure, started).await;
            if !is_transport {
                report.outcome = PassOutcome::Error;
                return self.finish(report, started).await;
            }
            report.outcome = PassOutcome::Partial;
        }

        if let Err(failure) = self.reconcile_step(conflicts, &mut report).await {
            self.record_failure(failure, started).await;
            report.outcome = PassOutcome::Error;
            return self.finish(report, started).await;
        }

        if report.rejected > 0 && report.outcome == PassOutcome::Success {
            report.outcome = PassOutcome::Partial;
        }
        self.finish(report, started).await
    }

    fn network_blocker(&self, config: &SyncConfiguration) -> Option<&'static str> {
        if !self.inner.network.is_connected() {
            return Some("device is offline");
        }
        if config.wifi_only && !self.inner.network.current_connection_is_unmetered() {
            return Some("wifi-only sync on a metered connection");
        }
        None
    }

    /// Push the oldest pending records and apply per-record outcomes.
    async fn push_step(
        &self,
        config: &SyncConfiguration,
        report: &mut PassReport,
        conflicts: &mut Vec<PendingConflict>,
    ) -> std::result::Result<(), StepError> {
        self.set_state(PassState::Pushing);
        let started = Instant::now();

        let mut batch = self.inner.store.query_pending(config.batch_size).await?;
        sort_oldest_first(&mut batch);
        batch.truncate(config.batch_size);

        if batch.is_empty() {
            self.log(Self::entry(SyncLogType::Push).with_duration(elapsed_ms(started)))
                .await;
            return Ok(());
        }

        let push = match self.inner.transport.push_batch(&batch).await {
            Ok(push) => push,
            Err(e) => {
                tracing::warn!(records = batch.len(), error = %e, "Push failed");
                return Err(StepError {
                    error: e.into(),
                    items: batch.len(),
                });
            }
        };
        report.bytes_transferred += push.bytes_transferred;

        let outcomes = push.outcomes();
        for record in &batch {
            match outcomes.get(record.id.as_str()).copied() {
                Some(RecordOutcome::Synced { revision }) => {
                    self.acknowledge(record, *revision).await?;
                    report.pushed += 1;
                }
                Some(RecordOutcome::Conflict { server }) => {
                    add_conflict(conflicts, PendingConflict::new(record, server));
                }
                Some(RecordOutcome::Error { message }) => {
                    tracing::warn!(record_id = %record.id, %message, "Server rejected record");
                    self.inner.store.mark_error(&record.id).await?;
                    self.log(
                        Self::entry(SyncLogType::Error)
                            .with_items(1)
                            .failed(format!("record {}: {}", record.id, message)),
                    )
                    .await;
                    report.rejected += 1;
                }
                None => {
                    tracing::warn!(record_id = %record.id, "No push outcome, leaving record pending");
                }
            }
        }

        self.log(
            Self::entry(SyncLogType::Push)
                .with_duration(elapsed_ms(started))
                .with_items(batch.len())
                .with_bytes(push.bytes_transferred),
        )
        .await;
        Ok(())
    }

    /// Mark a pushed record synced, unless it was edited while in flight.
    async fn acknowledge(
        &self,
        pushed: &SyncableRecord,
        revision: Revision,
    ) -> std::result::Result<(), StoreError> {
        match self.inner.store.get(&pushed.id).await? {
            Some(mut current)
                if current.updated_at != pushed.updated_at || current.payload != pushed.payload =>
            {
                current.rebase(revision);
                self.inner.store.upsert(current).await
            }
            Some(_) => self.inner.store.mark_synced(&pushed.id, revision).await,
            None => Ok(()),
        }
    }

    /// Pull server changes page by page from the stored checkpoint.
    async fn pull_step(
        &self,
        config: &SyncConfiguration,
        report: &mut PassReport,
        conflicts: &mut Vec<PendingConflict>,
    ) -> std::result::Result<(), StepError> {
        self.set_state(PassState::Pulling);
        let started = Instant::now();

        let mut checkpoint = self.inner.store.load_checkpoint().await?;
        let mut pulled = 0;
        let mut bytes = 0;

        for _ in 0..config.max_pull_pages {
            let page = match self
                .inner
                .transport
                .pull_since(checkpoint.as_deref(), config.batch_size)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(pulled, error = %e, "Pull failed");
                    report.pulled += pulled;
                    report.bytes_transferred += bytes;
                    return Err(e.into());
                }
            };

            pulled += page.records.len();
            bytes += page.bytes_transferred;

            for server in &page.records {
                self.apply_pulled(server, conflicts).await?;
            }

            self.inner.store.save_checkpoint(&page.checkpoint).await?;
            checkpoint = Some(page.checkpoint);

            if !page.has_more {
                break;
            }
        }

        report.pulled += pulled;
        report.bytes_transferred += bytes;

        self.log(
            Self::entry(SyncLogType::Pull)
                .with_duration(elapsed_ms(started))
                .with_items(pulled)
                .with_bytes(bytes),
        )
        .await;
        Ok(())
    }

    /// Store one pulled record, or turn it into a conflict with local state.
    async fn apply_pulled(
        &self,
        server: &ServerRecord,
        conflicts: &mut Vec<PendingConflict>,
    ) -> std::result::Result<(), StoreError> {
        let local = self.inner.store.get(&server.id).await?;

        match local {
            Some(local) if local.sync_status == SyncStatus::Pending => {
                if local.payload == server.payload {
                    self.inner.store.mark_synced(&server.id, server.revision).await?;
                } else if local.base_revision.is_some_and(|base| base >= server.revision) {
                    // The local edit already builds on this version
                } else {
                    add_conflict(conflicts, PendingConflict::new(&local, server));
                }
            }
            Some(local) if local.sync_status == SyncStatus::Conflict => {
                let refreshed = self.inner.resolver.lock().await.refresh(
                    &server.id,
                    server.payload.clone(),
                    server.updated_at,
                    server.revision,
                );
                if !refreshed {
                    add_conflict(conflicts, PendingConflict::new(&local, server));
                }
            }
            _ => self.inner.store.upsert(server.to_synced_record()).await?,
        }
        Ok(())
    }

    /// Resolve this pass's conflicts and write the winners back.
    async fn reconcile_step(
        &self,
        conflicts: Vec<PendingConflict>,
        report: &mut PassReport,
    ) -> std::result::Result<(), StepError> {
        if conflicts.is_empty() {
            return Ok(());
        }
        self.set_state(PassState::Reconciling);

        for PendingConflict { item, kind } in conflicts {
            let started = Instant::now();
            let id = item.id.clone();

            let decision = {
                let mut resolver = self.inner.resolver.lock().await;
                // Already waiting on the user: only the server side moves
                if resolver.refresh(
                    &id,
                    item.server_version.clone(),
                    item.server_timestamp,
                    item.server_revision,
                ) {
                    None
                } else {
                    resolver.resolve(item.clone())
                }
            };

            match decision {
                Some(decision) => {
                    tracing::debug!(
                        record_id = %id,
                        strategy = ?decision.strategy,
                        winner = ?decision.winner,
                        "Conflict resolved"
                    );
                    self.write_back(&item, kind, decision.winner, decision.payload)
                        .await?;
                }
                None => {
                    self.inner.store.mark_conflict(&id).await?;
                    tracing::info!(record_id = %id, "Conflict queued for manual resolution");
                }
            }

            report.conflicts += 1;
            self.log(
                Self::entry(SyncLogType::Conflict)
                    .with_duration(elapsed_ms(started))
                    .with_items(1),
            )
            .await;
        }
        Ok(())
    }

    /// Write a resolved conflict to the store.
    ///
    /// The decision was made against the local version captured when the
    /// conflict was found. If the record changed since, that newer edit is
    /// kept and rebased on the server revision instead.
    async fn write_back(
        &self,
        item: &ConflictItem,
        kind: RecordKind,
        winner: Side,
        payload: serde_json::Value,
    ) -> std::result::Result<(), StoreError> {
        if let Some(mut current) = self.inner.store.get(&item.id).await? {
            if current.updated_at != item.local_timestamp || current.payload != item.local_version {
                tracing::debug!(record_id = %item.id, "Record edited during pass, keeping local edit");
                current.rebase(item.server_revision);
                return self.inner.store.upsert(current).await;
            }
        }

        let record = match winner {
            Side::Server => SyncableRecord::synced(
                item.id.clone(),
                kind,
                payload,
                item.server_timestamp,
                item.server_revision,
            ),
            Side::Local => {
                let mut record =
                    SyncableRecord::pending(item.id.clone(), kind, payload, item.local_timestamp);
                record.rebase(item.server_revision);
                record
            }
        };
        self.inner.store.upsert(record).await
    }

    async fn record_failure(&self, failure: StepError, pass_started: Instant) {
        let StepError { error, items } = failure;
        self.log(
            Self::entry(SyncLogType::Error)
                .with_duration(elapsed_ms(pass_started))
                .with_items(items)
                .failed(error.to_string()),
        )
        .await;
    }

    async fn finish(&self, mut report: PassReport, started: Instant) -> PassReport {
        report.duration = elapsed_ms(started);

        let stopped = self.inner.config.read().await.is_none();
        let state = if stopped {
            PassState::Aborted
        } else if report.outcome == PassOutcome::Error {
            PassState::Failed
        } else {
            PassState::Idle
        };
        self.set_state(state);

        tracing::info!(
            reason = %report.reason,
            outcome = ?report.outcome,
            pushed = report.pushed,
            pulled = report.pulled,
            conflicts = report.conflicts,
            rejected = report.rejected,
            duration_ms = report.duration,
            "Sync pass finished"
        );
        report
    }

    fn set_state(&self, state: PassState) {
        self.inner.state.send_replace(state);
    }

    fn entry(log_type: SyncLogType) -> SyncLog {
        SyncLog::new(uuid::Uuid::new_v4().to_string(), now_ms(), log_type)
    }

    async fn log(&self, entry: SyncLog) {
        self.inner.logger.lock().await.log(entry);
    }

    // ------------------------------------------------------------------
    // Conflicts
    // ------------------------------------------------------------------

    /// Resolve a queued conflict and write the chosen side to the store.
    ///
    /// Picking the server writes its payload as `synced`. Picking the local
    /// side keeps the current local record and rebases it on the server
    /// revision, so the next pass pushes it over the server version.
    pub async fn resolve_conflict(&self, id: &str, choice: ManualChoice) -> Result<ManualResolution> {
        let mut resolver = self.inner.resolver.lock().await;

        let item = resolver
            .get_conflicts()
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| SyncError::ConflictNotFound(id.to_string()))?;

        let current = self.inner.store.get(id).await?;
        let kind = current.as_ref().map(|r| r.kind).unwrap_or_default();

        let record = match choice {
            Side::Server => SyncableRecord::synced(
                id,
                kind,
                item.server_version.clone(),
                item.server_timestamp,
                item.server_revision,
            ),
            Side::Local => {
                let mut record = current.unwrap_or_else(|| {
                    SyncableRecord::pending(id, kind, item.local_version.clone(), item.local_timestamp)
                });
                record.rebase(item.server_revision);
                record
            }
        };
        self.inner.store.upsert(record).await?;

        let resolution = resolver.resolve_manually(id, choice)?;
        tracing::info!(record_id = %id, winner = ?choice, "Conflict resolved manually");
        Ok(resolution)
    }

    /// Unresolved conflicts, oldest first.
    pub async fn conflicts(&self) -> Vec<ConflictItem> {
        self.inner.resolver.lock().await.get_conflicts()
    }

    pub async fn strategy(&self) -> ConflictStrategy {
        self.inner.resolver.lock().await.strategy()
    }

    /// Change the strategy for later resolutions.
    pub async fn set_strategy(&self, strategy: ConflictStrategy) {
        self.inner.resolver.lock().await.set_strategy(strategy);
        tracing::info!(strategy = ?strategy, "Conflict strategy set");
    }

    // ------------------------------------------------------------------
    // Records
    // ------------------------------------------------------------------

    /// Put every record the server rejected back into the outbox.
    /// Returns how many records were requeued.
    pub async fn retry_failed(&self) -> Result<usize> {
        let failed = self.inner.store.query_by_status(SyncStatus::Error).await?;
        let count = failed.len();

        for mut record in failed {
            record.sync_status = SyncStatus::Pending;
            self.inner.store.upsert(record).await?;
        }

        if count > 0 {
            tracing::info!(count, "Requeued failed records");
        }
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------

    pub fn state(&self) -> PassState {
        *self.inner.state.borrow()
    }

    /// Subscribe to pass state changes.
    pub fn state_receiver(&self) -> watch::Receiver<PassState> {
        self.inner.state.subscribe()
    }

    pub async fn status(&self) -> OrchestratorStatus {
        let scheduled = self
            .inner
            .scheduler
            .lock()
            .await
            .as_ref()
            .is_some_and(|s| !s.handle.is_finished());

        OrchestratorStatus {
            armed: self.is_started().await,
            scheduled,
            state: self.state(),
            in_flight: self.inner.in_flight.load(Ordering::Acquire),
            retrigger_pending: self.inner.retrigger.load(Ordering::Acquire),
            last_report: self.inner.last_report.lock().await.clone(),
            checkpoint: self.inner.store.load_checkpoint().await.ok().flatten(),
            unresolved_conflicts: self.inner.resolver.lock().await.pending_count(),
        }
    }

    pub async fn statistics(&self) -> SyncStatistics {
        self.inner.logger.lock().await.get_statistics()
    }

    /// The newest `limit` log entries (all when `None`), oldest first.
    pub async fn logs(&self, limit: Option<usize>) -> Vec<SyncLog> {
        self.inner.logger.lock().await.get_logs(limit)
    }

    /// Drop all log entries and reset statistics.
    pub async fn clear_logs(&self) {
        self.inner.logger.lock().await.clear_logs();
    }
}
