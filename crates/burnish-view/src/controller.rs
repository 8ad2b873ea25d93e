use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use burnish_changebus::StoreChangeEnvelope;
use burnish_config::ViewTunables;
use burnish_coordinator::CoordinatorHandle;
use burnish_protocol::clock::epoch_millis;
use burnish_protocol::message::{CommandAck, ProgressTick};
use burnish_protocol::records::{
    HistoryLog, JobRecord, JobStatus, PolishOutcome, StoreKey, StoreRecord,
};
use burnish_store::{SharedStore, SharedStoreExt, StoreError};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::draft::DraftManager;
use crate::progress::{estimated_seconds, progress_percent};

/// Error written into a running record whose coordinator is presumed gone.
pub const STALE_JOB_ERROR: &str = "Request timed out.";

const DISPLAY_TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewPhase {
    #[default]
    Idle,
    Polishing {
        started_at_ms: u64,
        elapsed_seconds: u64,
        estimated_seconds: u64,
    },
    Completed {
        result: PolishOutcome,
    },
    Failed {
        error: String,
    },
    Cancelled,
}

/// Render model the host draws from. Pure data; drawing it twice has no
/// side effects.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewState {
    pub phase: ViewPhase,
    pub draft: Option<String>,
    pub history: HistoryLog,
}

impl ViewState {
    pub fn progress_percent(&self) -> Option<u8> {
        match &self.phase {
            ViewPhase::Polishing {
                elapsed_seconds,
                estimated_seconds,
                ..
            } => Some(progress_percent(*elapsed_seconds, *estimated_seconds)),
            ViewPhase::Completed { .. } => Some(100),
            _ => None,
        }
    }
}

struct DisplayTicker {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Drop for DisplayTicker {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

pub struct ViewController {
    store: Arc<dyn SharedStore>,
    coordinator: CoordinatorHandle,
    tunables: ViewTunables,
    state: Arc<StdMutex<ViewState>>,
    ticker: StdMutex<Option<DisplayTicker>>,
    drafts: DraftManager,
}

impl ViewController {
    /// Creates a view over whatever survived in the store. A fresh view
    /// was not subscribed when earlier writes happened, so it must start
    /// from a read, never from replayed events.
    pub fn open(
        store: Arc<dyn SharedStore>,
        coordinator: CoordinatorHandle,
        tunables: ViewTunables,
    ) -> Result<Self, StoreError> {
        let drafts = DraftManager::new(Arc::clone(&store), tunables.draft_quiet_period);
        let controller = Self {
            store,
            coordinator,
            tunables,
            state: Arc::new(StdMutex::new(ViewState::default())),
            ticker: StdMutex::new(None),
            drafts,
        };
        controller.reconcile()?;
        Ok(controller)
    }

    /// Read-based reconciliation; also the recovery path after a lagged
    /// change subscription.
    pub fn reconcile(&self) -> Result<(), StoreError> {
        let history = self.store.history()?;
        let draft = self.store.draft()?;
        let phase = match self.store.job()? {
            None => ViewPhase::Idle,
            Some(record) => self.reconcile_job(record)?,
        };

        let polishing = matches!(phase, ViewPhase::Polishing { .. });
        {
            let mut state = self.lock_state();
            state.history = history;
            state.draft = draft;
            state.phase = phase;
        }
        if polishing {
            self.ensure_ticker();
        } else {
            self.stop_ticker();
        }
        Ok(())
    }

    fn reconcile_job(&self, record: JobRecord) -> Result<ViewPhase, StoreError> {
        if record.status != JobStatus::Running {
            return Ok(terminal_phase(&record));
        }

        let elapsed_ms = epoch_millis().saturating_sub(record.started_at_ms);
        let staleness_ms = self.tunables.staleness_threshold.as_millis() as u64;
        if elapsed_ms > staleness_ms {
            // The coordinator never reported on this job and is presumed
            // gone. This is the only observer-declared termination, and it
            // never touches the remote service.
            warn!(
                started_at_ms = record.started_at_ms,
                elapsed_ms, "failing running job abandoned by its coordinator"
            );
            let failed = record.failed(STALE_JOB_ERROR);
            self.store.put_job(failed.clone())?;
            return Ok(terminal_phase(&failed));
        }

        Ok(self.polishing_phase(&record, elapsed_ms / 1_000))
    }

    fn polishing_phase(&self, record: &JobRecord, elapsed_seconds: u64) -> ViewPhase {
        ViewPhase::Polishing {
            started_at_ms: record.started_at_ms,
            elapsed_seconds,
            estimated_seconds: estimated_seconds(
                record.input_text.chars().count(),
                &self.tunables,
            ),
        }
    }

    pub fn state(&self) -> ViewState {
        self.lock_state().clone()
    }

    /// Dispatches one change envelope by record tag.
    pub fn handle_change(&self, envelope: &StoreChangeEnvelope) {
        match (envelope.key, &envelope.new) {
            (StoreKey::Job, Some(StoreRecord::Job(record))) => self.apply_job_change(record),
            (StoreKey::Job, None) => {
                self.stop_ticker();
                self.lock_state().phase = ViewPhase::Idle;
            }
            (StoreKey::History, Some(StoreRecord::History(log))) => {
                self.lock_state().history = log.clone();
            }
            (StoreKey::History, None) => {
                self.lock_state().history = HistoryLog::default();
            }
            (StoreKey::Draft, Some(StoreRecord::Draft(text))) => {
                self.lock_state().draft = Some(text.clone());
            }
            (StoreKey::Draft, None) => {
                self.lock_state().draft = None;
            }
            (StoreKey::Connection, _) => {}
            (key, Some(record)) => {
                warn!(
                    key = key.as_str(),
                    tag = record.key().as_str(),
                    "ignoring change event with mismatched record tag"
                );
            }
        }
    }

    fn apply_job_change(&self, record: &JobRecord) {
        if record.status == JobStatus::Running {
            // adopt the newly running job, whichever view started it
            let elapsed_seconds = epoch_millis().saturating_sub(record.started_at_ms) / 1_000;
            let phase = self.polishing_phase(record, elapsed_seconds);
            self.lock_state().phase = phase;
            self.ensure_ticker();
            return;
        }

        let tracked_started_at = match &self.lock_state().phase {
            ViewPhase::Polishing { started_at_ms, .. } => Some(*started_at_ms),
            _ => None,
        };
        if let Some(tracked) = tracked_started_at {
            if tracked != record.started_at_ms {
                debug!(
                    started_at_ms = record.started_at_ms,
                    tracked, "ignoring terminal event for a job this view is not tracking"
                );
                return;
            }
        }

        self.stop_ticker();
        self.lock_state().phase = terminal_phase(record);
    }

    /// Advisory; only ever moves the elapsed display forward.
    pub fn handle_tick(&self, tick: ProgressTick) {
        let mut state = self.lock_state();
        if let ViewPhase::Polishing {
            elapsed_seconds, ..
        } = &mut state.phase
        {
            *elapsed_seconds = (*elapsed_seconds).max(tick.seconds);
        }
    }

    /// Drives `handle_change` from a bus subscription until it closes,
    /// falling back to read-based reconciliation when the subscription
    /// lagged past its buffer.
    pub async fn pump(self: Arc<Self>, mut changes: broadcast::Receiver<StoreChangeEnvelope>) {
        loop {
            match changes.recv().await {
                Ok(envelope) => self.handle_change(&envelope),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "change subscription lagged; reconciling from the store");
                    if let Err(error) = self.reconcile() {
                        warn!(%error, "reconciliation after lag failed");
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// Drives `handle_tick` from the advisory tick channel. Ticks are
    /// droppable, so lag is simply skipped over.
    pub async fn pump_ticks(self: Arc<Self>, mut ticks: broadcast::Receiver<ProgressTick>) {
        loop {
            match ticks.recv().await {
                Ok(tick) => self.handle_tick(tick),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    pub async fn submit(&self, text: &str, model_id: &str) -> CommandAck {
        self.coordinator.start(text, model_id).await
    }

    pub async fn request_cancel(&self) -> CommandAck {
        self.coordinator.cancel().await
    }

    /// Local edit: echoed into the render model immediately, persisted
    /// after the debounce quiet period.
    pub fn note_edit(&self, text: String) {
        self.lock_state().draft = Some(text.clone());
        self.drafts.note_edit(text);
    }

    /// Teardown: stops the display ticker and drops any pending draft
    /// write. Also runs on Drop.
    pub fn close(&self) {
        self.stop_ticker();
        self.drafts.close();
    }

    fn ensure_ticker(&self) {
        let mut ticker = self.ticker.lock().expect("view ticker lock poisoned");
        if ticker.is_some() {
            return;
        }
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let state = Arc::clone(&self.state);
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(DISPLAY_TICK_INTERVAL) => {
                        let mut state = state.lock().expect("view state lock poisoned");
                        if let ViewPhase::Polishing { started_at_ms, elapsed_seconds, .. } = &mut state.phase {
                            let recomputed = epoch_millis().saturating_sub(*started_at_ms) / 1_000;
                            *elapsed_seconds = (*elapsed_seconds).max(recomputed);
                        }
                    }
                }
            }
        });
        *ticker = Some(DisplayTicker { cancel, task });
    }

    fn stop_ticker(&self) {
        self.ticker
            .lock()
            .expect("view ticker lock poisoned")
            .take();
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ViewState> {
        self.state.lock().expect("view state lock poisoned")
    }
}

impl Drop for ViewController {
    fn drop(&mut self) {
        self.close();
    }
}

fn terminal_phase(record: &JobRecord) -> ViewPhase {
    match record.status {
        JobStatus::Running => ViewPhase::Idle,
        JobStatus::Completed => match &record.result {
            Some(result) => ViewPhase::Completed {
                result: result.clone(),
            },
            None => ViewPhase::Failed {
                error: "Polish result missing.".to_owned(),
            },
        },
        JobStatus::Failed => ViewPhase::Failed {
            error: record
                .error
                .clone()
                .unwrap_or_else(|| "Request failed.".to_owned()),
        },
        JobStatus::Cancelled => ViewPhase::Cancelled,
    }
}
