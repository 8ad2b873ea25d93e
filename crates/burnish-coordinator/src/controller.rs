use std::sync::Arc;

use burnish_changebus::StoreChangeBus;
use burnish_client::PolishBackend;
use burnish_config::JobTunables;
use burnish_protocol::clock::epoch_millis;
use burnish_protocol::error::{truncate_error, JobError, JobResult};
use burnish_protocol::message::{CommandAck, ProgressTick};
use burnish_protocol::records::{HistoryEntry, JobRecord, JobStatus, PolishOutcome};
use burnish_store::{SharedStore, SharedStoreExt, StoreError};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::context::JobContext;
use crate::handle::CoordinatorRequest;

/// Persisted as the failure reason for a running record orphaned by a
/// coordinator restart.
pub const RESTART_FAILURE_MESSAGE: &str = "Interrupted by a coordinator restart.";

fn persistence(error: StoreError) -> JobError {
    JobError::Persistence(error.to_string())
}

/// Message persisted or surfaced for a given terminal error. Transport
/// failures carry the upstream detail; everything else uses the display
/// form.
fn failure_detail(error: &JobError) -> String {
    match error {
        JobError::Transport(detail) => detail.clone(),
        other => other.to_string(),
    }
}

fn ack_detail(error: &JobError) -> String {
    match error {
        JobError::Validation(detail) => detail.clone(),
        JobError::AlreadyRunning => "Already running".to_owned(),
        other => other.to_string(),
    }
}

pub struct JobCoordinator {
    store: Arc<dyn SharedStore>,
    backend: Arc<dyn PolishBackend>,
    bus: Arc<StoreChangeBus>,
    tunables: JobTunables,
    active: Arc<Mutex<Option<JobContext>>>,
}

impl JobCoordinator {
    pub fn new(
        store: Arc<dyn SharedStore>,
        backend: Arc<dyn PolishBackend>,
        tunables: JobTunables,
    ) -> Self {
        let bus = store.change_bus();
        Self {
            store,
            backend,
            bus,
            tunables,
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Startup reconciliation: a persisted `running` record this process
    /// does not recognize has no live call behind it (tokens do not
    /// survive restarts) and no request id to reattach, so it is resolved
    /// here: a persisted cancellation intent lands as `cancelled`,
    /// anything else as `failed`. Never re-issues the remote call.
    pub async fn recover(&self) -> JobResult<Option<JobStatus>> {
        let active = self.active.lock().await;
        let Some(record) = self.store.job().map_err(persistence)? else {
            return Ok(None);
        };
        if record.status != JobStatus::Running {
            return Ok(None);
        }

        let recognized = active
            .as_ref()
            .is_some_and(|context| context.started_at_ms == record.started_at_ms);
        if recognized {
            return Ok(None);
        }

        if record.cancel_requested {
            info!(
                started_at_ms = record.started_at_ms,
                "honoring persisted cancellation for orphaned running job"
            );
            self.store
                .put_job(record.cancelled())
                .map_err(persistence)?;
            return Ok(Some(JobStatus::Cancelled));
        }

        warn!(
            started_at_ms = record.started_at_ms,
            "failing running job orphaned by a previous coordinator"
        );
        self.store
            .put_job(record.failed(RESTART_FAILURE_MESSAGE))
            .map_err(persistence)?;
        Ok(Some(JobStatus::Failed))
    }

    /// Validates and accepts a new job. Returns as soon as the running
    /// record is written; the outcome is observed through the store.
    pub async fn start(&self, text: &str, model_id: &str) -> JobResult<()> {
        if text.trim().is_empty() {
            return Err(JobError::Validation("Text is required".to_owned()));
        }
        let model_id = model_id.trim();
        if model_id.is_empty() {
            return Err(JobError::Validation("Model is required".to_owned()));
        }
        if text.chars().count() > self.tunables.max_text_chars {
            return Err(JobError::Validation("Text too long".to_owned()));
        }

        let mut active = self.active.lock().await;
        if active.is_some() {
            return Err(JobError::AlreadyRunning);
        }
        if let Some(existing) = self.store.job().map_err(persistence)? {
            if existing.status == JobStatus::Running {
                return Err(JobError::AlreadyRunning);
            }
        }

        let started_at_ms = epoch_millis();
        self.store
            .put_job(JobRecord::running(text, model_id, started_at_ms))
            .map_err(persistence)?;
        info!(started_at_ms, model_id, "polish job accepted");

        let cancel = CancellationToken::new();
        let tick_task = self.spawn_tick_task(cancel.clone());
        self.spawn_fetch_task(
            text.to_owned(),
            model_id.to_owned(),
            started_at_ms,
            cancel.clone(),
        );
        *active = Some(JobContext::new(started_at_ms, cancel, tick_task));
        Ok(())
    }

    /// Requests cancellation of the active job. With a live call in this
    /// process the token unwinds it; without one (post-restart) only the
    /// durable intent and an optimistic terminal mark are possible, and
    /// the remote side may still finish. That late result is discarded.
    ///
    /// The `active` lock is held across the read-modify-write, as in every
    /// other job-record mutation, so a completing call can never interleave
    /// with the intent write.
    pub async fn cancel(&self) -> JobResult<()> {
        let active = self.active.lock().await;
        let Some(mut record) = self.store.job().map_err(persistence)? else {
            return Ok(());
        };
        if record.status != JobStatus::Running {
            return Ok(());
        }

        record.cancel_requested = true;
        if let Some(context) = active
            .as_ref()
            .filter(|context| context.started_at_ms == record.started_at_ms)
        {
            // intent persisted before the token fires, so the completion
            // path cannot miss it
            self.store.put_job(record).map_err(persistence)?;
            context.request_cancel();
        } else {
            info!(
                started_at_ms = record.started_at_ms,
                "no live call to unwind; marking running job cancelled"
            );
            self.store
                .put_job(record.cancelled())
                .map_err(persistence)?;
        }
        Ok(())
    }

    /// Answers view commands until the channel closes.
    pub async fn serve(self: Arc<Self>, mut requests: mpsc::Receiver<CoordinatorRequest>) {
        while let Some(request) = requests.recv().await {
            match request {
                CoordinatorRequest::Start { command, reply } => {
                    let ack = match self.start(&command.text, &command.model_id).await {
                        Ok(()) => CommandAck::accepted(),
                        Err(error) => CommandAck::rejected(ack_detail(&error)),
                    };
                    let _ = reply.send(ack);
                }
                CoordinatorRequest::Cancel { reply } => {
                    let ack = match self.cancel().await {
                        Ok(()) => CommandAck::accepted(),
                        Err(error) => CommandAck::rejected(ack_detail(&error)),
                    };
                    let _ = reply.send(ack);
                }
            }
        }
    }

    fn spawn_tick_task(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let bus = Arc::clone(&self.bus);
        let interval = self.tunables.tick_interval;
        tokio::spawn(async move {
            let mut seconds = 0u64;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        seconds += 1;
                        bus.publish_tick(ProgressTick { seconds });
                    }
                }
            }
        })
    }

    fn spawn_fetch_task(
        &self,
        text: String,
        model_id: String,
        started_at_ms: u64,
        cancel: CancellationToken,
    ) {
        let store = Arc::clone(&self.store);
        let backend = Arc::clone(&self.backend);
        let active = Arc::clone(&self.active);
        let history_cap = self.tunables.history_cap;
        tokio::spawn(async move {
            let outcome = match store.connection() {
                Ok(settings) => backend.polish(&settings, &text, &model_id, &cancel).await,
                Err(error) => Err(persistence(error)),
            };
            finish_job(&store, &active, started_at_ms, outcome, history_cap).await;
        });
    }
}

/// Applies a remote outcome to the store, releasing the job context and
/// guarding against superseded records so a late resolution can never
/// produce a second terminal state for the same `started_at_ms`. Runs
/// entirely under the `active` lock; all job-record mutations serialize
/// through it.
async fn finish_job(
    store: &Arc<dyn SharedStore>,
    active: &Arc<Mutex<Option<JobContext>>>,
    started_at_ms: u64,
    outcome: JobResult<PolishOutcome>,
    history_cap: usize,
) {
    let mut guard = active.lock().await;
    if guard
        .as_ref()
        .is_some_and(|context| context.started_at_ms == started_at_ms)
    {
        guard.take();
    }

    let current = match store.job() {
        Ok(record) => record,
        Err(error) => {
            warn!(%error, "failed to read job record at completion");
            return;
        }
    };
    let Some(record) = current else {
        debug!(started_at_ms, "job record gone before completion; discarding result");
        return;
    };
    if record.status != JobStatus::Running || record.started_at_ms != started_at_ms {
        debug!(started_at_ms, "job record superseded; discarding late result");
        return;
    }

    let persisted = if record.cancel_requested {
        // durable intent wins over a raced success
        store.put_job(record.cancelled())
    } else {
        match outcome {
            Ok(result) => complete_job(store, record, result, history_cap),
            Err(JobError::Cancelled) => store.put_job(record.cancelled()),
            Err(error) => {
                store.put_job(record.failed(truncate_error(&failure_detail(&error))))
            }
        }
    };
    if let Err(error) = persisted {
        warn!(%error, "failed to persist job outcome");
    }
}

fn complete_job(
    store: &Arc<dyn SharedStore>,
    record: JobRecord,
    result: PolishOutcome,
    history_cap: usize,
) -> Result<(), StoreError> {
    let now = epoch_millis();
    let entry = HistoryEntry {
        id: format!("h_{now}"),
        input: record.input_text.clone(),
        output: result.polished.clone(),
        model: result.model.clone(),
        elapsed_ms: result.elapsed_ms,
        timestamp_ms: now,
    };

    store.put_job(record.completed(result))?;
    let mut history = store.history()?;
    history.push_front(entry, history_cap);
    store.put_history(history)?;
    store.clear_draft()?;
    info!("polish job completed");
    Ok(())
}
