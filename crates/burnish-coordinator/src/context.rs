use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Per-job resources held only while the job's remote call is in flight:
/// the abort token and the advisory tick task. Dropped (and therefore
/// cancelled) on every terminal transition, which is the structured
/// replacement for process-global abort/interval handles.
pub(crate) struct JobContext {
    pub started_at_ms: u64,
    cancel: CancellationToken,
    tick_task: JoinHandle<()>,
}

impl JobContext {
    pub fn new(started_at_ms: u64, cancel: CancellationToken, tick_task: JoinHandle<()>) -> Self {
        Self {
            started_at_ms,
            cancel,
            tick_task,
        }
    }

    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for JobContext {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.tick_task.abort();
    }
}
