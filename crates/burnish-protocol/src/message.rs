use serde::{Deserialize, Serialize};

/// View → coordinator: begin a polish job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartCommand {
    pub text: String,
    pub model_id: String,
}

/// Coordinator → view: synchronous acceptance or rejection of a command.
/// Acceptance never implies completion; outcomes arrive through the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandAck {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandAck {
    pub fn accepted() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }
}

/// Coordinator → views: advisory elapsed-seconds heartbeat while a job
/// runs. Fire-and-forget; never load-bearing for correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressTick {
    pub seconds: u64,
}
