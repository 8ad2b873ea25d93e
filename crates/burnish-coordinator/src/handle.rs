use burnish_protocol::message::{CommandAck, StartCommand};
use tokio::sync::{mpsc, oneshot};

pub const DEFAULT_REQUEST_CHANNEL_CAPACITY: usize = 8;

const COORDINATOR_UNAVAILABLE: &str = "coordinator is unavailable";

/// One view → coordinator command, answered through the enclosed oneshot.
#[derive(Debug)]
pub enum CoordinatorRequest {
    Start {
        command: StartCommand,
        reply: oneshot::Sender<CommandAck>,
    },
    Cancel {
        reply: oneshot::Sender<CommandAck>,
    },
}

/// Cheaply cloneable sender side of the request exchange. Acks confirm
/// acceptance only; outcomes arrive through the store change bus.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    sender: mpsc::Sender<CoordinatorRequest>,
}

pub fn request_channel(capacity: usize) -> (CoordinatorHandle, mpsc::Receiver<CoordinatorRequest>) {
    let (sender, receiver) = mpsc::channel(capacity);
    (CoordinatorHandle { sender }, receiver)
}

impl CoordinatorHandle {
    pub async fn start(&self, text: impl Into<String>, model_id: impl Into<String>) -> CommandAck {
        let (reply, response) = oneshot::channel();
        let request = CoordinatorRequest::Start {
            command: StartCommand {
                text: text.into(),
                model_id: model_id.into(),
            },
            reply,
        };
        if self.sender.send(request).await.is_err() {
            return CommandAck::rejected(COORDINATOR_UNAVAILABLE);
        }
        response
            .await
            .unwrap_or_else(|_| CommandAck::rejected(COORDINATOR_UNAVAILABLE))
    }

    pub async fn cancel(&self) -> CommandAck {
        let (reply, response) = oneshot::channel();
        if self
            .sender
            .send(CoordinatorRequest::Cancel { reply })
            .await
            .is_err()
        {
            return CommandAck::rejected(COORDINATOR_UNAVAILABLE);
        }
        response
            .await
            .unwrap_or_else(|_| CommandAck::rejected(COORDINATOR_UNAVAILABLE))
    }
}
