use crate::messages::{CoordinatorSnapshot, LoopMessage};
use crate::transport::{Inbound, MessageRef, UserId};
use tokio::sync::{mpsc, oneshot};

/// Cloneable entry point into a running [`Coordinator`](crate::Coordinator)
///
/// Submission never waits on the loop. Methods return `false` once the
/// loop has stopped.
#[derive(Clone)]
pub struct CoordinatorHandle {
    sender: mpsc::UnboundedSender<LoopMessage>,
}

impl CoordinatorHandle {
    pub(crate) fn new(sender: mpsc::UnboundedSender<LoopMessage>) -> Self {
        Self { sender }
    }

    pub fn submit(&self, inbound: Inbound) -> bool {
        self.sender.send(LoopMessage::Inbound(inbound)).is_ok()
    }

    pub fn text(&self, user: UserId, text: impl Into<String>) -> bool {
        self.submit(Inbound::Text {
            user,
            text: text.into(),
        })
    }

    pub fn press(&self, user: UserId, message: MessageRef, data: impl Into<String>) -> bool {
        self.submit(Inbound::Button {
            user,
            message,
            data: data.into(),
        })
    }

    /// Counters as seen by the loop, after everything submitted so far
    pub async fn snapshot(&self) -> Option<CoordinatorSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.sender.send(LoopMessage::Inspect(tx)).ok()?;
        rx.await.ok()
    }

    pub fn shutdown(&self) {
        let _ = self.sender.send(LoopMessage::Shutdown);
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
