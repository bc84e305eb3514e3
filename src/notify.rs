// Dispatch is fire-and-forget: the engine publishes onto a broadcast
// channel and an external delivery worker (email/push) subscribes. A send
// failure must never roll back the transaction that produced the event.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Notification {
    pub tournament_id: Option<String>,
    pub user_id: String,
    pub contents: NotificationContents,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub enum NotificationContents {
    SlotConfirmed { slot_number: i64 },
    WaitlistJoined { position: i64 },
    CheckedIn,
    PromotedFromWaitlist { slot_number: i64 },
    DisqualifiedNoShow,
    HoldReleased { hold_id: String },
}

#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Best-effort send. Fails only when nobody is subscribed, which is
    /// logged and otherwise ignored.
    pub fn send(&self, notification: Notification) {
        if let Err(e) = self.tx.send(notification) {
            tracing::debug!("notification dropped (no subscribers): {e}");
        }
    }
}
