use std::sync::Arc;
use tokio::sync::Mutex;

use crate::callback::FeedCallback;
use crate::error::FeedResult;
use crate::types::{CallbackEntry, Identity};

/// Arguments of one [`FeedCallback::notify`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub entries: Vec<CallbackEntry>,
    pub deleted_ids: Vec<Identity>,
}

/// Callback recording every notification in memory.
///
/// Useful in tests to assert what the downstream consumer would have been told.
#[derive(Debug, Clone, Default)]
pub struct MemoryCallback {
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryCallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every notification received, in call order.
    pub async fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().await.clone()
    }

    /// Returns the most recent notification, if any.
    pub async fn last(&self) -> Option<Notification> {
        self.notifications.lock().await.last().cloned()
    }

    pub async fn clear(&self) {
        self.notifications.lock().await.clear();
    }
}

impl FeedCallback for MemoryCallback {
    async fn notify(
        &self,
        entries: Vec<CallbackEntry>,
        deleted_ids: Vec<Identity>,
    ) -> FeedResult<()> {
        let mut notifications = self.notifications.lock().await;
        notifications.push(Notification {
            entries,
            deleted_ids,
        });

        Ok(())
    }
}
