//! Per-record wake-up channel
//!
//! Carries no data; it only shortens a poller's sleep after a write.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

#[derive(Debug, Default)]
pub struct RecordSignals {
    channels: Mutex<HashMap<i64, Arc<Notify>>>,
}

impl RecordSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifier for one record, created on first use
    pub fn subscribe(&self, user_id: i64) -> Arc<Notify> {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels.entry(user_id).or_default().clone()
    }

    /// Wake everyone currently waiting on this record
    pub fn notify(&self, user_id: i64) {
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(notify) = channels.get(&user_id) {
            notify.notify_waiters();
        }
    }
}
