//! Check cycle worker - orchestration layer
//!
//! Owns the automation session for one cycle and guarantees the cleanup
//! that every exit path needs: session closed, exchange fields cleared.

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};
use crate::infrastructure::SessionLauncher;
use crate::models::CheckOutcome;
use crate::store::StatusStore;
use crate::workflow::{CheckCtx, CheckFlow};

/// In-flight cycles, at most one per record
#[derive(Debug, Clone, Default)]
pub struct CycleRegistry {
    running: Arc<Mutex<HashSet<i64>>>,
}

impl CycleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the record's slot; `None` if a cycle already holds it
    pub fn try_claim(&self, user_id: i64) -> Option<CycleGuard> {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        running.insert(user_id).then(|| CycleGuard {
            registry: self.clone(),
            user_id,
        })
    }

    pub fn is_running(&self, user_id: i64) -> bool {
        let running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        running.contains(&user_id)
    }
}

/// Frees the record's slot when dropped
#[derive(Debug)]
pub struct CycleGuard {
    registry: CycleRegistry,
    user_id: i64,
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        let mut running = self.registry.running.lock().unwrap_or_else(|e| e.into_inner());
        running.remove(&self.user_id);
    }
}

/// Runs check cycles in the background
pub struct CheckWorker {
    store: StatusStore,
    launcher: Arc<dyn SessionLauncher>,
    flow: CheckFlow,
}

impl CheckWorker {
    pub fn new(store: StatusStore, launcher: Arc<dyn SessionLauncher>, flow: CheckFlow) -> Self {
        Self {
            store,
            launcher,
            flow,
        }
    }

    /// Start a detached cycle; the guard is released when it ends
    pub fn spawn(self: &Arc<Self>, user_id: i64, guard: CycleGuard) -> JoinHandle<()> {
        let worker = Arc::clone(self);
        tokio::spawn(async move {
            let _guard = guard;
            // the outcome lives in the record, the result is only logged
            let _ = worker.run(user_id).await;
        })
    }

    /// Run one cycle to completion or failure
    ///
    /// A panic inside the cycle is turned into an error so the exchange
    /// fields are still cleared; the session's `Drop` releases the browser.
    pub async fn run(&self, user_id: i64) -> AppResult<CheckOutcome> {
        let result = AssertUnwindSafe(self.run_with_session(user_id))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(AppError::browser(panic_message(&*payload))));

        if let Err(e) = self.store.clear_exchange(user_id).await {
            warn!("[user #{}] failed to clear CAPTCHA fields: {}", user_id, e);
        }

        match &result {
            Ok(outcome) => info!("[user #{}] 🏁 cycle finished: {}", user_id, outcome.label()),
            Err(e) if e.is_benign() => warn!("[user #{}] ⌛ cycle abandoned: {}", user_id, e),
            Err(e) => error!("[user #{}] ❌ cycle failed: {}", user_id, e),
        }
        result
    }

    async fn run_with_session(&self, user_id: i64) -> AppResult<CheckOutcome> {
        let record = self.store.require(user_id).await?;
        let ctx = CheckCtx::from_record(&record);

        let mut session = self.launcher.launch().await?;
        let result = self.flow.run(&*session, &ctx).await;
        session.close().await;

        result
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("check cycle panicked: {}", detail)
}
