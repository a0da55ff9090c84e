//! Check coordinator - orchestration layer
//!
//! The two triggers the web boundary calls. Neither talks to the worker:
//! they write the record and poll it.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::SessionLauncher;
use crate::models::RecordField;
use crate::orchestrator::cycle::{CheckWorker, CycleRegistry};
use crate::services::Poller;
use crate::store::StatusStore;
use crate::workflow::CheckFlow;

#[derive(Clone)]
pub struct CheckCoordinator {
    store: StatusStore,
    poller: Poller,
    registry: CycleRegistry,
    worker: Arc<CheckWorker>,
    captcha_prompt: Duration,
    result_wait: Duration,
}

impl CheckCoordinator {
    pub fn new(config: &Config, store: StatusStore, launcher: Arc<dyn SessionLauncher>) -> Self {
        let poller = Poller::new(store.clone(), config.timeouts.poll_interval());
        let flow = CheckFlow::new(config, store.clone(), poller.clone());
        let worker = Arc::new(CheckWorker::new(store.clone(), launcher, flow));

        Self {
            store,
            poller,
            registry: CycleRegistry::new(),
            worker,
            captcha_prompt: config.timeouts.captcha_prompt(),
            result_wait: config.timeouts.result_wait(),
        }
    }

    /// Reset the record and launch a detached worker for it
    ///
    /// Rejects with `CycleInProgress` while another cycle holds the record.
    /// The returned handle may be ignored; the cycle runs regardless.
    pub async fn start_cycle(&self, user_id: i64) -> AppResult<JoinHandle<()>> {
        self.store.require(user_id).await?;

        let guard = self
            .registry
            .try_claim(user_id)
            .ok_or(AppError::CycleInProgress { user_id })?;

        self.store.reset_cycle(user_id).await?;
        info!("[user #{}] ▶️ starting status check", user_id);

        Ok(self.worker.spawn(user_id, guard))
    }

    /// Wait for the worker to publish the CAPTCHA (or for an answer to exist)
    pub async fn await_captcha(&self, user_id: i64) -> AppResult<bool> {
        self.poller
            .wait_for_any(
                user_id,
                &[RecordField::CaptchaImage, RecordField::CaptchaResult],
                self.captcha_prompt,
            )
            .await
    }

    /// Hand the human's answer to the worker and wait for the outcome
    ///
    /// `Ok(false)` without touching the record when no cycle is in flight.
    pub async fn submit_answer(&self, user_id: i64, answer: &str) -> AppResult<bool> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(AppError::InvalidInput("CAPTCHA answer is empty".to_string()));
        }
        // exchange fields are only written inside a cycle
        if !self.registry.is_running(user_id) {
            warn!("[user #{}] CAPTCHA answer without a running cycle, ignored", user_id);
            return Ok(false);
        }

        self.store.set_captcha_result(user_id, answer).await?;
        info!("[user #{}] 🔑 CAPTCHA answer received", user_id);

        self.poller
            .wait_for_any(user_id, &[RecordField::CheckResult], self.result_wait)
            .await
    }

    pub fn is_running(&self, user_id: i64) -> bool {
        self.registry.is_running(user_id)
    }
}
