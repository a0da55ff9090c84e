//! Page driver - infrastructure layer
//!
//! Element-level capabilities over one browser page. Knows nothing about
//! applicants or CAPTCHAs.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::time::{sleep, Instant};

use crate::error::{AppError, AppResult};

/// Operations the check flow needs from a page
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn goto(&self, url: &str) -> AppResult<()>;

    /// Whether `selector` currently matches an element
    async fn exists(&self, selector: &str) -> AppResult<bool>;

    async fn click(&self, selector: &str) -> AppResult<()>;

    /// Focus the element and type `text` into it
    async fn type_into(&self, selector: &str, text: &str) -> AppResult<()>;

    /// PNG screenshot of a single element
    async fn element_png(&self, selector: &str) -> AppResult<Vec<u8>>;

    /// PNG screenshot of the full page
    async fn page_png(&self) -> AppResult<Vec<u8>>;

    /// Rendered text of an element
    async fn text_of(&self, selector: &str) -> AppResult<String>;

    async fn eval(&self, js: &str) -> AppResult<JsonValue>;

    /// Wait until `selector` matches, checking every `period`
    ///
    /// An element still missing after `timeout` fails `step` with
    /// `TargetUnavailable`.
    async fn wait_for(
        &self,
        step: &'static str,
        selector: &str,
        timeout: Duration,
        period: Duration,
    ) -> AppResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.exists(selector).await? {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(AppError::target_unavailable(step, selector));
            }
            sleep(period.min(deadline - now)).await;
        }
    }
}

/// One live browser, scoped to exactly one check cycle
#[async_trait]
pub trait AutomationSession: PageDriver {
    /// Release the browser; called once on every exit path
    async fn close(&mut self);
}

/// Creates a fresh automation session per cycle
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> AppResult<Box<dyn AutomationSession>>;
}
