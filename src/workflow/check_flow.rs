//! Status check flow - workflow layer
//!
//! Defines one complete check of one applicant:
//! 1. landing page → "check status" → "continue"
//! 2. fill the form, hand the CAPTCHA image to the human
//! 3. wait for the answer, submit
//! 4. read the outcome, capture the captioned screenshot
//!
//! Owns no browser: the session is passed in by the orchestrator, which also
//! clears the exchange fields and releases the session afterwards.

use std::time::Duration;

use chrono::Utc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::config::{Config, Locators};
use crate::error::{AppError, AppResult};
use crate::infrastructure::PageDriver;
use crate::models::{CheckOutcome, RecordField};
use crate::services::{snapshot, Poller};
use crate::store::StatusStore;
use crate::utils::logging::truncate_text;
use crate::workflow::check_ctx::CheckCtx;

/// Period for element checks inside the page
const ELEMENT_POLL: Duration = Duration::from_millis(250);

pub struct CheckFlow {
    store: StatusStore,
    poller: Poller,
    target_url: String,
    locators: Locators,
    element_wait: Duration,
    captcha_answer: Duration,
}

impl CheckFlow {
    pub fn new(config: &Config, store: StatusStore, poller: Poller) -> Self {
        Self {
            store,
            poller,
            target_url: config.target_url.clone(),
            locators: config.locators.clone(),
            element_wait: config.timeouts.element_wait(),
            captcha_answer: config.timeouts.captcha_answer(),
        }
    }

    pub async fn run<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
        ctx: &CheckCtx,
    ) -> AppResult<CheckOutcome> {
        let l = &self.locators;

        // ========== 1-3: reach the form ==========
        info!("{} 🌐 opening {}", ctx, self.target_url);
        driver.goto(&self.target_url).await?;

        self.wait(driver, "check status link", &l.check_status).await?;
        driver.click(&l.check_status).await?;

        self.wait(driver, "continue link", &l.continue_link).await?;
        driver.click(&l.continue_link).await?;

        // ========== 4: fill the form ==========
        self.wait(driver, "entry form", &l.lastname).await?;
        debug!("{} filling entry form", ctx);
        driver.type_into(&l.confirmation, &ctx.confirmation_number).await?;
        driver.type_into(&l.lastname, &ctx.lastname).await?;
        driver.type_into(&l.birth_year, &ctx.birth_year).await?;

        // ========== 5: hand the CAPTCHA to the human ==========
        self.wait(driver, "captcha image", &l.captcha_image).await?;
        let captcha = driver.element_png(&l.captcha_image).await?;
        snapshot::ensure_image(&captcha, "captcha image", &l.captcha_image)?;
        self.store.set_captcha_image(ctx.user_id, &captcha).await?;
        info!("{} 🧩 CAPTCHA ready, waiting for an answer", ctx);

        // ========== 6: wait for the answer ==========
        let answered = self
            .poller
            .wait_for_any(ctx.user_id, &[RecordField::CaptchaResult], self.captcha_answer)
            .await?;
        if !answered {
            return Err(AppError::CaptchaTimeout {
                user_id: ctx.user_id,
            });
        }
        let answer = self
            .store
            .require(ctx.user_id)
            .await?
            .captcha_result
            .unwrap_or_default();

        // ========== 7: submit ==========
        self.wait(driver, "submit button", &l.submit).await?;
        driver.type_into(&l.captcha_input, &answer).await?;
        driver.click(&l.submit).await?;
        info!("{} 📤 form submitted", ctx);

        // ========== 8: read the outcome ==========
        let outcome = self.wait_for_outcome(driver).await?;

        // ========== 9: captioned screenshot ==========
        let at = Utc::now();
        let caption = snapshot::caption_text(&ctx.lastname, &ctx.birth_year, at);
        driver.eval(&snapshot::overlay_script(&caption)).await?;
        let screenshot = driver.page_png().await?;
        snapshot::ensure_image(&screenshot, "result screenshot", &l.result)?;
        self.store
            .record_outcome(ctx.user_id, outcome, &screenshot, at)
            .await?;

        info!("{} ✅ outcome recorded: {}", ctx, outcome.label());
        Ok(outcome)
    }

    async fn wait<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
        step: &'static str,
        selector: &str,
    ) -> AppResult<()> {
        driver
            .wait_for(step, selector, self.element_wait, ELEMENT_POLL)
            .await
    }

    /// Wait until the form is gone and the result element reads as an outcome
    async fn wait_for_outcome<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
    ) -> AppResult<CheckOutcome> {
        let l = &self.locators;
        let deadline = Instant::now() + self.element_wait;

        loop {
            if !driver.exists(&l.captcha_input).await? && driver.exists(&l.result).await? {
                let text = driver.text_of(&l.result).await?;
                if let Some(outcome) = CheckOutcome::classify(&text) {
                    return Ok(outcome);
                }
                debug!("result page not readable yet: {}", truncate_text(&text, 80));
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(AppError::target_unavailable("result page", &l.result));
            }
            sleep(ELEMENT_POLL.min(deadline - now)).await;
        }
    }
}
