use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde_json::Value as JsonValue;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{AutomationSession, PageDriver, SessionLauncher};

static SESSION_SEQ: AtomicU64 = AtomicU64::new(0);

/// Launches one headless Chrome per check cycle
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    executable: Option<PathBuf>,
    window: (u32, u32),
}

impl ChromeLauncher {
    pub fn new(config: &Config) -> Self {
        Self {
            executable: config.chrome_executable.as_ref().map(PathBuf::from),
            window: (config.window_width, config.window_height),
        }
    }
}

#[async_trait]
impl SessionLauncher for ChromeLauncher {
    async fn launch(&self) -> AppResult<Box<dyn AutomationSession>> {
        Ok(Box::new(ChromeSession::launch(self).await?))
    }
}

/// A live headless browser plus its event-handler task
///
/// `close()` shuts it down gracefully; `Drop` is the backstop for paths that
/// never reach `close()` (panics, aborted tasks). Dropping the `Browser`
/// kills the child process.
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    profile_dir: PathBuf,
    closed: bool,
}

impl ChromeSession {
    async fn launch(launcher: &ChromeLauncher) -> AppResult<Self> {
        info!("🚀 launching headless browser...");

        // private profile per session, concurrent cycles would fight over a shared profile lock
        let profile_dir = std::env::temp_dir().join(format!(
            "dv-status-check-{}-{}",
            std::process::id(),
            SESSION_SEQ.fetch_add(1, Ordering::Relaxed)
        ));

        let (width, height) = launcher.window;
        let mut builder = BrowserConfig::builder()
            .new_headless_mode()
            .no_sandbox()
            .window_size(width, height)
            .user_data_dir(&profile_dir)
            .args(vec!["--disable-gpu", "--disable-dev-shm-usage"]);
        if let Some(executable) = &launcher.executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder.build().map_err(|e| {
            error!("invalid browser configuration: {}", e);
            AppError::browser(e)
        })?;

        let (mut browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            error!("failed to launch headless browser: {}", e);
            AppError::from(e)
        })?;
        debug!("headless browser started, profile {}", profile_dir.display());

        // drive browser events in the background
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler event error: {}", e);
                }
            }
        });

        sleep(tokio::time::Duration::from_millis(300)).await;

        match browser.new_page("about:blank").await {
            Ok(page) => Ok(Self {
                browser,
                page,
                handler_task,
                profile_dir,
                closed: false,
            }),
            Err(e) => {
                error!("failed to open page: {}", e);
                shutdown(&mut browser, &handler_task, &profile_dir).await;
                Err(e.into())
            }
        }
    }
}

async fn shutdown(browser: &mut Browser, handler_task: &JoinHandle<()>, profile_dir: &Path) {
    if let Err(e) = browser.close().await {
        warn!("browser close failed: {}", e);
    }
    if let Err(e) = browser.wait().await {
        warn!("waiting for browser exit failed: {}", e);
    }
    handler_task.abort();
    if let Err(e) = std::fs::remove_dir_all(profile_dir) {
        debug!("profile dir {} not removed: {}", profile_dir.display(), e);
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        if !self.closed {
            warn!("browser session dropped without close, killing it");
            self.handler_task.abort();
            let _ = std::fs::remove_dir_all(&self.profile_dir);
        }
    }
}

#[async_trait]
impl AutomationSession for ChromeSession {
    async fn close(&mut self) {
        if self.closed {
            return;
        }
        info!("🧹 closing headless browser");
        shutdown(&mut self.browser, &self.handler_task, &self.profile_dir).await;
        self.closed = true;
    }
}

#[async_trait]
impl PageDriver for ChromeSession {
    async fn goto(&self, url: &str) -> AppResult<()> {
        debug!("navigating to {}", url);
        self.page.goto(url).await.map_err(|e| {
            error!("navigation to {} failed: {}", url, e);
            AppError::from(e)
        })?;
        Ok(())
    }

    async fn exists(&self, selector: &str) -> AppResult<bool> {
        Ok(self.page.find_element(selector).await.is_ok())
    }

    async fn click(&self, selector: &str) -> AppResult<()> {
        self.page.find_element(selector).await?.click().await?;
        Ok(())
    }

    async fn type_into(&self, selector: &str, text: &str) -> AppResult<()> {
        let element = self.page.find_element(selector).await?;
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn element_png(&self, selector: &str) -> AppResult<Vec<u8>> {
        let element = self.page.find_element(selector).await?;
        Ok(element.screenshot(CaptureScreenshotFormat::Png).await?)
    }

    async fn page_png(&self) -> AppResult<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        Ok(self.page.screenshot(params).await?)
    }

    async fn text_of(&self, selector: &str) -> AppResult<String> {
        let element = self.page.find_element(selector).await?;
        Ok(element.inner_text().await?.unwrap_or_default())
    }

    async fn eval(&self, js: &str) -> AppResult<JsonValue> {
        let result = self.page.evaluate(js).await?;
        result.into_value().map_err(AppError::browser)
    }
}
