//! Scripted stand-in for the status-check site

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dv_status_check::config::{Config, Locators, Timeouts};
use dv_status_check::infrastructure::{AutomationSession, PageDriver, SessionLauncher};
use dv_status_check::store::{init_memory_pool, run_migrations};
use dv_status_check::{AppError, AppResult, CheckCoordinator, NewApplicant, StatusStore};
use serde_json::{json, Value as JsonValue};

pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDRfake-pixels";

pub const NOT_SELECTED: &str =
    "Based on the information provided, the entry HAS NOT BEEN SELECTED for further processing";
pub const SELECTED: &str = "You have been randomly selected for further processing";

/// How the fake site behaves for the next launched session
#[derive(Debug, Clone)]
pub struct SiteScript {
    pub result_text: String,
    /// Selector that never appears
    pub missing: Option<String>,
    /// Selector whose click panics
    pub panic_on: Option<String>,
    pub fail_launch: bool,
}

impl Default for SiteScript {
    fn default() -> Self {
        Self {
            result_text: NOT_SELECTED.to_string(),
            missing: None,
            panic_on: None,
            fail_launch: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct SiteLog {
    pub typed: Vec<(String, String)>,
    pub clicks: Vec<String>,
    pub scripts: Vec<String>,
    pub visited: Vec<String>,
}

struct Shared {
    locators: Locators,
    script: Mutex<SiteScript>,
    launched: AtomicUsize,
    closed: AtomicUsize,
    dropped: AtomicUsize,
    log: Mutex<SiteLog>,
}

#[derive(Clone)]
pub struct FakeLauncher {
    shared: Arc<Shared>,
}

impl FakeLauncher {
    pub fn new(locators: Locators) -> Self {
        Self {
            shared: Arc::new(Shared {
                locators,
                script: Mutex::new(SiteScript::default()),
                launched: AtomicUsize::new(0),
                closed: AtomicUsize::new(0),
                dropped: AtomicUsize::new(0),
                log: Mutex::new(SiteLog::default()),
            }),
        }
    }

    pub fn set_script(&self, script: SiteScript) {
        *self.shared.script.lock().unwrap() = script;
    }

    pub fn launched(&self) -> usize {
        self.shared.launched.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Sessions released, closed or not
    pub fn dropped(&self) -> usize {
        self.shared.dropped.load(Ordering::SeqCst)
    }

    /// Last text typed into `selector`
    pub fn typed_into(&self, selector: &str) -> Option<String> {
        let log = self.shared.log.lock().unwrap();
        log.typed
            .iter()
            .rev()
            .find(|(s, _)| s == selector)
            .map(|(_, text)| text.clone())
    }

    pub fn scripts(&self) -> Vec<String> {
        self.shared.log.lock().unwrap().scripts.clone()
    }

    pub fn visited(&self) -> Vec<String> {
        self.shared.log.lock().unwrap().visited.clone()
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn launch(&self) -> AppResult<Box<dyn AutomationSession>> {
        let script = self.shared.script.lock().unwrap().clone();
        if script.fail_launch {
            return Err(AppError::browser("chrome not installed"));
        }
        self.shared.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            shared: Arc::clone(&self.shared),
            script,
            stage: Mutex::new(Stage::Blank),
            closed: false,
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Blank,
    Landing,
    Welcome,
    Form,
    Result,
}

struct FakeSession {
    shared: Arc<Shared>,
    script: SiteScript,
    stage: Mutex<Stage>,
    closed: bool,
}

impl FakeSession {
    fn stage(&self) -> Stage {
        *self.stage.lock().unwrap()
    }

    fn present(&self, selector: &str) -> bool {
        if self.script.missing.as_deref() == Some(selector) {
            return false;
        }
        let l = &self.shared.locators;
        match self.stage() {
            Stage::Blank => false,
            Stage::Landing => selector == l.check_status,
            Stage::Welcome => selector == l.continue_link,
            Stage::Form => [
                &l.confirmation,
                &l.lastname,
                &l.birth_year,
                &l.captcha_input,
                &l.captcha_image,
                &l.submit,
                &l.result,
            ]
            .iter()
            .any(|s| s.as_str() == selector),
            Stage::Result => selector == l.result,
        }
    }

    fn require(&self, selector: &str) -> AppResult<()> {
        if self.present(selector) {
            Ok(())
        } else {
            Err(AppError::browser(format!("no element matches {}", selector)))
        }
    }
}

#[async_trait]
impl PageDriver for FakeSession {
    async fn goto(&self, url: &str) -> AppResult<()> {
        self.shared.log.lock().unwrap().visited.push(url.to_string());
        *self.stage.lock().unwrap() = Stage::Landing;
        Ok(())
    }

    async fn exists(&self, selector: &str) -> AppResult<bool> {
        Ok(self.present(selector))
    }

    async fn click(&self, selector: &str) -> AppResult<()> {
        self.require(selector)?;
        if self.script.panic_on.as_deref() == Some(selector) {
            panic!("fake site crashed on {}", selector);
        }
        self.shared.log.lock().unwrap().clicks.push(selector.to_string());
        let l = &self.shared.locators;
        let next = if selector == l.check_status {
            Stage::Welcome
        } else if selector == l.continue_link {
            Stage::Form
        } else if selector == l.submit {
            Stage::Result
        } else {
            self.stage()
        };
        *self.stage.lock().unwrap() = next;
        Ok(())
    }

    async fn type_into(&self, selector: &str, text: &str) -> AppResult<()> {
        self.require(selector)?;
        self.shared
            .log
            .lock()
            .unwrap()
            .typed
            .push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn element_png(&self, selector: &str) -> AppResult<Vec<u8>> {
        self.require(selector)?;
        Ok(PNG.to_vec())
    }

    async fn page_png(&self) -> AppResult<Vec<u8>> {
        Ok(PNG.to_vec())
    }

    async fn text_of(&self, selector: &str) -> AppResult<String> {
        self.require(selector)?;
        Ok(match self.stage() {
            Stage::Result => self.script.result_text.clone(),
            _ => "Entrant Status Check".to_string(),
        })
    }

    async fn eval(&self, js: &str) -> AppResult<JsonValue> {
        self.shared.log.lock().unwrap().scripts.push(js.to_string());
        Ok(json!(true))
    }
}

#[async_trait]
impl AutomationSession for FakeSession {
    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.shared.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        self.shared.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

/// Short waits so failing paths finish quickly
pub fn test_config() -> Config {
    Config {
        target_url: "https://dv.test/".to_string(),
        timeouts: Timeouts {
            element_wait_secs: 1,
            captcha_answer_secs: 3,
            captcha_prompt_secs: 3,
            result_wait_secs: 5,
            poll_interval_ms: 20,
        },
        ..Config::default()
    }
}

pub async fn memory_store() -> StatusStore {
    let pool = init_memory_pool().await.unwrap();
    run_migrations(&pool).await.unwrap();
    StatusStore::new(pool)
}

pub fn doe() -> NewApplicant {
    NewApplicant {
        lastname: "Doe".to_string(),
        confirmation_number: "2024012345678".to_string(),
        birth_year: "1990".to_string(),
    }
}

pub struct Harness {
    pub config: Config,
    pub store: StatusStore,
    pub launcher: FakeLauncher,
    pub coordinator: CheckCoordinator,
}

pub async fn harness(config: Config) -> Harness {
    let store = memory_store().await;
    let launcher = FakeLauncher::new(config.locators.clone());
    let coordinator = CheckCoordinator::new(&config, store.clone(), Arc::new(launcher.clone()));
    Harness {
        config,
        store,
        launcher,
        coordinator,
    }
}
