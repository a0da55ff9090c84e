use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// Program configuration
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// sqlx connection string for the record store
    pub database_url: String,
    /// Interface the web server binds to
    pub bind_host: String,
    /// Web server port
    pub port: u16,
    /// Landing page of the status-check site
    pub target_url: String,
    /// Explicit Chrome/Chromium binary; autodetected when unset
    pub chrome_executable: Option<String>,
    /// Headless window size
    pub window_width: u32,
    pub window_height: u32,
    /// Verbose (debug) logging for this crate
    pub verbose_logging: bool,
    pub timeouts: Timeouts,
    pub locators: Locators,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://db.sqlite".to_string(),
            bind_host: "0.0.0.0".to_string(),
            port: 5000,
            target_url: "https://dvprogram.state.gov/".to_string(),
            chrome_executable: None,
            window_width: 1200,
            window_height: 600,
            verbose_logging: false,
            timeouts: Timeouts::default(),
            locators: Locators::default(),
        }
    }
}

impl Config {
    /// Defaults overridden by environment variables
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Read a TOML config file; missing keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// `DV_CONFIG` file (if set), then environment overrides
    pub fn load() -> AppResult<Self> {
        let base = match std::env::var("DV_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        Ok(base.with_env())
    }

    fn with_env(self) -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").unwrap_or(self.database_url),
            bind_host: std::env::var("BIND_HOST").unwrap_or(self.bind_host),
            port: std::env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(self.port),
            target_url: std::env::var("TARGET_URL").unwrap_or(self.target_url),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().or(self.chrome_executable),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(self.verbose_logging),
            ..self
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

/// Wait bounds for the check cycle and the request handlers
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Per-step wait for a page element
    pub element_wait_secs: u64,
    /// Worker wait for the human CAPTCHA answer
    pub captcha_answer_secs: u64,
    /// Handler wait for the CAPTCHA image after starting a cycle
    pub captcha_prompt_secs: u64,
    /// Handler wait for the outcome after submitting an answer
    pub result_wait_secs: u64,
    /// Poll period of the polling coordinator
    pub poll_interval_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            element_wait_secs: 10,
            captcha_answer_secs: 60,
            captcha_prompt_secs: 25,
            result_wait_secs: 60,
            poll_interval_ms: 250,
        }
    }
}

impl Timeouts {
    pub fn element_wait(&self) -> Duration {
        Duration::from_secs(self.element_wait_secs)
    }

    pub fn captcha_answer(&self) -> Duration {
        Duration::from_secs(self.captcha_answer_secs)
    }

    pub fn captcha_prompt(&self) -> Duration {
        Duration::from_secs(self.captcha_prompt_secs)
    }

    pub fn result_wait(&self) -> Duration {
        Duration::from_secs(self.result_wait_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// CSS locators of the status-check page flow
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Locators {
    pub check_status: String,
    pub continue_link: String,
    pub confirmation: String,
    pub lastname: String,
    pub birth_year: String,
    pub captcha_input: String,
    pub captcha_image: String,
    pub submit: String,
    /// Element that appears once the site has rendered an outcome
    pub result: String,
}

impl Default for Locators {
    fn default() -> Self {
        Self {
            check_status: "#maincontent > div:nth-child(3) > div > div > div.panel-body.p5555 > \
                           div.col-xs-12.col-sm-12.text-center > div > p:nth-child(2) > a"
                .to_string(),
            continue_link: "#main > div:nth-child(2) > div > p.text-center > a".to_string(),
            confirmation: "#txtCN".to_string(),
            lastname: "#txtLastName".to_string(),
            birth_year: "#txtYOB".to_string(),
            captcha_input: "#txtCodeInput".to_string(),
            captcha_image: "#c_checkstatus_uccaptcha30_CaptchaImage".to_string(),
            submit: "#btnCSubmit".to_string(),
            result: "#main".to_string(),
        }
    }
}
