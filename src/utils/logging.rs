//! Logging utilities
//!
//! Subscriber setup plus the startup banner

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Install the global subscriber
///
/// `RUST_LOG` wins when set; otherwise `info`, with this crate at `debug`
/// when `verbose` is on. Safe to call more than once (tests do).
pub fn init(verbose: bool) {
    let default_filter = if verbose {
        "info,dv_status_check=debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Log the effective configuration at startup
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 DV status checker starting");
    info!("🗄️ database: {}", config.database_url);
    info!("🌐 target: {}", config.target_url);
    info!(
        "⏱️ waits: element {}s, CAPTCHA answer {}s, prompt {}s, result {}s, poll {}ms",
        config.timeouts.element_wait_secs,
        config.timeouts.captcha_answer_secs,
        config.timeouts.captcha_prompt_secs,
        config.timeouts.result_wait_secs,
        config.timeouts.poll_interval_ms
    );
    info!("{}", "=".repeat(60));
}

/// Shorten long text for log lines
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
