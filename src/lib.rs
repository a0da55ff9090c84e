//! # DV Status Check
//!
//! Checks Diversity Visa entrant status with a headless browser, pausing
//! mid-flow so a human can solve the CAPTCHA.
//!
//! ## Architecture
//!
//! ### ① Infrastructure
//! - `infrastructure/` - `PageDriver` / `AutomationSession` / `SessionLauncher`
//! - `browser/` - headless Chrome behind those traits, one per check cycle
//! - `store/` - SQLite record store plus per-record wake-up signals
//!
//! ### ② Services
//! - `Poller` - bounded wait for record fields (the rendezvous)
//! - `snapshot` - screenshot caption and image checks
//!
//! ### ③ Workflow
//! - `CheckCtx` - which applicant is being checked
//! - `CheckFlow` - landing → form → CAPTCHA handoff → submit → outcome
//!
//! ### ④ Orchestration
//! - `CheckWorker` - background cycle, session lifetime and cleanup
//! - `CheckCoordinator` - start-cycle and submit-answer triggers
//!
//! ### ⑤ Web
//! - `web/` - axum routes over the coordinator and the store

pub mod app;
pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod store;
pub mod utils;
pub mod web;
pub mod workflow;

// re-exports
pub use app::App;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{CheckOutcome, NewApplicant, RecordField, StatusRecord};
pub use orchestrator::CheckCoordinator;
pub use store::StatusStore;
pub use workflow::{CheckCtx, CheckFlow};
