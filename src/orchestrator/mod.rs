//! Orchestration layer
//!
//! ## Responsibilities
//!
//! Starts check cycles and owns everything a cycle must hand back.
//!
//! ### `coordinator` - the web-facing triggers
//! - start a cycle: reset the record, claim the in-flight slot, spawn the worker
//! - wait (bounded) for the CAPTCHA image
//! - store the human's answer, wait (bounded) for the outcome
//!
//! ### `cycle` - the background worker
//! - launches one automation session per cycle
//! - runs `workflow::CheckFlow` against it
//! - closes the session and clears the exchange fields on every exit path
//!
//! ## Layering
//!
//! ```text
//! web (handlers)
//!     ↓
//! orchestrator (CheckCoordinator → CheckWorker)
//!     ↓
//! workflow::CheckFlow (one applicant, one cycle)
//!     ↓
//! services (Poller / snapshot)  +  store (StatusStore)
//!     ↓
//! infrastructure (PageDriver) ← browser (ChromeSession)
//! ```

pub mod coordinator;
pub mod cycle;

pub use coordinator::CheckCoordinator;
pub use cycle::{CheckWorker, CycleGuard, CycleRegistry};
