pub mod headless;

pub use headless::{ChromeLauncher, ChromeSession};
