pub mod poller;
pub mod snapshot;

pub use poller::Poller;
