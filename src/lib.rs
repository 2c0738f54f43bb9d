pub mod cli;
pub mod config;
pub mod cookies;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod logging;
pub mod monitor;
pub mod opener;
pub mod snapshot;

pub use config::Config;
pub use error::MonitorError;
pub use monitor::Monitor;
pub use snapshot::{ItemId, Snapshot};
