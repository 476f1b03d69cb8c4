//! Session-partitioned logging for multi-process desktop applications.
//!
//! One primary process and any number of satellite processes (including
//! embedded web content) write to a shared, time-partitioned log
//! directory. The primary holds the authoritative logging policy and
//! broadcasts changes over an injected transport; satellites hold replicas
//! and forward their own changes for confirmation. Partitions rotate on a
//! fixed hourly interval, expired ones are pruned against a configurable
//! retention window, and the live ones can be bundled into a zip on
//! demand.
//!
//! ```no_run
//! use hublog::{HubOptions, LogHub, LoggerOptions, Role};
//!
//! let hub = LogHub::new(HubOptions::new("myapp", Role::Primary));
//! hublog::init(hub.clone());
//!
//! let log = hub.logger(LoggerOptions::default());
//! hublog::log_values!(log, info, "starting up", 42);
//! ```

mod archive;
mod config;
mod error;
mod hub;
mod instance;
mod paths;
mod retention;
mod session;
mod transport;
mod writer;

use std::sync::Arc;

use once_cell::sync::OnceCell;

pub use config::{
    Applied, Config, ConfigStore, Setting, SettingUpdate, DEFAULT_RETENTION_DAYS,
    MAX_RETENTION_DAYS, MIN_RETENTION_DAYS,
};
pub use error::LogError;
pub use hub::{HubOptions, LogHub};
pub use instance::{Level, LogInstance, LoggerOptions, Role};
pub use session::{Session, ROTATION_INTERVAL_SECS};
pub use transport::{CrashSink, NoopCrashSink, NullTransport, SyncTransport};

/// Process-wide installed hub. Optional: hosts that prefer explicit
/// injection can pass the hub around and never touch this.
static HUB: OnceCell<Arc<LogHub>> = OnceCell::new();

/// Install the process-wide hub. Call once during app setup, before any
/// code reaches for `hublog::logger`.
pub fn init(hub: Arc<LogHub>) {
    if HUB.set(hub).is_err() {
        panic!("hublog::init called more than once");
    }
}

/// The installed hub, if `init` has run.
pub fn try_hub() -> Option<Arc<LogHub>> {
    HUB.get().cloned()
}

/// Convenience over the installed hub; `None` before `init`.
pub fn logger(options: LoggerOptions) -> Option<Arc<LogInstance>> {
    try_hub().map(|hub| hub.logger(options))
}

/// Variadic convenience over a `LogInstance`:
/// `log_values!(log, warn, "slow request", elapsed_ms);`
#[macro_export]
macro_rules! log_values {
    ($logger:expr, $level:ident, $($value:expr),+ $(,)?) => {
        $logger.$level(&[$(&$value as &dyn ::std::fmt::Debug),+])
    };
}
