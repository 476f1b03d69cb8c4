use crate::config::{Config, SettingUpdate};

/// Message channel between the primary process and its satellites. The
/// host application owns the real channel (IPC, sockets, whatever it has)
/// and adapts it to this trait; the crate only decides what travels when.
///
/// Every send is fire-and-forget: delivery is assumed reliable and ordered
/// by the transport but is not acknowledged, and there is no retry.
pub trait SyncTransport: Send + Sync {
    /// Primary -> all satellites.
    fn broadcast(&self, update: &SettingUpdate);

    /// Satellite -> primary, which re-broadcasts the confirmed value.
    fn send_to_primary(&self, update: &SettingUpdate);

    /// One-shot startup reconciliation: a newly started satellite pulls
    /// the authoritative config once, absorbing any broadcast it missed.
    fn fetch_config(&self) -> Option<Config> {
        None
    }
}

/// Transport for single-process hosts and tests: every send vanishes.
pub struct NullTransport;

impl SyncTransport for NullTransport {
    fn broadcast(&self, _update: &SettingUpdate) {}
    fn send_to_primary(&self, _update: &SettingUpdate) {}
}

/// Crash-reporting collaborator. Serialized error messages are handed over
/// best-effort; implementations must not block or fail loudly.
pub trait CrashSink: Send + Sync {
    fn report(&self, message: &str);
}

/// Default sink: crash reports go nowhere.
pub struct NoopCrashSink;

impl CrashSink for NoopCrashSink {
    fn report(&self, _message: &str) {}
}
