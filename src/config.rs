use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::{self, Session};

pub const DEFAULT_RETENTION_DAYS: u32 = 7;
pub const MIN_RETENTION_DAYS: u32 = 1;
pub const MAX_RETENTION_DAYS: u32 = 30;

/// Live logging policy. Exactly one authoritative copy exists in the
/// primary process; every satellite holds a replica that converges after a
/// broadcast round-trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub file_logging: bool,
    pub retention_days: u32,
    pub session: Session,
    pub crash_reporting: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file_logging: true,
            retention_days: DEFAULT_RETENTION_DAYS,
            session: session::mint(Utc::now()),
            crash_reporting: true,
        }
    }
}

/// The four recognized settings and their wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    FileLogging,
    LogsExpiry,
    Session,
    EnableBugsnag,
}

impl Setting {
    /// Unknown names map to `None` and are ignored by the caller; the
    /// update protocol stays permissive about fields it does not recognize.
    pub fn parse(name: &str) -> Option<Setting> {
        match name {
            "FILE_LOGGING" => Some(Setting::FileLogging),
            "LOGS_EXPIRY" => Some(Setting::LogsExpiry),
            "SESSION" => Some(Setting::Session),
            "ENABLE_BUGSNAG" => Some(Setting::EnableBugsnag),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Setting::FileLogging => "FILE_LOGGING",
            Setting::LogsExpiry => "LOGS_EXPIRY",
            Setting::Session => "SESSION",
            Setting::EnableBugsnag => "ENABLE_BUGSNAG",
        }
    }
}

/// One `updateSettings` message as it travels over the transport. `push`
/// asks the receiving side to propagate the change further: satellites
/// forward pushed updates to the primary, the primary fans them out with
/// `push` cleared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingUpdate {
    pub name: String,
    pub value: Value,
    #[serde(default)]
    pub push: bool,
}

impl SettingUpdate {
    pub fn new(setting: Setting, value: Value, push: bool) -> Self {
        Self {
            name: setting.name().to_string(),
            value,
            push,
        }
    }
}

/// Outcome of a successful `ConfigStore::apply`.
pub struct Applied {
    pub setting: Setting,
    /// `(old, new)` when the current session changed; the hub uses this to
    /// rebind live instances and fire session callbacks.
    pub session_change: Option<(Session, Session)>,
}

/// Process-local copy of the logging policy. One per process, owned by the
/// hub and shared by reference with every instance.
pub struct ConfigStore {
    inner: Mutex<Config>,
}

impl ConfigStore {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Mutex::new(config),
        }
    }

    /// Snapshot of the current replica.
    pub fn get(&self) -> Config {
        self.inner.lock().unwrap().clone()
    }

    pub fn session(&self) -> Session {
        self.inner.lock().unwrap().session.clone()
    }

    /// Validate and apply a single field. Returns `None` without touching
    /// any state when the value is out of range or of the wrong shape.
    pub fn apply(&self, setting: Setting, value: &Value) -> Option<Applied> {
        let mut config = self.inner.lock().unwrap();
        match setting {
            Setting::FileLogging => {
                config.file_logging = value.as_bool()?;
            }
            Setting::EnableBugsnag => {
                config.crash_reporting = value.as_bool()?;
            }
            Setting::LogsExpiry => {
                let days = u32::try_from(value.as_u64()?).ok()?;
                if !(MIN_RETENTION_DAYS..=MAX_RETENTION_DAYS).contains(&days) {
                    return None;
                }
                config.retention_days = days;
            }
            Setting::Session => {
                let next: Session = serde_json::from_value(value.clone()).ok()?;
                let prev = std::mem::replace(&mut config.session, next.clone());
                if prev.id != next.id {
                    return Some(Applied {
                        setting,
                        session_change: Some((prev, next)),
                    });
                }
            }
        }
        Some(Applied {
            setting,
            session_change: None,
        })
    }
}
