use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};

use chrono::{SecondsFormat, Utc};

use crate::error::LogError;
use crate::hub::LogHub;
use crate::session::Session;
use crate::writer::LogRecord;

/// Which kind of process (or content) an instance writes for. The process
/// role is fixed at hub construction; `EmbeddedView` is per-instance and
/// marks hosted web content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Primary,
    Satellite,
    EmbeddedView,
}

impl Role {
    /// File-stem prefix for this role's partition files.
    pub(crate) fn label(self) -> &'static str {
        match self {
            Role::Primary => "main",
            Role::Satellite => "renderer",
            Role::EmbeddedView => "webview",
        }
    }
}

/// Severity of a single log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub(crate) fn tag(self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

/// Construction options for `LogHub::logger`. With everything defaulted
/// the instance takes the hub's role and the role's default file name.
#[derive(Debug, Clone, Default)]
pub struct LoggerOptions {
    /// Custom name; for webviews this is the page URL or domain.
    pub file_name: Option<String>,
    /// Embedded web content: never deduplicated, never echoes to console,
    /// never reaches the crash sink.
    pub webview: bool,
    /// Explicit role override; defaults to the hub's process role.
    pub role: Option<Role>,
}

impl LoggerOptions {
    pub fn named(file_name: impl Into<String>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            ..Self::default()
        }
    }

    pub fn webview(file_name: impl Into<String>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            webview: true,
            role: None,
        }
    }
}

/// One logical log source. Owns its sink binding: the bound session names
/// the partition directory its lines land in, and rotation re-points it.
pub struct LogInstance {
    role: Role,
    file_stem: String,
    bound: Mutex<Session>,
    hub: Weak<LogHub>,
}

impl LogInstance {
    pub(crate) fn new(role: Role, file_stem: String, session: Session, hub: Weak<LogHub>) -> Self {
        Self {
            role,
            file_stem,
            bound: Mutex::new(session),
            hub,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Identity key; also the partition file stem.
    pub fn file_stem(&self) -> &str {
        &self.file_stem
    }

    pub fn bound_session(&self) -> Session {
        self.bound.lock().unwrap().clone()
    }

    /// Re-point the sink at a new partition. Lines already issued keep the
    /// path they resolved; lines issued after land in the new partition.
    pub(crate) fn rebind(&self, session: Session) {
        *self.bound.lock().unwrap() = session;
    }

    pub fn debug(&self, values: &[&dyn Debug]) {
        self.write(Level::Debug, values);
    }

    /// Alias for `info`, kept from the original surface.
    pub fn log(&self, values: &[&dyn Debug]) {
        self.write(Level::Info, values);
    }

    pub fn info(&self, values: &[&dyn Debug]) {
        self.write(Level::Info, values);
    }

    pub fn warn(&self, values: &[&dyn Debug]) {
        self.write(Level::Warn, values);
    }

    /// Like the other levels, plus a best-effort crash report unless the
    /// instance is an embedded view.
    pub fn error(&self, values: &[&dyn Debug]) {
        self.write(Level::Error, values);
    }

    /// The whole logging path is non-throwing: with the hub gone or file
    /// logging disabled this is a no-op, and downstream I/O failures stay
    /// inside the writer.
    fn write(&self, level: Level, values: &[&dyn Debug]) {
        let Some(hub) = self.hub.upgrade() else { return };
        let config = hub.config().get();
        if !config.file_logging {
            return;
        }
        // Satellites never decide staleness on their own; they wait for
        // the primary's broadcast.
        if self.role == Role::Primary {
            hub.rotate_if_stale();
        }

        let message = render_values(values);
        if level == Level::Error && self.role != Role::EmbeddedView && config.crash_reporting {
            hub.crash().report(&message);
        }

        let session = self.bound.lock().unwrap().clone();
        let path = hub
            .partition_path(&session)
            .join(format!("{}.log", self.file_stem));
        let line = format!(
            "{}::{}::{}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level.tag(),
            message
        );
        hub.writer().append(LogRecord {
            path,
            line,
            console: self.role != Role::EmbeddedView,
        });
    }

    fn hub(&self) -> Result<Arc<LogHub>, LogError> {
        self.hub.upgrade().ok_or(LogError::Shutdown)
    }

    // The administrative surface delegates to the hub, so application code
    // holding only an instance can reach it.

    pub fn prune_old_logs(&self) -> String {
        match self.hub.upgrade() {
            Some(hub) => hub.prune_old_logs(),
            None => String::from("logging subsystem is shut down"),
        }
    }

    pub fn log_archive(&self) -> Result<PathBuf, LogError> {
        self.hub()?.log_archive()
    }

    pub fn clear_log_archive(&self, path: &Path) -> Result<(), LogError> {
        self.hub()?.clear_log_archive(path)
    }

    pub fn enable_logging(&self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.enable_logging();
        }
    }

    pub fn disable_logging(&self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.disable_logging();
        }
    }

    pub fn set_log_expiry(&self, days: u32) -> bool {
        self.hub.upgrade().is_some_and(|hub| hub.set_log_expiry(days))
    }

    pub fn on_new_session<F>(&self, callback: F)
    where
        F: Fn(&Session, &Session) + Send + Sync + 'static,
    {
        if let Some(hub) = self.hub.upgrade() {
            hub.on_new_session(callback);
        }
    }

    pub fn logs_directory(&self) -> Result<PathBuf, LogError> {
        Ok(self.hub()?.logs_directory().to_path_buf())
    }

    pub fn open_logs_directory(&self) -> Result<(), LogError> {
        self.hub()?.open_logs_directory()
    }
}

/// Deep-format every value and join them into the single message the
/// variadic level methods log.
fn render_values(values: &[&dyn Debug]) -> String {
    values
        .iter()
        .map(|value| format!("{:?}", value))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compute the identity key and partition file stem for a would-be
/// instance. Webview names reduce to their domain; everything else hangs
/// off the role label.
pub(crate) fn file_stem(role: Role, file_name: Option<&str>) -> String {
    match role {
        Role::EmbeddedView => {
            let domain = file_name
                .map(parse_domain)
                .map(sanitize)
                .filter(|name| !name.is_empty());
            domain.unwrap_or_else(random_id)
        }
        _ => match file_name {
            Some(name) => {
                let name = sanitize(name);
                if name.is_empty() {
                    role.label().to_string()
                } else {
                    format!("{}-{}", role.label(), name)
                }
            }
            None => role.label().to_string(),
        },
    }
}

/// Reduce a webview URL to its host: `https://app.example.com/page` ->
/// `app.example.com`. Non-URLs pass through unchanged.
fn parse_domain(url: &str) -> &str {
    let rest = match url.find("//") {
        Some(i) => &url[i + 2..],
        None => url,
    };
    match rest.find('/') {
        Some(i) => &rest[..i],
        None => rest,
    }
}

/// Keep names usable as file stems on every platform.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}

fn random_id() -> String {
    format!("{:08x}", rand::random::<u32>())
}
