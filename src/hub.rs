use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex, Weak};

use chrono::Utc;
use serde_json::json;
use tracing::debug;

use crate::archive;
use crate::config::{
    Config, ConfigStore, Setting, SettingUpdate, MAX_RETENTION_DAYS, MIN_RETENTION_DAYS,
};
use crate::error::LogError;
use crate::instance::{self, LogInstance, LoggerOptions, Role};
use crate::paths;
use crate::retention;
use crate::session::{self, Session};
use crate::transport::{CrashSink, NoopCrashSink, NullTransport, SyncTransport};
use crate::writer::LogWriter;

type SessionCallback = Box<dyn Fn(&Session, &Session) + Send + Sync>;

/// Construction options for `LogHub::new`.
pub struct HubOptions {
    pub app_name: String,
    /// Process role: `Primary` or `Satellite`. `EmbeddedView` is an
    /// instance-level role and is treated as `Satellite` here.
    pub role: Role,
    pub transport: Arc<dyn SyncTransport>,
    pub crash: Arc<dyn CrashSink>,
    /// Override the platform log root; tests point this at a temp dir.
    pub root: Option<PathBuf>,
}

impl HubOptions {
    pub fn new(app_name: impl Into<String>, role: Role) -> Self {
        Self {
            app_name: app_name.into(),
            role,
            transport: Arc::new(NullTransport),
            crash: Arc::new(NoopCrashSink),
            root: None,
        }
    }

    pub fn transport(mut self, transport: Arc<dyn SyncTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn crash_sink(mut self, crash: Arc<dyn CrashSink>) -> Self {
        self.crash = crash;
        self
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }
}

/// Per-process heart of the logging subsystem: owns the config replica,
/// the instance registry and the writer thread, and routes setting updates
/// between local callers and the transport. One per process.
pub struct LogHub {
    role: Role,
    root: PathBuf,
    config: ConfigStore,
    transport: Arc<dyn SyncTransport>,
    crash: Arc<dyn CrashSink>,
    writer: LogWriter,
    /// Deduplication map for non-webview instances, keyed by file stem.
    registry: Mutex<HashMap<String, Arc<LogInstance>>>,
    /// Every live instance, webviews included, for session rebinding.
    instances: Mutex<Vec<Weak<LogInstance>>>,
    session_callbacks: Mutex<Vec<SessionCallback>>,
}

impl LogHub {
    pub fn new(options: HubOptions) -> Arc<LogHub> {
        let root = options
            .root
            .unwrap_or_else(|| paths::log_root(&options.app_name));
        // Satellites reconcile against the authoritative copy once at
        // startup; a broadcast missed before this point is absorbed here.
        let config = match options.role {
            Role::Primary => Config::default(),
            _ => options.transport.fetch_config().unwrap_or_default(),
        };
        Arc::new(LogHub {
            role: options.role,
            root,
            config: ConfigStore::new(config),
            transport: options.transport,
            crash: options.crash,
            writer: LogWriter::spawn(),
            registry: Mutex::new(HashMap::new()),
            instances: Mutex::new(Vec::new()),
            session_callbacks: Mutex::new(Vec::new()),
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn logs_directory(&self) -> &Path {
        &self.root
    }

    pub(crate) fn crash(&self) -> &dyn CrashSink {
        self.crash.as_ref()
    }

    pub(crate) fn writer(&self) -> &LogWriter {
        &self.writer
    }

    pub(crate) fn partition_path(&self, session: &Session) -> PathBuf {
        self.root.join(&session.id)
    }

    fn is_primary(&self) -> bool {
        self.role == Role::Primary
    }

    /// Look up or create the instance for these options. Non-webview
    /// instances are singletons per file stem and live until process exit;
    /// webview instances always construct fresh. Every fresh construction
    /// kicks off a retention pass whose handle is dropped on purpose
    /// (fire-and-forget, result ignored).
    pub fn logger(self: &Arc<Self>, options: LoggerOptions) -> Arc<LogInstance> {
        let role = if options.webview {
            Role::EmbeddedView
        } else {
            options.role.unwrap_or(self.role)
        };
        let stem = instance::file_stem(role, options.file_name.as_deref());

        if role == Role::EmbeddedView {
            let _ = retention::spawn_prune(self.root.clone(), self.config.get().retention_days);
            let instance = Arc::new(LogInstance::new(
                role,
                stem,
                self.config.session(),
                Arc::downgrade(self),
            ));
            self.instances.lock().unwrap().push(Arc::downgrade(&instance));
            return instance;
        }

        // The registry lock is held across creation so two concurrent
        // constructions with the same name cannot both build an instance.
        let mut registry = self.registry.lock().unwrap();
        if let Some(existing) = registry.get(&stem) {
            return existing.clone();
        }
        let _ = retention::spawn_prune(self.root.clone(), self.config.get().retention_days);
        let instance = Arc::new(LogInstance::new(
            role,
            stem.clone(),
            self.config.session(),
            Arc::downgrade(self),
        ));
        self.instances.lock().unwrap().push(Arc::downgrade(&instance));
        registry.insert(stem, instance.clone());
        instance
    }

    /// Lazy staleness check, evaluated on log calls from primary-role
    /// instances. Minting routes through `apply_update` so the rebind,
    /// callbacks and broadcast all happen on the same path a received
    /// update takes.
    pub(crate) fn rotate_if_stale(&self) {
        let now = Utc::now();
        if !session::is_stale(&self.config.session(), now) {
            return;
        }
        let next = session::mint(now);
        let Ok(value) = serde_json::to_value(&next) else {
            return;
        };
        self.apply_update(SettingUpdate::new(Setting::Session, value, true));
    }

    /// Single entry point for settings changes, local or delivered by the
    /// transport. Unknown names are ignored, invalid values decline
    /// silently, and session changes rebind every live instance before
    /// anything is propagated.
    pub fn apply_update(&self, update: SettingUpdate) {
        let Some(setting) = Setting::parse(&update.name) else {
            debug!("ignoring unknown logger setting {:?}", update.name);
            return;
        };
        let Some(applied) = self.config.apply(setting, &update.value) else {
            return;
        };
        if let Some((old, new)) = applied.session_change {
            self.rebind_all(&new);
            self.notify_session_change(&new, &old);
        }
        if update.push {
            if self.is_primary() {
                // Fan out with `push` cleared so satellites apply without
                // sending the update back.
                let mut fan_out = update;
                fan_out.push = false;
                self.transport.broadcast(&fan_out);
            } else {
                // The local value is provisional until the primary's
                // re-broadcast confirms it.
                self.transport.send_to_primary(&update);
            }
        }
    }

    fn rebind_all(&self, session: &Session) {
        let mut instances = self.instances.lock().unwrap();
        instances.retain(|weak| match weak.upgrade() {
            Some(instance) => {
                instance.rebind(session.clone());
                true
            }
            None => false,
        });
    }

    fn notify_session_change(&self, new: &Session, old: &Session) {
        for callback in self.session_callbacks.lock().unwrap().iter() {
            callback(new, old);
        }
    }

    /// Register a callback fired with `(new, old)` whenever the current
    /// session changes, locally minted or received over the transport.
    pub fn on_new_session<F>(&self, callback: F)
    where
        F: Fn(&Session, &Session) + Send + Sync + 'static,
    {
        self.session_callbacks.lock().unwrap().push(Box::new(callback));
    }

    pub fn enable_logging(&self) {
        self.apply_update(SettingUpdate::new(Setting::FileLogging, json!(true), true));
    }

    pub fn disable_logging(&self) {
        self.apply_update(SettingUpdate::new(Setting::FileLogging, json!(false), true));
    }

    /// Returns false (and changes nothing) outside the accepted window.
    pub fn set_log_expiry(&self, days: u32) -> bool {
        if !(MIN_RETENTION_DAYS..=MAX_RETENTION_DAYS).contains(&days) {
            return false;
        }
        self.apply_update(SettingUpdate::new(Setting::LogsExpiry, json!(days), true));
        true
    }

    /// Delete expired partitions now and report what happened.
    pub fn prune_old_logs(&self) -> String {
        retention::prune(&self.root, self.config.get().retention_days)
    }

    /// Bundle all live partitions; the caller owns (and deletes) the
    /// returned zip.
    pub fn log_archive(&self) -> Result<PathBuf, LogError> {
        archive::create(&self.root, self.config.get().retention_days)
    }

    /// Archive an arbitrary directory under a caller-chosen bundle name.
    pub fn create_archive(&self, dir: &Path, zip_name: &str) -> Result<PathBuf, LogError> {
        archive::create_named(dir, self.config.get().retention_days, zip_name)
    }

    pub fn clear_log_archive(&self, path: &Path) -> Result<(), LogError> {
        archive::clear(path)
    }

    /// Drain the writer queue to disk. There is no close API; hosts that
    /// care call this before exiting.
    pub fn flush(&self) {
        self.writer.flush();
    }

    /// Reveal the log root in the platform file manager.
    pub fn open_logs_directory(&self) -> Result<(), LogError> {
        let opener = if cfg!(target_os = "macos") {
            "open"
        } else if cfg!(target_os = "windows") {
            "explorer"
        } else {
            "xdg-open"
        };
        Command::new(opener).arg(&self.root).spawn()?;
        Ok(())
    }
}
