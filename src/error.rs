use thiserror::Error;

/// Errors surfaced by administrative operations (archive creation and
/// deletion, opening the log directory). The logging path itself never
/// returns these; it degrades to a silent no-op instead.
#[derive(Error, Debug)]
pub enum LogError {
    #[error("Failed to access log storage: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to build log archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Logging subsystem is no longer running")]
    Shutdown,
}
