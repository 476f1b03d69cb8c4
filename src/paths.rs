use std::path::PathBuf;

/// Platform-local application data directory. Falls back to the current
/// directory when the platform offers none.
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Root of the shared, time-partitioned log tree for an application.
/// Returns `{data_dir}/{app_name}-logs`.
pub fn log_root(app_name: &str) -> PathBuf {
    data_dir().join(format!("{}-logs", app_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_root_structure() {
        let root = log_root("myapp");
        assert!(root.ends_with("myapp-logs"));
        assert!(root.starts_with(data_dir()));
    }
}
