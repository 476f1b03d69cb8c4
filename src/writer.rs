use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

const BUFFER_CAPACITY: usize = 32;
const FLUSH_INTERVAL_MS: u64 = 100;

/// One formatted line headed for a partition file. The target path is
/// resolved at call time, so a rotation concurrent with an append sends
/// the line to whichever partition was bound when the call was issued.
pub(crate) struct LogRecord {
    pub path: PathBuf,
    pub line: String,
    /// Echo to the console sink as well (suppressed for embedded views).
    pub console: bool,
}

enum Command {
    Append(LogRecord),
    Flush(Sender<()>),
}

/// Buffered append-only writer. A single thread per process drains the
/// channel, which also serializes appends and preserves per-instance line
/// order. Sends are fire-and-forget; filesystem failures are reported on
/// stderr and swallowed.
pub(crate) struct LogWriter {
    tx: Sender<Command>,
}

impl LogWriter {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            writer_loop(rx);
        });

        Self { tx }
    }

    pub fn append(&self, record: LogRecord) {
        let _ = self.tx.send(Command::Append(record));
    }

    /// Block until every record queued before this call is on disk.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = mpsc::channel();
        if self.tx.send(Command::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }
}

fn writer_loop(rx: Receiver<Command>) {
    let mut buffer: Vec<LogRecord> = Vec::with_capacity(BUFFER_CAPACITY);
    let timeout = Duration::from_millis(FLUSH_INTERVAL_MS);

    loop {
        match rx.recv_timeout(timeout) {
            Ok(Command::Append(record)) => {
                buffer.push(record);
                if buffer.len() >= BUFFER_CAPACITY {
                    flush_buffer(&mut buffer);
                }
            }
            Ok(Command::Flush(ack)) => {
                flush_buffer(&mut buffer);
                let _ = ack.send(());
            }
            Err(RecvTimeoutError::Timeout) => {
                if !buffer.is_empty() {
                    flush_buffer(&mut buffer);
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                flush_buffer(&mut buffer);
                break;
            }
        }
    }
}

fn flush_buffer(buffer: &mut Vec<LogRecord>) {
    let mut files: HashMap<PathBuf, BufWriter<File>> = HashMap::new();

    for record in buffer.drain(..) {
        if record.console {
            println!("{}", record.line);
        }
        let writer = match files.entry(record.path.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => match open_append(entry.key()) {
                Ok(file) => entry.insert(BufWriter::new(file)),
                Err(e) => {
                    eprintln!("Failed to open log file {:?}: {}", record.path, e);
                    continue;
                }
            },
        };
        if let Err(e) = writeln!(writer, "{}", record.line) {
            eprintln!("Failed to write log file {:?}: {}", record.path, e);
        }
    }

    for (path, mut writer) in files {
        if let Err(e) = writer.flush() {
            eprintln!("Failed to flush log file {:?}: {}", path, e);
        }
    }
}

/// Partition directories come into existence on first write, not up front.
fn open_append(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_appear_in_send_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bucket").join("main.log");
        let writer = LogWriter::spawn();

        for i in 0..100 {
            writer.append(LogRecord {
                path: path.clone(),
                line: format!("line {}", i),
                console: false,
            });
        }
        writer.flush();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 100);
        assert_eq!(lines[0], "line 0");
        assert_eq!(lines[99], "line 99");
    }

    #[test]
    fn test_partition_directory_created_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let partition = dir.path().join("2026-01-01-10-00");
        let writer = LogWriter::spawn();
        assert!(!partition.exists());

        writer.append(LogRecord {
            path: partition.join("renderer.log"),
            line: "hello".to_string(),
            console: false,
        });
        writer.flush();

        assert!(partition.join("renderer.log").is_file());
    }

    #[test]
    fn test_flush_with_empty_queue_returns() {
        let writer = LogWriter::spawn();
        writer.flush();
    }
}
