//! File-backed logger.
//!
//! The host process has no console, so the `log` facade is pointed at a
//! plain text file under `Data/NVSE/Plugins/`. Lines are flushed as they
//! are written; a crash report without the last log line is useless.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;

struct FileLogger {
    file: Mutex<File>,
    level: LevelFilter,
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "[{}] {} {}\n",
            record.level(),
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.args()
        );
        let mut file = self.file.lock();
        let _ = file.write_all(line.as_bytes());
        let _ = file.flush();
    }

    fn flush(&self) {
        let _ = self.file.lock().flush();
    }
}

/// Routes the `log` macros to the file at `path`, appending to an
/// existing one. Idempotent: if a logger is already installed the call is
/// a no-op, so a repeated initialization cannot fail the plugin.
///
/// # Errors
///
/// Fails when the file or its directory cannot be created.
pub fn init(path: &Path, level: LevelFilter) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let logger = FileLogger {
        file: Mutex::new(file),
        level,
    };
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(level);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    #[test]
    fn levels_filter_against_the_configured_cap() {
        let dir = std::env::temp_dir().join("overdrive-logger-test");
        let path = dir.join("filter.log");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("temp dir");

        let logger = FileLogger {
            file: Mutex::new(File::create(&path).expect("log file")),
            level: LevelFilter::Info,
        };
        assert!(logger.enabled(&Metadata::builder().level(Level::Error).build()));
        assert!(logger.enabled(&Metadata::builder().level(Level::Info).build()));
        assert!(!logger.enabled(&Metadata::builder().level(Level::Debug).build()));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn lines_carry_level_and_timestamp() {
        let dir = std::env::temp_dir().join("overdrive-logger-lines-test");
        let path = dir.join("lines.log");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("temp dir");

        let logger = FileLogger {
            file: Mutex::new(File::create(&path).expect("log file")),
            level: LevelFilter::Info,
        };
        logger.log(
            &Record::builder()
                .level(Level::Warn)
                .args(format_args!("budget floor reached"))
                .build(),
        );
        let written = fs::read_to_string(&path).expect("read back");
        assert!(written.starts_with("[WARN] "));
        assert!(written.ends_with("budget floor reached\n"));

        let _ = fs::remove_dir_all(&dir);
    }
}
