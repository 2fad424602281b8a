use parking_lot::Mutex;
/// File logging for chirp.
///
/// The wrapped shell owns the terminal, so nothing may be written to
/// stdout/stderr while it runs. Every `log::` macro is routed to a file
/// instead: /tmp/chirp_debug.log on Unix, %TEMP%\chirp_debug.log elsewhere.
///
/// Level precedence: `--log-level`, then `--debug`, then the CHIRP_LOG
/// environment variable (off|error|warn|info|debug|trace). When the level
/// is `off` no file is created.
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

pub const LOG_ENV: &str = "CHIRP_LOG";

/// Default log file location.
pub fn default_log_path() -> PathBuf {
    #[cfg(unix)]
    let log_path = PathBuf::from("/tmp/chirp_debug.log");
    #[cfg(not(unix))]
    let log_path = std::env::temp_dir().join("chirp_debug.log");
    log_path
}

/// Pick the effective level from the CLI flags and the environment.
pub fn resolve_level(cli_level: Option<log::LevelFilter>, debug: bool) -> log::LevelFilter {
    if let Some(level) = cli_level {
        return level;
    }
    if debug {
        return log::LevelFilter::Debug;
    }
    level_from_env(std::env::var(LOG_ENV).ok().as_deref())
}

fn level_from_env(value: Option<&str>) -> log::LevelFilter {
    value
        .and_then(|v| log::LevelFilter::from_str(v.trim()).ok())
        .unwrap_or(log::LevelFilter::Off)
}

struct FileLogger {
    level: log::LevelFilter,
    file: Mutex<File>,
}

impl log::Log for FileLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(
            &get_timestamp(),
            record.level(),
            record.target(),
            &record.args().to_string(),
        );
        let mut file = self.file.lock();
        // Nowhere to report a failed log write; the terminal belongs to the shell.
        let _ = file.write_all(line.as_bytes());
        let _ = file.flush();
    }

    fn flush(&self) {
        let _ = self.file.lock().flush();
    }
}

fn get_timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:06}", now.as_secs(), now.subsec_micros())
}

fn format_line(timestamp: &str, level: log::Level, target: &str, msg: &str) -> String {
    format!("[{}] [{:<5}] [{}] {}\n", timestamp, level, target, msg)
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .write(true)
        .truncate(true)
        .create(true)
        .open(path)
}

/// Install the file logger. Safe to call more than once; only the first
/// call takes effect.
pub fn init_log_bridge(level: log::LevelFilter, log_file: Option<PathBuf>) {
    if level == log::LevelFilter::Off {
        return;
    }

    let path = log_file.unwrap_or_else(default_log_path);
    let mut file = match open_log_file(&path) {
        Ok(f) => f,
        // Silently run without logging rather than write to the terminal.
        Err(_) => return,
    };
    let _ = writeln!(
        file,
        "{}\nchirp debug session started at {} (level={})\n{}",
        "=".repeat(80),
        get_timestamp(),
        level,
        "=".repeat(80)
    );

    let logger = Box::new(FileLogger {
        level,
        file: Mutex::new(file),
    });
    if log::set_logger(Box::leak(logger)).is_ok() {
        log::set_max_level(level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_level_wins() {
        assert_eq!(
            resolve_level(Some(log::LevelFilter::Warn), true),
            log::LevelFilter::Warn
        );
        assert_eq!(resolve_level(None, true), log::LevelFilter::Debug);
    }

    #[test]
    fn test_env_level_parsing() {
        assert_eq!(level_from_env(Some("trace")), log::LevelFilter::Trace);
        assert_eq!(level_from_env(Some(" INFO ")), log::LevelFilter::Info);
        assert_eq!(level_from_env(Some("loud")), log::LevelFilter::Off);
        assert_eq!(level_from_env(None), log::LevelFilter::Off);
    }

    #[test]
    fn test_line_format() {
        let line = format_line("12.000034", log::Level::Info, "chirp::queue", "hello");
        assert_eq!(line, "[12.000034] [INFO ] [chirp::queue] hello\n");
    }
}
