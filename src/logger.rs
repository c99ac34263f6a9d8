//! Session log for StudioFE.
//!
//! Every history commit, silently rejected gesture, error-slot write, remote
//! edit outcome and script `print` goes through the `log_info!` / `log_warn!`
//! / `log_err!` macros into one file in the OS data directory:
//!
//!   Windows:  `%APPDATA%\StudioFE\studiofe.log`
//!   Linux:    `~/.local/share/StudioFE/studiofe.log`
//!   macOS:    `~/Library/Application Support/StudioFE/studiofe.log`
//!
//! The file is truncated at each launch. Library code never opens it; until
//! the binary calls [`init`], log calls are dropped. With [`set_echo`] on,
//! warnings and errors are mirrored to stderr as well (the CLI's `--verbose`).

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();
static ECHO: AtomicBool = AtomicBool::new(false);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn tag(&self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Mirror warnings and errors to stderr.
pub fn set_echo(on: bool) {
    ECHO.store(on, Ordering::Relaxed);
}

/// Record one message. Never fails; I/O errors are swallowed.
pub fn write(level: Level, msg: &str) {
    let line = format_line(&timestamp(), level, msg);
    if level != Level::Info && ECHO.load(Ordering::Relaxed) {
        eprintln!("{}", line);
    }
    write_raw(&line);
}

fn write_raw(line: &str) {
    if let Some(mutex) = LOG_FILE.get()
        && let Ok(mut file) = mutex.lock()
    {
        let _ = writeln!(file, "{}", line);
    }
}

fn format_line(ts: &str, level: Level, msg: &str) -> String {
    format!("[{}] [{:<5}] {}", ts, level.tag(), msg)
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Info, &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Warn, &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Error, &format!($($arg)*));
    };
}

/// Open (truncate) the log file and install a panic hook that copies panic
/// messages into it. Call once, from the binary.
pub fn init() {
    let path = log_file_path();
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path);
    match file {
        Ok(f) => {
            let _ = LOG_FILE.set(Mutex::new(f));
        }
        Err(e) => {
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
            return;
        }
    }

    write_raw(&format!(
        "=== StudioFE {} started (unix {}, pid {}) ===",
        env!("CARGO_PKG_VERSION"),
        unix_seconds(),
        std::process::id()
    ));
    write_raw(&format!("Log file: {}", path.display()));
    write_raw("");

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write_raw(&format_line(&timestamp(), Level::Error, &format!("PANIC {}", info)));
        prev(info);
    }));
}

fn log_file_path() -> PathBuf {
    data_dir().join("StudioFE").join("studiofe.log")
}

/// Platform data directory (without the app sub-folder).
fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join("Library").join("Application Support");
        }
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from(".")
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// HH:MM:SS.mmm (UTC).
fn timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => {
            let secs = d.as_secs();
            format!(
                "{:02}:{:02}:{:02}.{:03}",
                (secs % 86400) / 3600,
                (secs % 3600) / 60,
                secs % 60,
                d.subsec_millis()
            )
        }
        Err(_) => "??:??:??.???".to_string(),
    }
}
