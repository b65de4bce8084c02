//! Pass diagnostics on stderr, gated by `QUANTPREP_TRACE`.
//!
//! `QUANTPREP_TRACE=1` (or `basic`) shows pass summaries and precondition
//! failures; `full` adds per-value warnings. Critical messages always print.
use std::env;
use std::fmt::Arguments;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Verbosity {
    Off,
    Basic,
    Full,
}

static VERBOSITY: OnceLock<Verbosity> = OnceLock::new();

fn parse_verbosity(value: &str) -> Verbosity {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "basic" => Verbosity::Basic,
        "full" => Verbosity::Full,
        _ => Verbosity::Off,
    }
}

fn verbosity() -> Verbosity {
    *VERBOSITY.get_or_init(|| {
        env::var("QUANTPREP_TRACE")
            .map(|value| parse_verbosity(&value))
            .unwrap_or(Verbosity::Off)
    })
}

/// Severity of a diagnostic line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Trace,
    Warning,
    Error,
    Critical,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }

    /// ANSI color code for the label.
    fn color(self) -> &'static str {
        match self {
            Level::Trace => "34",
            Level::Warning => "33",
            Level::Error => "91",
            Level::Critical => "31",
        }
    }

    fn required(self) -> Verbosity {
        match self {
            Level::Critical => Verbosity::Off,
            Level::Trace | Level::Error => Verbosity::Basic,
            Level::Warning => Verbosity::Full,
        }
    }

    fn enabled_at(self, verbosity: Verbosity) -> bool {
        verbosity >= self.required()
    }
}

fn clock() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let secs = now.as_secs() % 86_400;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        secs / 3_600,
        (secs % 3_600) / 60,
        secs % 60,
        now.subsec_millis()
    )
}

/// Write one line at `level` if the current verbosity allows it.
pub fn emit(level: Level, args: Arguments) {
    if !level.enabled_at(verbosity()) {
        return;
    }
    eprintln!(
        "{} [\u{001b}[{}m{}\u{001b}[0m] quantprep: {}",
        clock(),
        level.color(),
        level.label(),
        args
    );
}

#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::Level::Trace, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! warning {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::Level::Warning, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::Level::Error, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! critical {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::Level::Critical, format_args!($($arg)*))
    };
}
