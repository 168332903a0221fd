use chrono::Local;
use env_logger::Builder;
use log::{Level, LevelFilter};
use std::io::Write;

/// Log targets used for per-recipient events.
pub const PROGRESS: &str = "progress";
pub const SENT: &str = "sent";
pub const FAILED: &str = "failed";
pub const SKIPPED: &str = "skipped";

/// Console marker for a record: event targets first, then the level.
pub fn marker(target: &str, level: Level) -> &'static str {
    match target {
        PROGRESS => "🔄",
        SENT => "✅",
        FAILED => "❌",
        SKIPPED => "⏭",
        _ => match level {
            Level::Error => "❌",
            Level::Warn => "⚠️",
            Level::Info => "📋",
            Level::Debug | Level::Trace => "🐞",
        },
    }
}

pub fn init(level: LevelFilter) {
    Builder::new()
        .format(|buf, record| {
            writeln!(buf,
                "[{}] {} {}",
                Local::now().format("%H:%M:%S"),
                marker(record.target(), record.level()),
                record.args()
            )
        })
        .filter(None, level)
        .init();

    log::debug!("Logger initialized.");
}
