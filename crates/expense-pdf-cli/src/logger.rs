use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record};
use std::io::Write;

/// Environment variable overriding the log level
pub const LOG_ENV: &str = "EXPDF_LOG";

/// Writes timestamped log lines to stderr so stdout stays free for reports
pub struct StderrLogger {
    level: LevelFilter,
}

impl StderrLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self { level }
    }

    /// Level from `EXPDF_LOG` if set and valid, else from the `-v` count
    pub fn level_from(verbosity: u8) -> LevelFilter {
        if let Some(level) = std::env::var(LOG_ENV)
            .ok()
            .and_then(|value| value.parse::<LevelFilter>().ok())
        {
            return level;
        }

        match verbosity {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    pub fn init(self) -> Result<(), log::SetLoggerError> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(level);
        Ok(())
    }
}

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let tag = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARN ",
            Level::Info => "INFO ",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };

        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(
            stderr,
            "{} {} [{}] {}",
            Local::now().format("%H:%M:%S%.3f"),
            tag,
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}
