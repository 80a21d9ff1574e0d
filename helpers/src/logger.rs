use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

/// ConsoleLogger prints log records as `LEVEL: message` lines. Warnings and errors go to stderr,
/// everything else to stdout.
#[derive(Debug)]
pub struct ConsoleLogger {
    level: LevelFilter,
}

impl ConsoleLogger {
    pub fn new(level: LevelFilter) -> ConsoleLogger {
        ConsoleLogger { level }
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let tag = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARNING",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };

        if record.level() <= Level::Warn {
            eprintln!("{}: {}", tag, record.args());
        } else {
            println!("{}: {}", tag, record.args());
        }
    }

    fn flush(&self) {}
}

/// init installs the console logger as global logger. It may only be called once per process.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(ConsoleLogger::new(level)))?;
    log::set_max_level(level);
    Ok(())
}
