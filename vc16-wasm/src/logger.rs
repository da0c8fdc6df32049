use log::{LevelFilter, Log, Metadata, Record};

/// `log` backend that hands every formatted record to a byte sink.
///
/// On wasm32 the sink is the host's `log_message` import.
pub struct HostLogger {
    sink: fn(&[u8]),
    level: LevelFilter,
}

impl HostLogger {
    pub const fn new(sink: fn(&[u8]), level: LevelFilter) -> Self {
        HostLogger { sink, level }
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }
}

impl Log for HostLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            (self.sink)(format_record(record).as_bytes());
        }
    }

    fn flush(&self) {}
}

pub fn format_record(record: &Record<'_>) -> String {
    format!("{} {}: {}", record.level(), record.target(), record.args())
}
