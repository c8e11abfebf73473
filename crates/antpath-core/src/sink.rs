//! Progress message sinks.

/// Receiver for progress and diagnostic text emitted by the driver.
pub trait MessageSink {
    fn emit(&mut self, message: &str);
}

/// Forwards every message to the `log` facade at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl MessageSink for LogSink {
    fn emit(&mut self, message: &str) {
        log::info!("{}", message);
    }
}

/// Discards messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MessageSink for NullSink {
    fn emit(&mut self, _message: &str) {}
}

/// Collects messages, handy for tests and for callers that print a summary.
impl MessageSink for Vec<String> {
    fn emit(&mut self, message: &str) {
        self.push(message.to_string());
    }
}
