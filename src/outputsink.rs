use std::sync::{Arc, Mutex, MutexGuard};

/// Device side of the fixture: takes a duty value for one channel.
///
/// Writes are fire-and-forget. Implementations log transport failures themselves.
pub trait OutputSink {
    fn set(&mut self, channel: u8, value: u8);
}

pub type SharedSink = Arc<Mutex<dyn OutputSink + Send>>;

/// Locks the sink, recovering it if a previous writer panicked.
pub fn lock_sink(sink: &SharedSink) -> MutexGuard<'_, dyn OutputSink + Send + 'static> {
    match sink.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Sink without hardware behind it, for dry runs.
pub struct LogSink;

impl OutputSink for LogSink {
    fn set(&mut self, channel: u8, value: u8) {
        log::info!("[dry run] channel {channel} = {value}");
    }
}
