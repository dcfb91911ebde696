use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{after, select, Receiver};

/// Fixed-rate deadline timer that can be interrupted by a stop channel.
pub struct IntervalTimer {
    interval: Duration,
    next_tick: Instant,
    thread_name: String,
}

impl IntervalTimer {
    pub fn new(interval: Duration) -> IntervalTimer {
        let cur_thread = thread::current();
        let thread_name = cur_thread.name().unwrap_or("unnamed");

        IntervalTimer {
            interval,
            next_tick: Instant::now() + interval,
            thread_name: thread_name.to_string(),
        }
    }

    /// Blocks until the next tick is due or `stop` fires.
    ///
    /// `stop` counts as fired on a message and on disconnect. Returns `false` when stopped.
    pub fn wait_for_tick(&mut self, stop: &Receiver<()>) -> bool {
        let timeout = self.next_tick.saturating_duration_since(Instant::now());

        select! {
            recv(stop) -> _ => false,
            recv(after(timeout)) -> _ => {
                self.advance();
                true
            }
        }
    }

    fn advance(&mut self) {
        let now = Instant::now();
        self.next_tick = if self.next_tick + self.interval > now {
            self.next_tick + self.interval
        } else {
            log::warn!("{} skipped a tick", self.thread_name);
            now + self.interval
        };
    }
}
