use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::error::{LightingError, Result};
use crate::intervaltimer::IntervalTimer;
use crate::lightingconfig::{CycleConfig, LightingConfig};
use crate::outputsink::{lock_sink, SharedSink};
use crate::schedule::{current_value, Clock, SystemClock};

pub const TICK_INTERVAL: Duration = Duration::from_secs(60);

struct RunningCycle {
    // Never sent on. Dropping it disconnects the loop's receiver.
    stop_tx: Sender<()>,
    thread: JoinHandle<()>,
}

/// Drives the intensity and spectrum channels, either once or from a background cycle.
pub struct LightingScheduler {
    intensity_channel: u8,
    spectrum_channel: u8,
    interval: Duration,
    clock: Arc<dyn Clock>,
    running: Option<RunningCycle>,
}

impl LightingScheduler {
    pub fn new(intensity_channel: u8, spectrum_channel: u8) -> LightingScheduler {
        LightingScheduler::with_interval(
            intensity_channel,
            spectrum_channel,
            TICK_INTERVAL,
            Arc::new(SystemClock),
        )
    }

    pub fn with_interval(
        intensity_channel: u8,
        spectrum_channel: u8,
        interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> LightingScheduler {
        LightingScheduler {
            intensity_channel,
            spectrum_channel,
            interval,
            clock,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Spawns the cycle loop on its own thread and returns immediately.
    ///
    /// The loop applies the scheduled values once per interval, starting one interval from now.
    pub fn start_cycle(&mut self, sink: SharedSink, conf: CycleConfig) -> Result<()> {
        if self.running.is_some() {
            return Err(LightingError::CycleAlreadyRunning);
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let cycle = Cycle {
            intensity_channel: self.intensity_channel,
            spectrum_channel: self.spectrum_channel,
            interval: self.interval,
            clock: Arc::clone(&self.clock),
            sink,
            conf,
        };

        let thread = thread::Builder::new()
            .name("lighting-cycle".to_string())
            .spawn(move || cycle.run(stop_rx))
            .map_err(LightingError::Spawn)?;

        log::info!(
            "Started lighting cycle, ticking every {}s",
            self.interval.as_secs_f32()
        );
        self.running = Some(RunningCycle { stop_tx, thread });
        Ok(())
    }

    /// Stops the cycle loop and waits for it to exit.
    ///
    /// No writes from the old loop happen after this returns. Without a running loop this
    /// only logs a warning.
    pub fn stop_cycle(&mut self) {
        let Some(running) = self.running.take() else {
            log::warn!("No lighting cycle is running, nothing to stop");
            return;
        };

        drop(running.stop_tx);
        if running.thread.join().is_err() {
            log::error!("Lighting cycle thread panicked");
        }
        log::info!("Stopped lighting cycle");
    }

    pub fn stop_if_running(&mut self) {
        if self.running.is_some() {
            self.stop_cycle();
        }
    }

    pub fn set_intensity(&self, sink: &SharedSink, value: u8) {
        apply(sink, self.intensity_channel, "intensity", value);
    }

    pub fn set_spectrum(&self, sink: &SharedSink, value: u8) {
        apply(sink, self.spectrum_channel, "spectrum", value);
    }

    /// Brings the outputs in line with a freshly loaded configuration.
    ///
    /// Starts the cycle if enabled and always applies the fixed values as a baseline.
    pub fn reconfigure(&mut self, sink: &SharedSink, conf: &LightingConfig) -> Result<()> {
        if conf.cycle.enabled {
            self.start_cycle(Arc::clone(sink), conf.cycle.clone())?;
        }
        self.set_intensity(sink, conf.fixed.intensity);
        self.set_spectrum(sink, conf.fixed.spectrum);
        Ok(())
    }
}

fn apply(sink: &SharedSink, channel: u8, label: &str, value: u8) {
    log::info!("Setting pwm value: {value} for lighting {label}");
    lock_sink(sink).set(channel, value);
}

impl Drop for LightingScheduler {
    fn drop(&mut self) {
        self.stop_if_running();
    }
}

/// Everything the loop thread owns: a snapshot of the configuration taken at start.
struct Cycle {
    intensity_channel: u8,
    spectrum_channel: u8,
    interval: Duration,
    clock: Arc<dyn Clock>,
    sink: SharedSink,
    conf: CycleConfig,
}

impl Cycle {
    fn run(self, stop: Receiver<()>) {
        let mut timer = IntervalTimer::new(self.interval);
        while timer.wait_for_tick(&stop) {
            self.tick();
        }
    }

    fn tick(&self) {
        let now = self.clock.time_of_day();
        if let Some(i) = current_value(now, &self.conf.intensities) {
            apply(&self.sink, self.intensity_channel, "intensity", i);
        }
        if let Some(s) = current_value(now, &self.conf.spectrums) {
            apply(&self.sink, self.spectrum_channel, "spectrum", s);
        }
    }
}
