use std::sync::Arc;

use crate::error::{Result, StoreError};
use crate::lightingconfig::{CycleConfig, FixedConfig, LightingConfig};
use crate::outputsink::SharedSink;
use crate::scheduler::LightingScheduler;
use crate::store::ConfigStore;

pub const LIGHTING_BUCKET: &str = "lightings";
pub const CONFIG_KEY: &str = "config";

/// Switches the fixture between cycle mode and fixed mode, keeping the store in step.
///
/// A store write error from a setter means the new state is already live but may be lost on
/// restart.
pub struct Lighting<S: ConfigStore> {
    store: S,
    sink: SharedSink,
    scheduler: LightingScheduler,
    config: LightingConfig,
}

impl<S: ConfigStore> Lighting<S> {
    pub fn new(store: S, sink: SharedSink, scheduler: LightingScheduler) -> Lighting<S> {
        Lighting {
            store,
            sink,
            scheduler,
            config: LightingConfig::default(),
        }
    }

    /// Loads the stored record, seeding a default one on first run, and applies it.
    pub fn start(&mut self) -> Result<()> {
        let config = match self.load() {
            Ok(config) => config,
            Err(StoreError::NotFound { .. }) => {
                log::info!("No stored lighting config, writing defaults");
                let config = LightingConfig::default();
                self.store.update(LIGHTING_BUCKET, CONFIG_KEY, &config)?;
                config
            }
            Err(err) => return Err(err.into()),
        };
        config.cycle.validate()?;
        config.fixed.validate()?;

        self.scheduler.stop_if_running();
        self.scheduler.reconfigure(&self.sink, &config)?;
        self.config = config;
        Ok(())
    }

    pub fn shutdown(&mut self) {
        self.scheduler.stop_if_running();
    }

    pub fn get_lighting_cycle(&self) -> Result<CycleConfig> {
        Ok(self.load()?.cycle)
    }

    /// Replaces the cycle schedules and restarts the loop when enabled.
    pub fn set_lighting_cycle(&mut self, conf: CycleConfig) -> Result<()> {
        conf.validate()?;
        let mut config = self.load()?;

        self.scheduler.stop_cycle();
        config.cycle = conf;
        if config.cycle.enabled {
            if let Err(err) = self
                .scheduler
                .start_cycle(Arc::clone(&self.sink), config.cycle.clone())
            {
                // The old loop is gone and no new one runs.
                self.config.cycle.enabled = false;
                return Err(err);
            }
        }
        self.config = config.clone();

        self.persist(&config)
    }

    pub fn get_fixed_lighting(&self) -> Result<FixedConfig> {
        Ok(self.load()?.fixed)
    }

    /// Switches to fixed mode and applies both values before returning.
    pub fn set_fixed_lighting(&mut self, conf: FixedConfig) -> Result<()> {
        conf.validate()?;
        let mut config = self.load()?;

        self.scheduler.stop_cycle();
        config.fixed = conf;
        config.cycle.enabled = false;
        self.config = config.clone();
        self.scheduler.set_intensity(&self.sink, conf.intensity);
        self.scheduler.set_spectrum(&self.sink, conf.spectrum);

        self.persist(&config)
    }

    /// The configuration the outputs currently follow, which may be ahead of the store.
    pub fn config(&self) -> &LightingConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &LightingScheduler {
        &self.scheduler
    }

    fn load(&self) -> std::result::Result<LightingConfig, StoreError> {
        self.store.get(LIGHTING_BUCKET, CONFIG_KEY)
    }

    fn persist(&self, config: &LightingConfig) -> Result<()> {
        if let Err(err) = self.store.update(LIGHTING_BUCKET, CONFIG_KEY, config) {
            log::warn!("Lighting config is applied but was not persisted: {err}");
            return Err(err.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use serde::de::DeserializeOwned;
    use serde::Serialize;

    use super::*;
    use crate::error::LightingError;
    use crate::outputsink::testing::{recording_sink, writes, RecordingSink};
    use crate::schedule::{hm, FixedClock, Schedule, ScheduleValuePoint};
    use crate::store::MemoryStore;

    const INTENSITY: u8 = 0;
    const SPECTRUM: u8 = 1;

    /// Reads work, writes fail once `fail_writes` is set.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_writes: Mutex<bool>,
    }

    impl ConfigStore for FlakyStore {
        fn get<T: DeserializeOwned>(
            &self,
            bucket: &str,
            key: &str,
        ) -> std::result::Result<T, StoreError> {
            self.inner.get(bucket, key)
        }

        fn update<T: Serialize>(
            &self,
            bucket: &str,
            key: &str,
            record: &T,
        ) -> std::result::Result<(), StoreError> {
            if *self.fail_writes.lock().unwrap() {
                return Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )));
            }
            self.inner.update(bucket, key, record)
        }
    }

    fn lighting() -> (Arc<Mutex<RecordingSink>>, Lighting<FlakyStore>) {
        let (recorder, sink) = recording_sink();
        // Long interval so only the orchestrator's own writes reach the sink.
        let scheduler = LightingScheduler::with_interval(
            INTENSITY,
            SPECTRUM,
            Duration::from_secs(3600),
            Arc::new(FixedClock(hm(7, 0))),
        );
        let mut lighting = Lighting::new(FlakyStore::default(), sink, scheduler);
        lighting.start().unwrap();
        (recorder, lighting)
    }

    fn cycle(enabled: bool) -> CycleConfig {
        let schedule = Schedule::new(vec![
            ScheduleValuePoint::new(hm(6, 0), 10),
            ScheduleValuePoint::new(hm(18, 0), 80),
        ])
        .unwrap();
        CycleConfig {
            enabled,
            intensities: schedule.clone(),
            spectrums: schedule,
        }
    }

    fn stored(lighting: &Lighting<FlakyStore>) -> LightingConfig {
        lighting.store.get(LIGHTING_BUCKET, CONFIG_KEY).unwrap()
    }

    #[test]
    fn start_seeds_defaults() {
        let (recorder, lighting) = lighting();
        assert_eq!(stored(&lighting), LightingConfig::default());
        assert!(!lighting.scheduler().is_running());
        assert_eq!(writes(&recorder), [(INTENSITY, 0), (SPECTRUM, 0)]);
    }

    #[test]
    fn start_resumes_stored_cycle() {
        let (recorder, sink) = recording_sink();
        let store = FlakyStore::default();
        let config = LightingConfig {
            cycle: cycle(true),
            fixed: FixedConfig {
                intensity: 20,
                spectrum: 40,
            },
        };
        store.update(LIGHTING_BUCKET, CONFIG_KEY, &config).unwrap();

        let mut lighting = Lighting::new(store, sink, LightingScheduler::new(INTENSITY, SPECTRUM));
        lighting.start().unwrap();
        assert!(lighting.scheduler().is_running());
        assert_eq!(lighting.config(), &config);
        assert_eq!(writes(&recorder), [(INTENSITY, 20), (SPECTRUM, 40)]);
        lighting.shutdown();
        assert!(!lighting.scheduler().is_running());
    }

    #[test]
    fn get_surfaces_missing_record() {
        let (_recorder, sink) = recording_sink();
        let lighting = Lighting::new(
            MemoryStore::new(),
            sink,
            LightingScheduler::new(INTENSITY, SPECTRUM),
        );
        assert!(matches!(
            lighting.get_lighting_cycle(),
            Err(LightingError::Store(StoreError::NotFound { .. }))
        ));
        assert!(lighting.get_fixed_lighting().is_err());
    }

    #[test]
    fn set_cycle_starts_loop_and_persists() {
        let (_recorder, mut lighting) = lighting();

        lighting.set_lighting_cycle(cycle(true)).unwrap();
        assert!(lighting.scheduler().is_running());
        assert_eq!(lighting.get_lighting_cycle().unwrap(), cycle(true));

        lighting.set_lighting_cycle(cycle(false)).unwrap();
        assert!(!lighting.scheduler().is_running());
        assert!(!lighting.get_lighting_cycle().unwrap().enabled);
    }

    #[test]
    fn set_cycle_rejects_empty_schedule() {
        let (_recorder, mut lighting) = lighting();
        lighting.set_lighting_cycle(cycle(true)).unwrap();

        let mut conf = cycle(true);
        conf.spectrums = Schedule::default();
        assert!(matches!(
            lighting.set_lighting_cycle(conf),
            Err(LightingError::EmptySchedule { .. })
        ));
        assert!(lighting.scheduler().is_running());
        assert_eq!(lighting.get_lighting_cycle().unwrap(), cycle(true));
        assert_eq!(lighting.config().cycle, cycle(true));
    }

    #[test]
    fn start_rejects_invalid_stored_record() {
        let stored_records = [
            LightingConfig {
                cycle: CycleConfig {
                    enabled: true,
                    ..CycleConfig::default()
                },
                ..LightingConfig::default()
            },
            LightingConfig {
                fixed: FixedConfig {
                    intensity: 250,
                    spectrum: 200,
                },
                ..LightingConfig::default()
            },
        ];

        for config in stored_records {
            let (recorder, sink) = recording_sink();
            let store = FlakyStore::default();
            store.update(LIGHTING_BUCKET, CONFIG_KEY, &config).unwrap();

            let mut lighting =
                Lighting::new(store, sink, LightingScheduler::new(INTENSITY, SPECTRUM));
            assert!(lighting.start().is_err());
            assert!(!lighting.scheduler().is_running());
            assert!(writes(&recorder).is_empty());
            assert_eq!(lighting.config(), &LightingConfig::default());
        }
    }

    #[test]
    fn set_fixed_stops_cycle_and_applies_once() {
        let (recorder, mut lighting) = lighting();
        lighting.set_lighting_cycle(cycle(true)).unwrap();
        let before = writes(&recorder).len();

        lighting
            .set_fixed_lighting(FixedConfig {
                intensity: 50,
                spectrum: 30,
            })
            .unwrap();

        assert!(!lighting.scheduler().is_running());
        assert_eq!(
            writes(&recorder)[before..],
            [(INTENSITY, 50), (SPECTRUM, 30)]
        );
        assert!(!lighting.get_lighting_cycle().unwrap().enabled);
        assert_eq!(
            lighting.get_fixed_lighting().unwrap(),
            FixedConfig {
                intensity: 50,
                spectrum: 30
            }
        );
        // Schedules are kept for the next time the cycle is enabled.
        assert_eq!(stored(&lighting).cycle.intensities, cycle(true).intensities);
    }

    #[test]
    fn set_fixed_rejects_out_of_range() {
        let (recorder, mut lighting) = lighting();
        let result = lighting.set_fixed_lighting(FixedConfig {
            intensity: 120,
            spectrum: 30,
        });
        assert!(matches!(
            result,
            Err(LightingError::ValueOutOfRange { value: 120, .. })
        ));
        assert_eq!(writes(&recorder).len(), 2);
    }

    #[test]
    fn failed_write_keeps_runtime_state() {
        let (_recorder, mut lighting) = lighting();
        *lighting.store.fail_writes.lock().unwrap() = true;

        let result = lighting.set_lighting_cycle(cycle(true));
        assert!(matches!(
            result,
            Err(LightingError::Store(StoreError::Io(_)))
        ));
        assert!(lighting.scheduler().is_running());
        assert_eq!(lighting.config().cycle, cycle(true));
        assert!(!stored(&lighting).cycle.enabled);
    }

    #[test]
    fn failed_fixed_write_still_applies_values() {
        let (recorder, mut lighting) = lighting();
        lighting.set_lighting_cycle(cycle(true)).unwrap();
        *lighting.store.fail_writes.lock().unwrap() = true;

        let fixed = FixedConfig {
            intensity: 5,
            spectrum: 6,
        };
        assert!(lighting.set_fixed_lighting(fixed).is_err());
        assert!(!lighting.scheduler().is_running());
        assert_eq!(writes(&recorder)[2..], [(INTENSITY, 5), (SPECTRUM, 6)]);
        assert!(stored(&lighting).cycle.enabled);
    }
}
