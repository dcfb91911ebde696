use serde::{Deserialize, Serialize};

use crate::error::{LightingError, Result};
use crate::schedule::{check_value, Schedule};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleConfig {
    pub enabled: bool,
    pub intensities: Schedule,
    pub spectrums: Schedule,
}

impl CycleConfig {
    /// Rejects configurations the cycle loop cannot evaluate.
    pub fn validate(&self) -> Result<()> {
        if self.enabled {
            if self.intensities.is_empty() {
                return Err(LightingError::EmptySchedule {
                    schedule: "intensity",
                });
            }
            if self.spectrums.is_empty() {
                return Err(LightingError::EmptySchedule {
                    schedule: "spectrum",
                });
            }
        }
        self.intensities.check_values()?;
        self.spectrums.check_values()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedConfig {
    pub intensity: u8,
    pub spectrum: u8,
}

impl FixedConfig {
    pub fn validate(&self) -> Result<()> {
        check_value(self.intensity)?;
        check_value(self.spectrum)
    }
}

/// The persisted lighting record. `cycle.enabled` decides which half is live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightingConfig {
    pub cycle: CycleConfig,
    pub fixed: FixedConfig,
}
