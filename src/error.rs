use std::io;

use chrono::NaiveTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No record {key} in bucket {bucket}")]
    NotFound { bucket: String, key: String },

    #[error("Store IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum LightingError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Schedule has more than one point at {0}")]
    DuplicateTime(NaiveTime),

    #[error("Cycle is enabled but the {schedule} schedule is empty")]
    EmptySchedule { schedule: &'static str },

    #[error("Value {value} is out of range 0..={max}")]
    ValueOutOfRange { value: u8, max: u8 },

    #[error("A lighting cycle is already running")]
    CycleAlreadyRunning,

    #[error("Failed to spawn cycle thread: {0}")]
    Spawn(io::Error),
}

pub type Result<T> = std::result::Result<T, LightingError>;
