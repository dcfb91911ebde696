//! Aquarium light controller.
//!
//! Drives the intensity and spectrum channels of a fixture either at fixed values or along a
//! daily schedule that is re-evaluated every minute. [`lighting::Lighting`] is the entry point
//! for anything that changes the configuration.

pub mod error;
pub mod intervaltimer;
pub mod lighting;
pub mod lightingconfig;
pub mod olaoutput;
pub mod outputsink;
pub mod schedule;
pub mod scheduler;
pub mod settings;
pub mod store;
