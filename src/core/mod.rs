//! Core types shared by every stage of the pipeline.
//!
//! This module holds configuration loading and the degradation log that
//! carries non-fatal failures through to artifact provenance.

pub mod config;
mod degradation;

pub use config::Config;
pub use degradation::{Degradation, DegradationLog, DegradationReason};
