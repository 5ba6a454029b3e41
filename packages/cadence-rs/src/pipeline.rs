//! Motion Pipeline
//!
//! Turns raw accelerometer and gyroscope samples into the eight processed channels:
//! 1. Estimate the sample rate from accelerometer timestamps
//! 2. Apply the configured smoothing filter to each raw axis (gyro converted to deg/s)
//! 3. Polish every axis with the 5-point Savitzky-Golay stage
//! 4. Derive the acceleration and angular-velocity magnitudes
//!
//! Each run is a full recomputation; nothing carries over between runs.

use crate::channels::ProcessedChannels;
use crate::filters::{savitzky_golay, FilterKind, DEFAULT_SAMPLE_RATE};
use crate::profiling::ProfileScope;
use crate::types::{MotionSample, NANOS_PER_SECOND};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Radians to degrees factor applied to gyroscope axes before filtering
pub const RAD_TO_DEG: f64 = 57.3;

/// Configuration for the motion pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Smoothing stage applied before the Savitzky-Golay polish
    #[serde(default)]
    pub filter: FilterKind,
}

impl PipelineConfig {
    pub fn new(filter: FilterKind) -> Self {
        Self { filter }
    }

    /// Build a config from a selector name and its two numeric parameters
    pub fn from_selector(selector: &str, param1: f64, param2: f64) -> Self {
        Self::new(FilterKind::from_selector(selector, param1, param2))
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub channels: ProcessedChannels,
    /// Estimated sample rate (Hz)
    pub sample_rate: f64,
    /// Applied configuration
    pub config: PipelineConfig,
    /// Processing time in milliseconds
    pub processing_time_ms: f64,
}

/// `count / elapsed_seconds` over the sample timestamps, or 100 Hz when fewer
/// than two samples exist or no time elapsed.
pub fn estimate_sample_rate(samples: &[MotionSample]) -> f64 {
    if samples.len() < 2 {
        return DEFAULT_SAMPLE_RATE;
    }
    let first = samples[0].time;
    let last = samples[samples.len() - 1].time;
    let elapsed = (last - first) as f64 / NANOS_PER_SECOND;
    if elapsed > 0.0 {
        samples.len() as f64 / elapsed
    } else {
        DEFAULT_SAMPLE_RATE
    }
}

fn run_axis(filter: &FilterKind, raw: Vec<f64>, sample_rate: f64) -> Vec<f64> {
    savitzky_golay(&filter.apply(&raw, sample_rate))
}

fn axes(samples: &[MotionSample], scale: f64) -> [Vec<f64>; 3] {
    [
        samples.iter().map(|s| s.x * scale).collect(),
        samples.iter().map(|s| s.y * scale).collect(),
        samples.iter().map(|s| s.z * scale).collect(),
    ]
}

/// Run the full pipeline over one batch of raw motion data.
///
/// Accelerometer and gyroscope batches of different lengths are truncated to
/// the shorter one. A missing gyroscope batch yields zero gyro channels.
pub fn process(
    accel: &[MotionSample],
    gyro: &[MotionSample],
    config: &PipelineConfig,
) -> PipelineResult {
    let scope = ProfileScope::new("motion pipeline");

    let sample_rate = estimate_sample_rate(accel);

    let (accel, gyro) = if gyro.is_empty() {
        if !accel.is_empty() {
            warn!("No gyroscope samples, gyro channels are zero-filled");
        }
        (accel, None)
    } else if accel.len() != gyro.len() {
        let n = accel.len().min(gyro.len());
        warn!(
            "Accelerometer ({}) and gyroscope ({}) lengths differ, truncating to {}",
            accel.len(),
            gyro.len(),
            n
        );
        (&accel[..n], Some(&gyro[..n]))
    } else {
        (accel, Some(gyro))
    };

    debug!(
        "Filtering {} samples at {:.2} Hz with {}",
        accel.len(),
        sample_rate,
        config.filter.selector()
    );

    let accel_axes = axes(accel, 1.0).map(|raw| run_axis(&config.filter, raw, sample_rate));
    let gyro_axes = match gyro {
        Some(gyro) => {
            axes(gyro, RAD_TO_DEG).map(|raw| run_axis(&config.filter, raw, sample_rate))
        }
        None => [
            vec![0.0; accel.len()],
            vec![0.0; accel.len()],
            vec![0.0; accel.len()],
        ],
    };

    let channels = ProcessedChannels::from_axes(accel_axes, gyro_axes);
    let processing_time_ms = scope.elapsed_ms();

    info!(
        "Processed {} motion samples ({:.2} Hz, {}) in {:.2}ms",
        channels.len(),
        sample_rate,
        config.filter.selector(),
        processing_time_ms
    );

    PipelineResult {
        channels,
        sample_rate,
        config: config.clone(),
        processing_time_ms,
    }
}
