//! Cycle matching across event sets and session-level cycle statistics.

use crate::channels::{Channel, ProcessedChannels};
use crate::error::{CadenceError, Result};
use crate::events::{EventSet, Peak};
use crate::gps::distance_between;
use crate::types::{GpsSample, NANOS_PER_SECOND};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seconds per sample assumed when the session gives no usable value
pub const DEFAULT_DT: f64 = 0.01;

/// Projection step of the fixed 100 Hz assumption (ns)
const ASSUMED_STEP_NS: i64 = 10_000_000;

/// How a motion index is mapped back to a timestamp for the GPS lookup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeProjection {
    /// `base + index * 10 ms`, regardless of the estimated sample rate
    #[default]
    #[serde(rename = "assumed_100hz")]
    Assumed100Hz,
    /// `base + index / fs` using the pipeline's estimated rate
    #[serde(rename = "estimated_rate")]
    EstimatedRate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub projection: TimeProjection,
}

/// Everything the analyzer reads besides the event sets
#[derive(Debug, Clone, Copy)]
pub struct CycleContext<'a> {
    /// Channels of the active section (or full recording)
    pub channels: &'a ProcessedChannels,
    pub gps: &'a [GpsSample],
    /// Timestamp of motion index 0 (ns)
    pub base_time: i64,
    /// Estimated motion sample rate (Hz)
    pub sample_rate: f64,
    /// Seconds per motion sample
    pub dt: f64,
    pub session_duration: f64,
}

impl CycleContext<'_> {
    fn time_for_index(&self, index: usize, projection: TimeProjection) -> i64 {
        match projection {
            TimeProjection::Assumed100Hz => self.base_time + index as i64 * ASSUMED_STEP_NS,
            TimeProjection::EstimatedRate => {
                let fs = if self.sample_rate > 0.0 {
                    self.sample_rate
                } else {
                    1.0 / DEFAULT_DT
                };
                self.base_time + (index as f64 / fs * NANOS_PER_SECOND).round() as i64
            }
        }
    }
}

/// `session_duration / sample_count`, or 0.01 s when that is not a positive finite number
pub fn sample_interval(session_duration: f64, sample_count: usize) -> f64 {
    let dt = session_duration / sample_count as f64;
    if dt.is_finite() && dt > 0.0 {
        dt
    } else {
        warn!(
            "Degenerate sample interval ({}s over {} samples), assuming {}s",
            session_duration, sample_count, DEFAULT_DT
        );
        DEFAULT_DT
    }
}

/// Per-axis maxima of `|value|` over a cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisMaxima {
    pub acc_x: f64,
    pub acc_y: f64,
    pub acc_z: f64,
    pub acc_mag: f64,
    pub gyro_x: f64,
    pub gyro_y: f64,
    pub gyro_z: f64,
    pub gyro_mag: f64,
}

impl AxisMaxima {
    fn over(channels: &ProcessedChannels, start: usize, end: usize) -> Self {
        let m = |c| channels.max_abs(c, start, end);
        Self {
            acc_x: m(Channel::AccX),
            acc_y: m(Channel::AccY),
            acc_z: m(Channel::AccZ),
            acc_mag: m(Channel::AccMag),
            gyro_x: m(Channel::GyroX),
            gyro_y: m(Channel::GyroY),
            gyro_z: m(Channel::GyroZ),
            gyro_mag: m(Channel::GyroMag),
        }
    }
}

/// One matched start -> (mid) -> end sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub start_index: usize,
    pub mid_index: Option<usize>,
    pub end_index: usize,
    pub start_value: f64,
    pub mid_value: Option<f64>,
    pub end_value: f64,
    /// Seconds
    pub duration: f64,
    pub phase1_duration: f64,
    pub phase2_duration: f64,
    /// Metres
    pub distance: f64,
    /// Maximum of `acc_mag` over `[start, end]`
    pub max_acceleration: f64,
    pub axis_maxima: AxisMaxima,
}

impl Cycle {
    /// Event values at the points this cycle used
    fn used_values(&self) -> impl Iterator<Item = f64> {
        [Some(self.start_value), self.mid_value, Some(self.end_value)]
            .into_iter()
            .flatten()
    }
}

/// Aggregate over a non-empty cycle list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleStatistics {
    pub count: usize,
    pub mean_duration: f64,
    pub min_duration: f64,
    pub max_duration: f64,
    /// Population standard deviation of duration
    pub std_duration: f64,
    /// `count / session_duration` (Hz)
    pub frequency: f64,
    pub total_distance: f64,
    pub distance_per_cycle: f64,
    pub mean_max_acceleration: f64,
    /// Only present when a mid event was used
    pub mean_phase1: Option<f64>,
    pub mean_phase2: Option<f64>,
    /// Mean of the strictly positive event values used by the cycles
    pub mean_acceleration: Option<f64>,
    /// Mean of the strictly negative event values used by the cycles
    pub mean_deceleration: Option<f64>,
    pub session_duration: f64,
    pub dt: f64,
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

impl CycleStatistics {
    /// Returns `None` for an empty list
    pub fn from_cycles(cycles: &[Cycle], session_duration: f64, dt: f64) -> Option<Self> {
        if cycles.is_empty() {
            return None;
        }
        let count = cycles.len();
        let n = count as f64;
        let durations = || cycles.iter().map(|c| c.duration);

        let mean_duration = durations().sum::<f64>() / n;
        let min_duration = durations().fold(f64::INFINITY, f64::min);
        let max_duration = durations().fold(f64::NEG_INFINITY, f64::max);
        let variance = durations()
            .map(|d| (d - mean_duration).powi(2))
            .sum::<f64>()
            / n;

        let has_phases = cycles.iter().any(|c| c.mid_index.is_some());
        let total_distance: f64 = cycles.iter().map(|c| c.distance).sum();

        Some(Self {
            count,
            mean_duration,
            min_duration,
            max_duration,
            std_duration: variance.sqrt(),
            frequency: if session_duration > 0.0 {
                n / session_duration
            } else {
                0.0
            },
            total_distance,
            distance_per_cycle: total_distance / n,
            mean_max_acceleration: cycles.iter().map(|c| c.max_acceleration).sum::<f64>() / n,
            mean_phase1: if has_phases {
                mean(cycles.iter().map(|c| c.phase1_duration))
            } else {
                None
            },
            mean_phase2: if has_phases {
                mean(cycles.iter().map(|c| c.phase2_duration))
            } else {
                None
            },
            mean_acceleration: mean(cycles.iter().flat_map(Cycle::used_values).filter(|v| *v > 0.0)),
            mean_deceleration: mean(cycles.iter().flat_map(Cycle::used_values).filter(|v| *v < 0.0)),
            session_duration,
            dt,
        })
    }
}

/// Result of one analysis request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleAnalysis {
    pub id: String,
    pub start_event: String,
    pub mid_event: Option<String>,
    pub end_event: String,
    pub config: AnalysisConfig,
    pub cycles: Vec<Cycle>,
    pub statistics: CycleStatistics,
    pub created_at: String,
}

fn sorted_peaks(set: &EventSet) -> Vec<Peak> {
    let mut peaks = set.peaks().to_vec();
    peaks.sort_by_key(|p| p.index);
    peaks
}

fn first_after(peaks: &[Peak], index: usize) -> Option<usize> {
    peaks.iter().position(|p| p.index > index)
}

/// Pair (or triple) sorted peaks into cycles.
///
/// Each start takes the first mid after it and the first end after that (or
/// the first end after the start when there is no mid set). Matching stops at
/// the first start with no later mid or end. An end peak closes at most one
/// cycle; a start whose end is already taken is skipped.
pub fn match_cycles(
    start: &[Peak],
    mid: Option<&[Peak]>,
    end: &[Peak],
) -> Vec<(Peak, Option<Peak>, Peak)> {
    let mut matched = Vec::new();
    let mut last_end = None;
    for &s in start {
        let m = match mid {
            Some(mid) => match first_after(mid, s.index) {
                Some(pos) => Some(mid[pos]),
                None => break,
            },
            None => None,
        };
        let Some(e) = first_after(end, m.map_or(s.index, |m| m.index)) else {
            break;
        };
        if last_end == Some(e) {
            continue;
        }
        last_end = Some(e);
        matched.push((s, m, end[e]));
    }
    matched
}

/// Match cycles between the named sets and compute their statistics.
///
/// Fails when `start` or `end` has no peaks, or when nothing matched.
pub fn analyze(
    start: &EventSet,
    mid: Option<&EventSet>,
    end: &EventSet,
    ctx: &CycleContext<'_>,
    config: &AnalysisConfig,
) -> Result<CycleAnalysis> {
    crate::profile_scope!("cycle analysis");

    for set in [start, end] {
        if set.is_empty() {
            return Err(CadenceError::EmptyEvent(set.name.clone()));
        }
    }

    let start_peaks = sorted_peaks(start);
    let end_peaks = sorted_peaks(end);
    let mid_peaks = mid.map(sorted_peaks);

    let dt = ctx.dt;
    let cycles: Vec<Cycle> = match_cycles(&start_peaks, mid_peaks.as_deref(), &end_peaks)
        .into_iter()
        .map(|(s, m, e)| {
            let t_start = ctx.time_for_index(s.index, config.projection);
            let t_end = ctx.time_for_index(e.index, config.projection);
            let axis_maxima = AxisMaxima::over(ctx.channels, s.index, e.index);
            Cycle {
                start_index: s.index,
                mid_index: m.map(|m| m.index),
                end_index: e.index,
                start_value: s.value,
                mid_value: m.map(|m| m.value),
                end_value: e.value,
                duration: (e.index - s.index) as f64 * dt,
                phase1_duration: m.map_or(0.0, |m| (m.index - s.index) as f64 * dt),
                phase2_duration: m.map_or(0.0, |m| (e.index - m.index) as f64 * dt),
                distance: distance_between(ctx.gps, t_start, t_end),
                max_acceleration: axis_maxima.acc_mag,
                axis_maxima,
            }
        })
        .collect();

    let statistics = CycleStatistics::from_cycles(&cycles, ctx.session_duration, dt)
        .ok_or(CadenceError::NoCycles)?;

    info!(
        "Matched {} cycles ({} -> {}{}), mean {:.3}s, {:.2} Hz",
        statistics.count,
        start.name,
        mid.map(|m| format!("{} -> ", m.name)).unwrap_or_default(),
        end.name,
        statistics.mean_duration,
        statistics.frequency
    );

    Ok(CycleAnalysis {
        id: Uuid::new_v4().to_string(),
        start_event: start.name.clone(),
        mid_event: mid.map(|m| m.name.clone()),
        end_event: end.name.clone(),
        config: config.clone(),
        cycles,
        statistics,
        created_at: chrono::Utc::now().to_rfc3339(),
    })
}
