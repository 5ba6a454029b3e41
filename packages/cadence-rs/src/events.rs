//! Windowed peak detection and named, editable peak sets.

use crate::channels::{Channel, ProcessedChannels};
use crate::error::{CadenceError, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Which extrema a detection pass records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Window maxima above `threshold`
    Pos,
    /// Window minima below `-threshold`
    Neg,
    /// Both
    Abs,
}

impl Direction {
    fn wants_max(self) -> bool {
        matches!(self, Direction::Pos | Direction::Abs)
    }

    fn wants_min(self) -> bool {
        matches!(self, Direction::Neg | Direction::Abs)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Pos => "pos",
            Direction::Neg => "neg",
            Direction::Abs => "abs",
        })
    }
}

impl FromStr for Direction {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pos" | "positive" => Ok(Direction::Pos),
            "neg" | "negative" => Ok(Direction::Neg),
            "abs" | "both" => Ok(Direction::Abs),
            other => Err(CadenceError::InvalidParameter(format!(
                "direction must be pos, neg or abs (got '{}')",
                other
            ))),
        }
    }
}

/// A flagged point on a channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub index: usize,
    pub value: f64,
}

impl Peak {
    pub fn new(index: usize, value: f64) -> Self {
        Self { index, value }
    }
}

fn default_threshold() -> f64 {
    1.0
}
fn default_window() -> usize {
    50
}
fn default_direction() -> Direction {
    Direction::Pos
}

/// Parameters of one detection pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub channel: Channel,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Samples per window
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default = "default_direction")]
    pub direction: Direction,
}

impl DetectionConfig {
    pub fn new(channel: Channel, threshold: f64, window: usize, direction: Direction) -> Self {
        Self {
            channel,
            threshold,
            window,
            direction,
        }
    }

    /// Config attached to a manually populated event set
    pub fn manual(channel: Channel) -> Self {
        Self::new(channel, default_threshold(), default_window(), default_direction())
    }
}

/// Split `data` into consecutive windows of `window` samples (the last may be
/// shorter) and record each window's extrema that pass the threshold.
///
/// Peaks come back in window order, with each window's maximum before its minimum.
pub fn detect_peaks(
    data: &[f64],
    threshold: f64,
    window: usize,
    direction: Direction,
) -> Result<Vec<Peak>> {
    if window == 0 {
        return Err(CadenceError::InvalidParameter(
            "detection window must be at least 1 sample".to_string(),
        ));
    }

    let mut peaks = Vec::new();
    for (w, chunk) in data.chunks(window).enumerate() {
        let offset = w * window;
        let mut max: Option<Peak> = None;
        let mut min: Option<Peak> = None;
        for (j, &v) in chunk.iter().enumerate() {
            if max.map_or(true, |m| v > m.value) {
                max = Some(Peak::new(offset + j, v));
            }
            if min.map_or(true, |m| v < m.value) {
                min = Some(Peak::new(offset + j, v));
            }
        }

        if direction.wants_max() {
            if let Some(p) = max.filter(|p| p.value > threshold) {
                peaks.push(p);
            }
        }
        if direction.wants_min() {
            if let Some(p) = min.filter(|p| p.value < -threshold) {
                peaks.push(p);
            }
        }
    }
    Ok(peaks)
}

/// Named collection of peaks, kept in ascending index order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSet {
    pub name: String,
    peaks: Vec<Peak>,
    pub config: DetectionConfig,
}

impl EventSet {
    pub fn new(name: impl Into<String>, config: DetectionConfig) -> Self {
        Self {
            name: name.into(),
            peaks: Vec::new(),
            config,
        }
    }

    /// Build from detector output; peaks are stably sorted by index
    pub fn with_peaks(name: impl Into<String>, config: DetectionConfig, mut peaks: Vec<Peak>) -> Self {
        peaks.sort_by_key(|p| p.index);
        Self {
            name: name.into(),
            peaks,
            config,
        }
    }

    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    /// Insert after any existing peaks at the same index
    pub fn add_peak(&mut self, index: usize, value: f64) {
        let at = self.peaks.partition_point(|p| p.index <= index);
        self.peaks.insert(at, Peak::new(index, value));
    }

    /// Remove every peak at `index`; returns how many were removed
    pub fn remove_peak(&mut self, index: usize) -> usize {
        let before = self.peaks.len();
        self.peaks.retain(|p| p.index != index);
        before - self.peaks.len()
    }
}

/// Per-set summary of detected peaks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakSummary {
    pub count: usize,
    pub mean_abs_value: f64,
    pub max_abs_value: f64,
    /// Mean spacing between consecutive peaks in seconds
    pub mean_interval: Option<f64>,
    pub events_per_minute: f64,
    pub session_duration: f64,
}

impl PeakSummary {
    /// Summarize `set` given the seconds-per-sample `dt` and the session length.
    /// Returns `None` for an empty set.
    pub fn from_set(set: &EventSet, dt: f64, session_duration: f64) -> Option<Self> {
        let peaks = set.peaks();
        if peaks.is_empty() {
            return None;
        }
        let count = peaks.len();
        let abs: Vec<f64> = peaks.iter().map(|p| p.value.abs()).collect();
        let mean_abs_value = abs.iter().sum::<f64>() / count as f64;
        let max_abs_value = abs.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let mean_interval = (count > 1).then(|| {
            let total: f64 = peaks
                .windows(2)
                .map(|w| (w[1].index - w[0].index) as f64 * dt)
                .sum();
            total / (count - 1) as f64
        });

        let events_per_minute = if session_duration > 0.0 {
            count as f64 / session_duration * 60.0
        } else {
            0.0
        };

        Some(Self {
            count,
            mean_abs_value,
            max_abs_value,
            mean_interval,
            events_per_minute,
            session_duration,
        })
    }
}

/// The event namespace of one section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventMap {
    sets: BTreeMap<String, EventSet>,
}

impl EventMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Result<&EventSet> {
        self.sets
            .get(name)
            .ok_or_else(|| CadenceError::EventNotFound(name.to_string()))
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut EventSet> {
        self.sets
            .get_mut(name)
            .ok_or_else(|| CadenceError::EventNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sets.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventSet> {
        self.sets.values()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// First `event_N` not already taken, counting up from the set count
    fn generated_name(&self) -> String {
        let mut n = self.sets.len();
        loop {
            let name = format!("event_{}", n);
            if !self.sets.contains_key(&name) {
                return name;
            }
            n += 1;
        }
    }

    /// Run detection over `data` and store the result under `name`, replacing
    /// any set of the same name. A blank name becomes the first free `event_N`.
    pub fn detect(
        &mut self,
        data: &ProcessedChannels,
        name: &str,
        config: DetectionConfig,
    ) -> Result<&EventSet> {
        let name = match name.trim() {
            "" => self.generated_name(),
            n => n.to_string(),
        };
        let peaks = detect_peaks(
            data.get(config.channel),
            config.threshold,
            config.window,
            config.direction,
        )?;
        info!(
            "Detected {} peaks for '{}' on {} (threshold {}, window {}, {})",
            peaks.len(),
            name,
            config.channel,
            config.threshold,
            config.window,
            config.direction
        );
        let set = EventSet::with_peaks(name.clone(), config, peaks);
        self.sets.insert(name.clone(), set);
        self.get(&name)
    }

    /// Register an empty set for manual editing
    pub fn add_event_type(&mut self, name: &str, channel: Channel) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CadenceError::InvalidParameter(
                "event name must not be empty".to_string(),
            ));
        }
        if self.sets.contains_key(name) {
            return Err(CadenceError::DuplicateEvent(name.to_string()));
        }
        self.sets
            .insert(name.to_string(), EventSet::new(name, DetectionConfig::manual(channel)));
        Ok(())
    }

    pub fn add_peak(&mut self, name: &str, index: usize, value: f64) -> Result<()> {
        self.get_mut(name)?.add_peak(index, value);
        debug!("Added peak {} ({}) to '{}'", index, value, name);
        Ok(())
    }

    /// Add a peak whose value is read from the set's own channel
    pub fn mark_peak(&mut self, data: &ProcessedChannels, name: &str, index: usize) -> Result<Peak> {
        let set = self.get_mut(name)?;
        let series = data.get(set.config.channel);
        let value = *series.get(index).ok_or_else(|| {
            CadenceError::InvalidParameter(format!(
                "index {} outside {} samples",
                index,
                series.len()
            ))
        })?;
        set.add_peak(index, value);
        Ok(Peak::new(index, value))
    }

    pub fn remove_peak(&mut self, name: &str, index: usize) -> Result<usize> {
        let removed = self.get_mut(name)?.remove_peak(index);
        debug!("Removed {} peak(s) at {} from '{}'", removed, index, name);
        Ok(removed)
    }

    pub fn delete_event(&mut self, name: &str) -> Result<EventSet> {
        self.sets
            .remove(name)
            .ok_or_else(|| CadenceError::EventNotFound(name.to_string()))
    }

    pub fn clear_all(&mut self) {
        self.sets.clear();
    }
}
