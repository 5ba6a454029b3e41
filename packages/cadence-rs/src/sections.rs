//! GPS markers and named, time-bounded sections of a session.
//!
//! A section owns an independent copy of the processed channels between its
//! two markers and its own event namespace. Sections are immutable once created.

use crate::channels::ProcessedChannels;
use crate::error::{CadenceError, Result};
use crate::events::EventMap;
use crate::types::{GpsMarker, GpsSample, TimeRange};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::mem;
use std::str::FromStr;

/// A named sub-range of the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub name: String,
    pub time_range: TimeRange,
    /// Inclusive GPS index bounds `[i0, i1]`
    pub gps_index_range: (usize, usize),
    /// Half-open motion index bounds `[m0, m1)`
    pub motion_index_range: (usize, usize),
    pub data: ProcessedChannels,
    pub duration_seconds: f64,
}

impl Section {
    pub fn motion_sample_count(&self) -> usize {
        self.motion_index_range.1 - self.motion_index_range.0
    }
}

/// The full recording or one saved section
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionRef {
    #[default]
    Full,
    Section(String),
}

impl fmt::Display for SectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionRef::Full => f.write_str("full"),
            SectionRef::Section(id) => f.write_str(id),
        }
    }
}

impl FromStr for SectionRef {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" => Err(CadenceError::SectionNotFound(String::new())),
            "full" => Ok(SectionRef::Full),
            id => Ok(SectionRef::Section(id.to_string())),
        }
    }
}

/// First index with `time >= t0`, and first index with `time > t1`
/// (both default to `times.len()`).
pub fn motion_bounds(times: &[i64], t0: i64, t1: i64) -> (usize, usize) {
    let m0 = times.iter().position(|&t| t >= t0).unwrap_or(times.len());
    let m1 = times.iter().position(|&t| t > t1).unwrap_or(times.len());
    (m0, m1.max(m0))
}

/// Markers, saved sections and the event maps of every inactive section
#[derive(Debug, Clone, Default)]
pub struct SectionStore {
    markers: Vec<GpsMarker>,
    next_marker_id: usize,
    sections: Vec<Section>,
    stored_events: BTreeMap<SectionRef, EventMap>,
}

impl SectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markers(&self) -> &[GpsMarker] {
        &self.markers
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn marker(&self, id: usize) -> Result<&GpsMarker> {
        self.markers
            .iter()
            .find(|m| m.id == id)
            .ok_or(CadenceError::MarkerNotFound(id))
    }

    pub fn section(&self, id: &str) -> Result<&Section> {
        self.sections
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| CadenceError::SectionNotFound(id.to_string()))
    }

    /// Place a marker on GPS fix `gps_index`. Without a label the fix's
    /// wall-clock time is used.
    pub fn add_marker(
        &mut self,
        gps: &[GpsSample],
        gps_index: usize,
        label: Option<&str>,
    ) -> Result<&GpsMarker> {
        let fix = gps.get(gps_index).ok_or_else(|| {
            CadenceError::InvalidParameter(format!(
                "GPS index {} outside {} fixes",
                gps_index,
                gps.len()
            ))
        })?;
        let label = match label {
            Some(l) if !l.trim().is_empty() => l.trim().to_string(),
            _ => format!(
                "Marker ({})",
                DateTime::<Utc>::from_timestamp_nanos(fix.time).format("%H:%M:%S")
            ),
        };
        let marker = GpsMarker {
            id: self.next_marker_id,
            index: gps_index,
            time: fix.time,
            label,
        };
        self.next_marker_id += 1;
        debug!("Added marker {} at GPS index {}", marker.id, gps_index);
        self.markers.push(marker);
        Ok(&self.markers[self.markers.len() - 1])
    }

    pub fn remove_marker(&mut self, id: usize) -> Result<GpsMarker> {
        let pos = self
            .markers
            .iter()
            .position(|m| m.id == id)
            .ok_or(CadenceError::MarkerNotFound(id))?;
        Ok(self.markers.remove(pos))
    }

    /// Save a section between two markers, slicing `channels` by `motion_times`.
    ///
    /// Rejected when either marker is missing or the start marker's GPS index is
    /// not before the end marker's. A blank name becomes `Section N`.
    pub fn create_section(
        &mut self,
        start_marker: usize,
        end_marker: usize,
        name: &str,
        motion_times: &[i64],
        channels: &ProcessedChannels,
    ) -> Result<&Section> {
        let start = self.marker(start_marker)?;
        let end = self.marker(end_marker)?;
        if start.index >= end.index {
            return Err(CadenceError::InvalidSection(format!(
                "start marker index {} must precede end marker index {}",
                start.index, end.index
            )));
        }

        let time_range = TimeRange {
            start: start.time,
            end: end.time,
        };
        let gps_index_range = (start.index, end.index);

        let usable = &motion_times[..motion_times.len().min(channels.len())];
        let (m0, m1) = motion_bounds(usable, time_range.start, time_range.end);

        let n = self.sections.len();
        let id = format!("sec_{}", n);
        let name = match name.trim() {
            "" => format!("Section {}", n + 1),
            s => s.to_string(),
        };

        let section = Section {
            id: id.clone(),
            name,
            time_range,
            gps_index_range,
            motion_index_range: (m0, m1),
            data: channels.slice(m0..m1),
            duration_seconds: time_range.duration_seconds(),
        };
        info!(
            "Saved section '{}' ({}): motion [{}, {}), {:.1}s",
            section.name, section.id, m0, m1, section.duration_seconds
        );

        self.stored_events
            .entry(SectionRef::Section(id))
            .or_default();
        self.sections.push(section);
        Ok(&self.sections[n])
    }

    /// Store `active` under `outgoing` and load the map of `incoming` into it
    pub fn swap_events(
        &mut self,
        outgoing: &SectionRef,
        incoming: &SectionRef,
        active: &mut EventMap,
    ) -> Result<()> {
        if let SectionRef::Section(id) = incoming {
            self.section(id)?;
        }
        self.stored_events
            .insert(outgoing.clone(), mem::take(active));
        *active = self.stored_events.remove(incoming).unwrap_or_default();
        debug!(
            "Switched events {} -> {} ({} sets)",
            outgoing,
            incoming,
            active.len()
        );
        Ok(())
    }

    /// Event map stored for an inactive section
    pub fn stored_events(&self, section: &SectionRef) -> Option<&EventMap> {
        self.stored_events.get(section)
    }

    /// Drop everything (markers, sections, stored events)
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
