//! Track summaries over GPS fixes.

use crate::sections::Section;
use crate::types::{GpsSample, NANOS_PER_SECOND};
use serde::{Deserialize, Serialize};

/// m/s to km/h
pub const MS_TO_KMH: f64 = 3.6;

/// Distance, speed and descent over a stretch of GPS fixes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub duration_seconds: f64,
    /// Sum of `speed * dt` between consecutive fixes (m)
    pub distance_m: f64,
    pub avg_speed_kmh: f64,
    pub max_speed_kmh: f64,
    /// Sum of altitude drops (m)
    pub descent_m: f64,
}

impl TrackSummary {
    pub fn duration_minutes(&self) -> f64 {
        self.duration_seconds / 60.0
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_m / 1000.0
    }
}

/// Distance and descent accumulated over fixes `from..=to`, each paired with its predecessor
fn accumulate(gps: &[GpsSample], from: usize, to: usize) -> (f64, f64) {
    let mut distance = 0.0;
    let mut descent = 0.0;
    for i in from.max(1)..=to.min(gps.len().saturating_sub(1)) {
        let dt = (gps[i].time - gps[i - 1].time) as f64 / NANOS_PER_SECOND;
        distance += gps[i].speed * dt;
        let d_alt = gps[i].altitude - gps[i - 1].altitude;
        if d_alt < 0.0 {
            descent += -d_alt;
        }
    }
    (distance, descent)
}

fn speed_stats(speeds: impl Iterator<Item = f64>) -> (f64, f64) {
    let (mut sum, mut max, mut n) = (0.0, f64::NEG_INFINITY, 0usize);
    for s in speeds {
        sum += s;
        max = max.max(s);
        n += 1;
    }
    if n == 0 {
        (0.0, 0.0)
    } else {
        (sum / n as f64, max)
    }
}

/// Summary of the whole recording. Speeds average over every fix.
pub fn track_summary(gps: &[GpsSample]) -> TrackSummary {
    let (Some(first), Some(last)) = (gps.first(), gps.last()) else {
        return TrackSummary::default();
    };
    let (distance_m, descent_m) = accumulate(gps, 1, gps.len() - 1);
    let (avg_speed_kmh, max_speed_kmh) = speed_stats(gps.iter().map(|p| p.speed * MS_TO_KMH));
    TrackSummary {
        duration_seconds: (last.time - first.time) as f64 / NANOS_PER_SECOND,
        distance_m,
        avg_speed_kmh,
        max_speed_kmh,
        descent_m,
    }
}

/// Summary of one section over GPS fixes `i0 + 1 ..= i1`
pub fn section_summary(gps: &[GpsSample], section: &Section) -> TrackSummary {
    let (i0, i1) = section.gps_index_range;
    let upper = i1.min(gps.len().saturating_sub(1));
    let (distance_m, descent_m) = accumulate(gps, i0 + 1, upper);
    let speeds = gps
        .get(i0 + 1..=upper)
        .unwrap_or(&[])
        .iter()
        .map(|p| p.speed * MS_TO_KMH);
    let (avg_speed_kmh, max_speed_kmh) = speed_stats(speeds);
    TrackSummary {
        duration_seconds: section.duration_seconds,
        distance_m,
        avg_speed_kmh,
        max_speed_kmh,
        descent_m,
    }
}

/// Mean speed of the fixes whose time lies in `[t_start, t_end]`, times the
/// elapsed seconds. Zero when no fix falls inside.
pub fn distance_between(gps: &[GpsSample], t_start: i64, t_end: i64) -> f64 {
    let (sum, n) = gps
        .iter()
        .filter(|p| p.time >= t_start && p.time <= t_end)
        .fold((0.0, 0usize), |(s, n), p| (s + p.speed, n + 1));
    if n == 0 {
        return 0.0;
    }
    sum / n as f64 * ((t_end - t_start) as f64 / NANOS_PER_SECOND)
}
