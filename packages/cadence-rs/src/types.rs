use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Nanoseconds per second, the unit of every raw timestamp.
pub const NANOS_PER_SECOND: f64 = 1e9;

/// One triaxial accelerometer or gyroscope reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    /// Timestamp in nanoseconds
    pub time: i64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl MotionSample {
    pub fn new(time: i64, x: f64, y: f64, z: f64) -> Self {
        Self { time, x, y, z }
    }
}

/// One GPS fix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsSample {
    /// Timestamp in nanoseconds
    pub time: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    /// Ground speed in m/s
    pub speed: f64,
}

/// A user-placed marker on the GPS timeline, used to bound sections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsMarker {
    pub id: usize,
    /// Index into the GPS sample array
    pub index: usize,
    /// Timestamp of the GPS sample at `index` (ns)
    pub time: i64,
    pub label: String,
}

/// Closed time interval in nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn duration_seconds(&self) -> f64 {
        (self.end - self.start) as f64 / NANOS_PER_SECOND
    }

    pub fn contains(&self, time: i64) -> bool {
        time >= self.start && time <= self.end
    }
}

/// A finite, already-collected batch of raw sensor data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recording {
    pub accel: Vec<MotionSample>,
    pub gyro: Vec<MotionSample>,
    pub gps: Vec<GpsSample>,
    #[serde(default)]
    pub device_name: Option<String>,
}

impl Recording {
    pub fn new(accel: Vec<MotionSample>, gyro: Vec<MotionSample>, gps: Vec<GpsSample>) -> Self {
        Self {
            accel,
            gyro,
            gps,
            device_name: None,
        }
    }

    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    /// Elapsed seconds between the first and last accelerometer samples
    pub fn motion_span_seconds(&self) -> Option<f64> {
        span_seconds(self.accel.first()?.time, self.accel.last()?.time)
    }

    /// Elapsed seconds between the first and last GPS fixes
    pub fn gps_span_seconds(&self) -> Option<f64> {
        span_seconds(self.gps.first()?.time, self.gps.last()?.time)
    }

    /// Wall-clock start of the recording, taken from the first GPS fix
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.gps
            .first()
            .map(|p| DateTime::<Utc>::from_timestamp_nanos(p.time))
    }

    /// Motion timestamps, used to map time bounds onto motion indices
    pub fn motion_times(&self) -> Vec<i64> {
        self.accel.iter().map(|s| s.time).collect()
    }
}

fn span_seconds(first: i64, last: i64) -> Option<f64> {
    if last > first {
        Some((last - first) as f64 / NANOS_PER_SECOND)
    } else {
        None
    }
}
