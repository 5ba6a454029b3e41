use crate::error::{CadenceError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Names of the eight processed motion channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    AccX,
    AccY,
    AccZ,
    AccMag,
    GyroX,
    GyroY,
    GyroZ,
    GyroMag,
}

impl Channel {
    pub const ALL: [Channel; 8] = [
        Channel::AccX,
        Channel::AccY,
        Channel::AccZ,
        Channel::AccMag,
        Channel::GyroX,
        Channel::GyroY,
        Channel::GyroZ,
        Channel::GyroMag,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::AccX => "acc_x",
            Channel::AccY => "acc_y",
            Channel::AccZ => "acc_z",
            Channel::AccMag => "acc_mag",
            Channel::GyroX => "gyro_x",
            Channel::GyroY => "gyro_y",
            Channel::GyroZ => "gyro_z",
            Channel::GyroMag => "gyro_mag",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self> {
        Channel::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CadenceError::UnknownChannel(s.to_string()))
    }
}

/// Cleaned motion channels; every series has the same length
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessedChannels {
    pub acc_x: Vec<f64>,
    pub acc_y: Vec<f64>,
    pub acc_z: Vec<f64>,
    pub acc_mag: Vec<f64>,
    pub gyro_x: Vec<f64>,
    pub gyro_y: Vec<f64>,
    pub gyro_z: Vec<f64>,
    pub gyro_mag: Vec<f64>,
}

/// Every channel value at one index, for playback read-back
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelSample {
    pub index: usize,
    pub acc_x: f64,
    pub acc_y: f64,
    pub acc_z: f64,
    pub acc_mag: f64,
    pub gyro_x: f64,
    pub gyro_y: f64,
    pub gyro_z: f64,
    pub gyro_mag: f64,
}

fn magnitude(x: &[f64], y: &[f64], z: &[f64]) -> Vec<f64> {
    x.iter()
        .zip(y)
        .zip(z)
        .map(|((x, y), z)| (x * x + y * y + z * z).sqrt())
        .collect()
}

impl ProcessedChannels {
    /// Assemble channels from filtered axes, deriving both magnitudes
    pub fn from_axes(accel: [Vec<f64>; 3], gyro: [Vec<f64>; 3]) -> Self {
        let [acc_x, acc_y, acc_z] = accel;
        let [gyro_x, gyro_y, gyro_z] = gyro;
        let acc_mag = magnitude(&acc_x, &acc_y, &acc_z);
        let gyro_mag = magnitude(&gyro_x, &gyro_y, &gyro_z);
        Self {
            acc_x,
            acc_y,
            acc_z,
            acc_mag,
            gyro_x,
            gyro_y,
            gyro_z,
            gyro_mag,
        }
    }

    pub fn get(&self, channel: Channel) -> &[f64] {
        match channel {
            Channel::AccX => &self.acc_x,
            Channel::AccY => &self.acc_y,
            Channel::AccZ => &self.acc_z,
            Channel::AccMag => &self.acc_mag,
            Channel::GyroX => &self.gyro_x,
            Channel::GyroY => &self.gyro_y,
            Channel::GyroZ => &self.gyro_z,
            Channel::GyroMag => &self.gyro_mag,
        }
    }

    /// Sample count (length of `acc_x`, equal to every other channel)
    pub fn len(&self) -> usize {
        self.acc_x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.acc_x.is_empty()
    }

    /// Independent copy of `range` across every channel.
    ///
    /// Panics if `range` exceeds the channel length.
    pub fn slice(&self, range: Range<usize>) -> Self {
        let cut = |v: &Vec<f64>| v[range.clone()].to_vec();
        Self {
            acc_x: cut(&self.acc_x),
            acc_y: cut(&self.acc_y),
            acc_z: cut(&self.acc_z),
            acc_mag: cut(&self.acc_mag),
            gyro_x: cut(&self.gyro_x),
            gyro_y: cut(&self.gyro_y),
            gyro_z: cut(&self.gyro_z),
            gyro_mag: cut(&self.gyro_mag),
        }
    }

    pub fn sample_at(&self, index: usize) -> Option<ChannelSample> {
        if index >= self.len() {
            return None;
        }
        Some(ChannelSample {
            index,
            acc_x: self.acc_x[index],
            acc_y: self.acc_y[index],
            acc_z: self.acc_z[index],
            acc_mag: self.acc_mag[index],
            gyro_x: self.gyro_x[index],
            gyro_y: self.gyro_y[index],
            gyro_z: self.gyro_z[index],
            gyro_mag: self.gyro_mag[index],
        })
    }

    /// Maximum of `|value|` over the inclusive index range
    pub fn max_abs(&self, channel: Channel, start: usize, end: usize) -> f64 {
        let data = self.get(channel);
        let end = end.min(data.len().saturating_sub(1));
        if data.is_empty() || start > end {
            return 0.0;
        }
        data[start..=end]
            .iter()
            .fold(f64::NEG_INFINITY, |m, v| m.max(v.abs()))
    }
}
