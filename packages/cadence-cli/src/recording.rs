//! Recording folder discovery and CSV ingestion.
//!
//! A recording folder holds one `*Location*.csv`, one `*Accelerometer*.csv`
//! and one `*Gyroscope*.csv` (uncalibrated variants are ignored), plus an
//! optional `*Metadata*.csv` carrying the device name.

use cadence_rs::{GpsSample, MotionSample, Recording};
use glob::MatchOptions;
use log::{debug, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Files found in a recording folder
#[derive(Debug, Default, Serialize)]
pub struct RecordingFiles {
    pub location: Option<PathBuf>,
    pub accelerometer: Option<PathBuf>,
    pub gyroscope: Option<PathBuf>,
    pub metadata: Option<PathBuf>,
    pub ignored: Vec<PathBuf>,
}

impl RecordingFiles {
    /// Names of the required files that are absent
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.location.is_none() {
            missing.push("Location");
        }
        if self.accelerometer.is_none() {
            missing.push("Accelerometer");
        }
        if self.gyroscope.is_none() {
            missing.push("Gyroscope");
        }
        missing
    }
}

/// Classify the CSV files of `dir` by name.
pub fn discover(dir: &Path) -> Result<RecordingFiles, String> {
    if !dir.is_dir() {
        return Err(format!("Recording folder not found: {}", dir.display()));
    }
    let pattern = dir.join("*.csv");
    let pattern = pattern
        .to_str()
        .ok_or_else(|| format!("Recording folder path is not valid UTF-8: {}", dir.display()))?;
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };

    let mut paths: Vec<PathBuf> = glob::glob_with(pattern, options)
        .map_err(|e| format!("Invalid recording folder pattern: {}", e))?
        .filter_map(|entry| entry.ok())
        .collect();
    paths.sort();

    let mut files = RecordingFiles::default();
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let slot = if name.contains("location") {
            &mut files.location
        } else if name.contains("accelerometer") && !name.contains("uncalibrated") {
            &mut files.accelerometer
        } else if name.contains("gyroscope") && !name.contains("uncalibrated") {
            &mut files.gyroscope
        } else if name.contains("metadata") {
            &mut files.metadata
        } else {
            files.ignored.push(path);
            continue;
        };
        if slot.is_some() {
            files.ignored.push(path);
        } else {
            *slot = Some(path);
        }
    }
    Ok(files)
}

const ALIASES: &[(&str, &[&str])] = &[
    ("time", &["timestamp"]),
    ("latitude", &["lat"]),
    ("longitude", &["lon", "long"]),
    ("altitude", &["alt", "height"]),
];

/// Rows keyed by lower-cased header, with column aliases resolved
fn read_rows(path: &Path) -> Result<Vec<HashMap<String, String>>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| format!("Failed to open '{}': {}", path.display(), e))?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| format!("Failed to read header of '{}': {}", path.display(), e))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_lowercase())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| format!("Malformed CSV in '{}': {}", path.display(), e))?;
        let mut row: HashMap<String, String> = headers
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_string))
            .collect();
        for (canonical, aliases) in ALIASES {
            if row.get(*canonical).map_or(true, |v| v.is_empty()) {
                if let Some(v) = aliases.iter().find_map(|a| row.get(*a).filter(|v| !v.is_empty())) {
                    let v = v.clone();
                    row.insert(canonical.to_string(), v);
                }
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

fn parse_time(value: &str) -> Option<i64> {
    value
        .parse::<i64>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v as i64))
}

fn field(row: &HashMap<String, String>, name: &str) -> Option<f64> {
    row.get(name)?.parse::<f64>().ok()
}

fn parse_motion(rows: &[HashMap<String, String>]) -> Option<Vec<MotionSample>> {
    rows.iter()
        .map(|row| {
            Some(MotionSample::new(
                parse_time(row.get("time")?)?,
                field(row, "x")?,
                field(row, "y")?,
                field(row, "z")?,
            ))
        })
        .collect()
}

fn parse_gps(rows: &[HashMap<String, String>]) -> Option<Vec<GpsSample>> {
    rows.iter()
        .map(|row| {
            Some(GpsSample {
                time: parse_time(row.get("time")?)?,
                latitude: field(row, "latitude")?,
                longitude: field(row, "longitude")?,
                altitude: field(row, "altitude")?,
                speed: field(row, "speed")?,
            })
        })
        .collect()
}

fn load_motion(path: &Path) -> Result<Vec<MotionSample>, String> {
    let rows = read_rows(path)?;
    parse_motion(&rows).ok_or_else(|| {
        format!(
            "'{}' needs numeric time, x, y and z columns on every row",
            path.display()
        )
    })
}

fn load_gps(path: &Path) -> Result<Vec<GpsSample>, String> {
    let rows = read_rows(path)?;
    parse_gps(&rows).ok_or_else(|| {
        format!(
            "'{}' needs numeric time, latitude, longitude, altitude and speed columns on every row",
            path.display()
        )
    })
}

/// `device name` from the first data row of a metadata file
fn read_device_name(path: &Path) -> Option<String> {
    match read_rows(path) {
        Ok(rows) => rows
            .into_iter()
            .next()
            .and_then(|mut row| row.remove("device name"))
            .filter(|name| !name.is_empty()),
        Err(e) => {
            warn!("Ignoring metadata: {}", e);
            None
        }
    }
}

/// Load every sample of a recording folder.
pub fn load(dir: &Path) -> Result<(Recording, RecordingFiles), String> {
    let files = discover(dir)?;
    let missing = files.missing();
    if !missing.is_empty() {
        return Err(format!(
            "Missing required files in {}: {}",
            dir.display(),
            missing.join(", ")
        ));
    }
    let (Some(location), Some(accel), Some(gyro)) =
        (&files.location, &files.accelerometer, &files.gyroscope)
    else {
        return Err(format!("Incomplete recording folder: {}", dir.display()));
    };

    let gps = load_gps(location)?;
    let accel = load_motion(accel)?;
    let gyro = load_motion(gyro)?;
    debug!(
        "Loaded {} GPS, {} accel, {} gyro rows from {}",
        gps.len(),
        accel.len(),
        gyro.len(),
        dir.display()
    );

    let mut recording = Recording::new(accel, gyro, gps);
    if let Some(name) = files.metadata.as_deref().and_then(read_device_name) {
        recording = recording.with_device_name(name);
    }
    Ok((recording, files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_discover_classifies_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Location.csv", "time\n");
        write(dir.path(), "Accelerometer.csv", "time\n");
        write(dir.path(), "AccelerometerUncalibrated.csv", "time\n");
        write(dir.path(), "Gyroscope.csv", "time\n");
        write(dir.path(), "Metadata.csv", "time\n");
        write(dir.path(), "notes.txt", "");

        let files = discover(dir.path()).unwrap();
        assert!(files.missing().is_empty());
        assert!(files.metadata.is_some());
        assert_eq!(files.ignored.len(), 1);
        assert!(files.ignored[0].ends_with("AccelerometerUncalibrated.csv"));
    }

    #[test]
    fn test_discover_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Location.csv", "time\n");
        let files = discover(dir.path()).unwrap();
        assert_eq!(files.missing(), vec!["Accelerometer", "Gyroscope"]);
        assert!(discover(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn test_load_with_aliases_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "Location.csv",
            "Timestamp,Lat,Long,Height,Speed\n1000000000,46.1,7.2,1500.5,3.2\n2000000000,46.2,7.3,1499.0,4.0\n",
        );
        write(
            dir.path(),
            "Accelerometer.csv",
            "time,seconds_elapsed,z,y,x\n0,0,9.8,0.1,\"0.2\"\n10000000,0.01,9.7,0.2,0.3\n",
        );
        write(
            dir.path(),
            "Gyroscope.csv",
            "time,seconds_elapsed,z,y,x\n0,0,0.01,0.02,0.03\n10000000,0.01,0.01,0.02,0.03\n",
        );
        write(
            dir.path(),
            "Metadata.csv",
            "version,device name,recording time\n1,Pixel 8,2024-01-01\n",
        );

        let (recording, _) = load(dir.path()).unwrap();
        assert_eq!(recording.gps.len(), 2);
        assert_eq!(recording.gps[0].time, 1_000_000_000);
        assert_eq!(recording.gps[1].altitude, 1499.0);
        assert_eq!(recording.gps[0].longitude, 7.2);
        assert_eq!(recording.accel[0].x, 0.2);
        assert_eq!(recording.accel[1].z, 9.7);
        assert_eq!(recording.gyro.len(), 2);
        assert_eq!(recording.device_name.as_deref(), Some("Pixel 8"));
    }

    #[test]
    fn test_load_rejects_non_numeric_rows() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Location.csv", "time,latitude,longitude,altitude,speed\n0,1,2,3,4\n");
        write(dir.path(), "Accelerometer.csv", "time,x,y,z\n0,a,0,0\n");
        write(dir.path(), "Gyroscope.csv", "time,x,y,z\n0,0,0,0\n");
        let err = load(dir.path()).unwrap_err();
        assert!(err.contains("Accelerometer"), "{}", err);
    }

    #[test]
    fn test_parse_time_accepts_float_notation() {
        assert_eq!(parse_time("1700000000000000000"), Some(1_700_000_000_000_000_000));
        assert_eq!(parse_time("1.5e9"), Some(1_500_000_000));
        assert_eq!(parse_time("x"), None);
    }
}
