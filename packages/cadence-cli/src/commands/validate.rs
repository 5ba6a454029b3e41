use crate::cli::ValidateArgs;
use crate::exit_codes;
use crate::output;
use crate::recording::{self, RecordingFiles};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct ValidateOutput {
    dir: String,
    exists: bool,
    files: Option<RecordingFiles>,
    missing: Vec<&'static str>,
    accel_samples: Option<usize>,
    gyro_samples: Option<usize>,
    gps_samples: Option<usize>,
    device: Option<String>,
    error: Option<String>,
}

fn validate(dir: &str) -> ValidateOutput {
    let path = Path::new(dir);
    let mut result = ValidateOutput {
        dir: dir.to_string(),
        exists: path.is_dir(),
        files: None,
        missing: Vec::new(),
        accel_samples: None,
        gyro_samples: None,
        gps_samples: None,
        device: None,
        error: None,
    };

    match recording::load(path) {
        Ok((rec, files)) => {
            result.accel_samples = Some(rec.accel.len());
            result.gyro_samples = Some(rec.gyro.len());
            result.gps_samples = Some(rec.gps.len());
            result.device = rec.device_name;
            if rec.gps.is_empty() || rec.accel.is_empty() {
                result.error = Some("Recording has no GPS or accelerometer rows".to_string());
            }
            result.files = Some(files);
        }
        Err(msg) => {
            if let Ok(files) = recording::discover(path) {
                result.missing = files.missing();
                result.files = Some(files);
            }
            result.error = Some(msg);
        }
    }
    result
}

pub fn execute(args: ValidateArgs) -> i32 {
    let result = validate(&args.dir);

    if args.json {
        if let Err(e) = output::emit(&result, false, None) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else if let Some(ref err) = result.error {
        eprintln!("Error: {}", err);
    } else {
        println!(
            "Recording '{}' is valid ({} accel, {} gyro, {} GPS rows)",
            args.dir,
            result.accel_samples.unwrap_or(0),
            result.gyro_samples.unwrap_or(0),
            result.gps_samples.unwrap_or(0)
        );
    }

    if result.error.is_some() {
        exit_codes::INPUT_ERROR
    } else {
        exit_codes::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_missing_folder() {
        let result = validate("/nonexistent/recording");
        assert!(!result.exists);
        assert!(result.files.is_none());
        assert!(result.error.unwrap().contains("not found"));
    }

    #[test]
    fn test_validate_lists_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Location.csv"), "time\n").unwrap();
        let result = validate(dir.path().to_str().unwrap());
        assert!(result.exists);
        assert_eq!(result.missing, vec!["Accelerometer", "Gyroscope"]);
        assert!(result.error.is_some());
    }
}
