//! CSV report: measurement info, GPS section table, cycle statistics.
//!
//! The file starts with a UTF-8 BOM so spreadsheet tools pick the encoding.

use cadence_rs::{AnalysisSession, CycleStatistics};
use std::path::Path;

const BOM: &str = "\u{FEFF}";

type CsvWriter<'a> = csv::Writer<&'a mut Vec<u8>>;

fn csv_err(e: impl std::fmt::Display) -> String {
    format!("Failed to write report: {}", e)
}

fn row(w: &mut CsvWriter<'_>, fields: &[&str]) -> Result<(), String> {
    w.write_record(fields).map_err(csv_err)
}

/// Write one block of rows through its own writer over `buf`
fn write_block<F>(buf: &mut Vec<u8>, block: F) -> Result<(), String>
where
    F: FnOnce(&mut CsvWriter<'_>) -> Result<(), String>,
{
    let mut w = csv::WriterBuilder::new().flexible(true).from_writer(buf);
    block(&mut w)?;
    w.flush().map_err(csv_err)
}

fn measurement_info(w: &mut CsvWriter<'_>, session: &AnalysisSession) -> Result<(), String> {
    let recording = session.recording();
    let track = session.track_summary();
    let started = recording.started_at();
    let date = started.map(|t| t.format("%Y-%m-%d").to_string()).unwrap_or_default();
    let time = started.map(|t| t.format("%H:%M:%S").to_string()).unwrap_or_default();

    row(w, &["=== Measurement Info ==="])?;
    row(w, &["Date", &date])?;
    row(w, &["Time", &time])?;
    row(w, &["Device", recording.device_name.as_deref().unwrap_or("Unknown")])?;
    row(w, &["Total Duration", &format!("{:.1} min", track.duration_minutes())])?;
    row(w, &["Total Distance", &format!("{:.2} km", track.distance_km())])?;
    row(w, &["Avg Speed", &format!("{:.1} km/h", track.avg_speed_kmh)])?;
    row(w, &["Max Speed", &format!("{:.1} km/h", track.max_speed_kmh)])
}

fn section_table(w: &mut CsvWriter<'_>, session: &AnalysisSession) -> Result<(), String> {
    row(w, &["=== GPS Section Analysis ==="])?;
    if session.sections().is_empty() {
        return row(w, &["No sections recorded."]);
    }
    row(
        w,
        &[
            "Name",
            "Duration (s)",
            "Distance (m)",
            "Avg Speed (km/h)",
            "Max Speed (km/h)",
            "Descent (m)",
        ],
    )?;
    for section in session.sections() {
        let summary = session
            .section_summary(&section.id)
            .map_err(|e| e.to_string())?;
        row(
            w,
            &[
                &section.name,
                &format!("{:.1}", section.duration_seconds),
                &format!("{:.1}", summary.distance_m),
                &format!("{:.1}", summary.avg_speed_kmh),
                &format!("{:.1}", summary.max_speed_kmh),
                &format!("{:.1}", summary.descent_m),
            ],
        )?;
    }
    Ok(())
}

fn cycle_block(w: &mut CsvWriter<'_>, stats: Option<&CycleStatistics>) -> Result<(), String> {
    row(w, &["=== Cycle Interval Analysis ==="])?;
    let Some(s) = stats else {
        return row(w, &["No cycle analysis performed yet."]);
    };
    row(w, &["Total Events (Count)", &s.count.to_string()])?;
    row(w, &["Avg Duration (s)", &format!("{:.3}", s.mean_duration)])?;
    row(w, &["Min Duration (s)", &format!("{:.3}", s.min_duration)])?;
    row(w, &["Max Duration (s)", &format!("{:.3}", s.max_duration)])?;
    row(w, &["SD (Standard Deviation)", &format!("{:.3}", s.std_duration)])?;
    row(w, &["Frequency (Hz)", &format!("{:.2}", s.frequency)])?;
    row(w, &["Distance per Event (m)", &format!("{:.2}", s.distance_per_cycle)])?;
    row(w, &["Avg Max Acceleration (g)", &format!("{:.2}", s.mean_max_acceleration)])?;
    row(
        w,
        &["Avg Acceleration (+ Peaks)", &format!("{:.2}", s.mean_acceleration.unwrap_or(0.0))],
    )?;
    row(
        w,
        &["Avg Deceleration (- Peaks)", &format!("{:.2}", s.mean_deceleration.unwrap_or(0.0))],
    )?;
    if let (Some(p1), Some(p2)) = (s.mean_phase1, s.mean_phase2) {
        row(w, &["Phase 1 Avg (s)", &format!("{:.3}", p1)])?;
        row(w, &["Phase 2 Avg (s)", &format!("{:.3}", p2)])?;
    }
    Ok(())
}

/// Render the report for the current state of `session`.
pub fn render(session: &AnalysisSession) -> Result<Vec<u8>, String> {
    let mut buf = BOM.as_bytes().to_vec();

    write_block(&mut buf, |w| measurement_info(w, session))?;
    buf.push(b'\n');
    write_block(&mut buf, |w| section_table(w, session))?;
    buf.push(b'\n');
    write_block(&mut buf, |w| {
        cycle_block(w, session.latest_analysis().map(|a| &a.statistics))
    })?;

    Ok(buf)
}

pub fn write(session: &AnalysisSession, path: &Path) -> Result<(), String> {
    let bytes = render(session)?;
    std::fs::write(path, bytes)
        .map_err(|e| format!("Failed to write report '{}': {}", path.display(), e))
}
