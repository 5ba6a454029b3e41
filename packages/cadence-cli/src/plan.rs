//! JSON analysis plan: what the `analyze` command runs over a recording.
//!
//! ```json
//! {
//!   "pipeline": { "filter": { "kind": "butterworth", "cutoff_hz": 6.0 } },
//!   "analysis": { "projection": "assumed_100hz" },
//!   "section": { "start_gps_index": 10, "end_gps_index": 80, "name": "Run 1" },
//!   "detections": [
//!     { "name": "left", "channel": "acc_y", "threshold": 2.0, "window": 50, "direction": "pos" },
//!     { "name": "right", "channel": "acc_y", "threshold": 2.0, "window": 50, "direction": "neg" }
//!   ],
//!   "corrections": [ { "action": "remove", "event": "left", "index": 120 } ],
//!   "cycles": { "start": "left", "mid": "right", "end": "left" }
//! }
//! ```

use cadence_rs::{AnalysisConfig, AnalysisSession, Channel, DetectionConfig, PipelineConfig, SectionRef};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisPlan {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub section: Option<SectionPlan>,
    #[serde(default)]
    pub detections: Vec<DetectionPlan>,
    #[serde(default)]
    pub corrections: Vec<Correction>,
    #[serde(default)]
    pub cycles: Option<CyclePlan>,
}

/// Section cut between two GPS fixes (inclusive)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionPlan {
    pub start_gps_index: usize,
    pub end_gps_index: usize,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionPlan {
    #[serde(default)]
    pub name: String,
    /// Create an empty set for manual corrections instead of detecting
    #[serde(default)]
    pub manual: bool,
    #[serde(flatten)]
    pub config: DetectionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Correction {
    /// Without a value the peak takes the channel value at `index`
    Add {
        event: String,
        index: usize,
        #[serde(default)]
        value: Option<f64>,
    },
    Remove { event: String, index: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CyclePlan {
    pub start: String,
    #[serde(default)]
    pub mid: Option<String>,
    pub end: String,
}

impl AnalysisPlan {
    /// Read a plan file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read plan '{}': {}", path.display(), e))?;
        serde_json::from_str(&text)
            .map_err(|e| format!("Invalid plan '{}': {}", path.display(), e))
    }

    /// Cut the section, run detections and corrections, then the cycle
    /// analysis, on an already loaded session.
    pub fn run(&self, session: &mut AnalysisSession) -> cadence_rs::Result<()> {
        if let Some(section) = &self.section {
            let start = session.add_marker(section.start_gps_index, None)?.id;
            let end = session.add_marker(section.end_gps_index, None)?.id;
            let id = session.create_section(start, end, &section.name)?.id.clone();
            session.select_section(SectionRef::Section(id))?;
        }

        for detection in &self.detections {
            if detection.manual {
                add_manual(session, &detection.name, detection.config.channel)?;
            } else {
                let set = session.detect(&detection.name, detection.config.clone())?;
                info!("Detected {} peaks for '{}'", set.len(), set.name);
            }
        }

        for correction in &self.corrections {
            match correction {
                Correction::Add {
                    event,
                    index,
                    value: Some(value),
                } => session.add_peak(event, *index, *value)?,
                Correction::Add {
                    event,
                    index,
                    value: None,
                } => {
                    session.mark_peak(event, *index)?;
                }
                Correction::Remove { event, index } => {
                    session.remove_peak(event, *index)?;
                }
            }
        }

        if let Some(cycles) = &self.cycles {
            let analysis = session.analyze(&cycles.start, cycles.mid.as_deref(), &cycles.end)?;
            info!("Matched {} cycles", analysis.cycles.len());
        }
        Ok(())
    }
}

fn add_manual(session: &mut AnalysisSession, name: &str, channel: Channel) -> cadence_rs::Result<()> {
    session.add_event_type(name, channel)?;
    session.select_event(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_rs::{Direction, FilterKind, TimeProjection};

    #[test]
    fn test_parse_full_plan() {
        let plan: AnalysisPlan = serde_json::from_str(
            r#"{
                "pipeline": { "filter": { "kind": "median", "kernel_size": 5 } },
                "analysis": { "projection": "estimated_rate" },
                "section": { "start_gps_index": 1, "end_gps_index": 4 },
                "detections": [
                    { "name": "up", "channel": "acc_y", "threshold": 2.5, "direction": "pos" },
                    { "name": "taps", "channel": "gyro_mag", "manual": true }
                ],
                "corrections": [
                    { "action": "add", "event": "taps", "index": 12 },
                    { "action": "add", "event": "taps", "index": 30, "value": -1.5 },
                    { "action": "remove", "event": "up", "index": 7 }
                ],
                "cycles": { "start": "up", "end": "up" }
            }"#,
        )
        .unwrap();

        assert_eq!(plan.pipeline.filter, FilterKind::Median { kernel_size: 5 });
        assert_eq!(plan.analysis.projection, TimeProjection::EstimatedRate);
        assert_eq!(plan.section.as_ref().unwrap().name, "");
        assert_eq!(plan.detections[0].config.window, 50);
        assert_eq!(plan.detections[0].config.direction, Direction::Pos);
        assert!(plan.detections[1].manual);
        assert_eq!(
            plan.corrections[1],
            Correction::Add {
                event: "taps".to_string(),
                index: 30,
                value: Some(-1.5)
            }
        );
        assert_eq!(plan.cycles.as_ref().unwrap().mid, None);
    }

    #[test]
    fn test_empty_plan_uses_defaults() {
        let plan: AnalysisPlan = serde_json::from_str("{}").unwrap();
        assert_eq!(plan.pipeline, PipelineConfig::default());
        assert!(plan.detections.is_empty());
        assert!(plan.cycles.is_none());
    }

    #[test]
    fn test_load_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = AnalysisPlan::load(&path).unwrap_err();
        assert!(err.starts_with("Invalid plan"));
        assert!(AnalysisPlan::load(&dir.path().join("missing.json")).is_err());
    }
}
