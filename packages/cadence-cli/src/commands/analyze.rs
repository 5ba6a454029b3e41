use crate::cli::{self, AnalyzeArgs};
use crate::commands::filter_defaults;
use crate::exit_codes;
use crate::output;
use crate::plan::{AnalysisPlan, SectionPlan};
use crate::recording;
use crate::report;
use cadence_rs::{
    AnalysisSession, CycleAnalysis, DetectionConfig, Peak, PeakSummary, PipelineConfig, SectionRef,
    TimeRange, TrackSummary,
};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct RecordingInfo<'a> {
    dir: &'a str,
    device: Option<&'a str>,
    started_at: Option<String>,
    accel_samples: usize,
    gyro_samples: usize,
    gps_samples: usize,
}

#[derive(Serialize)]
struct PipelineInfo<'a> {
    config: &'a PipelineConfig,
    sample_rate: f64,
    samples: usize,
    processing_time_ms: f64,
}

#[derive(Serialize)]
struct SectionInfo<'a> {
    id: &'a str,
    name: &'a str,
    time_range: TimeRange,
    gps_index_range: (usize, usize),
    motion_index_range: (usize, usize),
    duration_seconds: f64,
    summary: TrackSummary,
}

#[derive(Serialize)]
struct EventInfo<'a> {
    name: &'a str,
    config: &'a DetectionConfig,
    peaks: &'a [Peak],
    summary: Option<PeakSummary>,
}

#[derive(Serialize)]
struct AnalyzeOutput<'a> {
    recording: RecordingInfo<'a>,
    pipeline: PipelineInfo<'a>,
    track: TrackSummary,
    sections: Vec<SectionInfo<'a>>,
    active_section: &'a SectionRef,
    session_duration: f64,
    dt: f64,
    events: Vec<EventInfo<'a>>,
    analysis: Option<&'a CycleAnalysis>,
}

/// Plan file (or the empty plan) with the command-line overrides applied
fn resolve_plan(args: &AnalyzeArgs) -> Result<AnalysisPlan, String> {
    let mut plan = match &args.plan {
        Some(path) => AnalysisPlan::load(Path::new(path))?,
        None => AnalysisPlan::default(),
    };

    if let Some(ref selector) = args.filter {
        let (d1, d2) = filter_defaults(selector);
        plan.pipeline = PipelineConfig::from_selector(
            selector,
            args.param1.unwrap_or(d1),
            args.param2.unwrap_or(d2),
        );
    }

    if let Some(ref section) = args.section {
        let (start, end) = cli::parse_gps_range(section)?;
        plan.section = Some(SectionPlan {
            start_gps_index: start,
            end_gps_index: end,
            name: String::new(),
        });
    }
    Ok(plan)
}

fn build_output<'a>(session: &'a AnalysisSession, dir: &'a str) -> Result<AnalyzeOutput<'a>, String> {
    let recording = session.recording();
    let pipeline = session.pipeline();

    let sections = session
        .sections()
        .iter()
        .map(|s| {
            Ok(SectionInfo {
                id: &s.id,
                name: &s.name,
                time_range: s.time_range,
                gps_index_range: s.gps_index_range,
                motion_index_range: s.motion_index_range,
                duration_seconds: s.duration_seconds,
                summary: session.section_summary(&s.id).map_err(|e| e.to_string())?,
            })
        })
        .collect::<Result<Vec<_>, String>>()?;

    let events = session
        .events()
        .iter()
        .map(|set| {
            Ok(EventInfo {
                name: &set.name,
                config: &set.config,
                peaks: set.peaks(),
                summary: session.peak_summary(&set.name).map_err(|e| e.to_string())?,
            })
        })
        .collect::<Result<Vec<_>, String>>()?;

    Ok(AnalyzeOutput {
        recording: RecordingInfo {
            dir,
            device: recording.device_name.as_deref(),
            started_at: recording.started_at().map(|t| t.to_rfc3339()),
            accel_samples: recording.accel.len(),
            gyro_samples: recording.gyro.len(),
            gps_samples: recording.gps.len(),
        },
        pipeline: PipelineInfo {
            config: &pipeline.config,
            sample_rate: pipeline.sample_rate,
            samples: pipeline.channels.len(),
            processing_time_ms: pipeline.processing_time_ms,
        },
        track: session.track_summary(),
        sections,
        active_section: session.active_section(),
        session_duration: session.session_duration(),
        dt: session.dt(),
        events,
        analysis: session.latest_analysis(),
    })
}

pub fn execute(args: AnalyzeArgs) -> i32 {
    let plan = match resolve_plan(&args) {
        Ok(p) => p,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let (recording, _) = match recording::load(Path::new(&args.dir)) {
        Ok(r) => r,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if !args.quiet {
        eprintln!("Analyzing recording {}...", args.dir);
        eprintln!("  Filter: {}", plan.pipeline.filter.selector());
        eprintln!("  Detections: {}", plan.detections.len());
    }

    let mut session = AnalysisSession::new(recording, plan.pipeline.clone())
        .with_analysis_config(plan.analysis.clone());

    if let Err(e) = plan.run(&mut session) {
        eprintln!("Analysis failed: {}", e);
        return exit_codes::ANALYSIS_ERROR;
    }

    let result = match build_output(&session, &args.dir) {
        Ok(r) => r,
        Err(msg) => {
            eprintln!("Analysis failed: {}", msg);
            return exit_codes::ANALYSIS_ERROR;
        }
    };

    if let Err(e) = output::emit(&result, args.compact, args.output.as_deref()) {
        eprintln!("Error: {}", e);
        return exit_codes::EXECUTION_ERROR;
    }

    if let Some(ref path) = args.report {
        if let Err(e) = report::write(&session, Path::new(path)) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    }

    if !args.quiet {
        if let Some(analysis) = session.latest_analysis() {
            eprintln!(
                "  Cycles: {} (mean {:.3} s)",
                analysis.statistics.count, analysis.statistics.mean_duration
            );
        }
        if let Some(ref path) = args.output {
            eprintln!("Results written to {}", path);
        }
        if let Some(ref path) = args.report {
            eprintln!("Report written to {}", path);
        }
    }

    exit_codes::SUCCESS
}
