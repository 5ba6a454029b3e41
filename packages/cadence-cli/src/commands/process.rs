use crate::cli::ProcessArgs;
use crate::exit_codes;
use crate::output;
use crate::recording;
use cadence_rs::pipeline;
use cadence_rs::{Channel, ChannelSample, PipelineConfig, ProcessedChannels};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Serialize)]
struct ProcessOutput<'a> {
    config: &'a PipelineConfig,
    sample_rate: f64,
    samples: usize,
    processing_time_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    channels: Option<BTreeMap<&'static str, &'a [f64]>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample: Option<ChannelSample>,
}

/// Requested channels in catalog order, all eight when none are named
fn select_channels(names: Option<&[String]>) -> Result<Vec<Channel>, String> {
    let Some(names) = names else {
        return Ok(Channel::ALL.to_vec());
    };
    let mut selected = names
        .iter()
        .map(|n| n.parse::<Channel>().map_err(|e| e.to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    selected.sort();
    selected.dedup();
    Ok(selected)
}

fn channel_map<'a>(channels: &'a ProcessedChannels, selected: &[Channel]) -> BTreeMap<&'static str, &'a [f64]> {
    selected.iter().map(|&c| (c.as_str(), channels.get(c))).collect()
}

pub fn execute(args: ProcessArgs) -> i32 {
    let selected = match select_channels(args.channels.as_deref()) {
        Ok(s) => s,
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

    let config = PipelineConfig::from_selector(&args.filter, args.param1, args.param2);
    let result = pipeline::process(&recording.accel, &recording.gyro, &config);

    let sample = match args.sample {
        Some(index) => match result.channels.sample_at(index) {
            found @ Some(_) => found,
            None => {
                eprintln!(
                    "Error: sample index {} outside {} processed samples",
                    index,
                    result.channels.len()
                );
                return exit_codes::INPUT_ERROR;
            }
        },
        None => None,
    };

    let out = ProcessOutput {
        config: &result.config,
        sample_rate: result.sample_rate,
        samples: result.channels.len(),
        processing_time_ms: result.processing_time_ms,
        channels: sample
            .is_none()
            .then(|| channel_map(&result.channels, &selected)),
        sample,
    };

    if let Err(e) = output::emit(&out, args.compact, args.output.as_deref()) {
        eprintln!("Error: {}", e);
        return exit_codes::EXECUTION_ERROR;
    }
    exit_codes::SUCCESS
}
