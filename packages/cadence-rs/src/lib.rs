pub mod channels;
pub mod cycles;
pub mod error;
pub mod events;
pub mod filters;
pub mod gps;
pub mod pipeline;
pub mod profiling;
pub mod sections;
pub mod session;
pub mod types;

pub use channels::{Channel, ChannelSample, ProcessedChannels};
pub use cycles::{AnalysisConfig, Cycle, CycleAnalysis, CycleStatistics, TimeProjection};
pub use error::{CadenceError, Result};
pub use events::{DetectionConfig, Direction, EventMap, EventSet, Peak, PeakSummary};
pub use filters::FilterKind;
pub use gps::TrackSummary;
pub use pipeline::{PipelineConfig, PipelineResult};
pub use sections::{Section, SectionRef};
pub use session::AnalysisSession;
pub use types::*;
