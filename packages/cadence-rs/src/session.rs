//! One analysis session over a loaded recording.
//!
//! The session owns the processed channels, the section store, the active
//! event map and the latest analysis result. Selecting a section swaps event
//! maps; it never merges them.

use crate::channels::{Channel, ChannelSample, ProcessedChannels};
use crate::cycles::{self, AnalysisConfig, CycleAnalysis, CycleContext};
use crate::error::{CadenceError, Result};
use crate::events::{DetectionConfig, EventMap, EventSet, Peak, PeakSummary};
use crate::gps::{self, TrackSummary};
use crate::pipeline::{self, PipelineConfig, PipelineResult};
use crate::sections::{Section, SectionRef, SectionStore};
use crate::types::{GpsMarker, Recording};
use log::info;

pub struct AnalysisSession {
    recording: Recording,
    processed: PipelineResult,
    sections: SectionStore,
    active_section: SectionRef,
    events: EventMap,
    active_event: Option<String>,
    latest_analysis: Option<CycleAnalysis>,
    analysis_config: AnalysisConfig,
}

impl AnalysisSession {
    /// Load a recording and run the pipeline over it
    pub fn new(recording: Recording, config: PipelineConfig) -> Self {
        let processed = pipeline::process(&recording.accel, &recording.gyro, &config);
        info!(
            "Session loaded: {} accel, {} gyro, {} GPS samples",
            recording.accel.len(),
            recording.gyro.len(),
            recording.gps.len()
        );
        Self {
            recording,
            processed,
            sections: SectionStore::new(),
            active_section: SectionRef::Full,
            events: EventMap::new(),
            active_event: None,
            latest_analysis: None,
            analysis_config: AnalysisConfig::default(),
        }
    }

    pub fn with_analysis_config(mut self, config: AnalysisConfig) -> Self {
        self.analysis_config = config;
        self
    }

    /// Replace the recording and drop every derived state
    pub fn reload(&mut self, recording: Recording) {
        let config = self.processed.config.clone();
        let analysis_config = self.analysis_config.clone();
        *self = Self::new(recording, config).with_analysis_config(analysis_config);
    }

    /// Re-run the pipeline with `config`. Saved sections keep the data they were cut from.
    pub fn reprocess(&mut self, config: PipelineConfig) -> &PipelineResult {
        self.processed = pipeline::process(&self.recording.accel, &self.recording.gyro, &config);
        &self.processed
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn pipeline(&self) -> &PipelineResult {
        &self.processed
    }

    /// Channels of the full recording
    pub fn channels(&self) -> &ProcessedChannels {
        &self.processed.channels
    }

    fn section_of(&self, section: &SectionRef) -> Result<Option<&Section>> {
        match section {
            SectionRef::Full => Ok(None),
            SectionRef::Section(id) => self.sections.section(id).map(Some),
        }
    }

    fn active(&self) -> Option<&Section> {
        self.section_of(&self.active_section).ok().flatten()
    }

    /// Channels of the active section, or of the full recording
    pub fn active_data(&self) -> &ProcessedChannels {
        self.active()
            .map(|s| &s.data)
            .unwrap_or(&self.processed.channels)
    }

    pub fn sample_at(&self, index: usize) -> Option<ChannelSample> {
        self.active_data().sample_at(index)
    }

    // Sections

    pub fn markers(&self) -> &[GpsMarker] {
        self.sections.markers()
    }

    pub fn sections(&self) -> &[Section] {
        self.sections.sections()
    }

    pub fn add_marker(&mut self, gps_index: usize, label: Option<&str>) -> Result<&GpsMarker> {
        self.sections.add_marker(&self.recording.gps, gps_index, label)
    }

    pub fn remove_marker(&mut self, id: usize) -> Result<GpsMarker> {
        self.sections.remove_marker(id)
    }

    pub fn create_section(&mut self, start_marker: usize, end_marker: usize, name: &str) -> Result<&Section> {
        let times = self.recording.motion_times();
        self.sections.create_section(
            start_marker,
            end_marker,
            name,
            &times,
            &self.processed.channels,
        )
    }

    pub fn active_section(&self) -> &SectionRef {
        &self.active_section
    }

    /// Make `section` active, storing the outgoing event map and loading the
    /// incoming one. Clears the active event and the latest analysis.
    pub fn select_section(&mut self, section: SectionRef) -> Result<()> {
        self.sections
            .swap_events(&self.active_section, &section, &mut self.events)?;
        info!("Active section: {}", section);
        self.active_section = section;
        self.active_event = None;
        self.latest_analysis = None;
        Ok(())
    }

    /// Elapsed seconds of the active section, or of the full recording (GPS
    /// span, then accelerometer span)
    pub fn session_duration(&self) -> f64 {
        match self.active() {
            Some(section) => section.duration_seconds,
            None => self
                .recording
                .gps_span_seconds()
                .or_else(|| self.recording.motion_span_seconds())
                .unwrap_or(0.0),
        }
    }

    /// Seconds per motion sample of the active data
    pub fn dt(&self) -> f64 {
        let samples = match self.active() {
            Some(section) => section.motion_sample_count(),
            None => self.processed.channels.len(),
        };
        cycles::sample_interval(self.session_duration(), samples)
    }

    pub fn track_summary(&self) -> TrackSummary {
        gps::track_summary(&self.recording.gps)
    }

    pub fn section_summary(&self, id: &str) -> Result<TrackSummary> {
        let section = self.sections.section(id)?;
        Ok(gps::section_summary(&self.recording.gps, section))
    }

    // Events

    pub fn events(&self) -> &EventMap {
        &self.events
    }

    pub fn event(&self, name: &str) -> Result<&EventSet> {
        self.events.get(name)
    }

    pub fn active_event(&self) -> Option<&str> {
        self.active_event.as_deref()
    }

    pub fn select_event(&mut self, name: &str) -> Result<()> {
        self.events.get(name)?;
        self.active_event = Some(name.to_string());
        Ok(())
    }

    /// Detect peaks on the active data; the new set becomes the active event
    pub fn detect(&mut self, name: &str, config: DetectionConfig) -> Result<&EventSet> {
        let data = match &self.active_section {
            SectionRef::Full => &self.processed.channels,
            SectionRef::Section(id) => &self.sections.section(id)?.data,
        };
        let name = self.events.detect(data, name, config)?.name.clone();
        self.active_event = Some(name.clone());
        self.events.get(&name)
    }

    pub fn add_event_type(&mut self, name: &str, channel: Channel) -> Result<()> {
        self.events.add_event_type(name, channel)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        let len = self.active_data().len();
        if index >= len {
            return Err(CadenceError::InvalidParameter(format!(
                "peak index {} outside {} samples",
                index, len
            )));
        }
        Ok(())
    }

    pub fn add_peak(&mut self, name: &str, index: usize, value: f64) -> Result<()> {
        self.check_index(index)?;
        self.events.add_peak(name, index, value)
    }

    /// Add a peak at `index` with the value of the set's channel there
    pub fn mark_peak(&mut self, name: &str, index: usize) -> Result<Peak> {
        let data = match &self.active_section {
            SectionRef::Full => &self.processed.channels,
            SectionRef::Section(id) => &self.sections.section(id)?.data,
        };
        self.events.mark_peak(data, name, index)
    }

    pub fn remove_peak(&mut self, name: &str, index: usize) -> Result<usize> {
        self.events.remove_peak(name, index)
    }

    pub fn delete_event(&mut self, name: &str) -> Result<EventSet> {
        let removed = self.events.delete_event(name)?;
        if self.active_event.as_deref() == Some(name) {
            self.active_event = None;
            self.latest_analysis = None;
        }
        Ok(removed)
    }

    /// Empty the active event map
    pub fn clear_all(&mut self) {
        self.events.clear_all();
        self.active_event = None;
        self.latest_analysis = None;
    }

    pub fn peak_summary(&self, name: &str) -> Result<Option<PeakSummary>> {
        let set = self.events.get(name)?;
        Ok(PeakSummary::from_set(set, self.dt(), self.session_duration()))
    }

    // Cycles

    fn base_time(&self) -> i64 {
        match self.active() {
            Some(section) => self
                .recording
                .gps
                .get(section.gps_index_range.0)
                .map_or(section.time_range.start, |p| p.time),
            None => self.recording.accel.first().map_or(0, |s| s.time),
        }
    }

    /// Match cycles between the named sets on the active data and keep the
    /// result as the latest analysis
    pub fn analyze(&mut self, start: &str, mid: Option<&str>, end: &str) -> Result<&CycleAnalysis> {
        let start_set = self.events.get(start)?;
        let mid_set = mid.map(|m| self.events.get(m)).transpose()?;
        let end_set = self.events.get(end)?;

        let ctx = CycleContext {
            channels: self.active_data(),
            gps: &self.recording.gps,
            base_time: self.base_time(),
            sample_rate: self.processed.sample_rate,
            dt: self.dt(),
            session_duration: self.session_duration(),
        };
        let analysis = cycles::analyze(start_set, mid_set, end_set, &ctx, &self.analysis_config)?;
        Ok(self.latest_analysis.insert(analysis))
    }

    pub fn latest_analysis(&self) -> Option<&CycleAnalysis> {
        self.latest_analysis.as_ref()
    }
}
