use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::audio::{AudioBuffer, AudioCodec, SilenceOracle, TimeRange};
use crate::config::Config;
use crate::error::{Result, SplitError};

use super::boundary::{Boundary, BoundarySelector};
use super::naming::IdentityNamer;
use super::shape::SegmentShaper;

/// A segment decided on but not yet written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedSegment {
    pub part_index: usize,
    pub source_range: TimeRange,
    pub boundary: Boundary,
}

/// A segment written (or, in dry-run mode, that would be written).
#[derive(Debug, Clone, Serialize)]
pub struct SegmentRecord {
    pub part_index: usize,
    pub source_range: TimeRange,
    pub boundary: Boundary,
    pub output: PathBuf,
    pub shaped_duration_ms: u64,
}

/// Everything produced from one source file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub source: PathBuf,
    pub total_duration_ms: u64,
    pub segments: Vec<SegmentRecord>,
}

/// Cursor and part counter for one pass over a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SplitState {
    cursor: u64,
    part_index: usize,
}

impl SplitState {
    fn new() -> Self {
        Self {
            cursor: 0,
            part_index: 1,
        }
    }

    fn advance(&mut self, split_point: u64) {
        debug_assert!(split_point > self.cursor);
        self.cursor = split_point;
        self.part_index += 1;
    }
}

/// Splits one source file into padded, faded segments.
pub struct FileSplitter {
    codec: Arc<dyn AudioCodec>,
    oracle: Arc<dyn SilenceOracle>,
    selector: BoundarySelector,
    shaper: SegmentShaper,
    namer: IdentityNamer,
    dry_run: bool,
}

impl FileSplitter {
    pub fn new(
        codec: Arc<dyn AudioCodec>,
        oracle: Arc<dyn SilenceOracle>,
        config: &Config,
        output_root: &Path,
    ) -> Self {
        Self {
            codec,
            oracle,
            selector: BoundarySelector::new(config.min_duration, config.max_duration),
            shaper: SegmentShaper::default(),
            namer: IdentityNamer::new(output_root, config.normalized_extension()),
            dry_run: false,
        }
    }

    /// Plan and name segments without creating directories or writing audio.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn namer(&self) -> &IdentityNamer {
        &self.namer
    }

    /// Decide every cut for `buffer`, in order. Performs no I/O.
    pub fn plan(&self, buffer: &AudioBuffer) -> Vec<PlannedSegment> {
        let total = buffer.duration_ms();
        let mut state = SplitState::new();
        let mut planned = Vec::new();

        while state.cursor < total {
            let window = self.selector.window(state.cursor, total);
            let nonsilent = self.oracle.detect_nonsilent(&buffer.slice(window));
            let boundary = self.selector.select(state.cursor, total, &nonsilent);
            let split_point = boundary.split_point();

            debug!(
                "Segment {}: {}ms-{}ms ({})",
                state.part_index,
                state.cursor,
                split_point,
                if boundary.is_pause() { "pause" } else { "hard cut" }
            );

            planned.push(PlannedSegment {
                part_index: state.part_index,
                source_range: TimeRange::new(state.cursor, split_point),
                boundary,
            });
            state.advance(split_point);
        }

        planned
    }

    /// Decode `source`, then shape and export its segments in order.
    ///
    /// The first decode or export error aborts the file; later segments are
    /// not attempted.
    pub fn split(&self, source: &Path) -> Result<FileReport> {
        info!("Loading audio: {}", source.display());
        let buffer = self.codec.decode(source)?;
        let total = buffer.duration_ms();
        info!(
            "Total duration of {}: {:.2}s",
            source.display(),
            total as f64 / 1000.0
        );

        let mut segments = Vec::new();
        for planned in self.plan(&buffer) {
            let raw_ms = planned.source_range.duration_ms();

            let output = if self.dry_run {
                self.namer.path_for(source, planned.part_index)
            } else {
                let output = self
                    .namer
                    .prepare(source, planned.part_index)
                    .map_err(|e| {
                        SplitError::Export(format!(
                            "{} part {}: {}",
                            source.display(),
                            planned.part_index,
                            e
                        ))
                    })?;
                let shaped = self.shaper.shape(buffer.slice(planned.source_range));
                self.codec.encode(&shaped, &output)?;
                debug!(
                    "Exported {} ({:.2}s)",
                    output.display(),
                    shaped.duration_ms() as f64 / 1000.0
                );
                output
            };

            segments.push(SegmentRecord {
                part_index: planned.part_index,
                source_range: planned.source_range,
                boundary: planned.boundary,
                output,
                shaped_duration_ms: self.shaper.shaped_duration_ms(raw_ms),
            });
        }

        info!(
            "Split {} into {} segments",
            source.display(),
            segments.len()
        );

        Ok(FileReport {
            source: source.to_path_buf(),
            total_duration_ms: total,
            segments,
        })
    }
}
