pub mod buffer;
pub mod codec;
pub mod silence;

pub use buffer::AudioBuffer;
pub use codec::{check_ffmpeg, codec_for_extension, AudioCodec, FfmpegCodec, WavCodec};
pub use silence::{DbfsSilenceDetector, SilenceConfig, SilenceOracle};

use serde::Serialize;

/// A span of audio in milliseconds, `start` inclusive and `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: u64,
    pub end: u64,
}

impl TimeRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Get the length of this range in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}
