use tracing::debug;

use super::{AudioBuffer, TimeRange};

/// Full-scale amplitude of 16-bit PCM.
const MAX_AMPLITUDE: f64 = 32768.0;

/// Configuration for silence detection.
#[derive(Debug, Clone)]
pub struct SilenceConfig {
    /// Window RMS at or below this level (dBFS) counts as silence.
    pub threshold_db: f64,

    /// Shortest stretch of silence that separates two non-silent ranges.
    pub min_silence_len: u64,

    /// Step between analysed windows, in milliseconds.
    pub seek_step: u64,
}

impl Default for SilenceConfig {
    fn default() -> Self {
        Self {
            threshold_db: -40.0,
            min_silence_len: 500,
            seek_step: 1,
        }
    }
}

impl SilenceConfig {
    fn threshold_amplitude(&self) -> f64 {
        10f64.powf(self.threshold_db / 20.0) * MAX_AMPLITUDE
    }
}

/// Finds the stretches of a buffer that carry sound.
pub trait SilenceOracle: Send + Sync {
    /// Non-silent ranges relative to the start of `buffer`, sorted and disjoint.
    ///
    /// Empty when the buffer is entirely silent or entirely non-silent.
    fn detect_nonsilent(&self, buffer: &AudioBuffer) -> Vec<TimeRange>;
}

/// RMS energy detector working on a sliding millisecond window.
#[derive(Debug, Clone, Default)]
pub struct DbfsSilenceDetector {
    config: SilenceConfig,
}

impl DbfsSilenceDetector {
    pub fn new(config: SilenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SilenceConfig {
        &self.config
    }

    /// Silent ranges of `buffer`, merged across overlapping windows.
    pub fn detect_silence(&self, buffer: &AudioBuffer) -> Vec<TimeRange> {
        let len = buffer.duration_ms();
        let window = self.config.min_silence_len;
        let step = self.config.seek_step.max(1);

        if window == 0 || len < window {
            return vec![];
        }

        let profile = EnergyProfile::new(buffer, len);
        let threshold = self.config.threshold_amplitude();

        let last_start = len - window;
        let mut starts: Vec<u64> = (0..=last_start).step_by(step as usize).collect();
        if last_start % step != 0 {
            starts.push(last_start);
        }

        let silent_starts: Vec<u64> = starts
            .into_iter()
            .filter(|&i| profile.rms(i, i + window) <= threshold)
            .collect();

        let Some((&first, rest)) = silent_starts.split_first() else {
            return vec![];
        };

        let mut ranges = Vec::new();
        let mut range_start = first;
        let mut prev = first;
        for &i in rest {
            let continuous = i == prev + step;
            let has_gap = i > prev + window;
            if !continuous && has_gap {
                ranges.push(TimeRange::new(range_start, prev + window));
                range_start = i;
            }
            prev = i;
        }
        ranges.push(TimeRange::new(range_start, prev + window));

        ranges
    }
}

impl SilenceOracle for DbfsSilenceDetector {
    fn detect_nonsilent(&self, buffer: &AudioBuffer) -> Vec<TimeRange> {
        let len = buffer.duration_ms();
        let silent = self.detect_silence(buffer);

        if silent.is_empty() {
            debug!("No silence found in {}ms", len);
            return vec![];
        }
        if silent.len() == 1 && silent[0].start == 0 && silent[0].end >= len {
            debug!("Window of {}ms is entirely silent", len);
            return vec![];
        }

        let mut ranges = Vec::new();
        let mut prev_end = 0;
        for range in &silent {
            if range.start > prev_end {
                ranges.push(TimeRange::new(prev_end, range.start));
            }
            prev_end = range.end;
        }
        if prev_end < len {
            ranges.push(TimeRange::new(prev_end, len));
        }

        ranges
    }
}

/// Per-millisecond prefix sums of squared samples.
struct EnergyProfile {
    squares: Vec<f64>,
    counts: Vec<u64>,
}

impl EnergyProfile {
    fn new(buffer: &AudioBuffer, len: u64) -> Self {
        let ch = buffer.channels() as usize;
        let samples = buffer.samples();

        let mut squares = Vec::with_capacity(len as usize + 1);
        let mut counts = Vec::with_capacity(len as usize + 1);
        squares.push(0.0);
        counts.push(0);

        for ms in 0..len {
            let start = buffer.frame_at(ms) * ch;
            let end = if ms + 1 == len {
                samples.len()
            } else {
                buffer.frame_at(ms + 1) * ch
            };
            let bucket = &samples[start..end];
            let energy: f64 = bucket.iter().map(|&s| (s as f64) * (s as f64)).sum();

            squares.push(squares[ms as usize] + energy);
            counts.push(counts[ms as usize] + bucket.len() as u64);
        }

        Self { squares, counts }
    }

    fn rms(&self, start: u64, end: u64) -> f64 {
        let (s, e) = (start as usize, end as usize);
        let count = self.counts[e] - self.counts[s];
        if count == 0 {
            return 0.0;
        }
        ((self.squares[e] - self.squares[s]) / count as f64).sqrt()
    }
}
