use super::TimeRange;

/// Decoded audio: interleaved signed 16-bit PCM.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
}

impl AudioBuffer {
    pub fn new(samples: Vec<i16>, sample_rate: u32, channels: u16) -> Self {
        debug_assert!(sample_rate > 0 && channels > 0);
        debug_assert_eq!(samples.len() % channels as usize, 0);
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// A buffer of digital silence with the given format.
    pub fn silent(duration_ms: u64, sample_rate: u32, channels: u16) -> Self {
        let frames = ms_to_frames(duration_ms, sample_rate);
        Self::new(
            vec![0; frames * channels as usize],
            sample_rate,
            channels,
        )
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length in whole milliseconds, rounded to nearest.
    pub fn duration_ms(&self) -> u64 {
        let rate = self.sample_rate as u64;
        (self.frames() as u64 * 1000 + rate / 2) / rate
    }

    /// Frame index for a millisecond offset, clamped to the buffer.
    pub fn frame_at(&self, ms: u64) -> usize {
        ms_to_frames(ms, self.sample_rate).min(self.frames())
    }

    /// Copy out `range`. A range reaching the end of the buffer keeps every trailing frame.
    pub fn slice(&self, range: TimeRange) -> AudioBuffer {
        let start = self.frame_at(range.start);
        let end = if range.end >= self.duration_ms() {
            self.frames()
        } else {
            self.frame_at(range.end)
        };
        let ch = self.channels as usize;
        let samples = self.samples[start * ch..end.max(start) * ch].to_vec();
        AudioBuffer::new(samples, self.sample_rate, self.channels)
    }

    /// Linear ramp from silence to full gain over the first `duration_ms`.
    pub fn fade_in(mut self, duration_ms: u64) -> Self {
        let n = self.frame_at(duration_ms);
        let ch = self.channels as usize;
        for frame in 0..n {
            let gain = frame as f64 / n as f64;
            for s in &mut self.samples[frame * ch..(frame + 1) * ch] {
                *s = scale(*s, gain);
            }
        }
        self
    }

    /// Linear ramp from full gain to silence over the last `duration_ms`.
    pub fn fade_out(mut self, duration_ms: u64) -> Self {
        let n = self.frame_at(duration_ms);
        let total = self.frames();
        let ch = self.channels as usize;
        for k in 0..n {
            let frame = total - n + k;
            let gain = (n - 1 - k) as f64 / n as f64;
            for s in &mut self.samples[frame * ch..(frame + 1) * ch] {
                *s = scale(*s, gain);
            }
        }
        self
    }

    /// Append another buffer of the same format.
    pub fn append(&mut self, other: &AudioBuffer) {
        debug_assert_eq!(self.sample_rate, other.sample_rate);
        debug_assert_eq!(self.channels, other.channels);
        self.samples.extend_from_slice(&other.samples);
    }
}

fn ms_to_frames(ms: u64, sample_rate: u32) -> usize {
    (ms * sample_rate as u64 / 1000) as usize
}

fn scale(sample: i16, gain: f64) -> i16 {
    (sample as f64 * gain).round() as i16
}
