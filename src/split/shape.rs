use crate::audio::AudioBuffer;

/// Silence added before and after every segment.
pub const PADDING_MS: u64 = 1000;

/// Length of the fade applied to each edge of the raw audio.
pub const FADE_MS: u64 = 300;

/// Turns a raw slice of the source into an exportable segment.
#[derive(Debug, Clone, Copy)]
pub struct SegmentShaper {
    padding_ms: u64,
    fade_ms: u64,
}

impl Default for SegmentShaper {
    fn default() -> Self {
        Self {
            padding_ms: PADDING_MS,
            fade_ms: FADE_MS,
        }
    }
}

impl SegmentShaper {
    /// `padding ++ fade_out(fade_in(raw)) ++ padding`; the padding itself is never faded.
    pub fn shape(&self, raw: AudioBuffer) -> AudioBuffer {
        let padding = AudioBuffer::silent(self.padding_ms, raw.sample_rate(), raw.channels());
        let body = raw.fade_in(self.fade_ms).fade_out(self.fade_ms);

        let mut shaped = padding.clone();
        shaped.append(&body);
        shaped.append(&padding);
        shaped
    }

    /// Length of a shaped segment built from `raw_ms` of source audio.
    pub fn shaped_duration_ms(&self, raw_ms: u64) -> u64 {
        raw_ms + 2 * self.padding_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 8000;
    const FRAMES_PER_MS: usize = 8;

    fn constant(duration_ms: u64) -> AudioBuffer {
        AudioBuffer::new(vec![10_000; duration_ms as usize * FRAMES_PER_MS], RATE, 1)
    }

    #[test]
    fn test_shaped_length_adds_padding() {
        let shaped = SegmentShaper::default().shape(constant(20_000));
        assert_eq!(shaped.duration_ms(), 22_000);
        assert_eq!(SegmentShaper::default().shaped_duration_ms(20_000), 22_000);
    }

    #[test]
    fn test_padding_is_silent() {
        let shaped = SegmentShaper::default().shape(constant(20_000));
        let samples = shaped.samples();
        let pad = 1000 * FRAMES_PER_MS;

        assert!(samples[..pad].iter().all(|&s| s == 0));
        assert!(samples[samples.len() - pad..].iter().all(|&s| s == 0));
    }

    #[test]
    fn test_edges_of_raw_audio_are_ramped() {
        let shaped = SegmentShaper::default().shape(constant(20_000));
        let samples = shaped.samples();
        let pad = 1000 * FRAMES_PER_MS;
        let fade = 300 * FRAMES_PER_MS;
        let body_end = samples.len() - pad;

        // fade-in
        assert_eq!(samples[pad], 0);
        assert!(samples[pad + fade / 2] > 0 && samples[pad + fade / 2] < 10_000);
        assert_eq!(samples[pad + fade], 10_000);

        // untouched middle
        assert!(samples[pad + fade..body_end - fade].iter().all(|&s| s == 10_000));

        // fade-out
        assert!(samples[body_end - fade / 2] < 10_000);
        assert_eq!(samples[body_end - 1], 0);
    }

    #[test]
    fn test_stereo_format_is_preserved() {
        let raw = AudioBuffer::new(vec![500; 2 * 16_000], 16_000, 2);
        let shaped = SegmentShaper::default().shape(raw);

        assert_eq!(shaped.channels(), 2);
        assert_eq!(shaped.sample_rate(), 16_000);
        assert_eq!(shaped.duration_ms(), 3000);
    }
}
