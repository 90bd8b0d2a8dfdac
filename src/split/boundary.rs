use serde::Serialize;
use tracing::debug;

use crate::audio::TimeRange;

/// Why a segment was cut at the window limit instead of at a pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HardCutReason {
    /// The detector reported no non-silent ranges in the window.
    NoSpeechDetected,
    /// Pauses exist, but none ends inside `[min_duration, max_duration]`.
    NoQualifyingPause,
}

/// Where the current segment ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Boundary {
    /// Cut at the end of a pause; `pause` is absolute within the source.
    Pause { split_point: u64, pause: TimeRange },
    HardCut { split_point: u64, reason: HardCutReason },
}

impl Boundary {
    pub fn split_point(&self) -> u64 {
        match self {
            Boundary::Pause { split_point, .. } | Boundary::HardCut { split_point, .. } => {
                *split_point
            }
        }
    }

    pub fn is_pause(&self) -> bool {
        matches!(self, Boundary::Pause { .. })
    }
}

/// Chooses cut points between `min_duration` and `max_duration` past the cursor.
#[derive(Debug, Clone, Copy)]
pub struct BoundarySelector {
    min_duration: u64,
    max_duration: u64,
}

impl BoundarySelector {
    pub fn new(min_duration: u64, max_duration: u64) -> Self {
        Self {
            min_duration,
            max_duration,
        }
    }

    pub fn max_duration(&self) -> u64 {
        self.max_duration
    }

    /// The window the detector should analyse for a segment starting at `cursor`.
    pub fn window(&self, cursor: u64, total_duration: u64) -> TimeRange {
        TimeRange::new(
            cursor,
            cursor.saturating_add(self.max_duration).min(total_duration),
        )
    }

    /// Select the end of the segment starting at `cursor`.
    ///
    /// `nonsilent` holds ranges relative to `cursor`, as returned for the slice
    /// produced by [`BoundarySelector::window`]. The earliest pause whose end
    /// lands in `[min_duration, max_duration]` wins; otherwise the segment is
    /// cut at the window end.
    pub fn select(&self, cursor: u64, total_duration: u64, nonsilent: &[TimeRange]) -> Boundary {
        debug_assert!(cursor < total_duration);
        let window_end = self.window(cursor, total_duration).end;

        if nonsilent.is_empty() {
            debug!("No speech ranges after {}ms, cutting at {}ms", cursor, window_end);
            return Boundary::HardCut {
                split_point: window_end,
                reason: HardCutReason::NoSpeechDetected,
            };
        }

        let qualifying = nonsilent.windows(2).find_map(|pair| {
            let silence_start = pair[0].end;
            let silence_end = pair[1].start;
            let in_range =
                silence_end >= self.min_duration && silence_end <= self.max_duration;
            let split_point = cursor.saturating_add(silence_end);

            (in_range && split_point > cursor && split_point <= window_end).then(|| {
                let pause = TimeRange::new(cursor.saturating_add(silence_start), split_point);
                (split_point, pause)
            })
        });

        match qualifying {
            Some((split_point, pause)) => {
                debug!(
                    "Cutting at pause {}ms-{}ms ({}ms into segment)",
                    pause.start,
                    pause.end,
                    split_point - cursor
                );
                Boundary::Pause { split_point, pause }
            }
            None => {
                debug!("No suitable pause after {}ms, cutting at {}ms", cursor, window_end);
                Boundary::HardCut {
                    split_point: window_end,
                    reason: HardCutReason::NoQualifyingPause,
                }
            }
        }
    }
}
