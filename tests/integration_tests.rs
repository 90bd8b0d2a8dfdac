//! Integration tests for speechsplit
//!
//! These tests run whole batches against synthetic WAV files, so they need
//! neither FFmpeg nor real recordings.

use speechsplit::audio::{
    AudioBuffer, AudioCodec, DbfsSilenceDetector, SilenceConfig, SilenceOracle, TimeRange,
    WavCodec,
};
use speechsplit::split::{short_hash, Boundary, FileSplitter, IdentityNamer, SegmentShaper};
use speechsplit::{BatchOrchestrator, Config};

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const RATE: u32 = 8000;

/// Loud square wave with silent gaps at the given millisecond ranges.
fn speech_with_pauses(duration_ms: u64, pauses: &[(u64, u64)]) -> AudioBuffer {
    let frames = duration_ms * RATE as u64 / 1000;
    let samples = (0..frames)
        .map(|f| {
            let ms = f * 1000 / RATE as u64;
            if pauses.iter().any(|&(s, e)| ms >= s && ms < e) {
                0
            } else if f % 2 == 0 {
                12_000
            } else {
                -12_000
            }
        })
        .collect();
    AudioBuffer::new(samples, RATE, 1)
}

fn wav_config() -> Config {
    Config {
        extension: "wav".to_string(),
        ..Default::default()
    }
}

fn splitter(config: &Config, output: &Path) -> FileSplitter {
    let detector = DbfsSilenceDetector::new(SilenceConfig {
        threshold_db: config.silence_threshold,
        min_silence_len: config.min_silence_len,
        ..Default::default()
    });
    FileSplitter::new(Arc::new(WavCodec), Arc::new(detector), config, output)
}

fn written_files(root: &Path) -> BTreeSet<PathBuf> {
    let mut files = BTreeSet::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                files.insert(path);
            }
        }
    }
    files
}

// ============================================================================
// Segmentation Tests
// ============================================================================

mod segmentation_tests {
    use super::*;

    #[test]
    fn test_segments_tile_the_source() {
        let buffer = speech_with_pauses(
            125_000,
            &[(11_000, 11_800), (27_000, 28_000), (33_000, 34_000), (70_000, 71_000)],
        );
        let planned = splitter(&wav_config(), Path::new("/out")).plan(&buffer);

        let mut cursor = 0;
        for segment in &planned {
            assert_eq!(segment.source_range.start, cursor);
            assert!(segment.source_range.duration_ms() <= 25_000);
            cursor = segment.source_range.end;
        }
        assert_eq!(cursor, 125_000);

        for segment in &planned[..planned.len() - 1] {
            assert!(segment.source_range.duration_ms() >= 10_000);
        }
    }

    #[test]
    fn test_pause_preferred_over_limit() {
        let buffer = speech_with_pauses(40_000, &[(14_000, 15_000)]);
        let planned = splitter(&wav_config(), Path::new("/out")).plan(&buffer);

        assert_eq!(planned[0].source_range, TimeRange::new(0, 15_000));
        assert!(matches!(
            planned[0].boundary,
            Boundary::Pause { split_point: 15_000, .. }
        ));
    }

    #[test]
    fn test_custom_window_from_config() {
        let config = Config {
            min_duration: 2000,
            max_duration: 5000,
            ..wav_config()
        };
        let buffer = speech_with_pauses(12_000, &[(2500, 3000)]);
        let planned = splitter(&config, Path::new("/out")).plan(&buffer);

        let ends: Vec<u64> = planned.iter().map(|p| p.source_range.end).collect();
        assert_eq!(ends, vec![3000, 8000, 12_000]);
    }

    #[test]
    fn test_detector_contract_on_slices() {
        let detector = DbfsSilenceDetector::default();
        let buffer = speech_with_pauses(20_000, &[(5000, 6000)]);

        let slice = buffer.slice(TimeRange::new(4000, 20_000));
        assert_eq!(
            detector.detect_nonsilent(&slice),
            vec![TimeRange::new(0, 1000), TimeRange::new(2000, 16_000)]
        );
    }

    #[test]
    fn test_shaping_scenario() {
        let shaped = SegmentShaper::default().shape(speech_with_pauses(20_000, &[]));
        assert_eq!(shaped.duration_ms(), 22_000);
    }
}

// ============================================================================
// Naming Tests
// ============================================================================

mod naming_tests {
    use super::*;

    #[test]
    fn test_output_layout_matches_hash_scheme() {
        let namer = IdentityNamer::new("/out", "mp3");
        let source = Path::new("/audio/books/chapter01.mp3");

        let expected = PathBuf::from("/out")
            .join(short_hash("/audio/books"))
            .join(short_hash("chapter01.mp3"))
            .join(format!("{}.mp3", short_hash("/audio/books/chapter01.mp3_4")));

        assert_eq!(namer.path_for(source, 4), expected);
    }

    #[test]
    fn test_same_name_in_different_dirs_does_not_clash() {
        let namer = IdentityNamer::new("/out", "mp3");
        let a = namer.path_for(Path::new("/audio/a/talk.mp3"), 1);
        let b = namer.path_for(Path::new("/audio/b/talk.mp3"), 1);
        assert_ne!(a, b);
    }
}

// ============================================================================
// Batch Tests
// ============================================================================

mod batch_tests {
    use super::*;

    fn write_source(root: &Path, relative: &str, buffer: &AudioBuffer) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        WavCodec.encode(buffer, &path).unwrap();
        path
    }

    #[tokio::test]
    async fn test_batch_with_one_undecodable_file() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let config = wav_config();

        let first = write_source(
            input.path(),
            "1_intro.wav",
            &speech_with_pauses(30_000, &[(12_000, 13_000)]),
        );
        let broken = input.path().join("2_broken.wav");
        fs::write(&broken, b"RIFF but not really").unwrap();
        let third = write_source(
            input.path(),
            "nested/3_outro.wav",
            &speech_with_pauses(50_000, &[]),
        );

        let result = BatchOrchestrator::new(splitter(&config, output.path()), 2)
            .with_progress(false)
            .run(input.path(), &config.extension)
            .await
            .unwrap();

        assert_eq!(result.stats.total_files, 3);
        assert_eq!(result.stats.failed, 1);
        assert_eq!(result.failures().next().unwrap().source, broken);

        let namer = IdentityNamer::new(output.path(), "wav");
        let expected: BTreeSet<PathBuf> = [(&first, 2), (&third, 2)]
            .into_iter()
            .flat_map(|(source, parts)| {
                let namer = namer.clone();
                (1..=parts).map(move |part| namer.path_for(source, part))
            })
            .collect();

        assert_eq!(written_files(output.path()), expected);
    }

    #[tokio::test]
    async fn test_rerun_overwrites_same_paths() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let config = wav_config();
        write_source(input.path(), "talk.wav", &speech_with_pauses(45_000, &[(20_000, 21_000)]));

        let orchestrator =
            BatchOrchestrator::new(splitter(&config, output.path()), 1).with_progress(false);

        orchestrator.run(input.path(), "wav").await.unwrap();
        let first = written_files(output.path());
        orchestrator.run(input.path(), "wav").await.unwrap();
        let second = written_files(output.path());

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_written_segments_are_padded() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let config = wav_config();
        write_source(input.path(), "talk.wav", &speech_with_pauses(18_000, &[]));

        let result = BatchOrchestrator::new(splitter(&config, output.path()), 1)
            .with_progress(false)
            .run(input.path(), "wav")
            .await
            .unwrap();

        let report = result.outcomes[0].report.as_ref().unwrap();
        assert_eq!(report.segments.len(), 1);

        let written = WavCodec.decode(&report.segments[0].output).unwrap();
        assert_eq!(written.duration_ms(), 20_000);
        assert_eq!(written.samples()[0], 0);
        assert_eq!(*written.samples().last().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_input_root_is_an_error() {
        let output = tempfile::tempdir().unwrap();
        let result = BatchOrchestrator::new(splitter(&wav_config(), output.path()), 1)
            .with_progress(false)
            .run(Path::new("/nonexistent/input"), "wav")
            .await;

        assert!(result.is_err());
    }
}
