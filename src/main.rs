use anyhow::{Context, Result};
use clap::Parser;
use speechsplit::audio::{codec_for_extension, AudioCodec, DbfsSilenceDetector, SilenceConfig};
use speechsplit::{print_summary, BatchOrchestrator, Config, FileSplitter};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "speechsplit")]
#[command(version, about = "Split long spoken-word audio into pause-aligned segments")]
#[command(long_about = "Split every audio file under an input directory into 10-25s segments, \
cutting at natural pauses where possible, and write them under deterministic hashed paths.")]
struct Cli {
    /// Directory searched recursively for input files
    #[arg(short, long)]
    input: PathBuf,

    /// Directory the segment tree is written to
    #[arg(short, long)]
    output: PathBuf,

    /// Number of files processed in parallel
    #[arg(short = 'w', long)]
    max_workers: Option<usize>,

    /// Preferred minimum segment length in milliseconds
    #[arg(long)]
    min_duration: Option<u64>,

    /// Maximum segment length in milliseconds
    #[arg(long)]
    max_duration: Option<u64>,

    /// Silence threshold in dBFS (e.g. -40)
    #[arg(long, allow_hyphen_values = true)]
    silence_threshold: Option<f64>,

    /// Minimum pause length in milliseconds
    #[arg(long)]
    min_silence_len: Option<u64>,

    /// Audio file extension to read and write (e.g. mp3, wav)
    #[arg(short, long)]
    extension: Option<String>,

    /// Write a JSON report of every file and segment
    #[arg(long)]
    report: Option<PathBuf>,

    /// Plan and name segments without writing any audio
    #[arg(long)]
    dry_run: bool,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply_to(&self, config: &mut Config) {
        if let Some(v) = self.max_workers {
            config.max_workers = v;
        }
        if let Some(v) = self.min_duration {
            config.min_duration = v;
        }
        if let Some(v) = self.max_duration {
            config.max_duration = v;
        }
        if let Some(v) = self.silence_threshold {
            config.silence_threshold = v;
        }
        if let Some(v) = self.min_silence_len {
            config.min_silence_len = v;
        }
        if let Some(ref v) = self.extension {
            config.extension = v.clone();
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let mut config = Config::load().context("Failed to load configuration")?;
    cli.apply_to(&mut config);
    config
        .validate()
        .context("Configuration validation failed")?;

    let extension = config.normalized_extension();

    info!("Input:      {}", cli.input.display());
    info!("Output:     {}", cli.output.display());
    info!(
        "Segments:   {}-{}ms, silence {} dBFS for {}ms",
        config.min_duration, config.max_duration, config.silence_threshold, config.min_silence_len
    );
    info!("Workers:    {}", config.max_workers);
    if cli.dry_run {
        info!("Dry run: no audio will be written");
    }

    let codec: Arc<dyn AudioCodec> = Arc::from(
        codec_for_extension(&extension).context("No codec available for the configured extension")?,
    );
    let detector = DbfsSilenceDetector::new(SilenceConfig {
        threshold_db: config.silence_threshold,
        min_silence_len: config.min_silence_len,
        ..Default::default()
    });

    let splitter = FileSplitter::new(codec, Arc::new(detector), &config, &cli.output)
        .with_dry_run(cli.dry_run);
    let orchestrator =
        BatchOrchestrator::new(splitter, config.max_workers).with_progress(!cli.no_progress);

    let result = orchestrator
        .run(&cli.input, &extension)
        .await
        .with_context(|| format!("Failed to process {}", cli.input.display()))?;

    if let Some(ref path) = cli.report {
        result
            .write_report(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    print_summary(&result);

    if result.stats.failed > 0 {
        anyhow::bail!(
            "{} of {} files failed",
            result.stats.failed,
            result.stats.total_files
        );
    }

    Ok(())
}
