use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;

use ffmpeg_types::DEFAULT_SEEK_ACCURACY_US;
use vidsample::{NextOptions, ReaderConfig, VideoReader};

#[derive(Parser, Debug)]
pub struct FramesCommand {
    /// Media file or URL
    pub uri: String,

    /// Stream selector: video, audio, subtitle or cc, optionally with :index
    #[arg(long, default_value = "video")]
    pub stream: String,

    /// Start decoding at this offset, in seconds
    #[arg(long, default_value_t = 0.0)]
    pub start: f64,

    /// Seek to this timestamp, in seconds, before the first frame
    #[arg(long)]
    pub seek: Option<f64>,

    /// Accept the first decodable frame after a seek
    #[arg(long)]
    pub any_frame: bool,

    /// How far before the target, in microseconds, a precise seek may land
    #[arg(long, default_value_t = DEFAULT_SEEK_ACCURACY_US)]
    pub seek_accuracy_us: i64,

    /// Stop after this many frames
    #[arg(long)]
    pub limit: Option<usize>,

    /// Load the whole file into memory and decode from there
    #[arg(long)]
    pub memory: bool,

    /// Per-frame timeout, in seconds
    #[arg(long, default_value_t = 600.0)]
    pub timeout: f64,
}

impl FramesCommand {
    pub fn run(self) -> Result<()> {
        let config = ReaderConfig::new(&self.uri)
            .with_stream(&self.stream)
            .with_start_offset_secs(self.start)
            .with_seek_accuracy_us(self.seek_accuracy_us)
            .with_any_frame(self.any_frame)
            .with_timeout_secs(self.timeout);

        let mut reader = if self.memory {
            let bytes = std::fs::read(&self.uri)
                .with_context(|| format!("Failed to read {}", self.uri))?;
            VideoReader::from_bytes_with_config(bytes, config)
        } else {
            VideoReader::from_config(config)
        }
        .with_context(|| format!("Failed to open {}", self.uri))?;

        if let Some(ts) = self.seek {
            if ts < 0.0 {
                bail!("Seek target must not be negative, got {ts}");
            }
            reader.seek(ts, self.any_frame);
        }

        let started = Instant::now();
        let mut count = 0usize;
        let mut bytes = 0usize;

        while self.limit.is_none_or(|limit| count < limit) {
            let frame = reader
                .next_with(None, NextOptions::default())
                .context("Failed to decode frame")?;
            if frame.is_empty() {
                break;
            }

            println!(
                "{:>6}  {:>10}  {:<16} {:>9} bytes",
                count,
                frame
                    .pts
                    .map(|pts| format!("{pts:.6}"))
                    .unwrap_or_else(|| "-".to_string()),
                frame.shape.to_string(),
                frame.data.len()
            );
            count += 1;
            bytes += frame.data.len();
        }

        eprintln!(
            "{} frame(s), {} bytes, {} session(s) in {:.2?}",
            count,
            bytes,
            reader.init_count(),
            started.elapsed()
        );
        Ok(())
    }
}
