use anyhow::{Context, Result};
use clap::Parser;

use ffmpeg_types::Format;

#[derive(Parser, Debug)]
pub struct ProbeCommand {
    /// Media file or URL
    pub uri: String,

    /// Print metadata as JSON
    #[arg(long)]
    pub json: bool,
}

impl ProbeCommand {
    pub fn run(self) -> Result<()> {
        let metadata = ffmpeg_source::probe_all(&self.uri)
            .with_context(|| format!("Failed to probe {}", self.uri))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&metadata)?);
            return Ok(());
        }

        println!("{}: {} stream(s)", self.uri, metadata.len());
        for stream in &metadata {
            let detail = match &stream.format.format {
                Format::Video(video) => format!(
                    "{}x{} {:?}",
                    video.width, video.height, video.pixel_format
                ),
                Format::Audio(audio) => format!(
                    "{} ch {} Hz {:?}",
                    audio.channels, audio.sample_rate, audio.sample_format
                ),
                Format::Subtitle | Format::Caption => String::new(),
            };
            println!(
                "  [{}] {:<8} {:<12} {:>8.3} fps  {:>9.3}s  tb {}  {}",
                stream.format.stream.as_raw(),
                stream.format.media_type(),
                stream.codec_name,
                stream.fps,
                stream.duration_secs(),
                stream.time_base,
                detail
            );
        }
        Ok(())
    }
}
