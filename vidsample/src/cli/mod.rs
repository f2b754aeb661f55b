use anyhow::Result;
use clap::{Parser, Subcommand};

mod frames;
mod probe;

pub use frames::FramesCommand;
pub use probe::ProbeCommand;

#[derive(Parser, Debug)]
#[command(name = "vidsample")]
#[command(about = "Probe media files and dump decoded frames")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print stream metadata without decoding
    Probe(ProbeCommand),
    /// Decode a stream and print one line per frame
    Frames(FramesCommand),
}

impl Args {
    pub fn run(self) -> Result<()> {
        match self.command {
            Command::Probe(cmd) => cmd.run(),
            Command::Frames(cmd) => cmd.run(),
        }
    }
}
