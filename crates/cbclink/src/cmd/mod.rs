use std::io::Read;
use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::exit::{io_error, CliResult};
use crate::hex;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod replay;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Deframe a captured serial byte stream.
    Decode(DecodeArgs),
    /// Frame one service payload for the serial line.
    Encode(EncodeArgs),
    /// Run a captured serial stream through the service layer.
    Replay(ReplayArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Decode(args) => decode::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Replay(args) => replay::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Where serial bytes come from. Stdin (raw bytes) when neither is given.
#[derive(Args, Debug, Default)]
pub struct InputArgs {
    /// Serial bytes as hex.
    #[arg(long, conflicts_with = "file")]
    pub hex: Option<String>,
    /// Read raw serial bytes from a file.
    #[arg(long, conflicts_with = "hex")]
    pub file: Option<PathBuf>,
}

impl InputArgs {
    pub fn read(&self) -> CliResult<Vec<u8>> {
        if let Some(text) = &self.hex {
            return hex::parse(text);
        }
        if let Some(path) = &self.file {
            return std::fs::read(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
        }
        let mut bytes = Vec::new();
        std::io::stdin()
            .read_to_end(&mut bytes)
            .map_err(|err| io_error("failed reading stdin", err))?;
        Ok(bytes)
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Channel mux id.
    #[arg(long, short = 'c')]
    pub channel: u8,
    /// Service bytes as hex, command byte first.
    #[arg(long, short = 's')]
    pub service: String,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Signal table document (JSON).
    #[arg(long, value_name = "PATH")]
    pub tables: Option<PathBuf>,
    /// Boot reason reported until the SoC comes up.
    #[arg(long, default_value_t = 0)]
    pub boot_reason: u32,
    /// Device-channel data to submit after the stream, as CHANNEL:HEX.
    #[arg(long, value_name = "CHANNEL:HEX")]
    pub submit: Vec<String>,
    /// Also write each channel's output to `<DIR>/<id>-<name>.bin`.
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
