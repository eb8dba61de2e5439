mod cmd;
mod exit;
mod hex;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "cbclink", version, about = "CBC link-layer tools")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "warn",
        env = "CBCLINK_LOG_LEVEL",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_encode_subcommand() {
        let cli = Cli::try_parse_from([
            "cbclink",
            "encode",
            "--channel",
            "7",
            "--service",
            "01 02 03",
        ])
        .expect("encode args should parse");

        assert!(matches!(cli.command, Command::Encode(_)));
    }

    #[test]
    fn rejects_conflicting_inputs() {
        let err = Cli::try_parse_from([
            "cbclink",
            "decode",
            "--hex",
            "05",
            "--file",
            "/tmp/capture.bin",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_replay_with_submissions() {
        let cli = Cli::try_parse_from([
            "cbclink",
            "--format",
            "json",
            "replay",
            "--tables",
            "/tmp/tables.json",
            "--submit",
            "2:020110",
            "--hex",
            "",
        ])
        .expect("replay args should parse");

        match cli.command {
            Command::Replay(args) => assert_eq!(args.submit.len(), 1),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn encode_requires_channel() {
        let err = Cli::try_parse_from(["cbclink", "encode", "--service", "01"])
            .expect_err("missing channel should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
