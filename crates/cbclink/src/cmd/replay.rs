use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use cbclink_frame::channel_name;
use cbclink_service::{link, Session};
use cbclink_tables::SignalTables;
use cbclink_transport::{ChannelWriters, MemoryTransport, Transmission, Transmit};
use tracing::{debug, info};

use crate::cmd::ReplayArgs;
use crate::exit::{
    io_error, service_error, table_error, transport_error, CliError, CliResult, SUCCESS,
};
use crate::hex;
use crate::output::{print_transmissions, OutputFormat, TransmissionRecord};

pub fn run(args: ReplayArgs, format: OutputFormat) -> CliResult<i32> {
    let submissions = args
        .submit
        .iter()
        .map(|arg| parse_submission(arg))
        .collect::<CliResult<Vec<_>>>()?;

    let tables = match &args.tables {
        Some(path) => {
            SignalTables::from_path(path).map_err(|err| table_error("failed loading tables", err))?
        }
        None => SignalTables::new(),
    };
    debug!(
        signals = tables.signal_count(),
        groups = tables.group_count(),
        "tables loaded"
    );

    let session = Arc::new(Session::new(Arc::new(tables)).with_boot_reason(args.boot_reason));
    let rx_sink = MemoryTransport::new();
    let tx_sink = MemoryTransport::new();
    let (mut rx, mut tx) = link(session, rx_sink.clone(), tx_sink.clone());

    let bytes = args.input.read()?;
    let frames = rx.feed(&bytes);
    let handed_off = tx.drain();
    for (channel, service) in &submissions {
        tx.submit(*channel, service)
            .map_err(|err| service_error("submit failed", err))?;
    }
    info!(frames, handed_off, submitted = submissions.len(), "replay complete");

    let rx_sent = rx_sink.take();
    let tx_sent = tx_sink.take();
    if let Some(dir) = &args.out_dir {
        write_channels(dir, rx_sent.iter().chain(&tx_sent))?;
    }

    let mut records: Vec<TransmissionRecord> = rx_sent
        .iter()
        .map(|t| TransmissionRecord::new("rx", t))
        .collect();
    records.extend(tx_sent.iter().map(|t| TransmissionRecord::new("tx", t)));

    print_transmissions(&records, format);
    Ok(SUCCESS)
}

/// Replay transmissions into one file per channel under `dir`.
fn write_channels<'a>(
    dir: &Path,
    sent: impl Iterator<Item = &'a Transmission> + Clone,
) -> CliResult<()> {
    std::fs::create_dir_all(dir)
        .map_err(|err| io_error(&format!("failed creating {}", dir.display()), err))?;

    let channels: BTreeSet<u8> = sent.clone().map(|t| t.channel).collect();
    let mut writers = ChannelWriters::new();
    for channel in channels {
        let path = dir.join(channel_file(channel));
        let file = File::create(&path)
            .map_err(|err| io_error(&format!("failed creating {}", path.display()), err))?;
        writers.attach(channel, file);
    }

    for t in sent {
        writers
            .transmit(t.channel, &t.data)
            .map_err(|err| transport_error("channel write failed", err))?;
    }
    debug!(dir = %dir.display(), "channel output written");
    Ok(())
}

fn channel_file(channel: u8) -> String {
    format!("{channel:02}-{}.bin", channel_name(channel).to_ascii_lowercase())
}

fn parse_submission(arg: &str) -> CliResult<(u8, Vec<u8>)> {
    let (channel, service) = arg
        .split_once(':')
        .ok_or_else(|| CliError::usage(format!("expected CHANNEL:HEX, got {arg:?}")))?;
    let channel = channel
        .trim()
        .parse::<u8>()
        .map_err(|err| CliError::usage(format!("invalid channel {channel:?}: {err}")))?;
    Ok((channel, hex::parse(service)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_submission() {
        assert_eq!(parse_submission("7:01 02").unwrap(), (7, vec![0x01, 0x02]));
        assert!(parse_submission("7").is_err());
        assert!(parse_submission("x:01").is_err());
        assert!(parse_submission("300:01").is_err());
    }

    #[test]
    fn channel_files_are_named_by_id() {
        assert_eq!(channel_file(19), "19-virtual_uart.bin");
        assert_eq!(channel_file(7), "07-raw.bin");
    }
}
