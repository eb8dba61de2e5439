use std::io::{IsTerminal, Write};

use cbclink_frame::{channel_name, CbcRequest, FrameStats};
use cbclink_transport::Transmission;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use crate::hex;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One deframed or freshly framed request.
#[derive(Serialize, Debug)]
pub struct FrameRecord {
    pub index: usize,
    pub sequence: u8,
    pub channel: u8,
    pub channel_name: &'static str,
    pub priority: String,
    pub command: u8,
    pub srv_len: usize,
    pub frame_len: usize,
    pub service: String,
    pub frame: String,
    #[serde(skip)]
    raw: Vec<u8>,
}

impl FrameRecord {
    /// Describe a link-framed request. `raw` selects what `--format raw`
    /// writes: the service bytes for decoded frames, the frame for encoded.
    pub fn new(index: usize, req: &CbcRequest, raw: &[u8]) -> Self {
        let address = req.address();
        Self {
            index,
            sequence: req.link_header().sequence,
            channel: address.mux,
            channel_name: channel_name(address.mux),
            priority: format!("{:?}", address.priority),
            command: req.command(),
            srv_len: req.srv_len,
            frame_len: req.link_len,
            service: hex::encode(req.service()),
            frame: hex::encode(req.frame()),
            raw: raw.to_vec(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct StatsRecord {
    pub frames: u64,
    pub skipped: u64,
    pub oversized: u64,
    pub checksum_errors: u64,
    pub sequence_errors: u64,
    pub overflow_drops: u64,
}

impl From<FrameStats> for StatsRecord {
    fn from(stats: FrameStats) -> Self {
        Self {
            frames: stats.frames,
            skipped: stats.skipped,
            oversized: stats.oversized,
            checksum_errors: stats.checksum_errors,
            sequence_errors: stats.sequence_errors,
            overflow_drops: stats.overflow_drops,
        }
    }
}

/// One transmission the stack performed.
#[derive(Serialize, Debug)]
pub struct TransmissionRecord {
    pub direction: &'static str,
    pub channel: u8,
    pub channel_name: &'static str,
    pub len: usize,
    pub data: String,
    #[serde(skip)]
    raw: Vec<u8>,
}

impl TransmissionRecord {
    pub fn new(direction: &'static str, transmission: &Transmission) -> Self {
        Self {
            direction,
            channel: transmission.channel,
            channel_name: channel_name(transmission.channel),
            len: transmission.data.len(),
            data: hex::encode(&transmission.data),
            raw: transmission.data.to_vec(),
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Record<'a> {
    Frame(&'a FrameRecord),
    Stats(&'a StatsRecord),
    Transmission(&'a TransmissionRecord),
}

fn print_json(record: &Record<'_>) {
    println!(
        "{}",
        serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_frames(frames: &[FrameRecord], stats: Option<&StatsRecord>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for frame in frames {
                print_json(&Record::Frame(frame));
            }
            if let Some(stats) = stats {
                print_json(&Record::Stats(stats));
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "SEQ", "CHANNEL", "PRIO", "CMD", "SRV", "SERVICE"]);
            for frame in frames {
                table.add_row(vec![
                    frame.index.to_string(),
                    frame.sequence.to_string(),
                    format!("{} ({})", frame.channel_name, frame.channel),
                    frame.priority.clone(),
                    format!("{:#04x}", frame.command),
                    frame.srv_len.to_string(),
                    frame.service.clone(),
                ]);
            }
            println!("{table}");
            if let Some(stats) = stats {
                print_stats_table(stats);
            }
        }
        OutputFormat::Pretty => {
            for frame in frames {
                println!(
                    "frame {} seq={} channel={} ({}) prio={} cmd={:#04x} srv_len={} service={}",
                    frame.index,
                    frame.sequence,
                    frame.channel_name,
                    frame.channel,
                    frame.priority,
                    frame.command,
                    frame.srv_len,
                    frame.service
                );
            }
            if let Some(stats) = stats {
                println!(
                    "stats frames={} skipped={} oversized={} checksum_errors={} sequence_errors={} overflow_drops={}",
                    stats.frames,
                    stats.skipped,
                    stats.oversized,
                    stats.checksum_errors,
                    stats.sequence_errors,
                    stats.overflow_drops
                );
            }
        }
        OutputFormat::Raw => {
            for frame in frames {
                print_raw(&frame.raw);
            }
        }
    }
}

pub fn print_transmissions(records: &[TransmissionRecord], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for record in records {
                print_json(&Record::Transmission(record));
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DIR", "CHANNEL", "LEN", "DATA"]);
            for record in records {
                table.add_row(vec![
                    record.direction.to_string(),
                    format!("{} ({})", record.channel_name, record.channel),
                    record.len.to_string(),
                    record.data.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for record in records {
                println!(
                    "{} channel={} ({}) len={} data={}",
                    record.direction, record.channel_name, record.channel, record.len, record.data
                );
            }
        }
        OutputFormat::Raw => {
            for record in records {
                print_raw(&record.raw);
            }
        }
    }
}

fn print_stats_table(stats: &StatsRecord) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["STAT", "VALUE"])
        .add_row(vec!["frames".to_string(), stats.frames.to_string()])
        .add_row(vec!["skipped".to_string(), stats.skipped.to_string()])
        .add_row(vec!["oversized".to_string(), stats.oversized.to_string()])
        .add_row(vec![
            "checksum_errors".to_string(),
            stats.checksum_errors.to_string(),
        ])
        .add_row(vec![
            "sequence_errors".to_string(),
            stats.sequence_errors.to_string(),
        ])
        .add_row(vec![
            "overflow_drops".to_string(),
            stats.overflow_drops.to_string(),
        ]);
    println!("{table}");
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbclink_frame::{FrameWriter, LIFECYCLE};

    #[test]
    fn frame_record_describes_request() {
        let mut writer = FrameWriter::new(());
        let mut req = CbcRequest::from_service(LIFECYCLE, &[0x02, 0x01]).unwrap();
        writer.pack(&mut req).unwrap();

        let record = FrameRecord::new(0, &req, req.frame());

        assert_eq!(record.channel, LIFECYCLE);
        assert_eq!(record.channel_name, channel_name(LIFECYCLE));
        assert_eq!(record.priority, "High");
        assert_eq!(record.command, 0x02);
        assert_eq!(record.frame_len, 8);
        assert!(record.service.starts_with("02 01"));
    }

    #[test]
    fn json_records_are_tagged() {
        let stats = StatsRecord::from(FrameStats::default());
        let json = serde_json::to_value(Record::Stats(&stats)).unwrap();
        assert_eq!(json["kind"], "stats");
        assert_eq!(json["frames"], 0);
    }
}
