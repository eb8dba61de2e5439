use std::io::Cursor;

use cbclink_frame::{FrameError, FrameReader};
use tracing::debug;

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_frames, FrameRecord, OutputFormat, StatsRecord};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = args.input.read()?;
    debug!(len = bytes.len(), "decoding serial capture");

    let mut reader = FrameReader::new(Cursor::new(bytes));
    let mut frames = Vec::new();
    loop {
        match reader.read_request() {
            Ok(req) => {
                let record = FrameRecord::new(frames.len(), &req, req.service());
                frames.push(record);
            }
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => return Err(frame_error("decode failed", err)),
        }
    }

    if reader.buffered() > 0 {
        debug!(trailing = reader.buffered(), "capture ends inside a frame");
    }

    let stats = StatsRecord::from(reader.stats());
    print_frames(&frames, Some(&stats), format);
    Ok(SUCCESS)
}
