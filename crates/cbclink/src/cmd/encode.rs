use cbclink_frame::{CbcRequest, FrameWriter};

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::hex;
use crate::output::{print_frames, FrameRecord, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let service = hex::parse(&args.service)?;

    let mut req = CbcRequest::from_service(args.channel, &service)
        .map_err(|err| frame_error("encode failed", err))?;
    let mut writer = FrameWriter::new(());
    writer
        .pack(&mut req)
        .map_err(|err| frame_error("encode failed", err))?;

    let record = FrameRecord::new(0, &req, req.frame());
    print_frames(&[record], None, format);
    Ok(SUCCESS)
}
