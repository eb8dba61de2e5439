use cbclink_frame::codec::{MAX_FRAME_SIZE, MAX_SERVICE_SIZE, RING_BUFFER_SIZE};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("cbclink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: cbclink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("CBCLINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("features: service={}, cli=true", cfg!(feature = "service"));
    println!("ring_buffer: {RING_BUFFER_SIZE}");
    println!("max_frame: {MAX_FRAME_SIZE}");
    println!("max_service: {MAX_SERVICE_SIZE}");

    Ok(SUCCESS)
}
