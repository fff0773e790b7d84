use trice_frame::{MAX_ID, MAX_PAYLOAD_LEN};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("trice {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: trice");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("TRICE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("framings: none, cobs, tcobs (external codec)");
    println!("buffers: single, double, ring");
    println!("max_id: {MAX_ID}");
    println!("max_payload_len: {MAX_PAYLOAD_LEN}");

    Ok(SUCCESS)
}
