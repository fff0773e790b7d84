use serde::Serialize;
use tracing::{debug, warn};
use trice_frame::{FrameError, RecordWalker};
use trice_route::{DeferredOutput, HealthReport, RouteError, Router, TraceConfig};
use trice_transport::MemoryPort;

use crate::cmd::{read_dump, SimulateArgs};
use crate::exit::{route_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_json, print_pairs, OutputFormat};

#[derive(Serialize)]
struct ChannelOutput {
    name: String,
    bytes: usize,
}

#[derive(Serialize)]
struct SimulateOutput {
    buffer: &'static str,
    framing: &'static str,
    transfer_mode: &'static str,
    records: usize,
    packets: u64,
    channels: Vec<ChannelOutput>,
    health: HealthReport,
}

pub fn run(args: SimulateArgs, format: OutputFormat) -> CliResult<i32> {
    let config = match &args.config {
        Some(path) => TraceConfig::from_path(path)
            .map_err(|err| route_error(&format!("load {}", path.display()), err))?,
        None => TraceConfig::default(),
    };
    let dump = read_dump(&args.dump)?;

    let mut output = config
        .build_output()
        .map_err(|err| route_error("build output", err))?;
    let mut router = config
        .build_router(|_| MemoryPort::new())
        .map_err(|err| route_error("build router", err))?;

    let records = replay(&dump, &config, &mut output, &mut router)
        .map_err(|err| route_error("simulate", err))?;
    output
        .flush(&mut router)
        .map_err(|err| route_error("flush", err))?;

    let health = HealthReport::collect(output.diagnostics(), &router);
    let channels = router
        .channels()
        .iter()
        .map(|channel| ChannelOutput {
            name: channel.name().to_string(),
            bytes: channel.transmitter().port().sent().len(),
        })
        .collect();
    let out = SimulateOutput {
        buffer: config.buffer.strategy.name(),
        framing: config.framing.name(),
        transfer_mode: config.transfer_mode.name(),
        records,
        packets: output.packets_sent(),
        channels,
        health,
    };
    print_simulation(&out, format);

    if out.health.error_count > 0 {
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}

/// Push every record of `dump` into the output, flushing whenever the buffer
/// fills up. Stops at the first corrupt record. Returns the records pushed.
fn replay(
    dump: &[u8],
    config: &TraceConfig,
    output: &mut DeferredOutput,
    router: &mut Router<MemoryPort>,
) -> Result<usize, RouteError> {
    let mut walker = RecordWalker::new(dump, config.byte_order);
    let mut pushed = 0;
    loop {
        let start = walker.consumed();
        let record = match walker.next_record(output.diagnostics_mut()) {
            Ok(Some(record)) => record,
            Ok(None) => break,
            Err(err) => {
                warn!(offset = start, error = %err, "dump ends in corrupt data");
                break;
            }
        };
        let raw = &dump[start..start + record.consumed];
        match output.push_raw(raw) {
            Err(RouteError::Frame(FrameError::BufferFull { .. })) => {
                debug!(pending = output.pending(), "buffer full, flushing");
                output.flush(router)?;
                output.push_raw(raw)?;
            }
            other => other?,
        }
        pushed += 1;
    }
    Ok(pushed)
}

fn print_simulation(out: &SimulateOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        _ => {
            let mut pairs = vec![
                ("buffer", out.buffer.to_string()),
                ("framing", out.framing.to_string()),
                ("transfer_mode", out.transfer_mode.to_string()),
                ("records", out.records.to_string()),
                ("packets", out.packets.to_string()),
            ];
            for channel in &out.channels {
                pairs.push(("channel", format!("{} ({} bytes)", channel.name, channel.bytes)));
            }
            print_pairs(&pairs, format);
            print!("{}", out.health);
        }
    }
}
