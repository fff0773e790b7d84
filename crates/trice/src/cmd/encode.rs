use serde::Serialize;
use tracing::info;
use trice_frame::{ByteOrder, DeferredEncoder, Diagnostics, Framing, RecordWalker};

use crate::cmd::{read_dump, EncodeArgs};
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{hex, print_json, print_pairs, print_raw, OutputFormat};

#[derive(Serialize)]
struct EncodeOutput {
    records: usize,
    first_id: Option<u16>,
    dump_len: usize,
    netto_len: usize,
    packet_len: usize,
    framing: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    packet: Option<String>,
}

/// Multi-pack encode of a whole dump: every record's netto bytes in one
/// packet, framed as requested.
pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let dump = read_dump(&args.dump)?;
    let framing = Framing::from(args.framing);

    let mut walker = RecordWalker::new(&dump, ByteOrder::from(args.byte_order));
    let mut diag = Diagnostics::new();
    let mut records = Vec::new();
    while let Some(record) = walker
        .next_record(&mut diag)
        .map_err(|err| frame_error("walk dump", err))?
    {
        records.push(record);
    }

    let mut encoder = DeferredEncoder::new(framing).map_err(|err| frame_error("encode", err))?;
    let packet = encoder
        .encode_records(&records)
        .map_err(|err| frame_error("encode", err))?;

    let mut out = EncodeOutput {
        records: records.len(),
        first_id: records.first().map(|record| record.id),
        dump_len: dump.len(),
        netto_len: records.iter().map(|record| record.len_bytes()).sum(),
        packet_len: packet.len(),
        framing: framing.name(),
        packet: None,
    };

    if let Some(path) = &args.output {
        std::fs::write(path, &packet)
            .map_err(|err| io_error(&format!("write {}", path.display()), err))?;
        info!(path = %path.display(), len = packet.len(), "packet written");
    } else if matches!(format, OutputFormat::Raw) {
        print_raw(&packet);
        return Ok(SUCCESS);
    } else {
        out.packet = Some(hex(&packet));
    }

    match format {
        OutputFormat::Json => print_json(&out),
        _ => {
            let mut pairs = vec![
                ("records", out.records.to_string()),
                ("dump_len", out.dump_len.to_string()),
                ("netto_len", out.netto_len.to_string()),
                ("packet_len", out.packet_len.to_string()),
                ("framing", out.framing.to_string()),
            ];
            if let Some(id) = out.first_id {
                pairs.push(("first_id", id.to_string()));
            }
            if let Some(packet) = out.packet {
                pairs.push(("packet", packet));
            }
            print_pairs(&pairs, format);
        }
    }
    Ok(SUCCESS)
}
