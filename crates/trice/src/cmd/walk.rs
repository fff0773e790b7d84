use tracing::debug;
use trice_frame::{ByteOrder, Diagnostics, RecordWalker};

use crate::cmd::{read_dump, WalkArgs};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_records, OutputFormat, RecordRow};

pub fn run(args: WalkArgs, format: OutputFormat) -> CliResult<i32> {
    let dump = read_dump(&args.dump)?;
    let order = ByteOrder::from(args.byte_order);

    let mut walker = RecordWalker::new(&dump, order);
    let mut diag = Diagnostics::new();
    let mut rows = Vec::new();
    let mut netto = Vec::new();

    let outcome = loop {
        let offset = walker.consumed();
        match walker.next_record(&mut diag) {
            Ok(Some(record)) => {
                netto.extend_from_slice(record.netto);
                rows.push(RecordRow::new(offset, &record));
            }
            Ok(None) => break Ok(()),
            Err(err) => break Err((offset, err)),
        }
    };
    debug!(records = rows.len(), bytes = walker.consumed(), "walked dump");

    // Records before a corruption are still listed.
    print_records(&rows, &netto, format);
    match outcome {
        Ok(()) => Ok(SUCCESS),
        Err((offset, err)) => Err(frame_error(&format!("record at offset {offset}"), err)),
    }
}
