use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use trice_frame::Record;

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

/// One walked record as printed by `walk`.
#[derive(Serialize)]
pub struct RecordRow {
    pub offset: usize,
    pub id: u16,
    #[serde(rename = "type")]
    pub type_class: &'static str,
    pub stamp: Option<u32>,
    pub cycle: Option<u8>,
    pub len: usize,
    pub payload: String,
}

impl RecordRow {
    pub fn new(offset: usize, record: &Record<'_>) -> Self {
        Self {
            offset,
            id: record.id,
            type_class: record.type_class.name(),
            stamp: record.stamp,
            cycle: record.cycle,
            len: record.len_bytes(),
            payload: hex(record.payload),
        }
    }
}

pub fn print_records(rows: &[RecordRow], netto: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(rows),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["OFFSET", "ID", "TYPE", "STAMP", "LEN", "PAYLOAD"]);
            for row in rows {
                table.add_row(vec![
                    row.offset.to_string(),
                    row.id.to_string(),
                    row.type_class.to_string(),
                    optional(row.stamp),
                    row.len.to_string(),
                    row.payload.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in rows {
                println!(
                    "offset={} id={} type={} stamp={} cycle={} len={} payload=[{}]",
                    row.offset,
                    row.id,
                    row.type_class,
                    optional(row.stamp),
                    optional(row.cycle),
                    row.len,
                    row.payload
                );
            }
        }
        OutputFormat::Raw => print_raw(netto),
    }
}

/// Print any serializable value as one JSON line.
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

/// Print key/value pairs as a two-column table or `key=value` lines.
pub fn print_pairs(pairs: &[(&str, String)], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (key, value) in pairs {
                table.add_row(vec![key.to_string(), value.clone()]);
            }
            println!("{table}");
        }
        _ => {
            for (key, value) in pairs {
                println!("{key}={value}");
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
