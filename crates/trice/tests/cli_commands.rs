#![cfg(feature = "cli")]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use bytes::BytesMut;
use trice_frame::{encode_record, ByteOrder, Stamp};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "trice-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn write_dump(dir: &Path, records: &[(u16, Stamp, &[u8])]) -> PathBuf {
    let mut buf = BytesMut::new();
    for (cycle, (id, stamp, payload)) in records.iter().enumerate() {
        encode_record(&mut buf, *id, *stamp, payload, cycle as u8, ByteOrder::Little)
            .expect("record should encode");
    }
    let path = dir.join("dump.bin");
    std::fs::write(&path, &buf).expect("dump should be writable");
    path
}

fn trice(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_trice"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .output()
        .expect("trice should run")
}

fn sample_dump(dir: &Path) -> PathBuf {
    write_dump(
        dir,
        &[
            (42, Stamp::None, &[0xAA, 0xBB, 0xCC][..]),
            (7, Stamp::Ts16(0x1234), &b"hi"[..]),
            (300, Stamp::Ts32(0xCAFE), &[][..]),
        ],
    )
}

#[test]
fn walk_lists_records_as_json() {
    let dir = unique_temp_dir("walk");
    let dump = sample_dump(&dir);

    let output = trice(&["--format", "json", "walk", dump.to_str().unwrap()]);

    assert!(output.status.success());
    let rows: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be json");
    let rows = rows.as_array().expect("walk prints an array");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["id"], 42);
    assert_eq!(rows[0]["payload"], "aa bb cc");
    assert_eq!(rows[1]["type"], "stamp16");
    assert_eq!(rows[1]["stamp"], 0x1234);
    assert_eq!(rows[2]["offset"], 20);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn walk_corrupt_dump_returns_60() {
    let dir = unique_temp_dir("corrupt");
    let dump = sample_dump(&dir);
    let mut bytes = std::fs::read(&dump).unwrap();
    // Break the Stamp16 header duplicate of the second record.
    bytes[8] ^= 0x01;
    std::fs::write(&dump, &bytes).unwrap();

    let output = trice(&["--format", "json", "walk", dump.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(60));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"id\":42"));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("offset 8"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn walk_missing_file_fails() {
    let output = trice(&["walk", "/nonexistent/trice-dump.bin"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn encode_without_framing_writes_netto_concatenation() {
    let dir = unique_temp_dir("encode");
    let dump = write_dump(
        &dir,
        &[
            (42, Stamp::None, &[0xAA, 0xBB, 0xCC][..]),
            (7, Stamp::Ts16(0x1234), &[0x01][..]),
        ],
    );
    let packet = dir.join("packet.bin");

    let output = trice(&[
        "--format",
        "json",
        "encode",
        dump.to_str().unwrap(),
        "--framing",
        "none",
        "-o",
        packet.to_str().unwrap(),
    ]);

    assert!(output.status.success());
    assert_eq!(
        std::fs::read(&packet).unwrap(),
        [
            0x2A, 0x40, 0x00, 0x03, 0xAA, 0xBB, 0xCC, // id 42
            0x07, 0x80, 0x34, 0x12, 0x01, 0x01, 0x01, // id 7, cycle 1
        ]
    );
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["records"], 2);
    assert_eq!(summary["first_id"], 42);
    assert_eq!(summary["packet_len"], 14);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn encode_cobs_raw_ends_with_delimiter() {
    let dir = unique_temp_dir("cobs");
    let dump = sample_dump(&dir);

    let output = trice(&["--format", "raw", "encode", dump.to_str().unwrap()]);

    assert!(output.status.success());
    assert_eq!(output.stdout.last(), Some(&0u8));
    assert_eq!(output.stdout.iter().filter(|b| **b == 0).count(), 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn simulate_reports_channels_and_health() {
    let dir = unique_temp_dir("simulate");
    let dump = sample_dump(&dir);
    let config = dir.join("trace.json");
    std::fs::write(
        &config,
        r#"{
            "framing": "none",
            "transfer_mode": "single-pack",
            "buffer": { "strategy": "ring", "size": 64 },
            "channels": [
                { "name": "low", "min_id": 0, "max_id": 100 },
                { "name": "all" }
            ]
        }"#,
    )
    .unwrap();

    let output = trice(&[
        "--format",
        "json",
        "simulate",
        dump.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]);

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["records"], 3);
    assert_eq!(report["packets"], 3);
    // Netto sizes: 7 (id 42), 8 (id 7), 8 (id 300).
    assert_eq!(report["channels"][0]["bytes"], 15);
    assert_eq!(report["channels"][1]["bytes"], 23);
    assert_eq!(report["health"]["error_count"], 0);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn simulate_rejects_bad_config() {
    let dir = unique_temp_dir("badcfg");
    let dump = sample_dump(&dir);
    let config = dir.join("trace.json");
    std::fs::write(&config, r#"{ "framing": "tcobs" }"#).unwrap();

    let output = trice(&[
        "simulate",
        dump.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]);

    assert_eq!(output.status.code(), Some(64));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_prints_package_version() {
    let output = trice(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}
