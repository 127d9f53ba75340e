use bytes::Bytes;
use rohcheck_cli::commands::inspect;
use rohcheck_core::{
    capture::PcapWriter,
    types::{Frame, LinkType},
    FrameSink,
};
use std::path::Path;
use tempfile::tempdir;

fn write_raw_capture(path: &Path, packets: &[&[u8]]) {
    let mut writer = PcapWriter::create(path, LinkType::Raw).unwrap();
    for packet in packets {
        writer
            .write(&Frame::new(LinkType::Raw, Bytes::copy_from_slice(packet)))
            .unwrap();
    }
    writer.finish().unwrap();
}

#[test]
fn test_inspect_counts_packet_kinds() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rohc.pcap");
    write_raw_capture(
        &path,
        &[
            &[0xFC, 0x00, 0xB7, 0x45],
            &[0xF1, 0x00, 0xFC, 0x00, 0xB7, 0x45],
            &[0x45, 0x00, 0x00, 0x14],
            &[0xF1, 0x00],
        ],
    );

    let summary = inspect::execute(path.to_str().unwrap(), "smallcid", true).unwrap();

    assert_eq!(summary.frames, 4);
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.kinds.get("IR"), Some(&2));
    assert_eq!(summary.kinds.get("UO-0"), Some(&1));
    assert_eq!(summary.kinds.get("feedback-only"), Some(&1));
}

#[test]
fn test_inspect_reports_invalid_packets() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rohc.pcap");
    write_raw_capture(&path, &[&[0xF5, 0x00], &[0xFC, 0x00, 0xB7, 0x45]]);

    let summary = inspect::execute(path.to_str().unwrap(), "smallcid", false).unwrap();
    assert_eq!(summary.frames, 2);
    assert_eq!(summary.errors, 1);
}

#[test]
fn test_inspect_rejects_bad_cid_type() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rohc.pcap");
    write_raw_capture(&path, &[&[0x45]]);

    assert!(inspect::execute(path.to_str().unwrap(), "tinycid", false).is_err());
}

#[test]
fn test_inspect_missing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.pcap");
    assert!(inspect::execute(path.to_str().unwrap(), "smallcid", false).is_err());
}
