//! PAR 2.0 format properties: packet checksums, recovery-set cohesion,
//! exponent discipline, dedup idempotence, and hashing known answers.

mod common;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use par::checksum::{compute_crc32, compute_file_id, compute_md5};
use par::par2::exponents::{from_wire, is_valid};
use par::par2::{parse_packets, Packet, ParInfo};
use par::{create_par_file, restore_par_file, ContainerVersion};

fn create_par2(dir: &Path, data: &[u8], d: u8, p: u8, s: u32) -> std::path::PathBuf {
    let data_path = common::write_file(dir, "input.txt", data);
    let par_path = dir.join("input.txt.par");
    create_par_file(ContainerVersion::Par2, &par_path, &data_path, d, p, s).expect("create");
    par_path
}

fn packets_of(path: &Path) -> Vec<Packet> {
    let mut reader = BufReader::new(File::open(path).unwrap());
    parse_packets(&mut reader).unwrap()
}

#[test]
fn every_emitted_packet_passes_verification() {
    let dir = common::temp_dir();
    let par_path = create_par2(dir.path(), &common::patterned_bytes(4096, 1), 4, 2, 1024);
    let packets = packets_of(&par_path);
    assert!(!packets.is_empty());
    for packet in &packets {
        assert!(packet.verify(), "packet failed verification: {packet:?}");
    }
    common::finish(dir);
}

#[test]
fn recovery_set_id_binds_every_packet() {
    let dir = common::temp_dir();
    let par_path = create_par2(dir.path(), &common::patterned_bytes(4096, 2), 4, 2, 1024);
    let info = ParInfo::parse(&[par_path]).unwrap();
    let main = info.main.as_ref().unwrap();

    // The set id is the MD5 of the main packet body.
    assert_eq!(main.set_id, main.derive_set_id());
    assert_eq!(info.creator.as_ref().unwrap().set_id, main.set_id);
    let (file_desc, ifsc) = info.primary_file().unwrap();
    assert_eq!(file_desc.set_id, main.set_id);
    assert_eq!(ifsc.set_id, main.set_id);
    for slice in &info.recovery_data {
        assert_eq!(slice.set_id, main.set_id);
    }
    common::finish(dir);
}

#[test]
fn four_kib_scenario_packet_inventory() {
    // 4096 bytes over (4,2,1024): one stripe, two recovery slices of
    // body length 4 + 1024, four checksum pairs.
    let dir = common::temp_dir();
    let par_path = create_par2(dir.path(), &vec![b'A'; 4096], 4, 2, 1024);
    let info = ParInfo::parse(&[par_path]).unwrap();

    let main = info.main.as_ref().unwrap();
    assert_eq!(main.block_size, 1024);
    assert_eq!(main.recovery_set_count, 1);

    let (file_desc, ifsc) = info.primary_file().unwrap();
    assert_eq!(file_desc.file_length, 4096);
    assert_eq!(file_desc.name(), "input.txt");
    assert_eq!(ifsc.pairs.len(), 4);

    assert_eq!(info.recovery_data.len(), 2);
    for slice in &info.recovery_data {
        assert_eq!(slice.recovery_data.len(), 1024);
        assert_eq!(slice.length, 64 + 4 + 1024);
    }
    assert_eq!(info.block_count, 4);
    assert_eq!(info.total_size, 4096);
    common::finish(dir);
}

#[test]
fn exponents_are_valid_and_strictly_increasing() {
    let dir = common::temp_dir();
    // Multiple stripes so the exponent counter crosses stripe boundaries.
    let par_path = create_par2(dir.path(), &common::patterned_bytes(2000, 3), 3, 2, 64);
    let packets = packets_of(&par_path);

    let exponents: Vec<u64> = packets
        .iter()
        .filter_map(|p| match p {
            Packet::RecoverySlice(slice) => {
                Some(from_wire(slice.exponent).expect("wire exponent decodes"))
            }
            _ => None,
        })
        .collect();
    assert!(!exponents.is_empty());
    for window in exponents.windows(2) {
        assert!(window[0] < window[1], "exponents not increasing: {exponents:?}");
    }
    for &e in &exponents {
        assert!(is_valid(e));
        assert!(e % 3 != 0 && e % 5 != 0 && e % 17 != 0 && e % 257 != 0);
    }
    common::finish(dir);
}

#[test]
fn concatenated_file_parses_identically() {
    let dir = common::temp_dir();
    let par_path = create_par2(dir.path(), &common::patterned_bytes(4096, 4), 4, 2, 1024);
    let once = ParInfo::parse(&[par_path.clone()]).unwrap();

    let bytes = std::fs::read(&par_path).unwrap();
    let doubled_path = dir.path().join("doubled.par");
    let mut doubled = bytes.clone();
    doubled.extend_from_slice(&bytes);
    std::fs::write(&doubled_path, doubled).unwrap();
    let twice = ParInfo::parse(&[doubled_path]).unwrap();

    assert_eq!(
        once.main.as_ref().unwrap().md5,
        twice.main.as_ref().unwrap().md5
    );
    assert_eq!(once.recovery_data.len(), twice.recovery_data.len());
    assert_eq!(once.block_count, twice.block_count);
    assert_eq!(once.total_size, twice.total_size);
    assert_eq!(once.files.len(), twice.files.len());
    common::finish(dir);
}

#[test]
fn truncated_par2_file_fails_without_panicking() {
    let dir = common::temp_dir();
    let par_path = create_par2(dir.path(), &common::patterned_bytes(4096, 5), 4, 2, 1024);
    let bytes = std::fs::read(&par_path).unwrap();
    let cut_path = dir.path().join("cut.par");
    std::fs::write(&cut_path, &bytes[..100]).unwrap();

    // Header survives the cut, so parsing yields at most a packet or two
    // and restore fails cleanly.
    let data_path = dir.path().join("input.txt");
    let mut out = Vec::new();
    assert!(restore_par_file(&mut out, &cut_path, &data_path).is_err());
    common::finish(dir);
}

#[test]
fn leading_garbage_is_resynchronized_away() {
    let dir = common::temp_dir();
    let par_path = create_par2(dir.path(), &common::patterned_bytes(4096, 6), 4, 2, 1024);
    let bytes = std::fs::read(&par_path).unwrap();
    let dirty_path = dir.path().join("dirty.par");
    let mut dirty = b"PAR2\0garbage before the first real packet".to_vec();
    dirty.extend_from_slice(&bytes);
    std::fs::write(&dirty_path, dirty).unwrap();

    let info = ParInfo::parse(&[dirty_path.clone()]).unwrap();
    assert!(info.main.is_some());
    assert_eq!(info.recovery_data.len(), 2);

    // The garbage still begins with the PAR2 prefix, so the dispatcher
    // accepts the file and restore succeeds end to end.
    let data_path = dir.path().join("input.txt");
    let mut out = Vec::new();
    restore_par_file(&mut out, &dirty_path, &data_path).unwrap();
    assert_eq!(out, common::patterned_bytes(4096, 6));
    common::finish(dir);
}

#[test]
fn file_id_and_slice_checksums_match_the_reference_derivation() {
    let data = common::patterned_bytes(2600, 7);
    let dir = common::temp_dir();
    let par_path = create_par2(dir.path(), &data, 4, 2, 1024);
    let info = ParInfo::parse(&[par_path]).unwrap();
    let (file_desc, ifsc) = info.primary_file().unwrap();

    // Independent derivation of the identity hashes: the mini hash covers
    // the first 16 KiB (the whole file here), and the file id hashes
    // mini-md5, little-endian length and the unpadded ASCII name.
    let mini = compute_md5(&data);
    assert_eq!(file_desc.mini_md5, mini);
    assert_eq!(file_desc.file_md5, compute_md5(&data));
    assert_eq!(
        file_desc.file_id,
        compute_file_id(&mini, data.len() as u64, b"input.txt")
    );
    assert_eq!(ifsc.file_id, file_desc.file_id);

    // Per-block pairs cover the zero-padded block; three blocks for 2600
    // bytes at block size 1024.
    assert_eq!(ifsc.pairs.len(), 3);
    for (i, pair) in ifsc.pairs.iter().enumerate() {
        let start = i * 1024;
        let end = (start + 1024).min(data.len());
        let mut block = data[start..end].to_vec();
        block.resize(1024, 0);
        assert_eq!(pair.md5, compute_md5(&block), "block {i} md5");
        assert_eq!(pair.crc32, compute_crc32(&block), "block {i} crc");
    }
    common::finish(dir);
}

#[test]
fn header_packets_are_emitted_twice() {
    let dir = common::temp_dir();
    let par_path = create_par2(dir.path(), &common::patterned_bytes(4096, 8), 4, 2, 1024);
    // parse_packets dedups, so count raw magic + type occurrences instead.
    let bytes = std::fs::read(&par_path).unwrap();
    let count = |needle: &[u8]| {
        bytes
            .windows(needle.len())
            .filter(|window| *window == needle)
            .count()
    };
    assert_eq!(count(b"PAR 2.0\0Main\0\0\0\0"), 2);
    assert_eq!(count(b"PAR 2.0\0FileDesc"), 2);
    assert_eq!(count(b"PAR 2.0\0Creator\0"), 2);
    assert_eq!(count(b"PAR 2.0\0IFSC\0\0\0\0"), 2);
    assert_eq!(count(b"PAR 2.0\0RecvSlic"), 2); // one per recovery slice
    common::finish(dir);
}

#[test]
fn dump_model_exposes_the_main_packet_fields() {
    let dir = common::temp_dir();
    let par_path = create_par2(dir.path(), &common::patterned_bytes(4096, 9), 4, 2, 1024);
    let info = ParInfo::parse(&[par_path]).unwrap();
    let value = serde_json::to_value(&info).unwrap();
    assert_eq!(value["Main"]["BlockSize"], 1024);
    assert_eq!(value["Files"][0]["FileDesc"]["FileLength"], 4096);
    assert_eq!(value["BlockCount"], 4);
    common::finish(dir);
}
