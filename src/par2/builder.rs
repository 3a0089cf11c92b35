//! Write-side assembly of a single-file recovery set.
//!
//! One pass over the input computes the file description hashes (full MD5,
//! first-16-KiB MD5, length) together with the per-block IFSC pairs, then
//! the main packet is finalized and its body MD5 becomes the recovery-set
//! id stamped into every packet.

use std::io::Read;

use crate::checksum::{compute_block_checksums_padded, HashAccumulator};
use crate::domain::RecoverySetId;
use crate::error::Result;

use super::creator_packet::CreatorPacket;
use super::file_desc_packet::FileDescPacket;
use super::ifsc_packet::{ChecksumPair, IfscPacket};
use super::main_packet::MainPacket;

/// Scans `reader`, producing the FileDesc and IFSC packets for one input
/// file. `block_size` is the recovery-set block size; partial final blocks
/// are zero-padded before hashing.
pub fn scan_reader<R: Read>(
    reader: &mut R,
    file_name: &str,
    block_size: usize,
) -> Result<(FileDescPacket, IfscPacket)> {
    let mut file_desc = FileDescPacket::new(file_name);
    let mut acc = HashAccumulator::new();
    let mut pairs: Vec<ChecksumPair> = Vec::new();

    let mut block = vec![0u8; block_size];
    let mut filled = 0usize;
    loop {
        match reader.read(&mut block[filled..]) {
            Ok(0) => break,
            Ok(n) => {
                filled += n;
                if filled == block_size {
                    acc.update(&block);
                    let (md5, crc32) = compute_block_checksums_padded(&block, block_size);
                    pairs.push(ChecksumPair { md5, crc32 });
                    filled = 0;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    if filled > 0 {
        acc.update(&block[..filled]);
        let (md5, crc32) = compute_block_checksums_padded(&block[..filled], block_size);
        pairs.push(ChecksumPair { md5, crc32 });
    }

    let (mini_md5, full_md5, length) = acc.finalize();
    file_desc.mini_md5 = mini_md5;
    file_desc.file_md5 = full_md5;
    file_desc.file_length = length;
    file_desc.recalc_file_id();

    let mut ifsc = IfscPacket::new(file_desc.file_id);
    ifsc.pairs = pairs;
    Ok((file_desc, ifsc))
}

/// The four header packets of a single-file recovery set, sealed under a
/// common recovery-set id.
pub struct RecoverySet {
    pub main: MainPacket,
    pub file_desc: FileDescPacket,
    pub ifsc: IfscPacket,
    pub creator: CreatorPacket,
    pub set_id: RecoverySetId,
}

/// Builds the main packet from the scanned file, derives the recovery-set
/// id from its body, and stamps and seals every header packet.
pub fn build_recovery_set(
    block_size: u64,
    mut file_desc: FileDescPacket,
    mut ifsc: IfscPacket,
    creator_text: &str,
) -> RecoverySet {
    let mut main = MainPacket::new(block_size);
    main.recovery_set_file_ids.push(file_desc.file_id);
    main.recovery_set_count = 1;

    let set_id = main.derive_set_id();
    main.set_id = set_id;
    file_desc.set_id = set_id;
    ifsc.set_id = set_id;
    let mut creator = CreatorPacket::new(creator_text);
    creator.set_id = set_id;

    main.recalc();
    file_desc.recalc();
    ifsc.recalc();
    creator.recalc();

    RecoverySet {
        main,
        file_desc,
        ifsc,
        creator,
        set_id,
    }
}
