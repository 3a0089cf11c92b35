//! Centralized hashing utilities.
//!
//! All MD5, CRC-32 and CRC-32C computation goes through this module so the
//! padding and endianness conventions live in one place:
//!
//! - shard hashes in the JSON and tar framings are CRC-32C (Castagnoli)
//!   over the zero-padded S-byte shard;
//! - PAR 2.0 slice checksums are MD5 + CRC-32 (IEEE) over the zero-padded
//!   block, with the CRC emitted in little-endian byte order;
//! - the PAR 2.0 file id is MD5 of the 16-KiB hash, the little-endian
//!   length, and the unpadded ASCII file name.

use md5::{Digest, Md5};

use crate::domain::{Crc32Value, FileId, Md5Hash};

const HASH_16K_THRESHOLD: u64 = 16 * 1024;

/// Compute MD5 of a byte slice in one shot.
#[inline]
pub fn compute_md5(data: &[u8]) -> Md5Hash {
    Md5Hash::new(Md5::digest(data).into())
}

/// Compute MD5 as raw bytes (packet sealing and verification).
#[inline]
pub fn compute_md5_bytes(data: &[u8]) -> [u8; 16] {
    Md5::digest(data).into()
}

#[inline]
pub fn new_md5_hasher() -> Md5 {
    Md5::new()
}

#[inline]
pub fn finalize_md5(hasher: Md5) -> Md5Hash {
    Md5Hash::new(hasher.finalize().into())
}

/// CRC-32 (IEEE), as used by PAR 2.0 slice checksums.
#[inline]
pub fn compute_crc32(data: &[u8]) -> Crc32Value {
    Crc32Value::new(crc32fast::hash(data))
}

/// CRC-32C (Castagnoli), as used by the JSON and tar shard records.
#[inline]
pub fn compute_crc32c(data: &[u8]) -> Crc32Value {
    Crc32Value::new(crc32c::crc32c(data))
}

/// MD5 + CRC-32 of a block zero-padded to `block_size`.
pub fn compute_block_checksums_padded(data: &[u8], block_size: usize) -> (Md5Hash, Crc32Value) {
    if data.len() < block_size {
        let mut padded = vec![0u8; block_size];
        padded[..data.len()].copy_from_slice(data);
        (compute_md5(&padded), compute_crc32(&padded))
    } else {
        (compute_md5(data), compute_crc32(data))
    }
}

/// PAR 2.0 file id: `MD5(md5_16k || file_length (u64 LE) || file_name)`.
/// The name is the unpadded on-wire ASCII name.
pub fn compute_file_id(md5_16k: &Md5Hash, file_length: u64, file_name: &[u8]) -> FileId {
    let mut hasher = new_md5_hasher();
    hasher.update(md5_16k.as_bytes());
    hasher.update(file_length.to_le_bytes());
    hasher.update(file_name);
    FileId::new(hasher.finalize().into())
}

/// Accumulates the 16-KiB-prefix MD5 and the whole-stream MD5 in one pass.
/// For streams shorter than 16 KiB both digests are equal.
pub struct HashAccumulator {
    hasher_16k: Md5,
    hasher_full: Md5,
    total: u64,
    prefix_done: bool,
}

impl Default for HashAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl HashAccumulator {
    pub fn new() -> Self {
        Self {
            hasher_16k: new_md5_hasher(),
            hasher_full: new_md5_hasher(),
            total: 0,
            prefix_done: false,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        if !self.prefix_done {
            let room = (HASH_16K_THRESHOLD - self.total) as usize;
            let take = data.len().min(room);
            self.hasher_16k.update(&data[..take]);
            if self.total + data.len() as u64 >= HASH_16K_THRESHOLD {
                // The full-stream hasher picks up from the finished prefix.
                self.hasher_full = self.hasher_16k.clone();
                self.hasher_full.update(&data[take..]);
                self.prefix_done = true;
            }
        } else {
            self.hasher_full.update(data);
        }
        self.total += data.len() as u64;
    }

    /// Returns `(md5_16k, md5_full, total_bytes)`.
    pub fn finalize(self) -> (Md5Hash, Md5Hash, u64) {
        let hash_16k = finalize_md5(self.hasher_16k);
        let hash_full = if self.total < HASH_16K_THRESHOLD {
            hash_16k
        } else {
            finalize_md5(self.hasher_full)
        };
        (hash_16k, hash_full, self.total)
    }
}
