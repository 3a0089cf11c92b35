//! Restore-side shard source for the PAR 2.0 container.
//!
//! Data slots read blocks from the original data file and verify them
//! against the IFSC pairs; a mismatching or short block becomes a hole for
//! the GF(2^16) codec to solve. Parity slots replay recovery slices in
//! ascending-exponent order: slice `k` serves stripe `k / P`, parity slot
//! `k % P`, mirroring the writer's globally advancing exponent counter.

use std::io::{Read, Seek};

use log::warn;

use crate::checksum::{compute_crc32, compute_md5};
use crate::error::Result;
use crate::frame_json::fill_view_from;
use crate::metadata::ShardMetadata;
use crate::shard::{ShardPull, ShardSource};

use super::ifsc_packet::ChecksumPair;

pub struct Par2ShardSource<D> {
    data: D,
    pairs: Vec<ChecksumPair>,
    /// Recovery slice bytes indexed by sequence position; `None` where the
    /// slice was lost or damaged.
    recovery: Vec<Option<Vec<u8>>>,
    data_shards: usize,
    parity_shards: usize,
    remaining: u64,
    block_idx: usize,
    index: u32,
    stripe: u64,
}

impl<D: Read + Seek> Par2ShardSource<D> {
    pub fn new(
        data: D,
        pairs: Vec<ChecksumPair>,
        recovery: Vec<Option<Vec<u8>>>,
        data_shards: usize,
        parity_shards: usize,
        file_length: u64,
    ) -> Self {
        Self {
            data,
            pairs,
            recovery,
            data_shards,
            parity_shards,
            remaining: file_length,
            block_idx: 0,
            index: 0,
            stripe: 0,
        }
    }

    fn next_data_shard(&mut self, view: &mut [u8]) -> Result<ShardPull> {
        let size = (view.len() as u64).min(self.remaining) as u32;
        self.remaining -= size as u64;
        let mut meta = ShardMetadata {
            index: self.index,
            size,
            hash32: 0,
        };
        if size == 0 {
            return Ok(ShardPull::Filled(meta));
        }

        let block = self.block_idx;
        self.block_idx += 1;
        if !fill_view_from(&mut self.data, view, size as usize)? {
            warn!("data block {block}: short read, marking as missing");
            return Ok(ShardPull::Hole(meta));
        }

        // The IFSC pair covers the zero-padded block, which is exactly the
        // view contents at this point.
        let got = ChecksumPair {
            md5: compute_md5(view),
            crc32: compute_crc32(view),
        };
        meta.hash32 = got.crc32.as_u32();
        match self.pairs.get(block) {
            Some(want) if *want == got => Ok(ShardPull::Filled(meta)),
            Some(_) => {
                warn!("data block {block}: checksum mismatch, marking as missing");
                Ok(ShardPull::Hole(meta))
            }
            None => {
                warn!("data block {block}: no slice checksum on record");
                Ok(ShardPull::Hole(meta))
            }
        }
    }

    fn next_parity_shard(&mut self, view: &mut [u8], slot: usize) -> ShardPull {
        let meta = ShardMetadata {
            index: self.index,
            size: view.len() as u32,
            hash32: 0,
        };
        let k = self.stripe as usize * self.parity_shards + (slot - self.data_shards);
        match self.recovery.get(k) {
            Some(Some(bytes)) if bytes.len() == view.len() => {
                view.copy_from_slice(bytes);
                ShardPull::Filled(meta)
            }
            Some(Some(_)) => {
                warn!("recovery slice {k}: length does not match the block size");
                ShardPull::Hole(meta)
            }
            _ => ShardPull::Hole(meta),
        }
    }
}

impl<D: Read + Seek> ShardSource for Par2ShardSource<D> {
    fn next_shard(&mut self, view: &mut [u8], slot: usize) -> Result<ShardPull> {
        if slot == 0 && self.remaining == 0 {
            return Ok(ShardPull::Eof);
        }
        self.index += 1;
        let pull = if slot < self.data_shards {
            self.next_data_shard(view)?
        } else {
            self.next_parity_shard(view, slot)
        };
        if slot == self.data_shards + self.parity_shards - 1 {
            self.stripe += 1;
        }
        Ok(pull)
    }
}
