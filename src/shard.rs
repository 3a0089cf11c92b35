//! Shard buffer and the seams between the erasure pipeline and a framing.

use crate::error::Result;
use crate::metadata::ShardMetadata;

/// Owns one contiguous `(D+P)*S` byte region and hands out `D+P`
/// non-overlapping S-byte views in index order. Views are re-borrowed each
/// stripe; none outlives the buffer.
pub struct ShardBuffer {
    data: Vec<u8>,
    shard_size: usize,
    shard_count: usize,
}

impl ShardBuffer {
    pub fn new(shard_count: usize, shard_size: usize) -> Self {
        Self {
            data: vec![0u8; shard_count * shard_size],
            shard_size,
            shard_count,
        }
    }

    pub fn shard_size(&self) -> usize {
        self.shard_size
    }

    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    /// All shards as mutable views, index order.
    pub fn views_mut(&mut self) -> Vec<&mut [u8]> {
        self.data.chunks_exact_mut(self.shard_size).collect()
    }

    /// All shards as shared views, index order.
    pub fn views(&self) -> Vec<&[u8]> {
        self.data.chunks_exact(self.shard_size).collect()
    }

    pub fn shard(&self, index: usize) -> &[u8] {
        let start = index * self.shard_size;
        &self.data[start..start + self.shard_size]
    }

    pub fn shard_mut(&mut self, index: usize) -> &mut [u8] {
        let start = index * self.shard_size;
        &mut self.data[start..start + self.shard_size]
    }

    /// Prefix of the backing region; `len` need not be shard-aligned.
    /// Used to emit the logical data bytes of a stripe.
    pub fn prefix(&self, len: usize) -> &[u8] {
        &self.data[..len]
    }

    /// Copies `bytes` into the backing region starting at `offset`.
    pub fn fill_at(&mut self, offset: usize, bytes: &[u8]) {
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Zero-fills `[from, to)` of the backing region.
    pub fn zero_range(&mut self, from: usize, to: usize) {
        self.data[from..to].fill(0);
    }
}

/// Pull result of a shard source. A hole still carries the framing metadata
/// when the framing could decode it, so the decoder can account for the
/// slot's declared length before reconstruction.
#[derive(Debug, Clone, Copy)]
pub enum ShardPull {
    /// No further stripes. Only legal at slot 0.
    Eof,
    /// The slot's bytes are missing or failed their checksum.
    Hole(ShardMetadata),
    /// The view holds the padded shard described by the metadata.
    Filled(ShardMetadata),
}

/// Consumes one encoded stripe: `shards` holds all D+P padded views in slot
/// order and `logical_len` is the used portion of the data region (the rest
/// is zero padding).
pub trait StripeSink {
    fn write_stripe(&mut self, shards: &[&[u8]], logical_len: usize) -> Result<()>;
}

/// Produces shards one slot at a time in `0..D+P` order, stripe after
/// stripe, filling the provided S-byte view.
pub trait ShardSource {
    fn next_shard(&mut self, view: &mut [u8], slot: usize) -> Result<ShardPull>;
}
