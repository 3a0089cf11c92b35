//! PAR 2.0 container writer.
//!
//! Emission order: the four header packets on open, one RecoverySlice per
//! parity shard as stripes flush, and the header packets once more on
//! close so a second copy survives damage to either end of the file.

use std::io::{Read, Seek, Write};

use binrw::BinWrite;

use crate::error::Result;
use crate::metadata::FileMetadata;
use crate::shard::StripeSink;

use super::builder::{build_recovery_set, scan_reader, RecoverySet};
use super::exponents::{wire_value, ExponentCursor};
use super::recovery_slice_packet::RecoverySlicePacket;

/// Creator string carrying the stripe geometry; restore parses the
/// `d=`/`p=` tokens to regroup stripes.
pub fn creator_text(data_shards: u8, parity_shards: u8) -> String {
    format!(
        "par {} d={} p={}",
        env!("CARGO_PKG_VERSION"),
        data_shards,
        parity_shards
    )
}

/// Extracts the stripe geometry from a creator string, if present.
pub fn parse_creator_geometry(text: &str) -> Option<(u8, u8)> {
    let mut d = None;
    let mut p = None;
    for token in text.split_whitespace() {
        if let Some(v) = token.strip_prefix("d=") {
            d = v.parse().ok();
        } else if let Some(v) = token.strip_prefix("p=") {
            p = v.parse().ok();
        }
    }
    Some((d?, p?))
}

pub struct Par2Writer<W: Write + Seek> {
    w: W,
    meta: FileMetadata,
    set: RecoverySet,
    exponents: ExponentCursor,
    slice_index: usize,
}

impl<W: Write + Seek> Par2Writer<W> {
    /// Scans `input` for the recovery-set hashes, then writes the header
    /// packets. `input` is the same file the encoder will stream afterward.
    pub fn new<R: Read>(mut w: W, meta: FileMetadata, input: &mut R) -> Result<Self> {
        let (file_desc, ifsc) = scan_reader(input, &meta.file_name, meta.shard_size())?;
        let set = build_recovery_set(
            meta.shard_size as u64,
            file_desc,
            ifsc,
            &creator_text(meta.data_shards, meta.parity_shards),
        );

        write_header_packets(&mut w, &set)?;
        Ok(Self {
            w,
            meta,
            set,
            exponents: ExponentCursor::new(),
            slice_index: 0,
        })
    }

    /// Re-emits the header packets and returns the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        write_header_packets(&mut self.w, &self.set)?;
        self.w.flush()?;
        Ok(self.w)
    }
}

fn write_header_packets<W: Write + Seek>(w: &mut W, set: &RecoverySet) -> Result<()> {
    set.main.write_le(w)?;
    set.file_desc.write_le(w)?;
    set.creator.write_le(w)?;
    set.ifsc.write_le(w)?;
    Ok(())
}

impl<W: Write + Seek> StripeSink for Par2Writer<W> {
    fn write_stripe(&mut self, shards: &[&[u8]], _logical_len: usize) -> Result<()> {
        // Data shards are not persisted; the data file supplies them at
        // restore. Each parity shard becomes one recovery slice under the
        // next exponent in the sequence.
        for shard in &shards[self.meta.data_shards()..] {
            let e = self.exponents.nth(self.slice_index);
            self.slice_index += 1;
            let packet = RecoverySlicePacket::new(
                self.set.set_id,
                wire_value(e),
                shard.to_vec(),
            );
            packet.write_le(&mut self.w)?;
        }
        Ok(())
    }
}
