//! Streaming stripe decoder.
//!
//! Pulls D+P shards per stripe from a [`ShardSource`], marks holes,
//! reconstructs through the field engine when needed, verifies, and only
//! then emits the stripe's logical data prefix to the output sink.

use std::io::Write;

use log::debug;

use crate::codec::StripeCodec;
use crate::error::{Error, Result};
use crate::shard::{ShardBuffer, ShardPull, ShardSource};

pub struct StreamDecoder<C: StripeCodec, S: ShardSource> {
    buf: ShardBuffer,
    codec: C,
    source: S,
    /// Global 1-based running shard counter, checked against the framing.
    expected_index: u32,
    stripe: u64,
}

impl<C: StripeCodec, S: ShardSource> StreamDecoder<C, S> {
    pub fn new(shard_size: usize, codec: C, source: S) -> Self {
        let total = codec.data_shards() + codec.parity_shards();
        Self {
            buf: ShardBuffer::new(total, shard_size),
            codec,
            source,
            expected_index: 0,
            stripe: 0,
        }
    }

    /// Decodes stripes until the source reports end of input, writing the
    /// verified data bytes to `out`. Returns the number of bytes written.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<u64> {
        let mut written = 0u64;
        loop {
            match self.next_stripe()? {
                Some(total_size) => {
                    out.write_all(self.buf.prefix(total_size))?;
                    written += total_size as u64;
                }
                None => return Ok(written),
            }
        }
    }

    /// Pulls, repairs and verifies one stripe. Returns the stripe's logical
    /// data length, or `None` on a clean end of input.
    fn next_stripe(&mut self) -> Result<Option<usize>> {
        let data = self.codec.data_shards();
        let total = data + self.codec.parity_shards();
        let shard_size = self.buf.shard_size();

        let mut present = vec![true; total];
        let mut total_size = 0usize;

        for slot in 0..total {
            let view = self.buf.shard_mut(slot);
            let pull = self.source.next_shard(&mut *view, slot)?;
            self.expected_index += 1;

            let meta = match pull {
                ShardPull::Eof => {
                    if slot == 0 {
                        return Ok(None);
                    }
                    return Err(Error::Truncation);
                }
                ShardPull::Hole(meta) => {
                    debug!("stripe {}: slot {} is a hole", self.stripe, slot);
                    present[slot] = false;
                    meta
                }
                ShardPull::Filled(meta) => {
                    if meta.size == 0 {
                        // Zero-length sentinel: the view carries pure padding.
                        view.fill(0);
                    }
                    meta
                }
            };

            if meta.index != self.expected_index {
                return Err(Error::IndexMismatch {
                    got: meta.index,
                    want: self.expected_index,
                });
            }
            if slot < data {
                total_size += meta.size as usize;
            }
        }

        if present.iter().any(|p| !p) {
            let missing = present.iter().filter(|p| !**p).count();
            debug!(
                "stripe {}: {} missing shards, reconstructing",
                self.stripe, missing
            );
            let mut views = self.buf.views_mut();
            let mut slots: Vec<(&mut [u8], bool)> = views
                .iter_mut()
                .zip(present.iter())
                .map(|(v, p)| (&mut v[..], *p))
                .collect();
            self.codec.reconstruct(self.stripe, &mut slots)?;
        }

        if !self.codec.verify(self.stripe, &self.buf.views())? {
            return Err(Error::VerifyFailed);
        }

        debug_assert!(total_size <= data * shard_size);
        self.stripe += 1;
        Ok(Some(total_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::compute_crc32c;
    use crate::codec::Gf8Codec;
    use crate::metadata::ShardMetadata;
    use crate::shard::StripeSink;

    /// Replays pre-encoded stripes, optionally poking holes.
    struct ReplaySource {
        shards: Vec<(ShardMetadata, Option<Vec<u8>>)>,
        pos: usize,
    }

    impl ShardSource for ReplaySource {
        fn next_shard(&mut self, view: &mut [u8], _slot: usize) -> Result<ShardPull> {
            match self.shards.get(self.pos) {
                None => Ok(ShardPull::Eof),
                Some((meta, bytes)) => {
                    self.pos += 1;
                    match bytes {
                        Some(b) => {
                            view.copy_from_slice(b);
                            Ok(ShardPull::Filled(*meta))
                        }
                        None => Ok(ShardPull::Hole(*meta)),
                    }
                }
            }
        }
    }

    struct EncodeCapture {
        data_shards: usize,
        shard_size: usize,
        index: u32,
        shards: Vec<(ShardMetadata, Option<Vec<u8>>)>,
    }

    impl StripeSink for EncodeCapture {
        fn write_stripe(&mut self, shards: &[&[u8]], logical_len: usize) -> Result<()> {
            let mut remaining = logical_len;
            for (slot, shard) in shards.iter().enumerate() {
                let size = if slot < self.data_shards {
                    let n = remaining.min(self.shard_size);
                    remaining -= n;
                    n
                } else {
                    self.shard_size
                };
                self.index += 1;
                let meta = ShardMetadata {
                    index: self.index,
                    size: size as u32,
                    hash32: compute_crc32c(shard).as_u32(),
                };
                self.shards.push((meta, Some(shard.to_vec())));
            }
            Ok(())
        }
    }

    fn encode(data: &[u8], d: usize, p: usize, s: usize) -> Vec<(ShardMetadata, Option<Vec<u8>>)> {
        let codec = Gf8Codec::new(d, p).unwrap();
        let sink = EncodeCapture {
            data_shards: d,
            shard_size: s,
            index: 0,
            shards: Vec::new(),
        };
        let mut enc = crate::encoder::StreamEncoder::new(s, codec, sink);
        enc.write(data).unwrap();
        enc.finish().unwrap().shards
    }

    fn decode(shards: Vec<(ShardMetadata, Option<Vec<u8>>)>, d: usize, p: usize, s: usize) -> Result<Vec<u8>> {
        let codec = Gf8Codec::new(d, p).unwrap();
        let source = ReplaySource { shards, pos: 0 };
        let mut dec = StreamDecoder::new(s, codec, source);
        let mut out = Vec::new();
        dec.run(&mut out)?;
        Ok(out)
    }

    #[test]
    fn round_trip_multiple_stripes() {
        let data: Vec<u8> = (0..100u8).collect();
        let shards = encode(&data, 3, 2, 8);
        assert_eq!(decode(shards, 3, 2, 8).unwrap(), data);
    }

    #[test]
    fn holes_within_budget_are_recovered() {
        let data: Vec<u8> = (0..100u8).collect();
        let mut shards = encode(&data, 3, 2, 8);
        // Two holes per stripe (= P) in the first stripe.
        shards[0].1 = None;
        shards[3].1 = None;
        assert_eq!(decode(shards, 3, 2, 8).unwrap(), data);
    }

    #[test]
    fn too_many_holes_fail() {
        let data: Vec<u8> = (0..100u8).collect();
        let mut shards = encode(&data, 3, 2, 8);
        shards[0].1 = None;
        shards[1].1 = None;
        shards[3].1 = None;
        assert!(matches!(
            decode(shards, 3, 2, 8),
            Err(Error::ReconstructFailed(_))
        ));
    }

    #[test]
    fn truncation_mid_stripe_is_fatal() {
        let data: Vec<u8> = (0..100u8).collect();
        let mut shards = encode(&data, 3, 2, 8);
        shards.truncate(7); // one full stripe plus two slots
        assert!(matches!(decode(shards, 3, 2, 8), Err(Error::Truncation)));
    }

    #[test]
    fn index_mismatch_is_fatal() {
        let data: Vec<u8> = (0..20u8).collect();
        let mut shards = encode(&data, 3, 2, 8);
        shards[2].0.index = 99;
        assert!(matches!(
            decode(shards, 3, 2, 8),
            Err(Error::IndexMismatch { got: 99, want: 3 })
        ));
    }

    #[test]
    fn hole_metadata_still_counts_toward_logical_size() {
        // A broken final data shard must not shorten the output.
        let data: Vec<u8> = (0..20u8).collect(); // single stripe, last shard partial
        let mut shards = encode(&data, 3, 2, 8);
        shards[2].1 = None;
        assert_eq!(decode(shards, 3, 2, 8).unwrap(), data);
    }
}
