//! Streaming stripe encoder.
//!
//! Absorbs arbitrary byte input into the data region of the shard buffer,
//! flushes full stripes through the field engine, and zero-pads the final
//! partial stripe on `finish`. Exactly `ceil(len / (D*S))` stripes are
//! emitted; the last carries a logical length in `(0, D*S]`, all earlier
//! stripes carry `D*S`.

use crate::codec::StripeCodec;
use crate::error::Result;
use crate::shard::{ShardBuffer, StripeSink};

pub struct StreamEncoder<C: StripeCodec, S: StripeSink> {
    buf: ShardBuffer,
    codec: C,
    sink: S,
    /// Next write offset into the data region, in `[0, D*S]`.
    cursor: usize,
    stripe: u64,
}

impl<C: StripeCodec, S: StripeSink> StreamEncoder<C, S> {
    pub fn new(shard_size: usize, codec: C, sink: S) -> Self {
        let total = codec.data_shards() + codec.parity_shards();
        Self {
            buf: ShardBuffer::new(total, shard_size),
            codec,
            sink,
            cursor: 0,
            stripe: 0,
        }
    }

    fn data_capacity(&self) -> usize {
        self.codec.data_shards() * self.buf.shard_size()
    }

    /// Accepts input bytes, flushing a stripe whenever the data region
    /// fills. Returns the number of bytes accepted (always `buf.len()`
    /// unless the sink fails).
    pub fn write(&mut self, mut bytes: &[u8]) -> Result<usize> {
        let mut written = 0;
        while !bytes.is_empty() {
            let room = self.data_capacity() - self.cursor;
            let take = room.min(bytes.len());
            self.buf.fill_at(self.cursor, &bytes[..take]);
            self.cursor += take;
            written += take;
            bytes = &bytes[take..];
            if self.cursor == self.data_capacity() {
                self.flush_stripe()?;
            }
        }
        Ok(written)
    }

    /// Flushes the final partial stripe, if any, and returns the sink.
    /// A zero-length tail stripe is not emitted.
    pub fn finish(mut self) -> Result<S> {
        if self.cursor > 0 {
            self.flush_stripe()?;
        }
        Ok(self.sink)
    }

    fn flush_stripe(&mut self) -> Result<()> {
        let logical_len = self.cursor;
        self.buf.zero_range(logical_len, self.data_capacity());
        self.codec.encode(self.stripe, &mut self.buf.views_mut())?;
        self.sink.write_stripe(&self.buf.views(), logical_len)?;
        self.cursor = 0;
        self.stripe += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Gf8Codec;

    #[derive(Default)]
    struct CaptureSink {
        stripes: Vec<(Vec<Vec<u8>>, usize)>,
    }

    impl StripeSink for CaptureSink {
        fn write_stripe(&mut self, shards: &[&[u8]], logical_len: usize) -> Result<()> {
            self.stripes
                .push((shards.iter().map(|s| s.to_vec()).collect(), logical_len));
            Ok(())
        }
    }

    fn run_encoder(data: &[u8], d: usize, p: usize, s: usize) -> CaptureSink {
        let codec = Gf8Codec::new(d, p).unwrap();
        let mut enc = StreamEncoder::new(s, codec, CaptureSink::default());
        // Feed in awkward chunk sizes to exercise the cursor arithmetic.
        for chunk in data.chunks(5) {
            assert_eq!(enc.write(chunk).unwrap(), chunk.len());
        }
        enc.finish().unwrap()
    }

    #[test]
    fn stripe_count_and_logical_lengths() {
        let data = vec![0xa5u8; 100];
        let sink = run_encoder(&data, 3, 2, 8); // stripe capacity 24
        assert_eq!(sink.stripes.len(), 5); // ceil(100/24)
        for (shards, logical) in &sink.stripes[..4] {
            assert_eq!(*logical, 24);
            assert_eq!(shards.len(), 5);
        }
        assert_eq!(sink.stripes[4].1, 4);
    }

    #[test]
    fn tail_is_zero_padded() {
        let sink = run_encoder(b"xy", 2, 1, 4);
        let (shards, logical) = &sink.stripes[0];
        assert_eq!(*logical, 2);
        assert_eq!(shards[0], b"xy\0\0");
        assert_eq!(shards[1], vec![0u8; 4]);
    }

    #[test]
    fn empty_input_emits_no_stripes() {
        let sink = run_encoder(b"", 3, 2, 8);
        assert!(sink.stripes.is_empty());
    }

    #[test]
    fn exact_multiple_has_no_tail_stripe() {
        let sink = run_encoder(&[1u8; 24], 3, 2, 8);
        assert_eq!(sink.stripes.len(), 1);
        assert_eq!(sink.stripes[0].1, 24);
    }
}
