//! Erasure-codec seam between the streaming pipeline and the field
//! arithmetic.
//!
//! The JSON and tar containers run over GF(2^8) via `reed-solomon-erasure`;
//! the PAR 2.0 container supplies its own GF(2^16) implementation in
//! [`crate::par2::gf16`]. The stripe index parameter lets a codec vary its
//! coefficients per stripe (the PAR 2.0 exponent sequence advances across
//! stripes); the GF(2^8) codec ignores it.

use reed_solomon_erasure::galois_8::ReedSolomon;

use crate::error::{Error, Result};

/// One stripe's worth of encode/reconstruct/verify. Shards are the D+P
/// equally-sized views of the shard buffer, data first.
pub trait StripeCodec {
    fn data_shards(&self) -> usize;
    fn parity_shards(&self) -> usize;

    /// Populates the parity views from the data views.
    fn encode(&mut self, stripe: u64, shards: &mut [&mut [u8]]) -> Result<()>;

    /// Rebuilds every shard whose `present` flag is false. Fails with
    /// `ReconstructFailed` when too many shards are missing.
    fn reconstruct(&mut self, stripe: u64, shards: &mut [(&mut [u8], bool)]) -> Result<()>;

    /// Checks that the parity views are consistent with the data views.
    fn verify(&mut self, stripe: u64, shards: &[&[u8]]) -> Result<bool>;
}

/// GF(2^8) codec for the JSON and tar containers.
pub struct Gf8Codec {
    inner: ReedSolomon,
    data: usize,
    parity: usize,
}

impl Gf8Codec {
    pub fn new(data: usize, parity: usize) -> Result<Self> {
        let inner = ReedSolomon::new(data, parity)
            .map_err(|e| Error::InvalidMetadata(format!("D={data} P={parity}: {e}")))?;
        Ok(Self {
            inner,
            data,
            parity,
        })
    }
}

impl StripeCodec for Gf8Codec {
    fn data_shards(&self) -> usize {
        self.data
    }

    fn parity_shards(&self) -> usize {
        self.parity
    }

    fn encode(&mut self, _stripe: u64, shards: &mut [&mut [u8]]) -> Result<()> {
        self.inner
            .encode(shards)
            .map_err(|e| Error::ReconstructFailed(e.to_string()))
    }

    fn reconstruct(&mut self, _stripe: u64, shards: &mut [(&mut [u8], bool)]) -> Result<()> {
        // The library wants owned option buffers for reconstruction.
        let mut slots: Vec<Option<Vec<u8>>> = shards
            .iter()
            .map(|(view, present)| present.then(|| view.to_vec()))
            .collect();
        self.inner
            .reconstruct(&mut slots)
            .map_err(|e| Error::ReconstructFailed(e.to_string()))?;
        for ((view, present), slot) in shards.iter_mut().zip(slots) {
            if !*present {
                let rebuilt = slot.ok_or_else(|| {
                    Error::ReconstructFailed("missing shard not rebuilt".into())
                })?;
                view.copy_from_slice(&rebuilt);
                *present = true;
            }
        }
        Ok(())
    }

    fn verify(&mut self, _stripe: u64, shards: &[&[u8]]) -> Result<bool> {
        self.inner
            .verify(shards)
            .map_err(|e| Error::ReconstructFailed(e.to_string()))
    }
}
