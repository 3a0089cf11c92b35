//! GF(2^16) stripe codec for the PAR 2.0 container.
//!
//! Each recovery slice with sequence exponent `e` is the word-wise sum over
//! the stripe's data slots of `(2^{c_i})^e * word_i`, where `c_i` is the
//! i-th valid exponent and words are 16-bit little-endian. Exponents
//! advance globally: the j-th parity slot of stripe `s` uses the
//! `(s*P + j)`-th element of the sequence, so the same codec instance
//! drives both create and restore deterministically.

use super::exponents::{ExponentCursor, ExponentSequence};
use super::galois::{Galois16, LIMIT};
use super::matrix::Matrix;
use crate::codec::StripeCodec;
use crate::error::{Error, Result};

pub struct Gf16Codec {
    data: usize,
    parity: usize,
    /// Logarithms of the per-slot input constants (`c_i`).
    slot_logs: Vec<u64>,
    exponents: ExponentCursor,
}

impl Gf16Codec {
    pub fn new(data: usize, parity: usize) -> Result<Self> {
        if data == 0 || parity == 0 || data + parity > 256 {
            return Err(Error::InvalidMetadata(format!(
                "unsupported stripe geometry D={data} P={parity}"
            )));
        }
        let slot_logs: Vec<u64> = ExponentSequence::new().take(data).collect();
        Ok(Self {
            data,
            parity,
            slot_logs,
            exponents: ExponentCursor::new(),
        })
    }

    fn exponent_for(&mut self, stripe: u64, parity_slot: usize) -> u64 {
        self.exponents
            .nth(stripe as usize * self.parity + parity_slot)
    }

    /// Coefficient applied to data slot `slot` in the equation with
    /// sequence exponent `e`.
    fn coefficient(&self, slot: usize, e: u64) -> Galois16 {
        Galois16::pow2((self.slot_logs[slot] * e) % LIMIT as u64)
    }
}

/// `dst ^= coeff * src`, over 16-bit little-endian words.
fn mul_acc(dst: &mut [u8], src: &[u8], coeff: Galois16) {
    for (d, s) in dst.chunks_exact_mut(2).zip(src.chunks_exact(2)) {
        let word = Galois16::new(u16::from_le_bytes([s[0], s[1]]));
        let acc = u16::from_le_bytes([d[0], d[1]]) ^ (coeff * word).value();
        d.copy_from_slice(&acc.to_le_bytes());
    }
}

impl StripeCodec for Gf16Codec {
    fn data_shards(&self) -> usize {
        self.data
    }

    fn parity_shards(&self) -> usize {
        self.parity
    }

    fn encode(&mut self, stripe: u64, shards: &mut [&mut [u8]]) -> Result<()> {
        let (data, parity) = shards.split_at_mut(self.data);
        for (j, out) in parity.iter_mut().enumerate() {
            let e = self.exponent_for(stripe, j);
            out.fill(0);
            for (i, shard) in data.iter().enumerate() {
                mul_acc(out, shard, self.coefficient(i, e));
            }
        }
        Ok(())
    }

    fn reconstruct(&mut self, stripe: u64, shards: &mut [(&mut [u8], bool)]) -> Result<()> {
        let shard_size = shards[0].0.len();
        let data = self.data;
        let missing_data: Vec<usize> = (0..data).filter(|&i| !shards[i].1).collect();
        let present_parity: Vec<(usize, u64)> = (0..self.parity)
            .filter(|&j| shards[data + j].1)
            .map(|j| (j, self.exponent_for(stripe, j)))
            .collect();

        if missing_data.len() > present_parity.len() {
            return Err(Error::ReconstructFailed(format!(
                "{} data shards missing, only {} recovery slices available",
                missing_data.len(),
                present_parity.len()
            )));
        }

        if !missing_data.is_empty() {
            let m = missing_data.len();
            // Right-hand sides: surviving parity minus the contribution of
            // the surviving data slots.
            let mut rhs: Vec<Vec<u8>> = present_parity[..m]
                .iter()
                .map(|&(j, _)| shards[self.data + j].0.to_vec())
                .collect();
            for (r, &(_, e)) in present_parity[..m].iter().enumerate() {
                for i in (0..self.data).filter(|i| shards[*i].1) {
                    let coeff = self.coefficient(i, e);
                    mul_acc(&mut rhs[r], shards[i].0, coeff);
                }
            }

            let mut matrix = Matrix::zero(m);
            for (r, &(_, e)) in present_parity[..m].iter().enumerate() {
                for (c, &slot) in missing_data.iter().enumerate() {
                    matrix.set(r, c, self.coefficient(slot, e));
                }
            }
            matrix
                .invert()
                .map_err(|e| Error::ReconstructFailed(e.into()))?;

            let mut solved = vec![vec![0u8; shard_size]; m];
            for (c, out) in solved.iter_mut().enumerate() {
                for (r, rhs_row) in rhs.iter().enumerate() {
                    mul_acc(out, rhs_row, matrix.get(c, r));
                }
            }
            for (slot, bytes) in missing_data.iter().zip(solved) {
                shards[*slot].0.copy_from_slice(&bytes);
                shards[*slot].1 = true;
            }
        }

        // Re-derive any missing recovery slices from the repaired data so
        // the subsequent verification covers every slot.
        let missing_parity: Vec<usize> = (0..self.parity)
            .filter(|&j| !shards[self.data + j].1)
            .collect();
        for j in missing_parity {
            let e = self.exponent_for(stripe, j);
            let mut rebuilt = vec![0u8; shard_size];
            for i in 0..self.data {
                mul_acc(&mut rebuilt, shards[i].0, self.coefficient(i, e));
            }
            shards[self.data + j].0.copy_from_slice(&rebuilt);
            shards[self.data + j].1 = true;
        }
        Ok(())
    }

    fn verify(&mut self, stripe: u64, shards: &[&[u8]]) -> Result<bool> {
        let shard_size = shards[0].len();
        let mut expected = vec![0u8; shard_size];
        for j in 0..self.parity {
            let e = self.exponent_for(stripe, j);
            expected.fill(0);
            for i in 0..self.data {
                mul_acc(&mut expected, shards[i], self.coefficient(i, e));
            }
            if expected != shards[self.data + j] {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_stripe(d: usize, p: usize, s: usize) -> Vec<Vec<u8>> {
        let mut shards = Vec::new();
        for i in 0..d {
            shards.push((0..s).map(|b| (i * 31 + b * 7 + 1) as u8).collect());
        }
        shards.extend(std::iter::repeat(vec![0u8; s]).take(p));
        shards
    }

    fn encode(codec: &mut Gf16Codec, stripe: u64, shards: &mut [Vec<u8>]) {
        let mut views: Vec<&mut [u8]> = shards.iter_mut().map(|v| v.as_mut_slice()).collect();
        codec.encode(stripe, &mut views).unwrap();
    }

    #[test]
    fn encode_then_verify() {
        let mut codec = Gf16Codec::new(4, 2).unwrap();
        let mut shards = sample_stripe(4, 2, 16);
        encode(&mut codec, 0, &mut shards);
        let views: Vec<&[u8]> = shards.iter().map(|v| v.as_slice()).collect();
        assert!(codec.verify(0, &views).unwrap());
    }

    #[test]
    fn tampering_fails_verify() {
        let mut codec = Gf16Codec::new(4, 2).unwrap();
        let mut shards = sample_stripe(4, 2, 16);
        encode(&mut codec, 0, &mut shards);
        shards[1][3] ^= 1;
        let views: Vec<&[u8]> = shards.iter().map(|v| v.as_slice()).collect();
        assert!(!codec.verify(0, &views).unwrap());
    }

    #[test]
    fn reconstruct_missing_data_shards() {
        let mut codec = Gf16Codec::new(4, 2).unwrap();
        let mut shards = sample_stripe(4, 2, 16);
        encode(&mut codec, 0, &mut shards);
        let original = shards.clone();

        shards[0].fill(0);
        shards[2].fill(0);
        let mut slots: Vec<(&mut [u8], bool)> = shards
            .iter_mut()
            .enumerate()
            .map(|(i, v)| (v.as_mut_slice(), i != 0 && i != 2))
            .collect();
        codec.reconstruct(0, &mut slots).unwrap();
        assert_eq!(shards, original);
    }

    #[test]
    fn reconstruct_mixed_data_and_parity_holes() {
        let mut codec = Gf16Codec::new(3, 2).unwrap();
        let mut shards = sample_stripe(3, 2, 8);
        encode(&mut codec, 0, &mut shards);
        let original = shards.clone();

        shards[1].fill(0);
        shards[4].fill(0);
        let mut slots: Vec<(&mut [u8], bool)> = shards
            .iter_mut()
            .enumerate()
            .map(|(i, v)| (v.as_mut_slice(), i != 1 && i != 4))
            .collect();
        codec.reconstruct(0, &mut slots).unwrap();
        assert_eq!(shards, original);
        let views: Vec<&[u8]> = shards.iter().map(|v| v.as_slice()).collect();
        assert!(codec.verify(0, &views).unwrap());
    }

    #[test]
    fn too_many_missing_fails() {
        let mut codec = Gf16Codec::new(3, 2).unwrap();
        let mut shards = sample_stripe(3, 2, 8);
        encode(&mut codec, 0, &mut shards);

        let mut slots: Vec<(&mut [u8], bool)> = shards
            .iter_mut()
            .enumerate()
            .map(|(i, v)| (v.as_mut_slice(), i >= 3))
            .collect();
        assert!(matches!(
            codec.reconstruct(0, &mut slots),
            Err(Error::ReconstructFailed(_))
        ));
    }

    #[test]
    fn exponents_advance_across_stripes() {
        let mut codec = Gf16Codec::new(2, 2).unwrap();
        assert_eq!(codec.exponent_for(0, 0), 1);
        assert_eq!(codec.exponent_for(0, 1), 2);
        assert_eq!(codec.exponent_for(1, 0), 4);
        assert_eq!(codec.exponent_for(1, 1), 7);
        assert_eq!(codec.exponent_for(2, 0), 8);
    }

    #[test]
    fn later_stripes_round_trip() {
        let mut codec = Gf16Codec::new(3, 2).unwrap();
        for stripe in 0..5u64 {
            let mut shards = sample_stripe(3, 2, 12);
            encode(&mut codec, stripe, &mut shards);
            let original = shards.clone();
            shards[2].fill(0);
            let mut slots: Vec<(&mut [u8], bool)> = shards
                .iter_mut()
                .enumerate()
                .map(|(i, v)| (v.as_mut_slice(), i != 2))
                .collect();
            codec.reconstruct(stripe, &mut slots).unwrap();
            assert_eq!(shards, original);
        }
    }
}
