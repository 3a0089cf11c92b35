//! Recovery-slice exponent sequence.
//!
//! Valid exponents are the integers `e >= 1` with `e` not divisible by 3,
//! 5, 17 or 257, exactly the powers for which 2^e has full order in
//! GF(2^16), giving 32768 usable values. Recovery slices consume the
//! sequence in ascending order and the counter advances across stripes;
//! the same sequence also supplies the per-slot input constants.

use super::galois::Galois16;

pub fn is_valid(e: u64) -> bool {
    e % 3 != 0 && e % 5 != 0 && e % 17 != 0 && e % 257 != 0
}

/// Ascending iterator over the valid exponents, starting at 1.
pub struct ExponentSequence {
    next: u64,
}

impl Default for ExponentSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl ExponentSequence {
    pub fn new() -> Self {
        Self { next: 1 }
    }
}

impl Iterator for ExponentSequence {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        loop {
            let e = self.next;
            self.next += 1;
            if is_valid(e) {
                return Some(e);
            }
        }
    }
}

/// The on-wire exponent field value: 2^e in GF(2^16).
pub fn wire_value(e: u64) -> u32 {
    Galois16::pow2(e).value() as u32
}

/// Recovers the sequence exponent from a wire value, if it denotes one.
pub fn from_wire(wire: u32) -> Option<u64> {
    let value = u16::try_from(wire).ok()?;
    if value == 0 {
        return None;
    }
    let e = Galois16::new(value).log() as u64;
    is_valid(e).then_some(e)
}

/// Random-access view of the sequence with a forward cursor; `nth` is cheap
/// for the monotonically increasing indices the stripe pipeline produces.
pub struct ExponentCursor {
    cache: Vec<u64>,
    seq: ExponentSequence,
}

impl Default for ExponentCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl ExponentCursor {
    pub fn new() -> Self {
        Self {
            cache: Vec::new(),
            seq: ExponentSequence::new(),
        }
    }

    /// The k-th (0-based) valid exponent.
    pub fn nth(&mut self, k: usize) -> u64 {
        while self.cache.len() <= k {
            let e = self.seq.next().expect("exponent sequence is infinite");
            self.cache.push(e);
        }
        self.cache[k]
    }
}
