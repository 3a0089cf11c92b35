//! Run-time sized matrices over GF(2^16) with Gauss-Jordan inversion.
//!
//! Dimensions are the number of missing slots in a stripe, which is only
//! known at run time; the matrices stay tiny (at most P x P).

use super::galois::Galois16;

#[derive(Clone, Debug)]
pub struct Matrix {
    size: usize,
    data: Vec<Galois16>,
}

impl Matrix {
    pub fn zero(size: usize) -> Self {
        Self {
            size,
            data: vec![Galois16::ZERO; size * size],
        }
    }

    pub fn identity(size: usize) -> Self {
        let mut m = Self::zero(size);
        for i in 0..size {
            m.set(i, i, Galois16::ONE);
        }
        m
    }

    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Galois16 {
        self.data[row * self.size + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: Galois16) {
        self.data[row * self.size + col] = value;
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for col in 0..self.size {
            let tmp = self.get(a, col);
            self.set(a, col, self.get(b, col));
            self.set(b, col, tmp);
        }
    }

    /// Inverts in place. Returns `Err` for a singular matrix.
    pub fn invert(&mut self) -> Result<(), &'static str> {
        let size = self.size;
        let mut inverse = Matrix::identity(size);

        for pivot in 0..size {
            if self.get(pivot, pivot).is_zero() {
                let swap = ((pivot + 1)..size)
                    .find(|&row| !self.get(row, pivot).is_zero())
                    .ok_or("matrix is singular")?;
                self.swap_rows(pivot, swap);
                inverse.swap_rows(pivot, swap);
            }

            let pivot_val = self.get(pivot, pivot);
            if pivot_val != Galois16::ONE {
                for col in 0..size {
                    self.set(pivot, col, self.get(pivot, col) / pivot_val);
                    inverse.set(pivot, col, inverse.get(pivot, col) / pivot_val);
                }
            }

            for row in 0..size {
                if row == pivot {
                    continue;
                }
                let factor = self.get(row, pivot);
                if factor.is_zero() {
                    continue;
                }
                for col in 0..size {
                    let v = self.get(row, col) + factor * self.get(pivot, col);
                    self.set(row, col, v);
                    let v = inverse.get(row, col) + factor * inverse.get(pivot, col);
                    inverse.set(row, col, v);
                }
            }
        }

        *self = inverse;
        Ok(())
    }
}
