//! Golomb codec (§4.2): parameterized unary+binary variable-length integer
//! coding over the bit buffer.

use crate::bitbuffer::{BitBuffer, BitReader};
use crate::error::DecodeError;

/// Precomputed parameters for Golomb coding with modulus `m`.
#[derive(Debug, Clone, Copy)]
pub struct GolombParams {
    m: u64,
    /// `ceil(log2(m))`.
    b: u32,
    /// `2^b - m`.
    t: u64,
}

impl GolombParams {
    /// Derive `b` and `t` from `m` per §4.2: double `l` from 1 until
    /// `l >= m`, counting iterations as `b`.
    ///
    /// # Panics
    /// Panics if `m == 0` — the caller must ensure `m >= 1` (§4.2, §4.3).
    pub fn new(m: u64) -> Self {
        assert!(m > 0, "golomb parameter m must be at least 1");
        let mut b = 0u32;
        let mut l = 1u64;
        while l < m {
            b += 1;
            l <<= 1;
        }
        let t = l - m;
        Self { m, b, t }
    }

    /// The modulus this codec was constructed with.
    pub fn m(&self) -> u64 {
        self.m
    }

    /// Encode a nonnegative integer `n` into `buf`.
    pub fn encode(&self, n: u64, buf: &mut BitBuffer) {
        let quotient = n / self.m;
        for _ in 0..quotient {
            buf.append_bit(true);
        }
        buf.append_bit(false);

        if self.m == 1 {
            return;
        }

        let r = n % self.m;
        if r < self.t {
            for i in (0..self.b.saturating_sub(1)).rev() {
                buf.append_bit((r >> i) & 1 != 0);
            }
        } else {
            let r = r + self.t;
            for i in (0..self.b).rev() {
                buf.append_bit((r >> i) & 1 != 0);
            }
        }
    }

    /// Decode a single integer from `reader`.
    pub fn decode(&self, reader: &mut BitReader<'_>) -> Result<u64, DecodeError> {
        let mut quotient: u64 = 0;
        while reader.read_bit()? {
            quotient += 1;
        }
        let mut n = quotient * self.m;

        if self.m > 1 {
            let mut r: u64 = 0;
            for _ in 0..self.b.saturating_sub(1) {
                r = (r << 1) | reader.read_bit()? as u64;
            }
            if r >= self.t {
                r = (r << 1) | reader.read_bit()? as u64;
                r -= self.t;
            }
            n += r;
        }
        Ok(n)
    }
}

/// Choose a Golomb modulus from the mean gap a corpus-level count predicts,
/// per §4.3's "Choice of `m`": the mean of a geometric gap distribution,
/// clamped to at least 1 since `m = 0` is not representable.
pub fn mean_gap_m(total: u64, count: u64) -> u64 {
    if count == 0 {
        1
    } else {
        (total / count).max(1)
    }
}
