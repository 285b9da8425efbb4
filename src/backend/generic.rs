//! The generic (software) implementation.
//!
//! It's used by the other backends (`soft`, `aarch64`, etc.) if
//! hardware support is not detected. Both capabilities are
//! constant time: carry-less multiplication uses integer
//! multiplication with holes, and the AES S-box is computed as an
//! inversion in GF(2⁸) rather than looked up.

#![allow(
    clippy::arithmetic_side_effects,
    reason = "All arithmetic is bitwise or provably in range."
)]
#![allow(
    clippy::indexing_slicing,
    reason = "Indices are bounded by the fixed block size."
)]

use super::{BlockCipher, FieldMultiply, Lane};
use crate::poly::Block;

/// A 128-bit lane held in a `u128`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[repr(transparent)]
pub(crate) struct Soft(u128);

impl Soft {
    const fn unpack(self) -> (u64, u64) {
        let lo = self.0 as u64;
        let hi = (self.0 >> 64) as u64;
        (lo, hi)
    }
}

impl Lane for Soft {
    #[inline(always)]
    fn load(block: &Block) -> Self {
        Self(u128::from_le_bytes(*block))
    }

    #[inline(always)]
    fn store(self) -> Block {
        self.0.to_le_bytes()
    }

    #[inline(always)]
    fn xor(self, rhs: Self) -> Self {
        Self(self.0 ^ rhs.0)
    }

    #[inline(always)]
    fn swap_halves(self) -> Self {
        Self(self.0.rotate_left(64))
    }

    #[inline(always)]
    fn shl64(self) -> Self {
        Self(self.0 << 64)
    }

    #[inline(always)]
    fn shr64(self) -> Self {
        Self(self.0 >> 64)
    }

    #[inline(always)]
    fn add_lane0(self, n: u32) -> Self {
        let lane = (self.0 as u32).wrapping_add(n);
        Self((self.0 & !u128::from(u32::MAX)) | u128::from(lane))
    }
}

impl FieldMultiply for Soft {
    #[inline(always)]
    fn clmul<const SEL: i32>(self, rhs: Self) -> Self {
        let (x0, x1) = self.unpack();
        let (y0, y1) = rhs.unpack();
        let x = if SEL & 0x01 == 0 { x0 } else { x1 };
        let y = if SEL & 0x10 == 0 { y0 } else { y1 };
        Self(gf128_mul(x, y))
    }
}

impl BlockCipher for Soft {
    #[inline(always)]
    fn encrypt_round(self, key: Self) -> Self {
        let mut state = self.store();
        sub_bytes(&mut state);
        shift_rows(&mut state);
        mix_columns(&mut state);
        Self::load(&state).xor(key)
    }

    #[inline(always)]
    fn encrypt_last_round(self, key: Self) -> Self {
        let mut state = self.store();
        sub_bytes(&mut state);
        shift_rows(&mut state);
        Self::load(&state).xor(key)
    }
}

/// Returns the constant time 128-bit product of `x` and `y` in
/// GF(2)[X].
///
/// The idea comes from [Thomas Pornin]'s constant-time blog post
/// with 64-bit fixes from [Tim Taubert]'s blog post on formally
/// verified GHASH.
///
/// [Thomas Pornin]: https://www.bearssl.org/constanttime.html
/// [Tim Taubert]: https://timtaubert.de/blog/2017/06/verified-binary-multiplication-for-ghash/
pub(crate) const fn gf128_mul(x: u64, y: u64) -> u128 {
    const MASK0: u128 = 0x21084210842108421084210842108421;
    const MASK1: u128 = 0x42108421084210842108421084210842;
    const MASK2: u128 = 0x84210842108421084210842108421084;
    const MASK3: u128 = 0x08421084210842108421084210842108;
    const MASK4: u128 = 0x10842108421084210842108421084210;

    // Split both x and y into 5 words with four-bit holes.
    let x0 = (x as u128) & MASK0;
    let y0 = (y as u128) & MASK0;
    let x1 = (x as u128) & MASK1;
    let y1 = (y as u128) & MASK1;
    let x2 = (x as u128) & MASK2;
    let y2 = (y as u128) & MASK2;
    let x3 = (x as u128) & MASK3;
    let y3 = (y as u128) & MASK3;
    let x4 = (x as u128) & MASK4;
    let y4 = (y as u128) & MASK4;

    let t0 = (x0 * y0) ^ (x1 * y4) ^ (x2 * y3) ^ (x3 * y2) ^ (x4 * y1);
    let t1 = (x0 * y1) ^ (x1 * y0) ^ (x2 * y4) ^ (x3 * y3) ^ (x4 * y2);
    let t2 = (x0 * y2) ^ (x1 * y1) ^ (x2 * y0) ^ (x3 * y4) ^ (x4 * y3);
    let t3 = (x0 * y3) ^ (x1 * y2) ^ (x2 * y1) ^ (x3 * y0) ^ (x4 * y4);
    let t4 = (x0 * y4) ^ (x1 * y3) ^ (x2 * y2) ^ (x3 * y1) ^ (x4 * y0);

    (t0 & MASK0) | (t1 & MASK1) | (t2 & MASK2) | (t3 & MASK3) | (t4 & MASK4)
}

/// Multiplies `x` by the polynomial `x` modulo the AES
/// polynomial `x⁸ + x⁴ + x³ + x + 1`.
pub(crate) const fn xtime(x: u8) -> u8 {
    (x << 1) ^ (0x1b & (x >> 7).wrapping_neg())
}

/// Constant time multiplication in the AES field.
const fn gf8_mul(mut x: u8, mut y: u8) -> u8 {
    let mut p = 0;
    let mut i = 0;
    while i < 8 {
        p ^= x & (y & 1).wrapping_neg();
        x = xtime(x);
        y >>= 1;
        i += 1;
    }
    p
}

/// Returns `x²⁵⁴`, which is `x⁻¹` for non-zero `x` and zero
/// otherwise.
const fn gf8_inv(x: u8) -> u8 {
    let x2 = gf8_mul(x, x);
    let x3 = gf8_mul(x2, x);
    let x6 = gf8_mul(x3, x3);
    let x12 = gf8_mul(x6, x6);
    let x15 = gf8_mul(x12, x3);
    let x30 = gf8_mul(x15, x15);
    let x60 = gf8_mul(x30, x30);
    let x120 = gf8_mul(x60, x60);
    let x240 = gf8_mul(x120, x120);
    let x252 = gf8_mul(x240, x12);
    gf8_mul(x252, x2)
}

/// The AES S-box: inversion followed by the affine map.
pub(crate) const fn sbox(x: u8) -> u8 {
    let b = gf8_inv(x);
    b ^ b.rotate_left(1) ^ b.rotate_left(2) ^ b.rotate_left(3) ^ b.rotate_left(4) ^ 0x63
}

fn sub_bytes(state: &mut Block) {
    for b in state.iter_mut() {
        *b = sbox(*b);
    }
}

/// The state is column major: byte `r + 4*c` is row `r` of
/// column `c`. Row `r` rotates left by `r` columns.
fn shift_rows(state: &mut Block) {
    let s = *state;
    for c in 0..4 {
        for r in 0..4 {
            state[r + 4 * c] = s[r + 4 * ((c + r) % 4)];
        }
    }
}

fn mix_columns(state: &mut Block) {
    for col in state.chunks_exact_mut(4) {
        let (a0, a1, a2, a3) = (col[0], col[1], col[2], col[3]);
        let t = a0 ^ a1 ^ a2 ^ a3;
        col[0] = a0 ^ t ^ xtime(a0 ^ a1);
        col[1] = a1 ^ t ^ xtime(a1 ^ a2);
        col[2] = a2 ^ t ^ xtime(a2 ^ a3);
        col[3] = a3 ^ t ^ xtime(a3 ^ a0);
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, RngCore, SeedableRng};

    use super::*;

    #[test]
    fn test_gf128_mul_commutative() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..100_000 {
            let x = rng.next_u64();
            let y = rng.next_u64();
            let xy = gf128_mul(x, y);
            let yx = gf128_mul(y, x);
            assert_eq!(xy, yx, "{x}*{y}");
        }
    }

    #[test]
    fn test_gf128_mul_shift() {
        // Multiplying by x^k is a left shift by k.
        let mut rng = StdRng::seed_from_u64(7);
        for k in 0..64 {
            let x = rng.next_u64();
            assert_eq!(gf128_mul(x, 1 << k), u128::from(x) << k, "k={k}");
        }
    }

    #[test]
    fn test_sbox() {
        // FIPS-197 figure 7.
        assert_eq!(sbox(0x00), 0x63);
        assert_eq!(sbox(0x01), 0x7c);
        assert_eq!(sbox(0x53), 0xed);
        assert_eq!(sbox(0xff), 0x16);
        assert_eq!(sbox(0xc9), 0xdd);
    }

    #[test]
    fn test_gf8_inv() {
        for x in 1..=255u8 {
            assert_eq!(gf8_mul(x, gf8_inv(x)), 1, "{x:#04x}");
        }
        assert_eq!(gf8_inv(0), 0);
    }

    #[test]
    fn test_mix_columns() {
        // FIPS-197 appendix B, round 1.
        let mut state: Block = hex::decode("d4bf5d30e0b452aeb84111f11e2798e5")
            .expect("should be valid hex")
            .try_into()
            .expect("should be 16 bytes");
        mix_columns(&mut state);
        assert_eq!(hex::encode(state), "046681e5e0cb199a48f8d37a2806264c");
    }

    #[test]
    fn test_add_lane0_wraps() {
        let ctr = Soft::load(&[
            0xff, 0xff, 0xff, 0xff, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 0x8c,
        ]);
        let got = ctr.add_lane0(1).store();
        assert_eq!(got, [0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 0x8c]);
    }
}
