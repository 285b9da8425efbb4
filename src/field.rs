//! Arithmetic in POLYVAL's field, GF(2¹²⁸) modulo
//! x¹²⁸ + x¹²⁷ + x¹²⁶ + x¹²¹ + 1.
//!
//! Elements are little-endian: bit 0 of byte 0 is the
//! coefficient of x⁰. Multiplication is POLYVAL's "dot"
//! operation, `a·b·x⁻¹²⁸`, computed with a Karatsuba-free
//! schoolbook product and a two-step Montgomery reduction.

use crate::{
    backend::{self, Arch, Dispatch, FieldMultiply, Lane},
    poly::Block,
};

/// The reduction constant, 0xc2000000_00000000_00000000_00000001.
pub(crate) const POLY: Block = [
    0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xc2, //
];

/// An unreduced 256-bit product, or a sum of them.
///
/// Accumulating several products before a single reduction is
/// what makes the batched folds cheap.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Wide<F> {
    /// Σ x.lo·y.lo
    lo: F,
    /// Σ x.lo·y.hi + x.hi·y.lo
    mid: F,
    /// Σ x.hi·y.hi
    hi: F,
}

impl<F: FieldMultiply> Wide<F> {
    #[inline(always)]
    pub(crate) fn new(x: F, y: F) -> Self {
        Self {
            lo: x.clmul::<0x00>(y),
            mid: x.clmul::<0x10>(y).xor(x.clmul::<0x01>(y)),
            hi: x.clmul::<0x11>(y),
        }
    }

    /// Adds `x·y` to the sum.
    #[inline(always)]
    pub(crate) fn mul_acc(&mut self, x: F, y: F) {
        self.lo = self.lo.xor(x.clmul::<0x00>(y));
        self.mid = self
            .mid
            .xor(x.clmul::<0x10>(y))
            .xor(x.clmul::<0x01>(y));
        self.hi = self.hi.xor(x.clmul::<0x11>(y));
    }

    /// Folds the middle terms into the outer halves, returning
    /// the low and high 128 bits of the product.
    #[inline(always)]
    pub(crate) fn combine(self) -> (F, F) {
        let lo = self.lo.xor(self.mid.shl64());
        let hi = self.hi.xor(self.mid.shr64());
        (lo, hi)
    }

    #[inline(always)]
    pub(crate) fn reduce(self) -> F {
        let (lo, hi) = self.combine();
        let poly = F::load(&POLY);
        let lo = reduce_step(lo, poly);
        let lo = reduce_step(lo, poly);
        hi.xor(lo)
    }
}

/// One half of the Montgomery reduction: multiplies the low 64
/// bits by the reduction constant's high half and adds the
/// result to the swapped input.
///
/// Two steps applied to the low half of a product, then XORed
/// with the high half, complete the reduction.
#[inline(always)]
pub(crate) fn reduce_step<F: FieldMultiply>(x: F, poly: F) -> F {
    x.clmul::<0x10>(poly).xor(x.swap_halves())
}

/// Returns `x·y·x⁻¹²⁸`.
#[inline(always)]
pub(crate) fn mul<F: FieldMultiply>(x: F, y: F) -> F {
    Wide::new(x, y).reduce()
}

struct Multiply<'a> {
    x: &'a Block,
    y: &'a Block,
}

impl Dispatch for Multiply<'_> {
    type Output = Block;

    #[inline(always)]
    fn call<A: Arch>(self) -> Block {
        mul(A::load(self.x), A::load(self.y)).store()
    }
}

/// Multiplies two field elements with POLYVAL's "dot"
/// operation, `x·y·x⁻¹²⁸`.
///
/// The result is always fully reduced, so it is in canonical
/// form and can be compared byte for byte.
pub fn multiply(x: &Block, y: &Block) -> Block {
    backend::dispatch(Multiply { x, y })
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, RngCore, SeedableRng};

    use super::*;
    use crate::backend::portable;

    macro_rules! unhex {
        ($s:expr) => {{
            let v: Block = hex::decode($s)
                .expect("valid hex")
                .try_into()
                .expect("16 bytes");
            v
        }};
    }

    fn random_block(rng: &mut StdRng) -> Block {
        let mut b = [0u8; 16];
        rng.fill_bytes(&mut b);
        b
    }

    #[test]
    fn test_multiply_vector() {
        let x = unhex!("66e94bd4ef8a2c3b884cfa59ca342b2e");
        let y = unhex!("ff000000000000000000000000000000");
        let want = unhex!("ebe563401e7e91ea3ad6426b8140c394");
        assert_eq!(multiply(&x, &y), want);
        assert_eq!(portable(Multiply { x: &x, y: &y }), want);
    }

    #[test]
    fn test_multiply_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        let x = random_block(&mut rng);
        assert_eq!(multiply(&x, &[0u8; 16]), [0u8; 16]);
        assert_eq!(multiply(&[0u8; 16], &x), [0u8; 16]);
    }

    #[test]
    fn test_multiply_identity() {
        // x¹²⁸ is the identity for x·y·x⁻¹²⁸. In this field
        // x¹²⁸ = x¹²⁷ + x¹²⁶ + x¹²¹ + 1.
        let one = unhex!("010000000000000000000000000000c2");
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..32 {
            let x = random_block(&mut rng);
            assert_eq!(multiply(&x, &one), x);
        }
    }

    #[test]
    fn test_multiply_laws() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..64 {
            let a = random_block(&mut rng);
            let b = random_block(&mut rng);
            let c = random_block(&mut rng);

            assert_eq!(multiply(&a, &b), multiply(&b, &a), "commutative");
            assert_eq!(
                multiply(&multiply(&a, &b), &c),
                multiply(&a, &multiply(&b, &c)),
                "associative"
            );

            let bc: Block = core::array::from_fn(|i| b[i] ^ c[i]);
            let ab = multiply(&a, &b);
            let ac = multiply(&a, &c);
            let sum: Block = core::array::from_fn(|i| ab[i] ^ ac[i]);
            assert_eq!(multiply(&a, &bc), sum, "distributive");
        }
    }

    #[test]
    fn test_multiply_backends_agree() {
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..256 {
            let x = random_block(&mut rng);
            let y = random_block(&mut rng);
            assert_eq!(multiply(&x, &y), portable(Multiply { x: &x, y: &y }));
        }
    }

    #[test]
    fn test_delayed_reduction() {
        let mut rng = StdRng::seed_from_u64(5);
        let pairs: [(Block, Block); 8] =
            core::array::from_fn(|_| (random_block(&mut rng), random_block(&mut rng)));

        struct SumOfProducts<'a>(&'a [(Block, Block)]);
        impl Dispatch for SumOfProducts<'_> {
            type Output = Block;
            fn call<A: Arch>(self) -> Block {
                let ((x, y), rest) = self.0.split_first().expect("non-empty");
                let mut wide = Wide::new(A::load(x), A::load(y));
                for (x, y) in rest {
                    wide.mul_acc(A::load(x), A::load(y));
                }
                wide.reduce().store()
            }
        }

        let mut want = [0u8; 16];
        for (x, y) in &pairs {
            for (w, p) in want.iter_mut().zip(multiply(x, y)) {
                *w ^= p;
            }
        }
        assert_eq!(backend::dispatch(SumOfProducts(&pairs)), want);
        assert_eq!(portable(SumOfProducts(&pairs)), want);
    }
}
