//! POLYVAL with precomputed powers of `H`.

use core::fmt;

use crate::{
    backend::{self, Arch, Dispatch, FieldMultiply, Lane},
    field::{mul, Wide},
    poly::{as_blocks, pad, wipe, Block, HashKey, State},
};

/// The largest supported table.
pub const MAX_POWERS: usize = 8;

/// Precomputed powers `H¹, H², …, Hᴺ` of a hash key.
///
/// `N` is the batch size of [`fold_batched`] and must be in
/// `1..=8`. [`decrypt`][crate::decrypt] and
/// [`encrypt`][crate::encrypt] consume six blocks at a time, so
/// they need `N >= 6`.
///
/// The table is about `N` times larger than a [`HashKey`] but
/// lets `N` blocks share a single reduction.
#[derive(Clone)]
pub struct PowersTable<const N: usize = MAX_POWERS> {
    /// `pow[i] = Hⁱ⁺¹`, fully reduced.
    pub(crate) pow: [Block; N],
}

impl<const N: usize> PowersTable<N> {
    /// Computes `H¹` through `Hᴺ`.
    pub fn new(key: &HashKey) -> Self {
        const {
            assert!(N >= 1 && N <= MAX_POWERS, "table size must be in 1..=8");
        }
        log::trace!("computing {N} powers of H");

        let pow = backend::dispatch(Powers::<N> { h: &key.0 });
        Self { pow }
    }

    /// Returns `Hⁱ` for `i` in `1..=N`.
    pub fn power(&self, i: usize) -> Option<&Block> {
        self.pow.get(i.checked_sub(1)?)
    }

    /// Returns the number of powers, `N`.
    #[allow(clippy::len_without_is_empty, reason = "A table is never empty.")]
    pub const fn len(&self) -> usize {
        N
    }
}

#[cfg(feature = "zeroize")]
#[cfg_attr(docsrs, doc(cfg(feature = "zeroize")))]
impl<const N: usize> zeroize::ZeroizeOnDrop for PowersTable<N> {}

impl<const N: usize> Drop for PowersTable<N> {
    fn drop(&mut self) {
        for p in &mut self.pow {
            wipe(p);
        }
    }
}

impl<const N: usize> fmt::Debug for PowersTable<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PowersTable")
            .field("len", &N)
            .finish_non_exhaustive()
    }
}

/// Computes the powers table for `key`.
///
/// Shorthand for [`PowersTable::new`].
#[inline]
pub fn build_table<const N: usize>(key: &HashKey) -> PowersTable<N> {
    PowersTable::new(key)
}

struct Powers<'a, const N: usize> {
    h: &'a Block,
}

impl<const N: usize> Dispatch for Powers<'_, N> {
    type Output = [Block; N];

    #[inline(always)]
    fn call<A: Arch>(self) -> [Block; N] {
        let h = A::load(self.h);
        let mut prev = h;
        let mut pow = [[0u8; 16]; N];
        for (i, p) in pow.iter_mut().enumerate() {
            if i > 0 {
                prev = mul(prev, h);
            }
            *p = prev.store();
        }
        pow
    }
}

/// Folds `data` into `state`, `N` blocks at a time.
///
/// Within a group of `N` blocks `X₀ … Xₙ₋₁`, the oldest block
/// absorbs the running state and each block is multiplied by
/// the power matching its distance from the end of the group:
///
/// ```text
/// S ← (S ⊕ X₀)·Hᴺ ⊕ X₁·Hᴺ⁻¹ ⊕ … ⊕ Xₙ₋₁·H¹
/// ```
///
/// The products are summed before a single reduction. A final
/// short group of `k` blocks uses `Hᵏ … H¹` and a trailing
/// partial block is zero padded and folded with `H¹`.
///
/// The result is identical to [`fold_horner`][crate::fold_horner]
/// over the same data.
pub fn fold_batched<const N: usize>(mut state: State, table: &PowersTable<N>, data: &[u8]) -> State {
    if data.is_empty() {
        return state;
    }
    state.0 = backend::dispatch(Batched {
        y: &state.0,
        pow: &table.pow,
        data,
    });
    state
}

struct Batched<'a, const N: usize> {
    y: &'a Block,
    pow: &'a [Block; N],
    data: &'a [u8],
}

impl<const N: usize> Dispatch for Batched<'_, N> {
    type Output = Block;

    #[inline(always)]
    fn call<A: Arch>(self) -> Block {
        batched(A::load(self.y), self.pow, self.data).store()
    }
}

#[inline(always)]
pub(crate) fn batched<F: FieldMultiply, const N: usize>(
    mut y: F,
    pow: &[Block; N],
    data: &[u8],
) -> F {
    let (blocks, tail) = as_blocks(data);
    let mut groups = blocks.chunks_exact(N);
    for group in groups.by_ref() {
        y = fold_group(y, pow, group);
    }
    let rest = groups.remainder();
    if !rest.is_empty() {
        y = fold_group(y, pow, rest);
    }
    if !tail.is_empty() {
        if let Some(h) = pow.first() {
            y = mul(y.xor(F::load(&pad(tail))), F::load(h));
        }
    }
    y
}

/// Folds up to `N` blocks with one reduction.
#[inline(always)]
fn fold_group<F: FieldMultiply, const N: usize>(y: F, pow: &[Block; N], group: &[Block]) -> F {
    debug_assert!(group.len() <= N);

    // Oldest block first, paired with the highest power used.
    let mut terms = group
        .iter()
        .zip(pow.iter().take(group.len()).rev());
    let Some((first, h)) = terms.next() else {
        return y;
    };
    let mut sum = Wide::new(y.xor(F::load(first)), F::load(h));
    for (block, h) in terms {
        sum.mul_acc(F::load(block), F::load(h));
    }
    sum.reduce()
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, RngCore, SeedableRng};

    use super::*;
    use crate::{backend::portable, field::multiply, lite::fold_horner};

    fn random_key(rng: &mut StdRng) -> HashKey {
        let mut h = [0u8; 16];
        rng.fill_bytes(&mut h);
        h[0] |= 1;
        HashKey::new_unchecked(&h)
    }

    #[test]
    fn test_powers() {
        let mut rng = StdRng::seed_from_u64(10);
        let key = random_key(&mut rng);
        let table: PowersTable = build_table(&key);
        assert_eq!(table.len(), 8);
        assert_eq!(table.power(0), None);
        assert_eq!(table.power(9), None);
        assert_eq!(table.power(1), Some(&key.0));

        let mut want = key.0;
        for i in 2..=8 {
            want = multiply(&want, &key.0);
            assert_eq!(table.power(i), Some(&want), "H^{i}");
        }
    }

    fn check_equivalence<const N: usize>(rng: &mut StdRng) {
        let key = random_key(rng);
        let table = PowersTable::<N>::new(&key);
        let mut data = vec![0u8; 16 * 20 + 15];
        rng.fill_bytes(&mut data);
        let mut start = [0u8; 16];
        rng.fill_bytes(&mut start);

        for len in 0..data.len() {
            let want = fold_horner(State::from_bytes(&start), &key, &data[..len]);
            let got = fold_batched(State::from_bytes(&start), &table, &data[..len]);
            assert_eq!(got.to_bytes(), want.to_bytes(), "N = {N}, len = {len}");
        }
    }

    #[test]
    fn test_fold_batched_matches_horner() {
        let mut rng = StdRng::seed_from_u64(11);
        check_equivalence::<1>(&mut rng);
        check_equivalence::<2>(&mut rng);
        check_equivalence::<3>(&mut rng);
        check_equivalence::<4>(&mut rng);
        check_equivalence::<5>(&mut rng);
        check_equivalence::<6>(&mut rng);
        check_equivalence::<7>(&mut rng);
        check_equivalence::<8>(&mut rng);
    }

    #[test]
    fn test_fold_batched_chunked() {
        // Feeding whole blocks in arbitrary pieces gives the
        // same result as one call.
        let mut rng = StdRng::seed_from_u64(12);
        let key = random_key(&mut rng);
        let table: PowersTable = build_table(&key);
        let mut data = vec![0u8; 16 * 37];
        rng.fill_bytes(&mut data);

        let whole = fold_batched(State::default(), &table, &data);
        for cut in [1, 3, 7, 8, 9, 16, 36] {
            let (a, b) = data.split_at(cut * 16);
            let s = fold_batched(State::default(), &table, a);
            let s = fold_batched(s, &table, b);
            assert_eq!(s.to_bytes(), whole.to_bytes(), "cut after {cut} blocks");
        }
    }

    #[test]
    fn test_fold_batched_backends_agree() {
        let mut rng = StdRng::seed_from_u64(13);
        let key = random_key(&mut rng);
        let table: PowersTable = build_table(&key);
        assert_eq!(
            table.pow,
            portable(Powers::<8> { h: &key.0 }),
            "powers"
        );

        let mut data = vec![0u8; 1021];
        rng.fill_bytes(&mut data);
        let y = [0x11u8; 16];
        let job = || Batched {
            y: &y,
            pow: &table.pow,
            data: &data,
        };
        assert_eq!(backend::dispatch(job()), portable(job()));
    }
}
