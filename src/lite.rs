//! POLYVAL without precomputed tables.

use crate::{
    backend::{self, Arch, Dispatch, FieldMultiply, Lane},
    field::mul,
    poly::{as_blocks, pad, Block, HashKey, State},
};

/// Folds `data` into `state` one block at a time:
///
/// ```text
/// S ← (S ⊕ Xᵢ)·H·x⁻¹²⁸
/// ```
///
/// A trailing partial block is zero padded. An empty `data`
/// returns `state` unchanged.
pub fn fold_horner(mut state: State, key: &HashKey, data: &[u8]) -> State {
    if data.is_empty() {
        return state;
    }
    state.0 = backend::dispatch(Horner {
        y: &state.0,
        h: &key.0,
        data,
    });
    state
}

struct Horner<'a> {
    y: &'a Block,
    h: &'a Block,
    data: &'a [u8],
}

impl Dispatch for Horner<'_> {
    type Output = Block;

    #[inline(always)]
    fn call<A: Arch>(self) -> Block {
        horner(A::load(self.y), A::load(self.h), self.data).store()
    }
}

#[inline(always)]
pub(crate) fn horner<F: FieldMultiply>(mut y: F, h: F, data: &[u8]) -> F {
    let (blocks, tail) = as_blocks(data);
    for block in blocks {
        y = mul(y.xor(F::load(block)), h);
    }
    if !tail.is_empty() {
        y = mul(y.xor(F::load(&pad(tail))), h);
    }
    y
}
