//! AES-CTR with POLYVAL authentication in a single pass.
//!
//! The buffer is consumed in three phases:
//!
//! 1. While at least six blocks remain, six counter blocks are
//!    run through the cipher in lock-step. The products for the
//!    previous six blocks are computed between those rounds, so
//!    the AES and carry-less multiply pipelines stay busy at the
//!    same time.
//! 2. Whole blocks that are left are processed one at a time.
//! 3. A final partial block is processed through a zeroed
//!    scratch block.
//!
//! In both directions the plaintext is what gets authenticated:
//! decryption folds its output and encryption folds its input.

use core::fmt;

use crate::{
    backend::{self, Arch, BlockCipher, Dispatch, FieldMultiply, Lane},
    cipher::{last_round, round, whiten, Counter, KeySchedule, Ladder},
    field::{mul, reduce_step, Wide, POLY},
    poly::{as_blocks_mut, pad, Block, State, Tag, BLOCK_SIZE},
    precomp::PowersTable,
};

/// The number of blocks processed together in the steady state.
pub const WIDE: usize = 6;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Direction {
    Decrypt,
    Encrypt,
}

impl Direction {
    /// Picks the plaintext out of an input/output pair.
    #[inline(always)]
    fn plaintext<L: Lane>(self, input: L, output: L) -> L {
        match self {
            Self::Decrypt => output,
            Self::Encrypt => input,
        }
    }
}

/// Returned by [`decrypt`] and [`encrypt`] when the output
/// buffer is not the same length as the input.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct LengthMismatch;

impl fmt::Display for LengthMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "output length does not match input length")
    }
}

impl core::error::Error for LengthMismatch {}

/// Decrypts `input` into `output` and folds the plaintext into
/// `state`.
///
/// The keystream starts at [`Counter::from_tag`]`(tag)`. The
/// returned state is what [`fold_batched`][crate::fold_batched]
/// over the plaintext would produce; checking it against the
/// tag is up to the caller.
pub fn decrypt<const N: usize>(
    keys: &KeySchedule,
    table: &PowersTable<N>,
    tag: &Tag,
    state: State,
    input: &[u8],
    output: &mut [u8],
) -> Result<State, LengthMismatch> {
    if input.len() != output.len() {
        return Err(LengthMismatch);
    }
    output.copy_from_slice(input);
    Ok(decrypt_in_place(keys, table, tag, state, output))
}

/// Encrypts `input` into `output` and folds the plaintext into
/// `state`.
///
/// See [`decrypt`].
pub fn encrypt<const N: usize>(
    keys: &KeySchedule,
    table: &PowersTable<N>,
    tag: &Tag,
    state: State,
    input: &[u8],
    output: &mut [u8],
) -> Result<State, LengthMismatch> {
    if input.len() != output.len() {
        return Err(LengthMismatch);
    }
    output.copy_from_slice(input);
    Ok(encrypt_in_place(keys, table, tag, state, output))
}

/// Decrypts `buf` in place and folds the plaintext into
/// `state`.
pub fn decrypt_in_place<const N: usize>(
    keys: &KeySchedule,
    table: &PowersTable<N>,
    tag: &Tag,
    state: State,
    buf: &mut [u8],
) -> State {
    apply(Direction::Decrypt, keys, table, tag, state, buf)
}

/// Encrypts `buf` in place and folds the plaintext into
/// `state`.
pub fn encrypt_in_place<const N: usize>(
    keys: &KeySchedule,
    table: &PowersTable<N>,
    tag: &Tag,
    state: State,
    buf: &mut [u8],
) -> State {
    apply(Direction::Encrypt, keys, table, tag, state, buf)
}

fn apply<const N: usize>(
    dir: Direction,
    keys: &KeySchedule,
    table: &PowersTable<N>,
    tag: &Tag,
    mut state: State,
    buf: &mut [u8],
) -> State {
    const {
        assert!(N >= WIDE, "the codec needs at least six powers of H");
    }
    if buf.is_empty() {
        return state;
    }

    #[allow(
        clippy::arithmetic_side_effects,
        reason = "Division by non-zero constants."
    )]
    let (wide, single, tail) = {
        let blocks = buf.len() / BLOCK_SIZE;
        (blocks / WIDE, blocks % WIDE, buf.len() % BLOCK_SIZE)
    };
    log::trace!(
        "{dir:?} {} bytes: {wide} wide, {single} single, {tail} tail",
        buf.len()
    );

    let ctr = Counter::from_tag(tag).to_bytes();
    state.0 = backend::dispatch(Codec {
        dir,
        keys: keys.ladder(),
        pow: &table.pow,
        ctr: &ctr,
        y: &state.0,
        buf,
    });
    state
}

struct Codec<'a, const N: usize> {
    dir: Direction,
    keys: Ladder<'a>,
    pow: &'a [Block; N],
    ctr: &'a Block,
    y: &'a Block,
    buf: &'a mut [u8],
}

impl<const N: usize> Dispatch for Codec<'_, N> {
    type Output = Block;

    #[inline(always)]
    fn call<A: Arch>(self) -> Block {
        let Self {
            dir,
            keys,
            pow,
            ctr,
            y,
            buf,
        } = self;

        #[allow(
            clippy::indexing_slicing,
            reason = "`N >= WIDE` is checked at compile time."
        )]
        let h: [A; WIDE] = core::array::from_fn(|i| A::load(&pow[i]));
        let mut ctr = A::load(ctr);
        let mut y = A::load(y);

        let (blocks, tail) = as_blocks_mut(buf);
        let mut chunks = blocks.chunks_exact_mut(WIDE);
        y = wide_pass(dir, &keys, &h, &mut ctr, y, &mut chunks);

        let [h1, ..] = h;
        for block in chunks.into_remainder() {
            y = single_block(dir, &keys, h1, &mut ctr, y, block);
        }

        if !tail.is_empty() {
            y = tail_block(dir, &keys, h1, ctr, y, tail);
        }

        y.store()
    }
}

/// Returns `WIDE` consecutive counter blocks and advances `ctr`
/// past them.
#[inline(always)]
fn counters<L: Lane>(ctr: &mut L) -> [L; WIDE] {
    let mut lanes = [*ctr; WIDE];
    for x in &mut lanes {
        *x = *ctr;
        *ctr = ctr.add_lane0(1);
    }
    lanes
}

/// XORs the keystream into `chunk` and returns the blocks to
/// authenticate.
#[inline(always)]
fn apply_keystream<L: Lane>(dir: Direction, ks: [L; WIDE], chunk: &mut [Block]) -> [L; WIDE] {
    let mut auth = ks;
    for ((block, k), a) in chunk.iter_mut().zip(ks).zip(&mut auth) {
        let x = L::load(block);
        let out = x.xor(k);
        *block = out.store();
        *a = dir.plaintext(x, out);
    }
    auth
}

/// Processes every six-block chunk.
///
/// The first chunk only runs the cipher. Each later chunk runs
/// the cipher while the previous chunk is hashed, and the last
/// chunk is hashed after the loop.
#[inline(always)]
fn wide_pass<'b, A: Arch>(
    dir: Direction,
    keys: &Ladder<'_>,
    h: &[A; WIDE],
    ctr: &mut A,
    mut y: A,
    chunks: &mut impl Iterator<Item = &'b mut [Block]>,
) -> A {
    let Some(chunk) = chunks.next() else {
        return y;
    };
    let ks = keys.encrypt(counters(ctr));
    let mut prev = apply_keystream(dir, ks, chunk);

    let poly = A::load(&POLY);
    let [h1, h2, h3, h4, h5, h6] = *h;
    let [k1, k2, k3, k4, k5, k6, k7, k8, k9] = keys.common;

    for chunk in chunks {
        let [p0, p1, p2, p3, p4, p5] = prev;

        let mut x = whiten(counters(ctr), keys.first);
        let mut sum = Wide::new(p5, h1);
        x = round(x, k1);
        sum.mul_acc(p4, h2);
        x = round(x, k2);
        sum.mul_acc(p3, h3);
        x = round(x, k3);
        sum.mul_acc(p2, h4);
        x = round(x, k4);
        sum.mul_acc(p1, h5);
        x = round(x, k5);
        x = round(x, k6);
        x = round(x, k7);
        sum.mul_acc(p0.xor(y), h6);
        x = round(x, k8);
        let (lo, hi) = sum.combine();
        x = round(x, k9);
        let lo = reduce_step(lo, poly);
        for key in keys.extra {
            x = round(x, key);
        }
        x = last_round(x, keys.last);
        y = hi.xor(reduce_step(lo, poly));

        prev = apply_keystream(dir, x, chunk);
    }

    fold_wide(y, prev, h)
}

/// Folds six blocks, oldest first, into `y`.
#[inline(always)]
fn fold_wide<F: FieldMultiply>(y: F, blocks: [F; WIDE], h: &[F; WIDE]) -> F {
    let [p0, p1, p2, p3, p4, p5] = blocks;
    let [h1, h2, h3, h4, h5, h6] = *h;
    let mut sum = Wide::new(p0.xor(y), h6);
    sum.mul_acc(p1, h5);
    sum.mul_acc(p2, h4);
    sum.mul_acc(p3, h3);
    sum.mul_acc(p4, h2);
    sum.mul_acc(p5, h1);
    sum.reduce()
}

/// Processes one block and folds its plaintext with `H`.
#[inline(always)]
fn single_block<A: BlockCipher + FieldMultiply>(
    dir: Direction,
    keys: &Ladder<'_>,
    h: A,
    ctr: &mut A,
    y: A,
    block: &mut Block,
) -> A {
    let [k] = keys.encrypt([*ctr]);
    *ctr = ctr.add_lane0(1);
    let x = A::load(block);
    let out = x.xor(k);
    *block = out.store();
    mul(y.xor(dir.plaintext(x, out)), h)
}

/// Processes a final partial block through a zeroed scratch
/// block and folds the zero-padded plaintext with `H`.
#[inline(always)]
fn tail_block<A: BlockCipher + FieldMultiply>(
    dir: Direction,
    keys: &Ladder<'_>,
    h: A,
    ctr: A,
    y: A,
    tail: &mut [u8],
) -> A {
    let [k] = keys.encrypt([ctr]);
    let x = A::load(&pad(tail));
    let out = x.xor(k).store();
    for (t, o) in tail.iter_mut().zip(out) {
        *t = o;
    }
    // Only the valid bytes were copied back, so `tail` now
    // holds the output without the keystream past its end.
    let out = A::load(&pad(tail));
    mul(y.xor(dir.plaintext(x, out)), h)
}
