use core::{fmt, slice};

use subtle::{Choice, ConstantTimeEq};
#[cfg(feature = "zeroize")]
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The size in bytes of a POLYVAL key.
pub const KEY_SIZE: usize = 16;

/// The size in bytes of a block, for both AES and POLYVAL.
pub const BLOCK_SIZE: usize = 16;

/// The size in bytes of an authentication tag.
pub const TAG_SIZE: usize = 16;

/// A 128-bit block.
pub type Block = [u8; BLOCK_SIZE];

/// A POLYVAL hash key, `H`.
#[derive(Clone)]
pub struct HashKey(pub(crate) Block);

impl HashKey {
    const ZERO: &[u8; KEY_SIZE] = &[0u8; KEY_SIZE];

    /// Creates a POLYVAL key.
    ///
    /// It returns `None` if the key is all zero.
    pub fn new(key: &[u8; KEY_SIZE]) -> Option<Self> {
        if bool::from(key.ct_eq(Self::ZERO)) {
            None
        } else {
            Some(Self::new_unchecked(key))
        }
    }

    /// Creates a POLYVAL key from a known non-zero key.
    ///
    /// # Warning
    ///
    /// Only use this method if `key` is known to be non-zero.
    /// Using an all zero key fixes the POLYVAL to zero,
    /// regardless of the input.
    #[inline]
    pub fn new_unchecked(key: &[u8; KEY_SIZE]) -> Self {
        Self(*key)
    }
}

#[cfg(feature = "zeroize")]
#[cfg_attr(docsrs, doc(cfg(feature = "zeroize")))]
impl ZeroizeOnDrop for HashKey {}

impl Drop for HashKey {
    fn drop(&mut self) {
        wipe(&mut self.0);
    }
}

impl fmt::Debug for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashKey").finish_non_exhaustive()
    }
}

/// The running POLYVAL accumulator.
///
/// Every fold takes the accumulator by value and returns the
/// updated one. Start from [`State::default`] (zero) or from a
/// state derived earlier, e.g. after the associated data.
#[derive(Clone, Default)]
pub struct State(pub(crate) Block);

impl State {
    /// Creates an accumulator holding `bytes`.
    #[inline]
    pub fn from_bytes(bytes: &Block) -> Self {
        Self(*bytes)
    }

    /// Returns the current accumulator value.
    #[inline]
    pub fn to_bytes(&self) -> Block {
        self.0
    }
}

impl ConstantTimeEq for State {
    #[inline]
    fn ct_eq(&self, other: &Self) -> Choice {
        self.0.ct_eq(&other.0)
    }
}

#[cfg(feature = "zeroize")]
#[cfg_attr(docsrs, doc(cfg(feature = "zeroize")))]
impl ZeroizeOnDrop for State {}

impl Drop for State {
    #[inline]
    fn drop(&mut self) {
        wipe(&mut self.0);
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State").finish_non_exhaustive()
    }
}

/// An authentication tag.
#[derive(Copy, Clone, Debug)]
pub struct Tag(pub(crate) [u8; TAG_SIZE]);

impl ConstantTimeEq for Tag {
    #[inline]
    fn ct_eq(&self, other: &Self) -> Choice {
        self.0.ct_eq(&other.0)
    }
}

impl From<[u8; TAG_SIZE]> for Tag {
    #[inline]
    fn from(tag: [u8; TAG_SIZE]) -> Self {
        Self(tag)
    }
}

impl From<Tag> for [u8; TAG_SIZE] {
    #[inline]
    fn from(tag: Tag) -> Self {
        tag.0
    }
}

/// Overwrites secret material with zeros.
pub(crate) fn wipe(block: &mut Block) {
    #[cfg(feature = "zeroize")]
    {
        block.zeroize();
    }
    #[cfg(not(feature = "zeroize"))]
    {
        for b in block.iter_mut() {
            *b ^= *b;
        }
    }
}

/// Copies a partial block into a zeroed block.
#[inline(always)]
pub(crate) fn pad(tail: &[u8]) -> Block {
    debug_assert!(tail.len() < BLOCK_SIZE);

    let mut block = [0u8; BLOCK_SIZE];
    #[allow(
        clippy::indexing_slicing,
        reason = "Callers only pass partial blocks."
    )]
    block[..tail.len()].copy_from_slice(tail);
    block
}

// See https://doc.rust-lang.org/std/primitive.slice.html#method.as_chunks
pub(crate) const fn as_blocks(blocks: &[u8]) -> (&[Block], &[u8]) {
    #[allow(clippy::arithmetic_side_effects)]
    let len_rounded_down = (blocks.len() / BLOCK_SIZE) * BLOCK_SIZE;
    // SAFETY: The rounded-down value is always the same or
    // smaller than the original length, and thus must be
    // in-bounds of the slice.
    let (head, tail) = unsafe { blocks.split_at_unchecked(len_rounded_down) };
    let new_len = head.len() / BLOCK_SIZE;
    // SAFETY: We cast a slice of `new_len * N` elements into
    // a slice of `new_len` many `N` elements chunks.
    let head = unsafe { slice::from_raw_parts(head.as_ptr().cast(), new_len) };
    (head, tail)
}

// See https://doc.rust-lang.org/std/primitive.slice.html#method.as_chunks_mut
pub(crate) fn as_blocks_mut(blocks: &mut [u8]) -> (&mut [Block], &mut [u8]) {
    #[allow(clippy::arithmetic_side_effects)]
    let len_rounded_down = (blocks.len() / BLOCK_SIZE) * BLOCK_SIZE;
    // SAFETY: See `as_blocks`.
    let (head, tail) = unsafe { blocks.split_at_mut_unchecked(len_rounded_down) };
    let new_len = head.len() / BLOCK_SIZE;
    // SAFETY: See `as_blocks`. `head` is uniquely borrowed, so
    // the new slice is too.
    let head = unsafe { slice::from_raw_parts_mut(head.as_mut_ptr().cast(), new_len) };
    (head, tail)
}
