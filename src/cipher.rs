//! The AES block cipher, given an expanded key schedule.
//!
//! Key expansion is left to the caller. Only encryption is
//! needed: CTR mode never runs the inverse cipher.

use core::fmt;

use crate::{
    backend::{self, Arch, BlockCipher, Dispatch, Lane},
    poly::{wipe, Block, Tag},
};

/// The number of round keys for AES-128.
pub const AES128_ROUND_KEYS: usize = 11;

/// The number of round keys for AES-256.
pub const AES256_ROUND_KEYS: usize = 15;

/// An expanded AES-128 or AES-256 encryption key schedule.
///
/// Round key `i` is the 16 bytes of FIPS-197 words `4i` through
/// `4i+3`. Key 0 is the whitening key and the last key is used
/// by the final round.
#[derive(Clone)]
pub struct KeySchedule(Keys);

#[derive(Clone)]
enum Keys {
    Aes128([Block; AES128_ROUND_KEYS]),
    Aes256([Block; AES256_ROUND_KEYS]),
}

impl KeySchedule {
    /// Creates a key schedule from 11 (AES-128) or 15 (AES-256)
    /// round keys.
    pub fn new(round_keys: &[Block]) -> Result<Self, InvalidKeySchedule> {
        if let Ok(keys) = <[Block; AES128_ROUND_KEYS]>::try_from(round_keys) {
            Ok(Self(Keys::Aes128(keys)))
        } else if let Ok(keys) = <[Block; AES256_ROUND_KEYS]>::try_from(round_keys) {
            Ok(Self(Keys::Aes256(keys)))
        } else {
            Err(InvalidKeySchedule(round_keys.len()))
        }
    }

    /// Returns the number of rounds: 10 for AES-128 and 14 for
    /// AES-256.
    pub const fn rounds(&self) -> usize {
        match self.0 {
            Keys::Aes128(_) => AES128_ROUND_KEYS - 1,
            Keys::Aes256(_) => AES256_ROUND_KEYS - 1,
        }
    }

    /// Encrypts a single block.
    pub fn encrypt_block(&self, block: &Block) -> Block {
        backend::dispatch(EncryptBlock {
            keys: self.ladder(),
            block,
        })
    }

    pub(crate) fn ladder(&self) -> Ladder<'_> {
        match &self.0 {
            Keys::Aes128([first, k1, k2, k3, k4, k5, k6, k7, k8, k9, last]) => Ladder {
                first,
                common: [k1, k2, k3, k4, k5, k6, k7, k8, k9],
                extra: &[],
                last,
            },
            Keys::Aes256([first, k1, k2, k3, k4, k5, k6, k7, k8, k9, extra @ .., last]) => Ladder {
                first,
                common: [k1, k2, k3, k4, k5, k6, k7, k8, k9],
                extra,
                last,
            },
        }
    }
}

impl From<[Block; AES128_ROUND_KEYS]> for KeySchedule {
    #[inline]
    fn from(keys: [Block; AES128_ROUND_KEYS]) -> Self {
        Self(Keys::Aes128(keys))
    }
}

impl From<[Block; AES256_ROUND_KEYS]> for KeySchedule {
    #[inline]
    fn from(keys: [Block; AES256_ROUND_KEYS]) -> Self {
        Self(Keys::Aes256(keys))
    }
}

#[cfg(feature = "zeroize")]
#[cfg_attr(docsrs, doc(cfg(feature = "zeroize")))]
impl zeroize::ZeroizeOnDrop for KeySchedule {}

impl Drop for KeySchedule {
    fn drop(&mut self) {
        let keys: &mut [Block] = match &mut self.0 {
            Keys::Aes128(keys) => keys,
            Keys::Aes256(keys) => keys,
        };
        for key in keys {
            wipe(key);
        }
    }
}

impl fmt::Debug for KeySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySchedule")
            .field("rounds", &self.rounds())
            .finish_non_exhaustive()
    }
}

/// Returned by [`KeySchedule::new`] when the number of round
/// keys is neither 11 nor 15.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct InvalidKeySchedule(usize);

impl fmt::Display for InvalidKeySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid key schedule: {} round keys, want {AES128_ROUND_KEYS} or {AES256_ROUND_KEYS}",
            self.0
        )
    }
}

impl core::error::Error for InvalidKeySchedule {}

/// The round keys, split the way the rounds consume them.
///
/// Rounds 1 through 9 exist for both key sizes, which lets the
/// codec schedule its hashing against them.
#[derive(Copy, Clone)]
pub(crate) struct Ladder<'a> {
    pub(crate) first: &'a Block,
    pub(crate) common: [&'a Block; 9],
    /// Rounds 10 through 13 for AES-256, empty for AES-128.
    pub(crate) extra: &'a [Block],
    pub(crate) last: &'a Block,
}

impl Ladder<'_> {
    /// Runs the full cipher over `W` independent blocks.
    #[inline(always)]
    pub(crate) fn encrypt<C: BlockCipher, const W: usize>(&self, lanes: [C; W]) -> [C; W] {
        let mut lanes = whiten(lanes, self.first);
        for key in self.common {
            lanes = round(lanes, key);
        }
        for key in self.extra {
            lanes = round(lanes, key);
        }
        last_round(lanes, self.last)
    }
}

#[inline(always)]
pub(crate) fn whiten<C: Lane, const W: usize>(lanes: [C; W], key: &Block) -> [C; W] {
    let k = C::load(key);
    lanes.map(|x| x.xor(k))
}

#[inline(always)]
pub(crate) fn round<C: BlockCipher, const W: usize>(lanes: [C; W], key: &Block) -> [C; W] {
    let k = C::load(key);
    lanes.map(|x| x.encrypt_round(k))
}

#[inline(always)]
pub(crate) fn last_round<C: BlockCipher, const W: usize>(lanes: [C; W], key: &Block) -> [C; W] {
    let k = C::load(key);
    lanes.map(|x| x.encrypt_last_round(k))
}

struct EncryptBlock<'a> {
    keys: Ladder<'a>,
    block: &'a Block,
}

impl Dispatch for EncryptBlock<'_> {
    type Output = Block;

    #[inline(always)]
    fn call<A: Arch>(self) -> Block {
        let [x] = self.keys.encrypt([A::load(self.block)]);
        x.store()
    }
}

/// An AES-CTR counter block.
///
/// Only the first 32 bits (bytes 0 through 3, little-endian)
/// count. They wrap modulo 2³² without carrying into the other
/// 96 bits.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Counter(Block);

impl Counter {
    /// Returns the initial counter for `tag`: the tag with the
    /// top bit of its last byte set.
    pub fn from_tag(tag: &Tag) -> Self {
        let mut block = tag.0;
        block[15] |= 0x80;
        Self(block)
    }

    /// Creates a counter from a raw block.
    #[inline]
    pub const fn from_bytes(block: &Block) -> Self {
        Self(*block)
    }

    /// Returns the counter block.
    #[inline]
    pub const fn to_bytes(&self) -> Block {
        self.0
    }

    /// Returns the counting 32-bit word.
    pub fn low_word(&self) -> u32 {
        let [a, b, c, d, ..] = self.0;
        u32::from_le_bytes([a, b, c, d])
    }

    /// Returns the counter `n` blocks ahead, wrapping the low
    /// 32 bits.
    #[must_use]
    pub fn add(self, n: u32) -> Self {
        let mut block = self.0;
        let word = self.low_word().wrapping_add(n).to_le_bytes();
        for (b, w) in block.iter_mut().zip(word) {
            *b = w;
        }
        Self(block)
    }
}
