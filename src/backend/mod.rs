//! The hardware capabilities and their implementations.
//!
//! Everything above this module is written once, generically over
//! [`Arch`]. A [`Dispatch`] job is handed to [`dispatch`], which
//! runs it with the hardware lane type when the CPU supports it
//! and with [`generic::Soft`] otherwise.

mod aarch64;
pub(crate) mod generic;
mod soft;
mod x86;

use core::sync::atomic::{AtomicBool, Ordering};

use crate::poly::Block;

cfg_if::cfg_if! {
    if #[cfg(feature = "soft")] {
        use soft as imp;
    } else if #[cfg(all(target_arch = "aarch64", target_feature = "neon"))] {
        use aarch64 as imp;
    } else if #[cfg(any(target_arch = "x86", target_arch="x86_64"))] {
        use x86 as imp;
    } else {
        use soft as imp;
    }
}

/// Runs `job` on the best backend available on this CPU.
pub(crate) use imp::dispatch;

static ANNOUNCED: AtomicBool = AtomicBool::new(false);

/// Logs the backend picked by [`dispatch`], once per process.
#[inline]
fn announce(name: &str) {
    if !ANNOUNCED.load(Ordering::Relaxed) {
        ANNOUNCED.store(true, Ordering::Relaxed);
        log::debug!("using the {name} backend");
    }
}

/// A 128-bit vector register.
///
/// Bytes are loaded little-endian, so the "low half" is bytes
/// `0..8` and lane 0 is bytes `0..4`.
pub(crate) trait Lane: Copy {
    fn load(block: &Block) -> Self;
    fn store(self) -> Block;
    fn xor(self, rhs: Self) -> Self;
    /// Exchanges the 64-bit halves.
    fn swap_halves(self) -> Self;
    /// Moves the low half into the high half, zero filling.
    fn shl64(self) -> Self;
    /// Moves the high half into the low half, zero filling.
    fn shr64(self) -> Self;
    /// Adds `n` to the 32-bit lane 0, wrapping. Lanes 1-3 are
    /// left untouched.
    fn add_lane0(self, n: u32) -> Self;
}

/// The AES round function.
pub(crate) trait BlockCipher: Lane {
    /// `MixColumns(ShiftRows(SubBytes(self))) ^ key`.
    fn encrypt_round(self, key: Self) -> Self;
    /// `ShiftRows(SubBytes(self)) ^ key`.
    fn encrypt_last_round(self, key: Self) -> Self;
}

/// Carry-less multiplication of 64-bit halves.
pub(crate) trait FieldMultiply: Lane {
    /// Returns the 128-bit carry-less product of one half of
    /// `self` and one half of `rhs`.
    ///
    /// `SEL` has PCLMULQDQ semantics: bit 0 picks the half of
    /// `self` and bit 4 picks the half of `rhs` (0 = low,
    /// 1 = high).
    fn clmul<const SEL: i32>(self, rhs: Self) -> Self;
}

/// Both capabilities on the same lane type.
pub(crate) trait Arch: BlockCipher + FieldMultiply {}

impl<T: BlockCipher + FieldMultiply> Arch for T {}

/// A job that can run on any [`Arch`].
///
/// Implementations should mark `call` `#[inline(always)]` so the
/// body is compiled inside the backend's `#[target_feature]`
/// trampoline.
pub(crate) trait Dispatch {
    type Output;

    fn call<A: Arch>(self) -> Self::Output;
}

/// Runs `job` on the portable backend regardless of the CPU.
#[cfg(test)]
pub(crate) fn portable<D: Dispatch>(job: D) -> D::Output {
    job.call::<generic::Soft>()
}
