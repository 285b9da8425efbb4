//! The x86 implementation: AES-NI rounds and PCLMULQDQ.

#![cfg(all(
    not(feature = "soft"),
    any(target_arch = "x86", target_arch = "x86_64")
))]
#![allow(clippy::undocumented_unsafe_blocks, reason = "Too many unsafe blocks.")]
// SAFETY: every unsafe block in this module calls an SSE2, AES
// or PCLMULQDQ intrinsic. `Ni` is only ever instantiated inside
// `dispatch_ni`, which is entered after `have_ni` confirmed all
// three features.

use cfg_if::cfg_if;

use super::{announce, generic::Soft, BlockCipher, Dispatch, FieldMultiply, Lane};
use crate::poly::Block;

cfg_if! {
    if #[cfg(target_arch = "x86")] {
        use core::arch::x86::*;
    } else {
        use core::arch::x86_64::*;
    }
}

cpufeatures::new!(have_ni, "sse2", "aes", "pclmulqdq");

pub(crate) fn dispatch<D: Dispatch>(job: D) -> D::Output {
    if have_ni::get() {
        announce("AES-NI/PCLMULQDQ");
        // SAFETY: `have_ni` verified the target features that
        // `dispatch_ni` enables.
        unsafe { dispatch_ni(job) }
    } else {
        announce("portable");
        job.call::<Soft>()
    }
}

/// # Safety
///
/// The SSE2, AES and PCLMULQDQ architectural features must be
/// enabled.
#[target_feature(enable = "sse2,aes,pclmulqdq")]
unsafe fn dispatch_ni<D: Dispatch>(job: D) -> D::Output {
    job.call::<Ni>()
}

/// An XMM register.
#[derive(Copy, Clone, Debug)]
#[repr(transparent)]
struct Ni(__m128i);

impl Lane for Ni {
    #[inline(always)]
    fn load(block: &Block) -> Self {
        Self(unsafe { _mm_loadu_si128(block.as_ptr().cast::<__m128i>()) })
    }

    #[inline(always)]
    fn store(self) -> Block {
        let mut out = [0u8; 16];
        unsafe { _mm_storeu_si128(out.as_mut_ptr().cast::<__m128i>(), self.0) }
        out
    }

    #[inline(always)]
    fn xor(self, rhs: Self) -> Self {
        Self(unsafe { _mm_xor_si128(self.0, rhs.0) })
    }

    #[inline(always)]
    fn swap_halves(self) -> Self {
        Self(unsafe { _mm_shuffle_epi32::<0x4e>(self.0) })
    }

    #[inline(always)]
    fn shl64(self) -> Self {
        Self(unsafe { _mm_slli_si128::<8>(self.0) })
    }

    #[inline(always)]
    fn shr64(self) -> Self {
        Self(unsafe { _mm_srli_si128::<8>(self.0) })
    }

    #[inline(always)]
    fn add_lane0(self, n: u32) -> Self {
        let n = i32::from_ne_bytes(n.to_ne_bytes());
        Self(unsafe { _mm_add_epi32(self.0, _mm_cvtsi32_si128(n)) })
    }
}

impl FieldMultiply for Ni {
    #[inline(always)]
    fn clmul<const SEL: i32>(self, rhs: Self) -> Self {
        Self(unsafe { _mm_clmulepi64_si128::<SEL>(self.0, rhs.0) })
    }
}

impl BlockCipher for Ni {
    #[inline(always)]
    fn encrypt_round(self, key: Self) -> Self {
        Self(unsafe { _mm_aesenc_si128(self.0, key.0) })
    }

    #[inline(always)]
    fn encrypt_last_round(self, key: Self) -> Self {
        Self(unsafe { _mm_aesenclast_si128(self.0, key.0) })
    }
}
