//! AArch64 implementation: ARMv8 AES rounds and PMULL.

#![cfg(all(
    not(feature = "soft"),
    target_arch = "aarch64",
    target_feature = "neon",
))]
#![allow(clippy::undocumented_unsafe_blocks, reason = "Too many unsafe blocks.")]

use core::arch::aarch64::{
    uint8x16_t, vaddq_u32, vaeseq_u8, vaesmcq_u8, vdupq_n_u32, vdupq_n_u8, veorq_u8, vextq_u8,
    vgetq_lane_u64, vld1q_u8, vmull_p64, vreinterpretq_u32_u8, vreinterpretq_u64_u8,
    vreinterpretq_u8_p128, vreinterpretq_u8_u32, vsetq_lane_u32, vst1q_u8,
};

use super::{announce, generic::Soft, BlockCipher, Dispatch, FieldMultiply, Lane};
use crate::poly::Block;

// NB: `aes` implies `neon` and covers PMULL.
cpufeatures::new!(have_aes, "aes");

pub(crate) fn dispatch<D: Dispatch>(job: D) -> D::Output {
    if have_aes::get() {
        announce("ARMv8 AES/PMULL");
        // SAFETY: `have_aes` verified the target features that
        // `dispatch_neon` enables.
        unsafe { dispatch_neon(job) }
    } else {
        announce("portable");
        job.call::<Soft>()
    }
}

/// # Safety
///
/// The NEON and AES architectural features must be enabled.
#[target_feature(enable = "neon,aes")]
unsafe fn dispatch_neon<D: Dispatch>(job: D) -> D::Output {
    job.call::<Neon>()
}

/// A NEON register.
///
/// Only instantiated inside `dispatch_neon`, so every intrinsic
/// below runs with `neon` and `aes` available.
#[derive(Copy, Clone, Debug)]
#[repr(transparent)]
struct Neon(uint8x16_t);

impl Lane for Neon {
    #[inline(always)]
    fn load(block: &Block) -> Self {
        Self(unsafe { vld1q_u8(block.as_ptr()) })
    }

    #[inline(always)]
    fn store(self) -> Block {
        let mut out = [0u8; 16];
        unsafe { vst1q_u8(out.as_mut_ptr(), self.0) }
        out
    }

    #[inline(always)]
    fn xor(self, rhs: Self) -> Self {
        Self(unsafe { veorq_u8(self.0, rhs.0) })
    }

    #[inline(always)]
    fn swap_halves(self) -> Self {
        Self(unsafe { vextq_u8::<8>(self.0, self.0) })
    }

    #[inline(always)]
    fn shl64(self) -> Self {
        // {0, x.lo}
        Self(unsafe { vextq_u8::<8>(vdupq_n_u8(0), self.0) })
    }

    #[inline(always)]
    fn shr64(self) -> Self {
        // {x.hi, 0}
        Self(unsafe { vextq_u8::<8>(self.0, vdupq_n_u8(0)) })
    }

    #[inline(always)]
    fn add_lane0(self, n: u32) -> Self {
        Self(unsafe {
            let n = vsetq_lane_u32::<0>(n, vdupq_n_u32(0));
            vreinterpretq_u8_u32(vaddq_u32(vreinterpretq_u32_u8(self.0), n))
        })
    }
}

impl FieldMultiply for Neon {
    #[inline(always)]
    fn clmul<const SEL: i32>(self, rhs: Self) -> Self {
        Self(unsafe {
            let x = vreinterpretq_u64_u8(self.0);
            let y = vreinterpretq_u64_u8(rhs.0);
            let x = if SEL & 0x01 == 0 {
                vgetq_lane_u64::<0>(x)
            } else {
                vgetq_lane_u64::<1>(x)
            };
            let y = if SEL & 0x10 == 0 {
                vgetq_lane_u64::<0>(y)
            } else {
                vgetq_lane_u64::<1>(y)
            };
            vreinterpretq_u8_p128(vmull_p64(x, y))
        })
    }
}

impl BlockCipher for Neon {
    // AESE computes `ShiftRows(SubBytes(x ^ k))`, so the round
    // key goes in after MixColumns instead.

    #[inline(always)]
    fn encrypt_round(self, key: Self) -> Self {
        Self(unsafe {
            let x = vaeseq_u8(self.0, vdupq_n_u8(0));
            veorq_u8(vaesmcq_u8(x), key.0)
        })
    }

    #[inline(always)]
    fn encrypt_last_round(self, key: Self) -> Self {
        Self(unsafe { veorq_u8(vaeseq_u8(self.0, vdupq_n_u8(0)), key.0) })
    }
}
