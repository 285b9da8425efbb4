//! The software-only backend.

#![forbid(unsafe_code)]
#![cfg(any(
    feature = "soft",
    not(any(
        target_arch = "x86",
        target_arch = "x86_64",
        all(target_arch = "aarch64", target_feature = "neon"),
    ))
))]

use super::{announce, generic::Soft, Dispatch};

pub(crate) fn dispatch<D: Dispatch>(job: D) -> D::Output {
    announce("portable");
    job.call::<Soft>()
}
