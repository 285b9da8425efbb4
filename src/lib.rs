//! The AES-CTR and POLYVAL core of AES-GCM-SIV per [RFC 8452].
//!
//! This crate provides the parts of AES-GCM-SIV that touch every
//! byte of a message:
//!
//! - [`multiply`], POLYVAL's field multiplication.
//! - [`fold_horner`] and [`fold_batched`], two interchangeable
//!   ways to fold data into a POLYVAL [`State`].
//! - [`decrypt`] and [`encrypt`] (and their in-place forms),
//!   which run AES-CTR and fold the plaintext into the POLYVAL
//!   state in the same pass.
//!
//! Everything else belongs to the caller: expanding the AES key
//! into a [`KeySchedule`], deriving the per-nonce keys, framing
//! the associated data and lengths, computing the tag and
//! comparing it in constant time.
//!
//! The hardware AES and carry-less multiply instructions are used
//! on x86, x86-64 and AArch64 when the CPU has them. Enable the
//! `soft` feature to always use the portable implementation.
//!
//! [RFC 8452]: https://datatracker.ietf.org/doc/html/rfc8452

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(any(test, doctest, feature = "std")), no_std)]
#![cfg_attr(not(any(feature = "std", test)), deny(clippy::std_instead_of_core))]

mod backend;
mod cipher;
mod ctr;
mod field;
mod lite;
mod poly;
mod precomp;

pub use cipher::{Counter, InvalidKeySchedule, KeySchedule, AES128_ROUND_KEYS, AES256_ROUND_KEYS};
pub use ctr::{decrypt, decrypt_in_place, encrypt, encrypt_in_place, LengthMismatch, WIDE};
pub use field::multiply;
pub use lite::fold_horner;
pub use poly::{Block, HashKey, State, Tag, BLOCK_SIZE, KEY_SIZE, TAG_SIZE};
pub use precomp::{build_table, fold_batched, PowersTable, MAX_POWERS};
