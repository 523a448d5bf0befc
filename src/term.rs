//! Term Conversion
//!
//! Rust values to BEAM terms for the NIF surface.

use rustler::types::atom;
use rustler::{Encoder, Env, NewBinary, Term};

/// Copy bytes into a fresh BEAM binary
pub fn bytes_to_binary<'a>(env: Env<'a>, bytes: &[u8]) -> Term<'a> {
    let mut binary = NewBinary::new(env, bytes.len());
    binary.as_mut_slice().copy_from_slice(bytes);
    binary.into()
}

/// `{:ok, value}`
pub fn ok_tuple<'a>(env: Env<'a>, value: impl Encoder) -> Term<'a> {
    (atom::ok(), value).encode(env)
}

/// `{:error, reason}`
pub fn error_tuple<'a>(env: Env<'a>, reason: impl Encoder) -> Term<'a> {
    (atom::error(), reason).encode(env)
}
