//! Base64 Alphabet
//!
//! The RFC 4648 standard alphabet and its inverse, both built at compile time.

/// The 64 output symbols, indexed by 6-bit value
pub const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Padding symbol marking missing bytes in the final quantum
pub const PAD: u8 = b'=';

/// Marker for bytes that are not part of the alphabet
const INVALID: u8 = 0xFF;

/// Symbol -> 6-bit value, `INVALID` for everything else
static INVERSE: [u8; 256] = build_inverse();

const fn build_inverse() -> [u8; 256] {
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
}

/// Symbol for the low 6 bits of `value`
#[inline]
pub fn symbol(value: u32) -> u8 {
    ALPHABET[(value & 0x3F) as usize]
}

/// 6-bit value of an alphabet symbol, or None for padding and foreign bytes
#[inline]
pub fn value_of(symbol: u8) -> Option<u8> {
    match INVERSE[symbol as usize] {
        INVALID => None,
        v => Some(v),
    }
}
