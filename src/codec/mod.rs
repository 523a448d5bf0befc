//! Codec Module - Streaming base64 transcoding
//!
//! - Alphabet: compile-time symbol table and inverse
//! - Sink: tagged output destination (file, buffer, stream)
//! - Transcoder: quantum-carrying encode/decode state machine

pub mod alphabet;
pub mod sink;
pub mod transcoder;

pub use sink::Sink;
pub use transcoder::{Encoding, Mode, TranscodeState, Transcoder, BASE64};

/// Encode a whole payload with the named encoding
pub fn encode_to_vec(encoding: &str, input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len().div_ceil(3) * 4);
    let mut transcoder = Transcoder::with_encoding(&mut out, encoding);
    // Buffer sinks never fail
    let _ = transcoder.encode(input).and_then(|()| transcoder.finish());
    out
}

/// Decode a whole payload with the named encoding
pub fn decode_to_vec(encoding: &str, input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() / 4 * 3 + 3);
    let mut transcoder = Transcoder::with_encoding(&mut out, encoding);
    let _ = transcoder.decode(input).and_then(|()| transcoder.finish());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_shot_helpers() {
        assert_eq!(encode_to_vec(BASE64, b"Man"), b"TWFu");
        assert_eq!(decode_to_vec(BASE64, b"TWFu"), b"Man");
        assert_eq!(encode_to_vec("identity", b"Man"), b"Man");
        assert_eq!(decode_to_vec("", b"TWFu"), b"TWFu");
    }

    #[test]
    fn test_one_shot_round_trip() {
        let data: Vec<u8> = (0..=255).collect();
        assert_eq!(decode_to_vec(BASE64, &encode_to_vec(BASE64, &data)), data);
    }
}
