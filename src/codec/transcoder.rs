//! Streaming Transcoder
//!
//! Encodes or decodes base64 over input split at arbitrary call boundaries.
//! A partial quantum (up to 2 raw bytes when encoding, up to 3 symbols when
//! decoding) is carried in [`TranscodeState`] until the next call or
//! [`Transcoder::finish`].

use std::io;

use super::alphabet::{self, PAD};
use super::sink::Sink;

/// Name that selects base64; anything else passes bytes through
pub const BASE64: &str = "base64";

/// Active transcoding algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Bytes are copied to the sink unchanged
    #[default]
    PassThrough,
    /// RFC 4648 base64, standard alphabet, padded, unwrapped
    Base64,
}

impl Encoding {
    /// Map an encoding name to an algorithm. Unknown names pass through.
    pub fn from_name(name: &str) -> Self {
        if name == BASE64 {
            Encoding::Base64
        } else {
            Encoding::PassThrough
        }
    }
}

/// Last operation requested; decides how `finish` flushes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Encode,
    Decode,
}

/// Accumulator carried between transcoder calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TranscodeState {
    encoding: Encoding,
    mode: Mode,
    /// Up to 24 bits of a partial quantum, left-aligned
    pending_value: u32,
    /// Units (bytes or symbols) in `pending_value`
    pending_rank: u8,
    /// `=` symbols seen in the current decode quantum
    missing_bytes: u8,
}

impl TranscodeState {
    /// Fresh state for the given encoding
    pub fn new(encoding: Encoding) -> Self {
        TranscodeState {
            encoding,
            ..Default::default()
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn pending_rank(&self) -> u8 {
        self.pending_rank
    }

    pub fn missing_bytes(&self) -> u8 {
        self.missing_bytes
    }

    /// True when a partial quantum is waiting to be flushed
    pub fn has_pending(&self) -> bool {
        match self.mode {
            Mode::Encode => self.pending_value != 0 || self.pending_rank != 0,
            Mode::Decode => {
                self.pending_value != 0 || self.pending_rank != 0 || self.missing_bytes != 0
            }
        }
    }

    fn clear_pending(&mut self) {
        self.pending_value = 0;
        self.pending_rank = 0;
        self.missing_bytes = 0;
    }
}

/// Stream filter writing encoded or decoded bytes into a [`Sink`]
///
/// Not `Clone`: continuing a stream on another sink goes through
/// [`Transcoder::snapshot`] and [`Transcoder::resume`].
pub struct Transcoder<'s> {
    sink: Sink<'s>,
    state: TranscodeState,
}

impl<'s> Transcoder<'s> {
    /// Transcoder in pass-through mode until an encoding is set
    pub fn new(sink: impl Into<Sink<'s>>) -> Self {
        Transcoder {
            sink: sink.into(),
            state: TranscodeState::default(),
        }
    }

    /// Transcoder with the encoding selected by `name`
    pub fn with_encoding(sink: impl Into<Sink<'s>>, name: &str) -> Self {
        let mut transcoder = Self::new(sink);
        transcoder.set_encoding(name);
        transcoder
    }

    /// Continue a stream on `sink` from a previously captured state
    pub fn resume(sink: impl Into<Sink<'s>>, state: TranscodeState) -> Self {
        Transcoder {
            sink: sink.into(),
            state,
        }
    }

    /// Copy of the accumulator state; the sink is not part of it
    pub fn snapshot(&self) -> TranscodeState {
        self.state
    }

    /// Give up the sink borrow and keep the accumulator state
    pub fn into_state(self) -> TranscodeState {
        self.state
    }

    /// Select the algorithm used by subsequent calls. Not validated.
    pub fn set_encoding(&mut self, name: &str) {
        let encoding = Encoding::from_name(name);
        if encoding == Encoding::PassThrough {
            tracing::trace!(encoding = name, "unrecognized encoding, passing bytes through");
        }
        self.state.encoding = encoding;
    }

    pub fn encoding(&self) -> Encoding {
        self.state.encoding
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    /// Append `buf` to the encode stream
    pub fn encode(&mut self, buf: &[u8]) -> io::Result<()> {
        self.switch_mode(Mode::Encode);
        match self.state.encoding {
            Encoding::Base64 => self.encode_base64(buf),
            Encoding::PassThrough => self.sink.write(buf),
        }
    }

    /// Append `buf` to the decode stream
    pub fn decode(&mut self, buf: &[u8]) -> io::Result<()> {
        self.switch_mode(Mode::Decode);
        match self.state.encoding {
            Encoding::Base64 => self.decode_base64(buf),
            Encoding::PassThrough => self.sink.write(buf),
        }
    }

    /// Flush a trailing partial quantum, reset the pending state and flush
    /// the sink
    pub fn finish(&mut self) -> io::Result<()> {
        if self.state.encoding == Encoding::Base64 && self.state.has_pending() {
            self.write_tail()?;
        }
        self.sink.flush()
    }

    fn write_tail(&mut self) -> io::Result<()> {
        let state = self.state;
        self.state.clear_pending();

        match state.mode {
            Mode::Decode => {
                let missing = if state.missing_bytes == 0 {
                    4 - state.pending_rank
                } else {
                    state.missing_bytes
                };
                let decoded = unpack(state.pending_value);
                let len = 3usize.saturating_sub(missing as usize);
                tracing::trace!(rank = state.pending_rank, written = len, "flushed decode quantum");
                self.sink.write(&decoded[..len])
            }
            Mode::Encode => {
                let mut encoded = pack(state.pending_value);
                let padding = 3 - state.pending_rank as usize;
                for slot in encoded.iter_mut().rev().take(padding) {
                    *slot = PAD;
                }
                tracing::trace!(rank = state.pending_rank, padding, "flushed encode quantum");
                self.sink.write(&encoded)
            }
        }
    }

    /// A partial quantum never crosses a change of direction
    fn switch_mode(&mut self, mode: Mode) {
        if self.state.mode != mode {
            if self.state.has_pending() {
                tracing::trace!(?mode, "direction changed, dropping partial quantum");
            }
            self.state.clear_pending();
            self.state.mode = mode;
        }
    }

    fn encode_base64(&mut self, buf: &[u8]) -> io::Result<()> {
        let mut value = self.state.pending_value;
        let mut rank = self.state.pending_rank;
        let mut out = Vec::with_capacity((buf.len() / 3 + 1) * 4);

        for &byte in buf {
            value |= u32::from(byte) << ((2 - u32::from(rank)) * 8);
            rank += 1;

            if rank == 3 {
                out.extend_from_slice(&pack(value));
                value = 0;
                rank = 0;
            }
        }

        self.state.pending_value = value;
        self.state.pending_rank = rank;
        self.sink.write(&out)
    }

    fn decode_base64(&mut self, buf: &[u8]) -> io::Result<()> {
        let mut value = self.state.pending_value;
        let mut rank = self.state.pending_rank;
        let mut missing = self.state.missing_bytes;
        let mut out = Vec::with_capacity(buf.len() / 4 * 3 + 3);

        for &c in buf {
            if let Some(bits) = alphabet::value_of(c) {
                value |= u32::from(bits) << ((3 - u32::from(rank)) * 6);
                rank += 1;
            } else if c == PAD {
                missing += 1;
                rank += 1;
            } else {
                continue;
            }

            if rank == 4 {
                let decoded = unpack(value);
                let len = 3usize.saturating_sub(missing as usize);
                out.extend_from_slice(&decoded[..len]);
                value = 0;
                rank = 0;
                missing = 0;
            }
        }

        self.state.pending_value = value;
        self.state.pending_rank = rank;
        self.state.missing_bytes = missing;
        self.sink.write(&out)
    }
}

impl std::fmt::Debug for Transcoder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transcoder")
            .field("sink", &self.sink)
            .field("state", &self.state)
            .finish()
    }
}

/// 24-bit value -> 4 symbols
#[inline]
fn pack(value: u32) -> [u8; 4] {
    [
        alphabet::symbol(value >> 18),
        alphabet::symbol(value >> 12),
        alphabet::symbol(value >> 6),
        alphabet::symbol(value),
    ]
}

/// 24-bit value -> 3 bytes
#[inline]
fn unpack(value: u32) -> [u8; 3] {
    [(value >> 16) as u8, (value >> 8) as u8, value as u8]
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use proptest::prelude::*;

    fn encode_chunks(chunks: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut t = Transcoder::with_encoding(&mut out, BASE64);
        for chunk in chunks {
            t.encode(chunk).unwrap();
        }
        t.finish().unwrap();
        out
    }

    fn decode_chunks(chunks: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut t = Transcoder::with_encoding(&mut out, BASE64);
        for chunk in chunks {
            t.decode(chunk).unwrap();
        }
        t.finish().unwrap();
        out
    }

    #[test]
    fn test_rfc4648_vectors() {
        let vectors: [(&[u8], &[u8]); 7] = [
            (b"", b""),
            (b"f", b"Zg=="),
            (b"fo", b"Zm8="),
            (b"foo", b"Zm9v"),
            (b"foob", b"Zm9vYg=="),
            (b"fooba", b"Zm9vYmE="),
            (b"foobar", b"Zm9vYmFy"),
        ];
        for (raw, encoded) in vectors {
            assert_eq!(encode_chunks(&[raw]), encoded);
            assert_eq!(decode_chunks(&[encoded]), raw);
        }
    }

    #[test]
    fn test_round_trip_small_lengths() {
        for len in [0usize, 1, 2, 3, 4, 5, 6, 100] {
            let data: Vec<u8> = (0..len).map(|i| (i * 37 + 11) as u8).collect();
            let encoded = encode_chunks(&[&data]);
            assert_eq!(encoded.len() % 4, 0);
            assert_eq!(decode_chunks(&[&encoded]), data, "length {len}");
        }
    }

    #[test]
    fn test_padding_by_length() {
        assert!(encode_chunks(&[b"a"]).ends_with(b"=="));
        assert!(encode_chunks(&[b"abcd"]).ends_with(b"=="));
        let two = encode_chunks(&[b"ab"]);
        assert!(two.ends_with(b"=") && !two.ends_with(b"=="));
        assert!(!encode_chunks(&[b"abc"]).contains(&PAD));
        assert!(!encode_chunks(&[b"abcdef"]).contains(&PAD));
    }

    #[test]
    fn test_high_bytes_are_unsigned() {
        assert_eq!(encode_chunks(&[&[0xFF, 0xFE, 0xFD]]), b"//79");
        assert_eq!(decode_chunks(&[b"//79"]), vec![0xFF, 0xFE, 0xFD]);
    }

    #[test]
    fn test_encode_byte_at_a_time() {
        let data = b"streamed payload";
        let chunks: Vec<&[u8]> = data.chunks(1).collect();
        assert_eq!(encode_chunks(&chunks), encode_chunks(&[data]));
    }

    #[test]
    fn test_decode_byte_at_a_time() {
        let inputs: [&[u8]; 4] = [b"Zm9v\nYmE=", b"Zm9vYg==", b" Zm9v\r\nYmFy ", b"Zm9vYmE"];
        for input in inputs {
            let chunks: Vec<&[u8]> = input.chunks(1).collect();
            assert_eq!(decode_chunks(&chunks), decode_chunks(&[input]));
        }
        let chunks: Vec<&[u8]> = b"Zm9v\nYmE=".chunks(1).collect();
        assert_eq!(decode_chunks(&chunks), b"fooba");
    }

    #[test]
    fn test_decode_skips_foreign_characters() {
        assert_eq!(decode_chunks(&[b"Zm9v\r\nYmFy"]), b"foobar");
        assert_eq!(decode_chunks(&[b" Z m 9 v Y g = = "]), b"foob");
        assert_eq!(decode_chunks(&[b"Zm-9v*Ym!E="]), b"fooba");
    }

    #[test]
    fn test_decode_unpadded_tail_flushed_by_finish() {
        assert_eq!(decode_chunks(&[b"Zm9vYg"]), b"foob");
        assert_eq!(decode_chunks(&[b"Zm9vYmE"]), b"fooba");
    }

    #[test]
    fn test_decode_lone_symbol_writes_nothing() {
        assert_eq!(decode_chunks(&[b"Zm9vY"]), b"foo");
    }

    #[test]
    fn test_excess_padding_saturates() {
        assert_eq!(decode_chunks(&[b"===="]), b"");
        assert_eq!(decode_chunks(&[b"A==="]), b"");
    }

    #[test]
    fn test_finish_without_pending_is_noop() {
        let mut out = Vec::new();
        let mut t = Transcoder::with_encoding(&mut out, BASE64);
        t.finish().unwrap();
        t.encode(b"abc").unwrap();
        t.finish().unwrap();
        t.finish().unwrap();
        assert_eq!(out, b"YWJj");
    }

    #[test]
    fn test_finish_resets_for_reuse() {
        let mut out = Vec::new();
        let mut t = Transcoder::with_encoding(&mut out, BASE64);
        t.encode(b"f").unwrap();
        t.finish().unwrap();
        assert!(!t.snapshot().has_pending());
        t.decode(b"Zm8").unwrap();
        t.finish().unwrap();
        let state = t.snapshot();
        assert!(!state.has_pending());
        assert_eq!(state.mode(), Mode::Decode);
        assert_eq!(state.encoding(), Encoding::Base64);
        assert_eq!(out, b"Zg==fo");
    }

    #[test]
    fn test_pending_state_between_calls() {
        let mut out = Vec::new();
        let mut t = Transcoder::with_encoding(&mut out, BASE64);
        t.encode(b"ab").unwrap();
        assert_eq!(t.snapshot().pending_rank(), 2);
        t.encode(b"c").unwrap();
        assert_eq!(t.snapshot().pending_rank(), 0);
        t.decode(b"Zm9").unwrap();
        assert_eq!(t.snapshot().pending_rank(), 3);
        assert_eq!(t.mode(), Mode::Decode);
        t.decode(b"=").unwrap();
        assert_eq!(t.snapshot().pending_rank(), 0);
        assert_eq!(t.snapshot().missing_bytes(), 0);
        drop(t);
        assert_eq!(out, b"YWJjfo");
    }

    #[test]
    fn test_direction_change_drops_partial_quantum() {
        let mut out = Vec::new();
        let mut t = Transcoder::with_encoding(&mut out, BASE64);
        t.decode(b"Zm9").unwrap();
        t.encode(b"a").unwrap();
        assert_eq!(t.snapshot().pending_rank(), 1);
        t.finish().unwrap();
        drop(t);
        assert_eq!(out, b"YQ==");
    }

    #[test]
    fn test_pass_through() {
        let mut out = Vec::new();
        let mut t = Transcoder::with_encoding(&mut out, "quoted-printable");
        assert_eq!(t.encoding(), Encoding::PassThrough);
        t.encode(b"raw ").unwrap();
        t.decode(b"bytes==").unwrap();
        t.finish().unwrap();
        assert_eq!(out, b"raw bytes==");
    }

    #[test]
    fn test_default_encoding_passes_through() {
        let mut out = Vec::new();
        let mut t = Transcoder::new(&mut out);
        t.encode(b"plain").unwrap();
        t.finish().unwrap();
        assert_eq!(out, b"plain");
    }

    #[test]
    fn test_resume_on_other_sink() {
        let mut first = Vec::new();
        let mut second = Vec::new();

        let mut t = Transcoder::with_encoding(&mut first, BASE64);
        t.encode(b"hello w").unwrap();
        let state = t.into_state();

        let mut t = Transcoder::resume(&mut second, state);
        t.encode(b"orld").unwrap();
        t.finish().unwrap();

        first.extend_from_slice(&second);
        assert_eq!(first, encode_chunks(&[b"hello world"]));
    }

    #[test]
    fn test_stream_sink() {
        let mut cursor = io::Cursor::new(Vec::new());
        let mut t = Transcoder::with_encoding(Sink::Stream(&mut cursor), BASE64);
        t.encode(b"hi").unwrap();
        t.finish().unwrap();
        drop(t);
        assert_eq!(cursor.into_inner(), b"aGk=");
    }

    struct BrokenPipe;

    impl io::Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FlushCounter {
        data: Vec<u8>,
        flushes: usize,
    }

    impl io::Write for FlushCounter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[test]
    fn test_finish_flushes_sink() {
        let mut stream = FlushCounter::default();
        {
            let mut t = Transcoder::with_encoding(Sink::Stream(&mut stream), BASE64);
            t.encode(b"ab").unwrap();
            t.finish().unwrap();
        }
        assert_eq!(stream.data, b"YWI=");
        assert_eq!(stream.flushes, 1);

        // Pass-through writes nothing on finish but still flushes
        let mut stream = FlushCounter::default();
        {
            let mut t = Transcoder::new(Sink::Stream(&mut stream));
            t.encode(b"raw").unwrap();
            t.finish().unwrap();
        }
        assert_eq!(stream.data, b"raw");
        assert_eq!(stream.flushes, 1);
    }

    #[test]
    fn test_sink_errors_propagate() {
        let mut pipe = BrokenPipe;
        let mut t = Transcoder::with_encoding(Sink::Stream(&mut pipe), BASE64);
        let err = t.encode(b"abc").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    proptest! {
        #[test]
        fn prop_matches_reference_encoder(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            prop_assert_eq!(encode_chunks(&[&data]), STANDARD.encode(&data).into_bytes());
        }

        #[test]
        fn prop_decodes_reference_output(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let encoded = STANDARD.encode(&data);
            prop_assert_eq!(decode_chunks(&[encoded.as_bytes()]), data);
        }

        #[test]
        fn prop_encode_split_invariant(
            data in proptest::collection::vec(any::<u8>(), 0..256),
            a in 0usize..256,
            b in 0usize..256,
        ) {
            let a = a.min(data.len());
            let b = b.min(data.len()).max(a);
            let split = encode_chunks(&[&data[..a], &data[a..b], &data[b..]]);
            prop_assert_eq!(split, encode_chunks(&[&data]));
        }

        #[test]
        fn prop_decode_split_invariant(
            data in proptest::collection::vec(any::<u8>(), 0..256),
            a in 0usize..400,
            b in 0usize..400,
        ) {
            let encoded = STANDARD.encode(&data).into_bytes();
            let a = a.min(encoded.len());
            let b = b.min(encoded.len()).max(a);
            let split = decode_chunks(&[&encoded[..a], &encoded[a..b], &encoded[b..]]);
            prop_assert_eq!(split, data);
        }

        #[test]
        fn prop_byte_at_a_time_matches_whole(data in proptest::collection::vec(any::<u8>(), 0..128)) {
            let bytes: Vec<&[u8]> = data.chunks(1).collect();
            prop_assert_eq!(encode_chunks(&bytes), encode_chunks(&[&data]));

            let encoded = STANDARD.encode(&data).into_bytes();
            let symbols: Vec<&[u8]> = encoded.chunks(1).collect();
            prop_assert_eq!(decode_chunks(&symbols), data);
        }

        #[test]
        fn prop_decode_ignores_noise(
            data in proptest::collection::vec(any::<u8>(), 0..128),
            noise in proptest::collection::vec(
                prop_oneof![Just(b' '), Just(b'\n'), Just(b'\t'), Just(b'.'), Just(b'-'), Just(b'~')],
                0..64,
            ),
            seed in any::<u64>(),
        ) {
            let clean = STANDARD.encode(&data).into_bytes();
            let mut noisy = clean.clone();
            let mut pos = seed as usize;
            for c in noise {
                pos = pos.wrapping_mul(31).wrapping_add(7);
                let at = pos % (noisy.len() + 1);
                noisy.insert(at, c);
            }
            prop_assert_eq!(decode_chunks(&[&noisy]), decode_chunks(&[&clean]));
        }
    }
}
