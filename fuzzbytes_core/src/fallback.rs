use rand_chacha::ChaCha8Rng;
use rand_core::{RngCore, SeedableRng};
use std::collections::VecDeque;

/// Number of bytes produced by a single draw from the underlying generator.
const DRAW_LEN: usize = 8;

/// Longest UTF-8 encoding of a single code point.
pub(crate) const MAX_UTF8_LEN: usize = 4;

/// An endless, seeded byte stream used once the real input bytes run out.
///
/// The stream is the concatenation of successive `ChaCha8Rng::next_u64` draws laid
/// out little-endian, which makes it exactly the ChaCha8 keystream for the seed.
/// Draws are buffered so callers can consume (or peek at) any number of bytes
/// without skipping parts of a draw.
#[derive(Debug, Clone)]
pub struct FallbackStream {
    rng: ChaCha8Rng,
    /// Bytes of the last draw(s) not yet handed out.
    pending: VecDeque<u8>,
    drawn: u64,
}

impl FallbackStream {
    /// Creates a stream seeded from `seed` (reinterpreted as `u64`).
    pub fn new(seed: i64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed as u64),
            pending: VecDeque::with_capacity(DRAW_LEN),
            drawn: 0,
        }
    }

    /// Total number of stream bytes handed out so far.
    pub fn drawn(&self) -> u64 {
        self.drawn
    }

    /// Fills `dest` with the next `dest.len()` bytes of the stream.
    pub fn fill(&mut self, dest: &mut [u8]) {
        let buffered = self.pending.len().min(dest.len());
        for (slot, byte) in dest.iter_mut().zip(self.pending.drain(..buffered)) {
            *slot = byte;
        }

        // `pending` is empty here unless `dest` was already satisfied.
        let mut chunks = dest[buffered..].chunks_exact_mut(DRAW_LEN);
        for chunk in &mut chunks {
            chunk.copy_from_slice(&self.rng.next_u64().to_le_bytes());
        }
        let tail = chunks.into_remainder();
        if !tail.is_empty() {
            let len = tail.len();
            self.buffer_at_least(len);
            for (slot, byte) in tail.iter_mut().zip(self.pending.drain(..len)) {
                *slot = byte;
            }
        }
        self.drawn += dest.len() as u64;
    }

    /// Returns the next 64-bit draw.
    ///
    /// When no partial draw is buffered this is a direct `ChaCha8Rng::next_u64`;
    /// otherwise the next 8 stream bytes are taken little-endian, which keeps the
    /// byte stream and the 64-bit draws on one sequence.
    pub fn next_u64(&mut self) -> u64 {
        if self.pending.is_empty() {
            self.drawn += DRAW_LEN as u64;
            return self.rng.next_u64();
        }
        let mut draw = [0u8; DRAW_LEN];
        self.fill(&mut draw);
        u64::from_le_bytes(draw)
    }

    /// Decodes one code point from the head of the stream.
    pub fn read_char(&mut self) -> (char, usize) {
        self.buffer_at_least(MAX_UTF8_LEN);
        let head = self.pending.make_contiguous();
        let (decoded, size) = decode_char(&head[..MAX_UTF8_LEN]);
        self.pending.drain(..size);
        self.drawn += size as u64;
        (decoded, size)
    }

    fn buffer_at_least(&mut self, count: usize) {
        while self.pending.len() < count {
            self.pending.extend(self.rng.next_u64().to_le_bytes());
        }
    }
}

/// Decodes the code point at the head of `bytes`.
///
/// A well-formed UTF-8 sequence yields its scalar value and encoded length. A
/// malformed or truncated sequence yields U+FFFD and consumes a single byte.
pub(crate) fn decode_char(bytes: &[u8]) -> (char, usize) {
    let head = &bytes[..bytes.len().min(MAX_UTF8_LEN)];
    let valid = match std::str::from_utf8(head) {
        Ok(text) => text,
        // `valid_up_to` always lands on a char boundary.
        Err(err) => std::str::from_utf8(&head[..err.valid_up_to()]).unwrap_or_default(),
    };
    match valid.chars().next() {
        Some(decoded) => (decoded, decoded.len_utf8()),
        None => (char::REPLACEMENT_CHARACTER, 1),
    }
}
