use crate::config::SourceConfig;
use crate::fallback::{FallbackStream, decode_char};
use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Number of leading input bytes the fallback seed is derived from.
pub const SEED_LEN: usize = 8;

/// Errors raised while building a [`ByteSource`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The input was empty. A fuzzing engine is expected to always hand over at
    /// least one byte, so this indicates a caller bug.
    #[error("Invalid input: a byte source needs at least one input byte")]
    InvalidInput,
}

/// Whether deriving the seed consumes the leading input bytes.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SeedMode {
    /// The seed is read without moving the cursor; the first read starts at byte 0.
    #[default]
    Peek,
    /// The seed bytes are set aside; the first read starts at byte [`SEED_LEN`].
    Consume,
}

/// A single read cursor over two chained byte sources: the finite input buffer,
/// then an endless stream seeded from the input's first [`SEED_LEN`] bytes.
///
/// Once the buffer runs out every read is served from the fallback stream, and
/// there is no way back. A read that straddles the boundary takes whatever real
/// bytes are left and exactly as many fallback bytes as it is short.
///
/// `ByteSource` also implements [`RngCore`], so the whole `rand::Rng` API can be
/// driven by fuzzer input.
#[derive(Debug, Clone)]
pub struct ByteSource<'a> {
    data: &'a [u8],
    cursor: usize,
    seed: i64,
    fallback: FallbackStream,
}

impl<'a> ByteSource<'a> {
    /// Creates a byte source with the default [`SeedMode::Peek`].
    pub fn new(data: &'a [u8]) -> Result<Self, SourceError> {
        Self::with_config(data, &SourceConfig::default())
    }

    pub fn with_config(data: &'a [u8], config: &SourceConfig) -> Result<Self, SourceError> {
        if data.is_empty() {
            return Err(SourceError::InvalidInput);
        }
        let seed = derive_seed(data);
        let cursor = match config.seed_mode {
            SeedMode::Peek => 0,
            SeedMode::Consume => data.len().min(SEED_LEN),
        };
        log::debug!(
            "byte source over {} input bytes, seed {:#018x}, seed mode {:?}",
            data.len(),
            seed,
            config.seed_mode
        );
        Ok(Self {
            data,
            cursor,
            seed,
            fallback: FallbackStream::new(seed),
        })
    }

    /// The seed the current fallback stream was created from.
    pub fn seed(&self) -> i64 {
        self.seed
    }

    /// Offset of the next real byte. Equals the input length once exhausted.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Real input bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Bytes served by the fallback stream so far (since the last reseed).
    pub fn fallback_drawn(&self) -> u64 {
        self.fallback.drawn()
    }

    /// Returns exactly `count` bytes.
    pub fn read(&mut self, count: usize) -> Vec<u8> {
        let mut out = vec![0u8; count];
        self.fill(&mut out);
        out
    }

    /// Fills `dest` from the remaining input, then from the fallback stream.
    pub fn fill(&mut self, dest: &mut [u8]) {
        let real = self.take_real(dest.len());
        let (head, tail) = dest.split_at_mut(real.len());
        head.copy_from_slice(real);
        if !tail.is_empty() {
            self.fallback.fill(tail);
        }
    }

    /// Next 64-bit draw.
    ///
    /// While input remains this consumes up to 8 real bytes (a short tail is
    /// zero-padded) and reads them big-endian. Afterwards it draws 64 bits from the
    /// fallback generator.
    pub fn next_uint64(&mut self) -> u64 {
        if self.is_exhausted() {
            return self.fallback.next_u64();
        }
        let mut word = [0u8; 8];
        let real = self.take_real(word.len());
        word[..real.len()].copy_from_slice(real);
        u64::from_be_bytes(word)
    }

    /// A non-negative 63-bit draw.
    pub fn int63(&mut self) -> i64 {
        (self.next_uint64() >> 1) as i64
    }

    /// Decodes one code point, returning it with the number of bytes consumed.
    ///
    /// While any real byte remains the code point is decoded from the input alone
    /// (a sequence truncated by the end of input decodes to U+FFFD); otherwise it
    /// is decoded from the fallback stream.
    pub fn read_char(&mut self) -> (char, usize) {
        if self.is_exhausted() {
            return self.fallback.read_char();
        }
        let (decoded, size) = decode_char(&self.data[self.cursor..]);
        self.take_real(size);
        (decoded, size)
    }

    /// Replaces the fallback generator with one seeded from `seed` and abandons the
    /// rest of the input for good.
    pub fn reseed(&mut self, seed: i64) {
        log::trace!(
            "reseeding fallback with {:#018x}, dropping {} unread input bytes",
            seed,
            self.remaining()
        );
        self.seed = seed;
        self.fallback = FallbackStream::new(seed);
        self.cursor = self.data.len();
    }

    fn take_real(&mut self, count: usize) -> &'a [u8] {
        let data = self.data;
        let start = self.cursor;
        let end = start + count.min(self.remaining());
        self.cursor = end;
        if start < end && end == data.len() {
            log::trace!("input exhausted after {} bytes, continuing from fallback", end);
        }
        &data[start..end]
    }
}

/// Big-endian seed from the first [`SEED_LEN`] bytes, zero-padded on the right.
fn derive_seed(data: &[u8]) -> i64 {
    let mut word = [0u8; SEED_LEN];
    let head = &data[..data.len().min(SEED_LEN)];
    word[..head.len()].copy_from_slice(head);
    i64::from_be_bytes(word)
}

impl RngCore for ByteSource<'_> {
    fn next_u32(&mut self) -> u32 {
        (self.next_uint64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.next_uint64()
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        self.fill(dst)
    }
}

impl io::Read for ByteSource<'_> {
    /// Always fills `buf` completely and never fails.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.fill(buf);
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::io::Read;

    const SEED_BYTES: [u8; 8] = [0, 0, 0, 0, 0, 0, 0, 1];

    /// First bytes of the fallback stream for seed 1.
    const SEED_ONE_STREAM: [u8; 12] = [
        0xb1, 0x0d, 0xa4, 0x8c, 0xea, 0x4c, 0x09, 0x67, 0x6b, 0x8e, 0x0e, 0xfc,
    ];

    fn consuming(payload: &[u8]) -> Vec<u8> {
        let mut data = SEED_BYTES.to_vec();
        data.extend_from_slice(payload);
        data
    }

    fn consume_config() -> SourceConfig {
        SourceConfig {
            seed_mode: SeedMode::Consume,
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(ByteSource::new(&[]).unwrap_err(), SourceError::InvalidInput);
        assert_eq!(
            ByteSource::with_config(&[], &consume_config()).unwrap_err(),
            SourceError::InvalidInput
        );
    }

    #[test]
    fn seed_is_big_endian_and_zero_padded() {
        assert_eq!(ByteSource::new(&SEED_BYTES).unwrap().seed(), 1);
        assert_eq!(
            ByteSource::new(&[1, 2, 3]).unwrap().seed(),
            0x0102_0300_0000_0000
        );
        assert_eq!(ByteSource::new(&[0xff; 12]).unwrap().seed(), -1);
    }

    #[test]
    fn peek_mode_reads_from_byte_zero() {
        let data = consuming(&[9]);
        let mut source = ByteSource::new(&data).unwrap();
        assert_eq!(source.position(), 0);
        assert_eq!(source.read(9), data);
        assert!(source.is_exhausted());
    }

    #[test]
    fn consume_mode_sets_seed_bytes_aside() {
        let data = consuming(&[9, 10]);
        let mut source = ByteSource::with_config(&data, &consume_config()).unwrap();
        assert_eq!(source.position(), 8);
        assert_eq!(source.read(1), vec![9]);
        assert_eq!(source.read(1), vec![10]);
        assert_eq!(source.read(1), vec![SEED_ONE_STREAM[0]]);
    }

    #[test]
    fn consume_mode_with_short_input_starts_exhausted() {
        let source = ByteSource::with_config(&[1, 2, 3], &consume_config()).unwrap();
        assert!(source.is_exhausted());
        assert_eq!(source.position(), 3);
    }

    #[test]
    fn exhaustion_switches_to_fallback() {
        let data = [4u8, 5, 6, 7, 8, 9, 10, 11, 12, 13];
        let mut source = ByteSource::new(&data).unwrap();
        let served: Vec<u8> = (0..data.len()).map(|_| source.read(1)[0]).collect();
        assert_eq!(served, data);

        let mut reference = FallbackStream::new(source.seed());
        let mut expected = [0u8; 1];
        reference.fill(&mut expected);
        assert_eq!(source.read(1), expected.to_vec());
        assert_eq!(source.fallback_drawn(), 1);
    }

    #[test]
    fn straddling_read_joins_real_and_fallback_bytes() {
        let data = consuming(&[9]);
        let mut source = ByteSource::with_config(&data, &consume_config()).unwrap();
        assert_eq!(source.read(2), vec![9, SEED_ONE_STREAM[0]]);

        let data = [1u8, 2, 3];
        let mut source = ByteSource::new(&data).unwrap();
        let mut direct = source.clone();
        direct.reseed(source.seed());
        let head = source.read(6);
        assert_eq!(&head[..3], &data);
        assert_eq!(head[3..].to_vec(), direct.read(3));
    }

    #[test]
    fn next_uint64_reads_real_bytes_big_endian() {
        let data = [0u8, 0, 0, 0, 0, 0, 2, 3, 0xaa];
        let mut source = ByteSource::new(&data).unwrap();
        assert_eq!(source.next_uint64(), 515);
        // A one-byte tail is zero-padded rather than topped up from the fallback.
        assert_eq!(source.next_uint64(), 0xaa00_0000_0000_0000);
        assert!(source.is_exhausted());
        assert_eq!(source.fallback_drawn(), 0);
    }

    #[test]
    fn next_uint64_after_exhaustion_draws_from_fallback() {
        let mut source = ByteSource::with_config(&SEED_BYTES, &consume_config()).unwrap();
        assert_eq!(source.next_uint64(), 7424550030962593201);
        assert_eq!(source.next_uint64(), 1482817706323250795);
    }

    #[test]
    fn int63_is_never_negative() {
        let mut source = ByteSource::new(&[0xff; 16]).unwrap();
        for _ in 0..32 {
            assert!(source.int63() >= 0);
        }
    }

    #[test]
    fn reseed_abandons_input_for_good() {
        let data = [1u8, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        let mut source = ByteSource::new(&data).unwrap();
        assert_eq!(source.read(2), vec![1, 2]);
        source.reseed(1);
        assert!(source.is_exhausted());
        assert_eq!(source.seed(), 1);
        assert_eq!(source.read(3), SEED_ONE_STREAM[..3].to_vec());
        source.reseed(1);
        assert_eq!(source.read(3), SEED_ONE_STREAM[..3].to_vec());
    }

    #[test]
    fn read_char_never_mixes_sources() {
        // A lead byte of a 2-byte sequence as the final input byte.
        let data = [b'a', 0xc3];
        let mut source = ByteSource::new(&data).unwrap();
        assert_eq!(source.read_char(), ('a', 1));
        assert_eq!(source.read_char(), (char::REPLACEMENT_CHARACTER, 1));
        assert!(source.is_exhausted());
        // 0xb1 heads the fallback stream for this seed and is not a valid lead byte.
        let mut fresh = ByteSource::with_config(&SEED_BYTES, &consume_config()).unwrap();
        assert_eq!(fresh.read_char(), (char::REPLACEMENT_CHARACTER, 1));
        assert_eq!(fresh.read(1), vec![SEED_ONE_STREAM[1]]);
    }

    #[test]
    fn works_as_a_rand_source() {
        let data = [0x80u8, 0, 0, 0, 0, 0, 0, 0, 7];
        let mut source = ByteSource::new(&data).unwrap();
        assert_eq!(source.next_u32(), 0x8000_0000);
        let picked = source.random_range(0..10u32);
        assert!(picked < 10);
        assert!(source.is_exhausted());
    }

    #[test]
    fn io_read_always_fills_the_buffer() {
        let mut source = ByteSource::new(&[1, 2]).unwrap();
        let mut buf = [0u8; 5];
        assert_eq!(Read::read(&mut source, &mut buf).unwrap(), 5);
        assert_eq!(&buf[..2], &[1, 2]);
    }
}
