use crate::byte_source::{ByteSource, SourceError};
use crate::config::SourceConfig;
use std::io;

/// Typed, fixed-width decoders over a [`ByteSource`].
///
/// Every accessor consumes a fixed number of bytes no matter which value comes
/// out, and multi-byte values are assembled big-endian. Identical input blobs
/// therefore always produce identical value sequences, and flipping an input byte
/// perturbs exactly the value that byte was decoded into.
///
/// Accessors advance the shared cursor: calling the same accessor twice yields the
/// next value in the stream, not the same one.
///
/// ```
/// use fuzzbytes_core::ValueGenerator;
///
/// let mut values = ValueGenerator::new(&[0, 0, 0, 0, 0, 0, 2, 3, 1]).unwrap();
/// assert_eq!(values.int(), 515);
/// assert!(values.bool());
/// ```
#[derive(Debug, Clone)]
pub struct ValueGenerator<'a> {
    source: ByteSource<'a>,
}

impl<'a> ValueGenerator<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self, SourceError> {
        Ok(Self::from_source(ByteSource::new(data)?))
    }

    pub fn with_config(data: &'a [u8], config: &SourceConfig) -> Result<Self, SourceError> {
        Ok(Self::from_source(ByteSource::with_config(data, config)?))
    }

    pub fn from_source(source: ByteSource<'a>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &ByteSource<'a> {
        &self.source
    }

    /// Mutable access to the underlying source, e.g. to drive `rand::Rng` helpers
    /// or to [`reseed`](ByteSource::reseed) it.
    pub fn source_mut(&mut self) -> &mut ByteSource<'a> {
        &mut self.source
    }

    pub fn into_source(self) -> ByteSource<'a> {
        self.source
    }

    /// Consumes `count` bytes and returns them unchanged.
    pub fn bytes(&mut self, count: usize) -> Vec<u8> {
        self.source.read(count)
    }

    fn array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        self.source.fill(&mut out);
        out
    }

    /// Consumes 8 bytes.
    pub fn uint64(&mut self) -> u64 {
        u64::from_be_bytes(self.array())
    }

    /// Consumes 8 bytes.
    pub fn int64(&mut self) -> i64 {
        self.uint64() as i64
    }

    /// Consumes 8 bytes; the result is in `[0, 1 << 63)`.
    pub fn int63(&mut self) -> i64 {
        (self.uint64() >> 1) as i64
    }

    /// Consumes 4 bytes.
    pub fn uint32(&mut self) -> u32 {
        u32::from_be_bytes(self.array())
    }

    /// Consumes 4 bytes.
    pub fn int32(&mut self) -> i32 {
        self.uint32() as i32
    }

    /// Consumes 4 bytes; the result is in `[0, 1 << 31)`.
    pub fn int31(&mut self) -> i32 {
        (self.uint32() >> 1) as i32
    }

    /// Consumes 8 bytes regardless of the platform's pointer width.
    pub fn uint(&mut self) -> usize {
        self.uint64() as usize
    }

    /// Consumes 8 bytes regardless of the platform's pointer width.
    pub fn int(&mut self) -> isize {
        self.int64() as isize
    }

    /// Consumes 1 byte; true when its low bit is set.
    pub fn bool(&mut self) -> bool {
        let [byte] = self.array::<1>();
        byte & 1 == 1
    }

    /// Decodes a single code point and reports how many bytes it took (1 to 4).
    pub fn read_rune(&mut self) -> (char, usize) {
        self.source.read_char()
    }

    pub fn rune(&mut self) -> char {
        self.read_rune().0
    }

    /// Decodes `count` code points.
    pub fn text(&mut self, count: usize) -> String {
        (0..count).map(|_| self.rune()).collect()
    }

    /// Consumes 9 bytes: an [`int64`](Self::int64) magnitude followed by a sign
    /// byte whose low bit selects negation. Negation wraps, so `i64::MIN` stays put.
    pub fn signed_int64(&mut self) -> i64 {
        let magnitude = self.int64();
        if self.bool() {
            magnitude.wrapping_neg()
        } else {
            magnitude
        }
    }

    /// Platform-width form of [`signed_int64`](Self::signed_int64); consumes 9 bytes.
    pub fn signed_int(&mut self) -> isize {
        self.signed_int64() as isize
    }
}

impl io::Read for ValueGenerator<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut self.source, buf)
    }
}
