//! Deterministic typed values from fuzzer-supplied bytes.
//!
//! [`ValueGenerator`] turns a raw input blob into integers, booleans, code points
//! and byte slices. Values are read straight from the blob while it lasts and from
//! a ChaCha8 stream seeded by the blob's first 8 bytes afterwards, so a target can
//! ask for as many values as it likes and the same blob always replays the same
//! run.
//!
//! ```
//! use fuzzbytes_core::{Rng, ValueGenerator};
//!
//! fn fuzz_target(data: &[u8]) {
//!     let Ok(mut values) = ValueGenerator::new(data) else {
//!         return;
//!     };
//!     let count = values.uint32() % 16;
//!     let label = values.text(count as usize);
//!     let ratio: f64 = values.source_mut().random();
//!     assert!(label.chars().count() == count as usize);
//!     assert!((0.0..1.0).contains(&ratio));
//! }
//!
//! fuzz_target(b"\x00\x00\x00\x03abc");
//! ```

pub mod byte_source;
pub mod config;
pub mod fallback;
pub mod generator;
pub mod plan;

pub use byte_source::{ByteSource, SEED_LEN, SeedMode, SourceError};
pub use config::{DecodeSettings, FuzzBytesConfig, OutputFormat, SourceConfig};
pub use fallback::FallbackStream;
pub use generator::ValueGenerator;
pub use plan::{Accessor, DecodedEntry, DecodedValue, PlanError, decode_plan, parse_plan};
pub use rand::Rng;
pub use rand_core::RngCore;
