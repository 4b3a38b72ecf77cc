//! Ordered accessor plans for replaying a saved input.
//!
//! A plan names the sequence of accessor calls a fuzz target makes, e.g.
//! `int64,bool,text:4`. Applying it to a [`ValueGenerator`] reproduces the values
//! the target saw for a given blob.

use crate::generator::ValueGenerator;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest length accepted by `bytes:K` and `text:N`.
pub const MAX_ACCESSOR_LEN: usize = 1 << 20;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Unknown accessor '{0}'")]
    UnknownAccessor(String),
    #[error("Accessor '{0}' requires a length, e.g. '{0}:4'")]
    MissingLength(String),
    #[error("Accessor '{0}' does not take a length")]
    UnexpectedLength(String),
    #[error("Invalid length '{length}' for accessor '{name}' (at most {max})", max = MAX_ACCESSOR_LEN)]
    InvalidLength { name: String, length: String },
}

/// A single accessor call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessor {
    Bytes(usize),
    Uint64,
    Int64,
    Int63,
    Uint32,
    Int32,
    Int31,
    Uint,
    Int,
    Bool,
    Rune,
    Text(usize),
    SignedInt,
    SignedInt64,
    /// The byte source's own 64-bit draw rather than a typed accessor.
    RawUint64,
}

impl Accessor {
    fn name(&self) -> &'static str {
        match self {
            Accessor::Bytes(_) => "bytes",
            Accessor::Uint64 => "uint64",
            Accessor::Int64 => "int64",
            Accessor::Int63 => "int63",
            Accessor::Uint32 => "uint32",
            Accessor::Int32 => "int32",
            Accessor::Int31 => "int31",
            Accessor::Uint => "uint",
            Accessor::Int => "int",
            Accessor::Bool => "bool",
            Accessor::Rune => "rune",
            Accessor::Text(_) => "text",
            Accessor::SignedInt => "signed-int",
            Accessor::SignedInt64 => "signed-int64",
            Accessor::RawUint64 => "uint64-raw",
        }
    }

    pub fn apply(&self, values: &mut ValueGenerator<'_>) -> DecodedValue {
        match *self {
            Accessor::Bytes(count) => DecodedValue::Bytes(values.bytes(count)),
            Accessor::Uint64 => DecodedValue::Unsigned(values.uint64()),
            Accessor::Int64 => DecodedValue::Signed(values.int64()),
            Accessor::Int63 => DecodedValue::Signed(values.int63()),
            Accessor::Uint32 => DecodedValue::Unsigned(values.uint32().into()),
            Accessor::Int32 => DecodedValue::Signed(values.int32().into()),
            Accessor::Int31 => DecodedValue::Signed(values.int31().into()),
            Accessor::Uint => DecodedValue::Unsigned(values.uint() as u64),
            Accessor::Int => DecodedValue::Signed(values.int() as i64),
            Accessor::Bool => DecodedValue::Bool(values.bool()),
            Accessor::Rune => {
                let (rune, size) = values.read_rune();
                DecodedValue::Rune { rune, size }
            }
            Accessor::Text(count) => DecodedValue::Text(values.text(count)),
            Accessor::SignedInt => DecodedValue::Signed(values.signed_int() as i64),
            Accessor::SignedInt64 => DecodedValue::Signed(values.signed_int64()),
            Accessor::RawUint64 => DecodedValue::Unsigned(values.source_mut().next_uint64()),
        }
    }
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Bytes(len) | Accessor::Text(len) => write!(f, "{}:{}", self.name(), len),
            _ => f.write_str(self.name()),
        }
    }
}

impl FromStr for Accessor {
    type Err = PlanError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let token = token.trim();
        let (name, length) = match token.split_once(':') {
            Some((name, length)) => (name.trim(), Some(length.trim())),
            None => (token, None),
        };

        let parse_length = || -> Result<usize, PlanError> {
            let raw = length.ok_or_else(|| PlanError::MissingLength(name.to_string()))?;
            raw.parse::<usize>()
                .ok()
                .filter(|len| *len <= MAX_ACCESSOR_LEN)
                .ok_or_else(|| PlanError::InvalidLength {
                    name: name.to_string(),
                    length: raw.to_string(),
                })
        };

        let accessor = match name {
            "bytes" => return Ok(Accessor::Bytes(parse_length()?)),
            "text" | "string" => return Ok(Accessor::Text(parse_length()?)),
            "uint64" => Accessor::Uint64,
            "int64" => Accessor::Int64,
            "int63" => Accessor::Int63,
            "uint32" => Accessor::Uint32,
            "int32" => Accessor::Int32,
            "int31" => Accessor::Int31,
            "uint" => Accessor::Uint,
            "int" => Accessor::Int,
            "bool" => Accessor::Bool,
            "rune" => Accessor::Rune,
            "signed-int" => Accessor::SignedInt,
            "signed-int64" => Accessor::SignedInt64,
            "uint64-raw" => Accessor::RawUint64,
            _ => return Err(PlanError::UnknownAccessor(name.to_string())),
        };
        if length.is_some() {
            return Err(PlanError::UnexpectedLength(name.to_string()));
        }
        Ok(accessor)
    }
}

/// Parses accessor tokens; each token may itself be a comma-separated list.
pub fn parse_plan<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<Accessor>, PlanError> {
    tokens
        .iter()
        .flat_map(|token| token.as_ref().split(','))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::parse)
        .collect()
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "value")]
pub enum DecodedValue {
    Bytes(Vec<u8>),
    Unsigned(u64),
    Signed(i64),
    Bool(bool),
    Rune { rune: char, size: usize },
    Text(String),
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedValue::Bytes(bytes) => {
                f.write_str("0x")?;
                for byte in bytes {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            DecodedValue::Unsigned(value) => write!(f, "{value}"),
            DecodedValue::Signed(value) => write!(f, "{value}"),
            DecodedValue::Bool(value) => write!(f, "{value}"),
            DecodedValue::Rune { rune, size } => {
                write!(f, "{:?} (U+{:04X}, {} bytes)", rune, *rune as u32, size)
            }
            DecodedValue::Text(text) => write!(f, "{text:?}"),
        }
    }
}

/// One decoded value together with the accessor that produced it.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DecodedEntry {
    pub accessor: String,
    #[serde(flatten)]
    pub value: DecodedValue,
}

/// Runs `plan` against `values` in order.
pub fn decode_plan(values: &mut ValueGenerator<'_>, plan: &[Accessor]) -> Vec<DecodedEntry> {
    plan.iter()
        .map(|accessor| DecodedEntry {
            accessor: accessor.to_string(),
            value: accessor.apply(values),
        })
        .collect()
}
