use std::fmt;
use std::fmt::Formatter;

use crate::fhft::chunk::FourCC;

/// Structural failures of the container format and the conversion pipeline.
///
/// Everything is passed around as `anyhow::Error`; callers that need to tell
/// these apart use `downcast_ref::<FhftError>()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FhftError {
    BadFourCC(Vec<u8>),
    LengthOverflow { id: FourCC, len: usize },
    NameTooLong(usize),
    WidthMismatch { table: FourCC, codepoint: u32 },
    NoStrikes,
    NonFixedHeight(Vec<u16>),
    GlyphTooLarge { name: String, width: u16, height: u16 },
    TooManyGlyphs(usize),
    Truncated { what: String, need: usize, have: usize },
    Malformed(String),
    UnsupportedVersion(u16),
    MissingChunk(FourCC),
}

impl fmt::Display for FhftError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FhftError::BadFourCC(bytes) => { write!(f, "chunk id must be exactly 4 bytes, got {} ({:02x?})", bytes.len(), bytes) },
            FhftError::LengthOverflow{ id, len } => { write!(f, "chunk {} payload of {} bytes does not fit a 32-bit length", id, len) },
            FhftError::NameTooLong(len) => { write!(f, "font name of {} bytes does not fit a 16-bit length", len) },
            FhftError::WidthMismatch{ table, codepoint } => { write!(f, "codepoint 0x{:X} does not belong in table {}", codepoint, table) },
            FhftError::NoStrikes => { write!(f, "font has no embedded bitmap strikes") },
            FhftError::NonFixedHeight(heights) => { write!(f, "non-fixed-height font: strike heights {:?}", heights) },
            FhftError::GlyphTooLarge{ name, width, height } => { write!(f, "glyph '{}' is {}x{}, at most 16x16 is supported", name, width, height) },
            FhftError::TooManyGlyphs(count) => { write!(f, "{} glyphs do not fit 16-bit glyph ids", count) },
            FhftError::Truncated{ what, need, have } => { write!(f, "{} truncated: need {} bytes, have {}", what, need, have) },
            FhftError::Malformed(msg) => { write!(f, "malformed container: {}", msg) },
            FhftError::UnsupportedVersion(v) => { write!(f, "format version {} is older than {}", v, crate::fhft::schema::MIN_READ_VERSION) },
            FhftError::MissingChunk(id) => { write!(f, "{} chunk was not found", id) },
        }
    }
}

impl std::error::Error for FhftError { }
