use byteorder::{LittleEndian, WriteBytesExt};
use anyhow::Result;
use std::fmt;
use std::fmt::Formatter;
use std::io::Write;

use crate::error::FhftError;
use crate::fhft::schema::{CmapTable, FontMetadata, GlyphMetadata, GlyphShape};

/// Four byte chunk identifier, stored as raw bytes.
#[derive(PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct FourCC([u8; 4]);

impl FourCC {
    pub const fn new(id: &[u8; 4]) -> Self {
        FourCC(*id)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl TryFrom<&[u8]> for FourCC {
    type Error = FhftError;

    fn try_from(value: &[u8]) -> std::result::Result<Self, Self::Error> {
        let id: [u8; 4] = value.try_into().map_err(|_| FhftError::BadFourCC(value.to_vec()))?;
        Ok(FourCC(id))
    }
}

impl TryFrom<&str> for FourCC {
    type Error = FhftError;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        FourCC::try_from(value.as_bytes())
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            let ch = if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' };
            write!(f, "{}", ch)?;
        }
        Ok(())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "FourCC({})", self)
    }
}

pub const RIFF: FourCC = FourCC::new(b"RIFF");
pub const LIST: FourCC = FourCC::new(b"LIST");

/// Size of the id and length fields preceding every payload.
pub const HEADER_SIZE: usize = 8;

/// A list chunk: `id` is `RIFF` for the root and `LIST` everywhere else.
#[derive(Debug, Clone, PartialEq)]
pub struct List {
    pub id: FourCC,
    pub list_type: FourCC,
    pub children: Vec<Chunk>,
}

impl List {
    pub fn new(list_type: FourCC, children: Vec<Chunk>) -> Self {
        List{ id: LIST, list_type, children }
    }

    pub fn riff(form_type: FourCC, children: Vec<Chunk>) -> Self {
        List{ id: RIFF, list_type: form_type, children }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    FontMetadata(FontMetadata),
    CmapTable(CmapTable),
    GlyphMetadata(GlyphMetadata),
    GlyphShape(GlyphShape),
    Raw { id: FourCC, data: Vec<u8> },
    List(List),
}

impl Chunk {
    pub fn id(&self) -> FourCC {
        match self {
            Chunk::FontMetadata(_) => { FontMetadata::ID },
            Chunk::CmapTable(table) => { table.id() },
            Chunk::GlyphMetadata(_) => { GlyphMetadata::ID },
            Chunk::GlyphShape(_) => { GlyphShape::ID },
            Chunk::Raw{ id, .. } => { *id },
            Chunk::List(list) => { list.id },
        }
    }

    /// Encodes the payload, without header and pad byte.
    pub fn payload(&self) -> Result<Vec<u8>> {
        match self {
            Chunk::FontMetadata(meta) => { meta.payload() },
            Chunk::CmapTable(table) => { table.payload() },
            Chunk::GlyphMetadata(meta) => { meta.payload() },
            Chunk::GlyphShape(shape) => { shape.payload() },
            Chunk::Raw{ data, .. } => { Ok(data.clone()) },
            Chunk::List(list) => {
                let mut out = Vec::new();
                out.extend_from_slice(list.list_type.as_bytes());
                for child in &list.children {
                    child.write_to(&mut out)?;
                }
                Ok(out)
            },
        }
    }

    /// Encodes the complete chunk: id, length, payload and pad byte.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let payload = self.payload()?;
        encode_chunk(self.id(), &payload)
    }

    /// Serializes into memory first so nothing reaches `out` on failure.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        let bytes = self.serialize()?;
        out.write_all(&bytes)?;
        Ok(())
    }
}

impl From<List> for Chunk {
    fn from(list: List) -> Self {
        Chunk::List(list)
    }
}

pub fn padded_len(len: usize) -> usize {
    len + (len & 1)
}

/// Returns the value of the length field for a payload of `len` bytes.
pub fn check_length(id: FourCC, len: usize) -> Result<u32, FhftError> {
    u32::try_from(len).map_err(|_| FhftError::LengthOverflow{ id, len })
}

pub fn encode_chunk(id: FourCC, payload: &[u8]) -> Result<Vec<u8>> {
    let len = check_length(id, payload.len())?;
    let mut out = Vec::with_capacity(HEADER_SIZE + padded_len(payload.len()));
    out.write_all(id.as_bytes())?;
    out.write_u32::<LittleEndian>(len)?;
    out.write_all(payload)?;
    if payload.len() % 2 == 1 {
        out.write_u8(0)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TEST: FourCC = FourCC::new(b"TEST");

    #[test]
    fn fourcc_must_be_four_bytes() {
        assert_eq!(FourCC::try_from("CM1B").unwrap(), FourCC::new(b"CM1B"));
        assert_eq!(FourCC::try_from("CM1"), Err(FhftError::BadFourCC(b"CM1".to_vec())));
        assert_eq!(FourCC::try_from("CM1BX"), Err(FhftError::BadFourCC(b"CM1BX".to_vec())));
        assert_eq!(FourCC::new(b"GL\0P").to_string(), "GL?P");
    }

    #[test]
    fn even_payload_has_no_pad() {
        let bytes = encode_chunk(TEST, &[1, 2]).unwrap();
        assert_eq!(bytes, vec![b'T', b'E', b'S', b'T', 2, 0, 0, 0, 1, 2]);
    }

    #[test]
    fn odd_payload_is_padded_but_length_is_not() {
        let bytes = encode_chunk(TEST, &[1, 2, 3]).unwrap();
        assert_eq!(bytes, vec![b'T', b'E', b'S', b'T', 3, 0, 0, 0, 1, 2, 3, 0]);
        assert_eq!(bytes.len(), HEADER_SIZE + padded_len(3));
    }

    #[test]
    fn empty_list_is_just_its_type() {
        let list = Chunk::from(List::new(FourCC::new(b"SPLI"), Vec::new()));
        assert_eq!(list.serialize().unwrap(), b"LIST\x04\x00\x00\x00SPLI".to_vec());
    }

    #[test]
    fn list_length_counts_child_padding() {
        let list = Chunk::from(List::riff(FourCC::new(b"FHFT"), vec![
            Chunk::Raw{ id: TEST, data: vec![0xaa] },
            Chunk::Raw{ id: TEST, data: vec![0xbb, 0xcc] },
        ]));
        let bytes = list.serialize().unwrap();
        // type (4) + child 1 (8 + 1 + pad) + child 2 (8 + 2)
        assert_eq!(&bytes[4..8], &24u32.to_le_bytes());
        assert_eq!(bytes.len(), HEADER_SIZE + 24);
        assert_eq!(bytes[HEADER_SIZE + 4 + HEADER_SIZE + 1], 0);
        assert_eq!(&bytes[HEADER_SIZE + 4 + 10..HEADER_SIZE + 4 + 14], b"TEST");
    }

    #[test]
    fn oversized_length_is_rejected() {
        assert_eq!(check_length(TEST, u32::MAX as usize), Ok(u32::MAX));
        assert_eq!(check_length(TEST, u32::MAX as usize + 1),
            Err(FhftError::LengthOverflow{ id: TEST, len: u32::MAX as usize + 1 }));
    }
}
