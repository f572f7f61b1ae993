use anyhow::{anyhow, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use packed_struct::prelude::*;
use std::io::Write;

use crate::error::FhftError;
use crate::fhft::chunk::{Chunk, FourCC, List};

/// Format version written into FTMT.
pub const FORMAT_VERSION: u16 = 2;
/// Oldest FTMT version the reader accepts.
pub const MIN_READ_VERSION: u16 = 2;
/// Each glyph column is a single `u16`.
pub const MAX_GLYPH_HEIGHT: u16 = 16;
pub const MAX_GLYPH_WIDTH: u16 = 16;

pub const FHFT: FourCC = FourCC::new(b"FHFT");
pub const CMAP: FourCC = FourCC::new(b"CMAP");
pub const GLYF: FourCC = FourCC::new(b"GLYF");
pub const SPLI: FourCC = FourCC::new(b"SPLI");

/// Number of bytes used to store a codepoint in a CMAP table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum CodepointWidth {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
}

impl CodepointWidth {
    pub const ALL: [CodepointWidth; 4] = [
        CodepointWidth::One, CodepointWidth::Two, CodepointWidth::Three, CodepointWidth::Four
    ];

    /// Minimal width holding `codepoint`: max(1, ceil(bit_length / 8)).
    pub fn of(codepoint: u32) -> Self {
        let bits = u32::BITS - codepoint.leading_zeros();
        match ((bits + 7) / 8).max(1) {
            1 => CodepointWidth::One,
            2 => CodepointWidth::Two,
            3 => CodepointWidth::Three,
            _ => CodepointWidth::Four,
        }
    }

    pub fn bytes(self) -> usize {
        u8::from(self) as usize
    }

    /// Size of one table entry: codepoint plus 16-bit glyph id.
    pub fn item_size(self) -> usize {
        self.bytes() + 2
    }

    pub fn table_id(self) -> FourCC {
        FourCC::new(&[b'C', b'M', b'0' + u8::from(self), b'B'])
    }

    pub fn from_table_id(id: FourCC) -> Option<Self> {
        match id.as_bytes() {
            [b'C', b'M', n, b'B'] if n.is_ascii_digit() => CodepointWidth::try_from(n - b'0').ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontMetadata {
    pub version: u16,
    pub name: String,
}

impl FontMetadata {
    pub const ID: FourCC = FourCC::new(b"FTMT");

    pub fn new(name: &str) -> Self {
        FontMetadata{ version: FORMAT_VERSION, name: name.to_string() }
    }

    pub fn payload(&self) -> Result<Vec<u8>> {
        let name = self.name.as_bytes();
        let name_len = u16::try_from(name.len()).map_err(|_| FhftError::NameTooLong(name.len()))?;
        let mut out = Vec::with_capacity(4 + name.len());
        out.write_u16::<LittleEndian>(self.version)?;
        out.write_u16::<LittleEndian>(name_len)?;
        out.write_all(name)?;
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmapItem {
    pub codepoint: u32,
    pub glyph_id: u16,
}

impl CmapItem {
    pub fn new(codepoint: u32, glyph_id: u16) -> Self {
        CmapItem{ codepoint, glyph_id }
    }

    pub fn width(&self) -> CodepointWidth {
        CodepointWidth::of(self.codepoint)
    }
}

/// One `CM<N>B` table; all items share the table's codepoint width.
#[derive(Debug, Clone, PartialEq)]
pub struct CmapTable {
    pub width: CodepointWidth,
    items: Vec<CmapItem>,
}

impl CmapTable {
    pub fn new(width: CodepointWidth) -> Self {
        CmapTable{ width, items: Vec::new() }
    }

    pub fn id(&self) -> FourCC {
        self.width.table_id()
    }

    pub fn items(&self) -> &[CmapItem] {
        &self.items
    }

    pub fn push(&mut self, item: CmapItem) -> Result<()> {
        if item.width() != self.width {
            return Err(FhftError::WidthMismatch{ table: self.id(), codepoint: item.codepoint }.into());
        }
        self.items.push(item);
        Ok(())
    }

    pub fn payload(&self) -> Result<Vec<u8>> {
        // Refuse the whole table before encoding anything
        if let Some(bad) = self.items.iter().find(|item| item.width() != self.width) {
            return Err(FhftError::WidthMismatch{ table: self.id(), codepoint: bad.codepoint }.into());
        }
        let mut out = Vec::with_capacity(self.items.len() * self.width.item_size());
        for item in &self.items {
            out.write_uint::<LittleEndian>(item.codepoint as u64, self.width.bytes())?;
            out.write_u16::<LittleEndian>(item.glyph_id)?;
        }
        Ok(out)
    }
}

/// The four codepoint tables, in ascending width order.
#[derive(Debug, Clone, PartialEq)]
pub struct Cmap {
    pub tables: [CmapTable; 4],
}

impl Cmap {
    pub fn new() -> Self {
        Cmap{ tables: CodepointWidth::ALL.map(CmapTable::new) }
    }

    /// Sorts `items` by codepoint and buckets each one by its minimal width.
    pub fn from_items(mut items: Vec<CmapItem>) -> Result<Self> {
        items.sort_by_key(|item| item.codepoint);
        let mut cmap = Cmap::new();
        for item in items {
            cmap.table_mut(item.width()).push(item)?;
        }
        Ok(cmap)
    }

    pub fn table(&self, width: CodepointWidth) -> &CmapTable {
        &self.tables[width.bytes() - 1]
    }

    pub fn table_mut(&mut self, width: CodepointWidth) -> &mut CmapTable {
        &mut self.tables[width.bytes() - 1]
    }

    pub fn len(&self) -> usize {
        self.tables.iter().map(|t| t.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_chunk(self) -> Chunk {
        let children = self.tables.into_iter().map(Chunk::CmapTable).collect();
        List::new(CMAP, children).into()
    }
}

impl Default for Cmap {
    fn default() -> Self {
        Cmap::new()
    }
}

#[derive(PackedStruct, Debug, Clone, Copy, PartialEq, Eq)]
#[packed_struct(endian="lsb")]
pub struct GlyphMetadata {
    pub max_width: u16,
    pub height: u16,
}

impl GlyphMetadata {
    pub const ID: FourCC = FourCC::new(b"GLMT");

    pub fn payload(&self) -> Result<Vec<u8>> {
        let packed = self.pack().map_err(|e| anyhow!("cannot pack GLMT: {:?}", e))?;
        Ok(packed.to_vec())
    }
}

/// Fixed header in front of the column data of a GLSP chunk.
#[derive(PackedStruct, Debug, Clone, Copy, PartialEq, Eq)]
#[packed_struct(endian="lsb")]
pub struct ShapeHeader {
    pub first_gid: u16,
    pub last_gid: u16,
    pub width: u16,
}

pub const SHAPE_HEADER_SIZE: usize = 6;

/// A run of glyphs with identical width and consecutive ids.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphShape {
    pub first_gid: u16,
    pub last_gid: u16,
    pub width: u16,
    pub columns: Vec<u16>,
}

impl GlyphShape {
    pub const ID: FourCC = FourCC::new(b"GLSP");

    pub fn glyph_count(&self) -> usize {
        (self.last_gid as usize + 1).saturating_sub(self.first_gid as usize)
    }

    pub fn contains(&self, gid: u16) -> bool {
        (self.first_gid..=self.last_gid).contains(&gid)
    }

    /// Columns of glyph `gid`, which must lie within this shape.
    pub fn glyph_columns(&self, gid: u16) -> Option<&[u16]> {
        if !self.contains(gid) {
            return None;
        }
        let width = self.width as usize;
        let start = (gid - self.first_gid) as usize * width;
        self.columns.get(start..start + width)
    }

    pub fn payload(&self) -> Result<Vec<u8>> {
        if self.last_gid < self.first_gid {
            return Err(FhftError::Malformed(format!("shape range {}..={} is empty", self.first_gid, self.last_gid)).into());
        }
        let expected = self.glyph_count() * self.width as usize;
        if self.columns.len() != expected {
            return Err(FhftError::Malformed(format!("shape {}..={} has {} columns, expected {}",
                self.first_gid, self.last_gid, self.columns.len(), expected)).into());
        }
        let header = ShapeHeader{ first_gid: self.first_gid, last_gid: self.last_gid, width: self.width };
        let header = header.pack().map_err(|e| anyhow!("cannot pack GLSP header: {:?}", e))?;
        let mut out = Vec::with_capacity(SHAPE_HEADER_SIZE + self.columns.len() * 2);
        out.write_all(&header)?;
        for column in &self.columns {
            out.write_u16::<LittleEndian>(*column)?;
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlyphList {
    pub metadata: GlyphMetadata,
    pub shapes: Vec<GlyphShape>,
}

impl GlyphList {
    pub fn into_chunk(self) -> Chunk {
        let shapes = self.shapes.into_iter().map(Chunk::GlyphShape).collect();
        List::new(GLYF, vec![
            Chunk::GlyphMetadata(self.metadata),
            List::new(SPLI, shapes).into(),
        ]).into()
    }
}

/// Root document: `RIFF` / `FHFT` with metadata, cmap and glyphs, in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedHeightFont {
    pub metadata: FontMetadata,
    pub cmap: Cmap,
    pub glyphs: GlyphList,
}

impl FixedHeightFont {
    pub fn into_chunk(self) -> Chunk {
        List::riff(FHFT, vec![
            Chunk::FontMetadata(self.metadata),
            self.cmap.into_chunk(),
            self.glyphs.into_chunk(),
        ]).into()
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        self.clone().into_chunk().serialize()
    }
}
