use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use anyhow::{Context, Result};
use packed_struct::prelude::*;
use std::io::{Cursor, Read, Write};
use std::str;

use crate::error::FhftError;
use crate::fhft::chunk::{Chunk, FourCC, List, HEADER_SIZE, LIST, RIFF};
use crate::fhft::schema::{
    CmapItem, CmapTable, CodepointWidth, FontMetadata, GlyphMetadata, GlyphShape, ShapeHeader,
    FHFT, MAX_GLYPH_HEIGHT, MIN_READ_VERSION, SHAPE_HEADER_SIZE,
};

const INDENT: &str = "  ";
/// FHFT itself nests three lists deep.
pub const MAX_LIST_DEPTH: usize = 8;

/// A chunk as found on disk. `offset` is the position of its id.
#[derive(Debug, Clone, PartialEq)]
pub enum RawChunk {
    Plain { id: FourCC, offset: usize, data: Vec<u8> },
    List { id: FourCC, offset: usize, size: u32, list_type: FourCC, children: Vec<RawChunk> },
}

fn truncated(what: &str, need: usize, have: usize) -> FhftError {
    FhftError::Truncated{ what: what.to_string(), need, have }
}

impl RawChunk {
    /// Parses a single chunk spanning all of `data` (a trailing pad byte is allowed).
    pub fn parse(data: &[u8]) -> Result<RawChunk> {
        let (chunk, end) = Self::parse_at(data, 0, 0)?;
        if end != data.len() {
            return Err(FhftError::Malformed(format!("{} trailing bytes after {}", data.len() - end, chunk.id())).into());
        }
        Ok(chunk)
    }

    /// Parses the chunk at `offset`, returning it and the offset of the next one.
    fn parse_at(data: &[u8], offset: usize, depth: usize) -> Result<(RawChunk, usize)> {
        let header = data.get(offset..offset + HEADER_SIZE)
            .ok_or_else(|| truncated("chunk header", HEADER_SIZE, data.len().saturating_sub(offset)))?;
        let id = FourCC::try_from(&header[0..4])?;
        let size = LittleEndian::read_u32(&header[4..8]);
        let start = offset + HEADER_SIZE;
        let end = start + size as usize;
        let payload = data.get(start..end)
            .ok_or_else(|| truncated(&format!("chunk {} at {}", id, offset), size as usize, data.len() - start))?;
        let mut next = end;
        if size % 2 == 1 {
            if next >= data.len() {
                return Err(truncated(&format!("pad byte of {} at {}", id, offset), 1, 0).into());
            }
            next += 1;
        }

        if id != RIFF && id != LIST {
            return Ok((RawChunk::Plain{ id, offset, data: payload.to_vec() }, next));
        }

        if payload.len() < 4 {
            return Err(FhftError::Malformed(format!("list {} at {} has no type", id, offset)).into());
        }
        if depth >= MAX_LIST_DEPTH {
            return Err(FhftError::Malformed(format!("list {} at {} is nested deeper than {}", id, offset, MAX_LIST_DEPTH)).into());
        }
        let list_type = FourCC::try_from(&payload[0..4])?;
        let mut children = Vec::new();
        let mut pos = start + 4;
        while pos < end {
            let (child, child_next) = Self::parse_at(&data[..end], pos, depth + 1)
                .with_context(|| format!("in {} {} at {}", id, list_type, offset))?;
            children.push(child);
            pos = child_next;
        }
        Ok((RawChunk::List{ id, offset, size, list_type, children }, next))
    }

    pub fn id(&self) -> FourCC {
        match self {
            RawChunk::Plain{ id, .. } => *id,
            RawChunk::List{ id, .. } => *id,
        }
    }

    pub fn offset(&self) -> usize {
        match self {
            RawChunk::Plain{ offset, .. } => *offset,
            RawChunk::List{ offset, .. } => *offset,
        }
    }

    /// Value of the on-disk length field.
    pub fn size(&self) -> u32 {
        match self {
            RawChunk::Plain{ data, .. } => data.len() as u32,
            RawChunk::List{ size, .. } => *size,
        }
    }

    /// Depth-first search for the first plain chunk (or list) with `id`.
    pub fn find(&self, id: FourCC) -> Option<&RawChunk> {
        if self.id() == id {
            return Some(self);
        }
        match self {
            RawChunk::Plain{ .. } => None,
            RawChunk::List{ children, .. } => children.iter().find_map(|c| c.find(id)),
        }
    }

    /// All plain chunks with `id`, in file order.
    pub fn find_all(&self, id: FourCC) -> Vec<&RawChunk> {
        let mut found = Vec::new();
        self.collect(id, &mut found);
        found
    }

    fn collect<'a>(&'a self, id: FourCC, found: &mut Vec<&'a RawChunk>) {
        match self {
            RawChunk::Plain{ id: this, .. } => {
                if *this == id { found.push(self); }
            },
            RawChunk::List{ children, .. } => {
                for child in children {
                    child.collect(id, found);
                }
            },
        }
    }

    pub fn data(&self) -> Option<&[u8]> {
        match self {
            RawChunk::Plain{ data, .. } => Some(data.as_slice()),
            RawChunk::List{ .. } => None,
        }
    }

    /// Prints the chunk tree, one line per chunk.
    pub fn dump<W: Write>(&self, out: &mut W) -> Result<()> {
        match self {
            RawChunk::List{ id, size, list_type, children, .. } if *id == RIFF => {
                writeln!(out, "{} size: {} form: {}", id, size, list_type)?;
                for child in children {
                    child.dump_indented(out, 0)?;
                }
                Ok(())
            },
            _ => self.dump_indented(out, 0),
        }
    }

    fn dump_indented<W: Write>(&self, out: &mut W, indent: usize) -> Result<()> {
        write!(out, "{}- {} size: {} offset: {}", INDENT.repeat(indent), self.id(), self.size(), self.offset())?;
        match self {
            RawChunk::Plain{ .. } => {
                writeln!(out)?;
            },
            RawChunk::List{ list_type, children, .. } => {
                writeln!(out, " type: {}", list_type)?;
                for child in children {
                    child.dump_indented(out, indent + 1)?;
                }
            },
        }
        Ok(())
    }
}

impl From<RawChunk> for Chunk {
    fn from(raw: RawChunk) -> Self {
        match raw {
            RawChunk::Plain{ id, data, .. } => Chunk::Raw{ id, data },
            RawChunk::List{ id, list_type, children, .. } => {
                let children = children.into_iter().map(Chunk::from).collect();
                Chunk::List(List{ id, list_type, children })
            },
        }
    }
}

fn require<'a>(root: &'a RawChunk, id: FourCC) -> Result<&'a [u8]> {
    root.find(id).and_then(|c| c.data()).ok_or_else(|| FhftError::MissingChunk(id).into())
}

fn parse_font_metadata(data: &[u8]) -> Result<FontMetadata> {
    let mut rdr = Cursor::new(data);
    let version = rdr.read_u16::<LittleEndian>().context("FTMT version")?;
    if version < MIN_READ_VERSION {
        return Err(FhftError::UnsupportedVersion(version).into());
    }
    let name_len = rdr.read_u16::<LittleEndian>().context("FTMT name length")? as usize;
    let mut name = vec![ 0u8; name_len ];
    rdr.read_exact(&mut name).map_err(|_| truncated("FTMT name", name_len, data.len().saturating_sub(4)))?;
    let name = str::from_utf8(&name).context("FTMT name is not UTF-8")?;
    Ok(FontMetadata{ version, name: name.to_string() })
}

fn parse_cmap_table(width: CodepointWidth, data: &[u8]) -> Result<CmapTable> {
    let item_size = width.item_size();
    if data.len() % item_size != 0 {
        return Err(FhftError::Malformed(format!("size of {} ({}) is not a multiple of {}",
            width.table_id(), data.len(), item_size)).into());
    }
    let mut table = CmapTable::new(width);
    let mut rdr = Cursor::new(data);
    for _ in 0..data.len() / item_size {
        let codepoint = rdr.read_uint::<LittleEndian>(width.bytes())? as u32;
        let glyph_id = rdr.read_u16::<LittleEndian>()?;
        table.push(CmapItem{ codepoint, glyph_id })?;
    }
    if table.items().windows(2).any(|w| w[0].codepoint >= w[1].codepoint) {
        log::warn!("{} is not sorted by codepoint, lookups may fail", width.table_id());
    }
    Ok(table)
}

fn parse_glyph_shape(data: &[u8]) -> Result<GlyphShape> {
    let header = data.get(0..SHAPE_HEADER_SIZE)
        .ok_or_else(|| truncated("GLSP header", SHAPE_HEADER_SIZE, data.len()))?;
    let header = ShapeHeader::unpack_from_slice(header)
        .map_err(|e| FhftError::Malformed(format!("GLSP header: {:?}", e)))?;
    if header.last_gid < header.first_gid {
        return Err(FhftError::Malformed(format!("GLSP range {}..={} is empty", header.first_gid, header.last_gid)).into());
    }
    let count = (header.last_gid - header.first_gid) as usize + 1;
    let expected = count * header.width as usize * 2;
    let bitmap = &data[SHAPE_HEADER_SIZE..];
    if bitmap.len() != expected {
        return Err(FhftError::Malformed(format!("GLSP {}..={} has {} bitmap bytes, expected {}",
            header.first_gid, header.last_gid, bitmap.len(), expected)).into());
    }
    let mut columns = vec![ 0u16; bitmap.len() / 2 ];
    LittleEndian::read_u16_into(bitmap, &mut columns);
    Ok(GlyphShape{ first_gid: header.first_gid, last_gid: header.last_gid, width: header.width, columns })
}

/// Decoded FHFT file.
pub struct FontFile {
    pub metadata: FontMetadata,
    pub glyph_metadata: GlyphMetadata,
    pub tables: Vec<CmapTable>,
    pub shapes: Vec<GlyphShape>,
}

impl FontFile {
    pub fn parse(data: &[u8]) -> Result<FontFile> {
        let root = RawChunk::parse(data)?;
        Self::from_tree(&root)
    }

    pub fn from_tree(root: &RawChunk) -> Result<FontFile> {
        match root {
            RawChunk::List{ id, list_type, .. } if *id == RIFF && *list_type == FHFT => { },
            _ => {
                return Err(FhftError::Malformed(format!("expected RIFF/FHFT root, got {}", root.id())).into());
            }
        }

        let metadata = parse_font_metadata(require(root, FontMetadata::ID)?)?;
        log::info!("format version: {}", metadata.version);
        log::info!("font name: {}", metadata.name);

        let glmt = require(root, GlyphMetadata::ID)?;
        let glmt = glmt.get(0..4).ok_or_else(|| truncated("GLMT", 4, glmt.len()))?;
        let glyph_metadata = GlyphMetadata::unpack_from_slice(glmt)
            .map_err(|e| FhftError::Malformed(format!("GLMT: {:?}", e)))?;
        if glyph_metadata.height > MAX_GLYPH_HEIGHT {
            return Err(FhftError::Malformed(format!("unsupported glyph height {}", glyph_metadata.height)).into());
        }

        let mut tables = Vec::new();
        for width in CodepointWidth::ALL {
            match root.find(width.table_id()).and_then(|c| c.data()) {
                Some(data) => { tables.push(parse_cmap_table(width, data)?); },
                None => {
                    log::warn!("{} chunk not found", width.table_id());
                    tables.push(CmapTable::new(width));
                }
            }
        }

        let mut shapes = Vec::new();
        for chunk in root.find_all(GlyphShape::ID) {
            if let Some(data) = chunk.data() {
                let shape = parse_glyph_shape(data)
                    .with_context(|| format!("GLSP at offset {}", chunk.offset()))?;
                shapes.push(shape);
            }
        }
        Ok(FontFile{ metadata, glyph_metadata, tables, shapes })
    }

    pub fn height(&self) -> u16 {
        self.glyph_metadata.height
    }

    /// Glyph id for `codepoint`, found by binary search in the table of its width.
    pub fn lookup(&self, codepoint: u32) -> Option<u16> {
        let width = CodepointWidth::of(codepoint);
        let table = self.tables.iter().find(|t| t.width == width)?;
        let items = table.items();
        log::debug!("cmap: {} itemcount: {}", table.id(), items.len());
        items.binary_search_by_key(&codepoint, |item| item.codepoint)
            .ok()
            .map(|ix| items[ix].glyph_id)
    }

    pub fn glyph_columns(&self, gid: u16) -> Option<&[u16]> {
        let shape = self.shapes.iter().find(|s| s.contains(gid))?;
        log::debug!("gid: 0x{:x}, width: {}", gid, shape.width);
        shape.glyph_columns(gid)
    }

    pub fn glyph_count(&self) -> usize {
        self.shapes.iter().map(|s| s.glyph_count()).sum()
    }
}
