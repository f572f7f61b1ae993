use anyhow::Result;

/// How rows of a monochrome bitmap are packed. Both are MSB first, top row first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLayout {
    /// Each row starts on a byte boundary.
    ByteAligned,
    /// Rows follow each other without padding.
    BitAligned,
}

impl RowLayout {
    /// Offset in bits of the first pixel of `row`.
    pub fn row_start(self, row: usize, width: usize) -> usize {
        match self {
            RowLayout::ByteAligned => row * width.div_ceil(8) * 8,
            RowLayout::BitAligned => row * width,
        }
    }

    pub fn data_size(self, width: usize, height: usize) -> usize {
        match self {
            RowLayout::ByteAligned => width.div_ceil(8) * height,
            RowLayout::BitAligned => (width * height).div_ceil(8),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrikeMetrics {
    pub height: u16,
    pub width: u16,
}

/// Glyphs `first_glyph..=last_glyph` rendered at one size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strike {
    pub metrics: StrikeMetrics,
    pub first_glyph: u16,
    pub last_glyph: u16,
}

impl Strike {
    pub fn glyph_ids(&self) -> std::ops::RangeInclusive<u16> {
        self.first_glyph..=self.last_glyph
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawGlyph {
    pub name: String,
    pub width: u16,
    pub height: u16,
    pub layout: RowLayout,
    pub data: Vec<u8>,
}

/// What the converter needs from a font with embedded bitmaps.
pub trait BitmapFontSource {
    fn strikes(&self) -> Result<Vec<Strike>>;

    /// Bitmap of glyph `gid`, or `None` if the font has no bitmap for it.
    fn glyph(&self, gid: u16) -> Result<Option<RawGlyph>>;

    /// Codepoint to glyph name mappings, in any order.
    fn reverse_cmap(&self) -> Result<Vec<(u32, String)>>;

    fn display_name(&self) -> String;
}

/// A font held entirely in memory, for fonts assembled by hand.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pub name: String,
    pub strikes: Vec<Strike>,
    pub glyphs: Vec<Option<RawGlyph>>,
    pub cmap: Vec<(u32, String)>,
}

impl MemorySource {
    pub fn new(name: &str) -> Self {
        MemorySource{ name: name.to_string(), ..Default::default() }
    }

    /// Appends one strike of byte-aligned glyphs and returns its glyph range,
    /// or `None` (adding nothing) when `glyphs` is empty.
    pub fn add_strike(&mut self, height: u16, width: u16, glyphs: Vec<(String, Vec<u8>)>) -> Option<Strike> {
        if glyphs.is_empty() {
            return None;
        }
        let first_glyph = self.glyphs.len() as u16;
        for (name, data) in glyphs {
            self.glyphs.push(Some(RawGlyph{ name, width, height, layout: RowLayout::ByteAligned, data }));
        }
        let last_glyph = self.glyphs.len() as u16 - 1;
        let strike = Strike{ metrics: StrikeMetrics{ height, width }, first_glyph, last_glyph };
        self.strikes.push(strike);
        Some(strike)
    }

    pub fn map(&mut self, codepoint: u32, name: &str) {
        self.cmap.push((codepoint, name.to_string()));
    }
}

impl BitmapFontSource for MemorySource {
    fn strikes(&self) -> Result<Vec<Strike>> {
        Ok(self.strikes.clone())
    }

    fn glyph(&self, gid: u16) -> Result<Option<RawGlyph>> {
        Ok(self.glyphs.get(gid as usize).cloned().flatten())
    }

    fn reverse_cmap(&self) -> Result<Vec<(u32, String)>> {
        Ok(self.cmap.clone())
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }
}
