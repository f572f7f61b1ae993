use anyhow::{anyhow, Result};
use skrifa::bitmap::{BitmapData, BitmapFormat, BitmapGlyph, BitmapStrikes};
use skrifa::raw::tables::post::Post;
use skrifa::raw::types::GlyphId16;
use skrifa::raw::{FontRef, TableProvider};
use skrifa::string::StringId;
use skrifa::{GlyphId, MetadataProvider};

use crate::conv::source::{BitmapFontSource, RawGlyph, RowLayout, Strike, StrikeMetrics};

/// An OpenType font with monochrome EBLC/EBDT strikes.
pub struct TtfSource<'a> {
    font: FontRef<'a>,
    strikes: Option<BitmapStrikes<'a>>,
    post: Option<Post<'a>>,
    num_glyphs: u16,
    name: Option<String>,
}

impl<'a> TtfSource<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let font = FontRef::new(data)
            .map_err(|e| anyhow!("not an OpenType font: {}", e))?;
        let strikes = BitmapStrikes::with_format(&font, BitmapFormat::Ebdt);
        if strikes.is_none() {
            log::warn!("font has no EBLC/EBDT tables");
        }
        let post = font.post().ok();
        let num_glyphs = font.maxp()?.num_glyphs();
        Ok(Self{ font, strikes, post, num_glyphs, name: None })
    }

    /// Replaces the name taken from the `name` table.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    fn glyph_name(&self, gid: u16) -> String {
        self.post.as_ref()
            .and_then(|post| post.glyph_name(GlyphId16::new(gid).into()))
            .map(|name| name.to_string())
            .unwrap_or_else(|| format!("gid{}", gid))
    }

    /// Size of the 1 bpp bitmap of `gid` in strike `ix`.
    fn bitmap_size(&self, ix: usize, gid: u16) -> Option<(u16, u16)> {
        let glyph = self.strikes.as_ref()?.get(ix)?.get(GlyphId::new(gid as u32))?;
        match glyph.data {
            BitmapData::Mask(ref mask) if mask.bpp == 1 => glyph_dimensions(&glyph),
            _ => None,
        }
    }
}

fn glyph_dimensions(glyph: &BitmapGlyph) -> Option<(u16, u16)> {
    Some((u16::try_from(glyph.width).ok()?, u16::try_from(glyph.height).ok()?))
}

/// Cuts a sequence of glyph sizes into strikes of consecutive glyphs sharing
/// one size. Glyphs without a size end the current strike.
pub fn split_strikes(sizes: impl IntoIterator<Item = (u16, Option<(u16, u16)>)>) -> Vec<Strike> {
    let mut strikes: Vec<Strike> = Vec::new();
    let mut open = false;
    for (gid, size) in sizes {
        let Some((width, height)) = size else {
            open = false;
            continue;
        };
        let metrics = StrikeMetrics{ height, width };
        match strikes.last_mut() {
            Some(strike) if open && strike.metrics == metrics && strike.last_glyph + 1 == gid => {
                strike.last_glyph = gid;
            },
            _ => {
                strikes.push(Strike{ metrics, first_glyph: gid, last_glyph: gid });
                open = true;
            }
        }
    }
    strikes
}

impl BitmapFontSource for TtfSource<'_> {
    fn strikes(&self) -> Result<Vec<Strike>> {
        let Some(bitmap_strikes) = &self.strikes else {
            return Ok(Vec::new());
        };
        let mut strikes = Vec::new();
        for ix in 0..bitmap_strikes.len() {
            let ppem = bitmap_strikes.get(ix).map(|s| s.ppem()).unwrap_or_default();
            let found = split_strikes((0..self.num_glyphs).map(|gid| (gid, self.bitmap_size(ix, gid))));
            log::debug!("bitmap size {}: {} ppem, {} glyph ranges", ix, ppem, found.len());
            strikes.extend(found);
        }
        Ok(strikes)
    }

    fn glyph(&self, gid: u16) -> Result<Option<RawGlyph>> {
        let Some(bitmap_strikes) = &self.strikes else {
            return Ok(None);
        };
        for strike in bitmap_strikes.iter() {
            let Some(glyph) = strike.get(GlyphId::new(gid as u32)) else {
                continue;
            };
            let BitmapData::Mask(ref mask) = glyph.data else {
                log::warn!("glyph {} is not a monochrome mask, skipped", gid);
                return Ok(None);
            };
            if mask.bpp != 1 {
                log::warn!("glyph {} has {} bits per pixel, skipped", gid, mask.bpp);
                return Ok(None);
            }
            let (width, height) = glyph_dimensions(&glyph)
                .ok_or_else(|| anyhow!("glyph {} is {}x{} pixels", gid, glyph.width, glyph.height))?;
            let layout = if mask.is_packed { RowLayout::BitAligned } else { RowLayout::ByteAligned };
            return Ok(Some(RawGlyph{ name: self.glyph_name(gid), width, height, layout, data: mask.data.to_vec() }));
        }
        Ok(None)
    }

    fn reverse_cmap(&self) -> Result<Vec<(u32, String)>> {
        let mut mappings = Vec::new();
        for (codepoint, gid) in self.font.charmap().mappings() {
            match u16::try_from(gid.to_u32()) {
                Ok(gid) => mappings.push((codepoint, self.glyph_name(gid))),
                Err(_) => log::warn!("U+{:04X} maps to out of range glyph {}", codepoint, gid.to_u32()),
            }
        }
        Ok(mappings)
    }

    fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        [StringId::FULL_NAME, StringId::FAMILY_NAME].into_iter()
            .find_map(|id| self.font.localized_strings(id).english_or_first())
            .map(|s| s.to_string())
            .unwrap_or_default()
    }
}
