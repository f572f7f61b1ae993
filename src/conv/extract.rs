use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::conv::bitmap;
use crate::conv::source::{BitmapFontSource, Strike};
use crate::error::FhftError;
use crate::fhft::schema::{
    Cmap, CmapItem, FixedHeightFont, FontMetadata, GlyphList, GlyphMetadata, GlyphShape,
};

/// A glyph after bit-layout normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedGlyph {
    pub source_gid: u16,
    pub name: String,
    pub width: u16,
    pub columns: Vec<u16>,
}

/// Returns the one height shared by all strikes.
pub fn validate_fixed_height(strikes: &[Strike]) -> Result<u16> {
    let mut heights: Vec<u16> = strikes.iter().map(|s| s.metrics.height).collect();
    heights.sort_unstable();
    heights.dedup();
    match heights.as_slice() {
        [] => Err(FhftError::NoStrikes.into()),
        [height] => Ok(*height),
        _ => Err(FhftError::NonFixedHeight(heights).into()),
    }
}

/// Reads and transposes every glyph covered by `strikes`, in strike order.
pub fn extract_glyphs<S: BitmapFontSource + ?Sized>(source: &S, strikes: &[Strike], height: u16) -> Result<Vec<ExtractedGlyph>> {
    let mut glyphs = Vec::new();
    let mut seen = HashSet::new();
    for strike in strikes {
        log::info!("strike {}x{}: glyphs {}..={}", strike.metrics.height, strike.metrics.width,
            strike.first_glyph, strike.last_glyph);
        for gid in strike.glyph_ids() {
            if !seen.insert(gid) {
                log::warn!("glyph {} appears in more than one strike, keeping the first", gid);
                continue;
            }
            let Some(raw) = source.glyph(gid)? else {
                log::warn!("glyph {} has no bitmap, skipped", gid);
                continue;
            };
            if raw.height != height {
                let mut heights = vec![height, raw.height];
                heights.sort_unstable();
                return Err(FhftError::NonFixedHeight(heights).into());
            }
            if gid == strike.first_glyph {
                log::debug!("from {}", raw.name);
            } else if gid == strike.last_glyph {
                log::debug!("to   {}", raw.name);
            }
            let columns = bitmap::transpose(&raw)?;
            glyphs.push(ExtractedGlyph{ source_gid: gid, name: raw.name, width: raw.width, columns });
        }
    }
    Ok(glyphs)
}

/// Sorts glyphs by width and cuts them into runs of equal width.
///
/// The position of a glyph in the returned vector is its new glyph id.
pub fn group_by_width(mut glyphs: Vec<ExtractedGlyph>) -> Result<(Vec<ExtractedGlyph>, Vec<GlyphShape>)> {
    if glyphs.len() > u16::MAX as usize + 1 {
        return Err(FhftError::TooManyGlyphs(glyphs.len()).into());
    }
    glyphs.sort_by_key(|g| g.width);

    let mut shapes: Vec<GlyphShape> = Vec::new();
    for (gid, glyph) in glyphs.iter().enumerate() {
        let gid = gid as u16;
        match shapes.last_mut() {
            Some(shape) if shape.width == glyph.width => {
                shape.last_gid = gid;
                shape.columns.extend_from_slice(&glyph.columns);
            },
            _ => {
                shapes.push(GlyphShape{ first_gid: gid, last_gid: gid, width: glyph.width, columns: glyph.columns.clone() });
            }
        }
    }
    Ok((glyphs, shapes))
}

/// Maps codepoints to new glyph ids through glyph names.
///
/// `glyphs` must already be in new-id order.
pub fn build_cmap(reverse_cmap: &[(u32, String)], glyphs: &[ExtractedGlyph]) -> Result<Cmap> {
    let mut ids: HashMap<&str, u16> = HashMap::new();
    for (gid, glyph) in glyphs.iter().enumerate() {
        if ids.contains_key(glyph.name.as_str()) {
            log::warn!("duplicate glyph name '{}' (source glyph {}), only the first is mapped", glyph.name, glyph.source_gid);
            continue;
        }
        ids.insert(&glyph.name, gid as u16);
    }

    let mut mapped: BTreeMap<u32, u16> = BTreeMap::new();
    let mut used: HashSet<&str> = HashSet::new();
    for (codepoint, name) in reverse_cmap {
        let Some(gid) = ids.get(name.as_str()) else {
            log::info!("U+{:04X} maps to '{}' which has no bitmap", codepoint, name);
            continue;
        };
        if let Some(previous) = mapped.insert(*codepoint, *gid) {
            log::warn!("U+{:04X} is mapped twice, using glyph {} instead of {}", codepoint, gid, previous);
        }
        used.insert(name);
    }

    for glyph in glyphs {
        if !used.contains(glyph.name.as_str()) {
            // ligature and variant targets have no codepoint of their own
            log::debug!("glyph '{}' has no codepoint, not in character map", glyph.name);
        }
    }

    let items = mapped.into_iter().map(|(cp, gid)| CmapItem::new(cp, gid)).collect();
    Cmap::from_items(items)
}

/// Runs the whole pipeline and returns the document, nothing is written.
pub fn convert<S: BitmapFontSource + ?Sized>(source: &S) -> Result<FixedHeightFont> {
    let strikes = source.strikes()?;
    let height = validate_fixed_height(&strikes)?;
    log::info!("fixed height: {}", height);

    let glyphs = extract_glyphs(source, &strikes, height)?;
    let max_width = glyphs.iter().map(|g| g.width).max().unwrap_or(0);
    let (glyphs, shapes) = group_by_width(glyphs)?;
    log::info!("{} glyphs in {} shapes, max width {}", glyphs.len(), shapes.len(), max_width);

    let reverse_cmap = source.reverse_cmap()?;
    let cmap = build_cmap(&reverse_cmap, &glyphs)?;
    log::info!("{} characters mapped", cmap.len());

    Ok(FixedHeightFont{
        metadata: FontMetadata::new(&source.display_name()),
        cmap,
        glyphs: GlyphList{ metadata: GlyphMetadata{ max_width, height }, shapes },
    })
}

/// Converts `source` and writes the result to `out_path`.
///
/// The file is only created once the complete byte stream has been built.
pub fn convert_to_file<S: BitmapFontSource + ?Sized>(source: &S, out_path: &Path) -> Result<FixedHeightFont> {
    let font = convert(source)?;
    let bytes = font.serialize()?;
    let mut out_file = File::create(out_path)
        .with_context(|| format!("cannot create {}", out_path.display()))?;
    out_file.write_all(&bytes)?;
    log::info!("wrote {} bytes to {}", bytes.len(), out_path.display());
    Ok(font)
}
