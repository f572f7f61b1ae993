use anyhow::{anyhow, Result};
use bmp::{Image, Pixel, px};
use std::io::Write;
use std::path::Path;

use crate::fhft::reader::FontFile;
use crate::fhft::schema::MAX_GLYPH_HEIGHT;

/// Column bitmap of a rendered string; bit `height - 1` of each column is the top row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderedText {
    pub columns: Vec<u16>,
    pub line_widths: Vec<usize>,
    pub line_ends: Vec<usize>,
}

pub fn render_text(font: &FontFile, text: &str) -> RenderedText {
    let mut out = RenderedText::default();
    let mut line_start = 0;
    for ch in text.chars() {
        if ch == '\n' {
            out.line_widths.push(out.columns.len() - line_start);
            out.line_ends.push(out.columns.len());
            line_start = out.columns.len();
            continue;
        }
        let codepoint = ch as u32;
        let Some(gid) = font.lookup(codepoint) else {
            log::error!("character 0x{:04x} wasn't found", codepoint);
            continue;
        };
        log::info!("ch: 0x{:06X} gid: 0x{:04X}", codepoint, gid);
        let Some(glyph) = font.glyph_columns(gid) else {
            log::error!("glyph 0x{:04X} for character 0x{:04x} has no bitmap", gid, codepoint);
            continue;
        };
        // keep one blank column between glyphs that touch their cell edge
        if glyph.first().is_some_and(|c| *c != 0) {
            out.columns.push(0);
        }
        out.columns.extend_from_slice(glyph);
        if glyph.last().is_some_and(|c| *c != 0) {
            out.columns.push(0);
        }
    }
    if out.line_ends.is_empty() || line_start < out.columns.len() {
        out.line_widths.push(out.columns.len() - line_start);
        out.line_ends.push(out.columns.len());
    }
    out
}

fn write_array<W: Write, T: std::fmt::Display>(out: &mut W, decl: &str, values: impl Iterator<Item = T>) -> Result<()> {
    write!(out, "{} = {{\n    ", decl)?;
    for v in values {
        write!(out, "{}, ", v)?;
    }
    write!(out, "\n}};\n")?;
    Ok(())
}

impl RenderedText {
    pub fn write_c_source<W: Write>(&self, out: &mut W) -> Result<()> {
        write_array(out, "uint16_t bitmap[]", self.columns.iter().map(|c| format!("0x{:X}", c)))?;
        write_array(out, "size_t line_widths[]", self.line_widths.iter())?;
        write_array(out, "size_t line_ends[]", self.line_ends.iter())?;
        Ok(())
    }

    /// Column range of each line.
    pub fn lines(&self) -> impl Iterator<Item = &[u16]> + '_ {
        self.line_ends.iter().zip(&self.line_widths)
            .map(|(end, width)| &self.columns[end - width..*end])
    }

    /// Writes a preview image, one band of `height` rows per line.
    pub fn save_bmp(&self, path: &Path, height: u16) -> Result<()> {
        if height > MAX_GLYPH_HEIGHT {
            return Err(anyhow!("preview height {} is above {}", height, MAX_GLYPH_HEIGHT));
        }
        let img_width = self.lines().map(|l| l.len()).max().unwrap_or(0).max(1) as u32;
        let img_height = (self.line_ends.len().max(1) * height as usize).max(1) as u32;
        let mut img = Image::new(img_width, img_height);
        for (n, line) in self.lines().enumerate() {
            let base_y = n as u32 * height as u32;
            for (x, column) in line.iter().enumerate() {
                for y in 0..height {
                    if *column & (1u16 << (height - 1 - y)) != 0 {
                        img.set_pixel(x as u32, base_y + y as u32, px!(255, 255, 255));
                    }
                }
            }
        }
        img.save(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fhft::schema::{Cmap, CmapItem, FixedHeightFont, FontMetadata, GlyphList, GlyphMetadata, GlyphShape};
    use pretty_assertions::assert_eq;

    fn font() -> FontFile {
        // 'i' is flush with both cell edges, ' ' is blank, 'l' has a blank leading column
        let font = FixedHeightFont{
            metadata: FontMetadata::new("t"),
            cmap: Cmap::from_items(vec![
                CmapItem::new(' ' as u32, 0), CmapItem::new('i' as u32, 1), CmapItem::new('l' as u32, 2),
            ]).unwrap(),
            glyphs: GlyphList{
                metadata: GlyphMetadata{ max_width: 2, height: 16 },
                shapes: vec![
                    GlyphShape{ first_gid: 0, last_gid: 1, width: 1, columns: vec![0x0000, 0xbfff] },
                    GlyphShape{ first_gid: 2, last_gid: 2, width: 2, columns: vec![0x0000, 0xffff] },
                ],
            },
        };
        FontFile::parse(&font.serialize().unwrap()).unwrap()
    }

    #[test]
    fn spacing_around_edge_glyphs() {
        let text = render_text(&font(), "i l");
        assert_eq!(text.columns, vec![0, 0xbfff, 0, 0x0000, 0x0000, 0xffff, 0]);
        assert_eq!(text.line_widths, vec![7]);
        assert_eq!(text.line_ends, vec![7]);
    }

    #[test]
    fn unknown_characters_are_skipped() {
        let text = render_text(&font(), "?i");
        assert_eq!(text.columns, vec![0, 0xbfff, 0]);
    }

    #[test]
    fn lines_are_split_on_newline() {
        let text = render_text(&font(), "i\n ii\nl");
        assert_eq!(text.line_widths, vec![3, 7, 3]);
        assert_eq!(text.line_ends, vec![3, 10, 13]);
        let lines: Vec<&[u16]> = text.lines().collect();
        assert_eq!(lines[2], &[0x0000, 0xffff, 0][..]);

        let trailing = render_text(&font(), "i\n");
        assert_eq!(trailing.line_widths, vec![3]);
        assert_eq!(trailing.line_ends, vec![3]);
    }

    #[test]
    fn empty_text_is_one_empty_line() {
        let text = render_text(&font(), "");
        assert_eq!(text, RenderedText{ columns: vec![], line_widths: vec![0], line_ends: vec![0] });
    }

    #[test]
    fn c_source_layout() {
        let text = render_text(&font(), "i");
        let mut out = Vec::new();
        text.write_c_source(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(),
            "uint16_t bitmap[] = {\n    0x0, 0xBFFF, 0x0, \n};\n\
             size_t line_widths[] = {\n    3, \n};\n\
             size_t line_ends[] = {\n    3, \n};\n");
    }

    #[test]
    fn bmp_preview_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.bmp");
        render_text(&font(), "il\ni").save_bmp(&path, 16).unwrap();
        let img = bmp::open(&path).unwrap();
        assert_eq!(img.get_width(), 6);
        assert_eq!(img.get_height(), 32);
        assert_eq!(img.get_pixel(1, 0), px!(255, 255, 255));
        assert_eq!(img.get_pixel(1, 1), px!(0, 0, 0));
    }

    #[test]
    fn bmp_taller_than_a_column_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tall.bmp");
        assert!(render_text(&font(), "i").save_bmp(&path, 17).is_err());
        assert!(!path.exists());
    }
}
