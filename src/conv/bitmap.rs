use anyhow::Result;

use crate::conv::source::RawGlyph;
use crate::error::FhftError;
use crate::fhft::schema::{MAX_GLYPH_HEIGHT, MAX_GLYPH_WIDTH};

/// Turns a row-major, MSB-first bitmap into one word per column.
///
/// Pixel (x, y), with y counted from the top row, ends up in bit
/// `height - 1 - y` of column `x`, so the top row is the highest used bit.
pub fn transpose(glyph: &RawGlyph) -> Result<Vec<u16>> {
    if glyph.width > MAX_GLYPH_WIDTH || glyph.height > MAX_GLYPH_HEIGHT {
        return Err(FhftError::GlyphTooLarge{ name: glyph.name.clone(), width: glyph.width, height: glyph.height }.into());
    }
    let width = glyph.width as usize;
    let height = glyph.height as usize;
    let need = glyph.layout.data_size(width, height);
    if glyph.data.len() < need {
        return Err(FhftError::Truncated{ what: format!("bitmap of glyph '{}'", glyph.name), need, have: glyph.data.len() }.into());
    }

    let mut columns = vec![ 0u16; width ];
    for y in 0..height {
        let row_start = glyph.layout.row_start(y, width);
        for (x, column) in columns.iter_mut().enumerate() {
            let bit = row_start + x;
            if glyph.data[bit / 8] & (0x80 >> (bit % 8)) != 0 {
                *column |= 1u16 << (height - 1 - y);
            }
        }
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conv::source::RowLayout;
    use pretty_assertions::assert_eq;

    fn glyph(width: u16, height: u16, layout: RowLayout, data: Vec<u8>) -> RawGlyph {
        RawGlyph{ name: "test".to_string(), width, height, layout, data }
    }

    /// Inverse of `transpose`, one `bool` per pixel, top row first.
    fn to_rows(columns: &[u16], height: usize) -> Vec<Vec<bool>> {
        (0..height).map(|y| {
            columns.iter().map(|c| *c & (1u16 << (height - 1 - y)) != 0).collect()
        }).collect()
    }

    fn parse_rows(rows: &[&str]) -> Vec<Vec<bool>> {
        rows.iter().map(|r| r.chars().map(|c| c == '1').collect()).collect()
    }

    #[test]
    fn transpose_3x4_byte_aligned() {
        // rows 101, 010, 111, 000
        let data = vec![0b1010_0000, 0b0100_0000, 0b1110_0000, 0b0000_0000];
        let columns = transpose(&glyph(3, 4, RowLayout::ByteAligned, data)).unwrap();
        assert_eq!(columns, vec![0b1010, 0b0110, 0b1010]);
        assert_eq!(to_rows(&columns, 4), parse_rows(&["101", "010", "111", "000"]));
    }

    #[test]
    fn transpose_3x4_bit_aligned() {
        // 101 010 111 000 packed into 12 bits
        let data = vec![0b1010_1011, 0b1000_0000];
        let columns = transpose(&glyph(3, 4, RowLayout::BitAligned, data)).unwrap();
        assert_eq!(columns, vec![0b1010, 0b0110, 0b1010]);
    }

    #[test]
    fn top_row_is_highest_bit_at_full_height() {
        let mut data = vec![ 0u8; 32 ];
        data[0] = 0x80; // (0, 0)
        data[31] = 0x01; // (15, 15)
        let columns = transpose(&glyph(16, 16, RowLayout::ByteAligned, data)).unwrap();
        assert_eq!(columns[0], 0x8000);
        assert_eq!(columns[15], 0x0001);
        assert!(columns[1..15].iter().all(|c| *c == 0));
    }

    #[test]
    fn empty_glyph_has_no_columns() {
        assert_eq!(transpose(&glyph(0, 16, RowLayout::ByteAligned, Vec::new())).unwrap(), Vec::<u16>::new());
    }

    #[test]
    fn oversized_glyphs_are_rejected() {
        for (w, h) in [(17, 16), (8, 17)] {
            let err = transpose(&glyph(w, h, RowLayout::ByteAligned, vec![ 0u8; 64 ])).unwrap_err();
            assert!(matches!(err.downcast_ref::<FhftError>(), Some(FhftError::GlyphTooLarge{ .. })));
        }
    }

    #[test]
    fn short_buffer_is_rejected() {
        let err = transpose(&glyph(9, 2, RowLayout::ByteAligned, vec![ 0u8; 3 ])).unwrap_err();
        assert_eq!(err.downcast_ref::<FhftError>(),
            Some(&FhftError::Truncated{ what: "bitmap of glyph 'test'".to_string(), need: 4, have: 3 }));
    }
}
