use fixed_height_font::conv::extract;
use fixed_height_font::conv::source::MemorySource;
use fixed_height_font::error::FhftError;
use fixed_height_font::fhft::reader::{FontFile, RawChunk};
use fixed_height_font::fhft::schema::{CmapItem, CodepointWidth, GlyphShape};
use pretty_assertions::assert_eq;

/// Glyph of `width` x 16 whose top row alone is set.
fn top_bar(name: &str, width: u16) -> (String, Vec<u8>) {
    let row_bytes = (width as usize).div_ceil(8);
    let mut data = vec![ 0u8; row_bytes * 16 ];
    for x in 0..width as usize {
        data[x / 8] |= 0x80 >> (x % 8);
    }
    (name.to_string(), data)
}

fn latin_and_kana() -> MemorySource {
    let mut source = MemorySource::new("Test Sans 16");
    source.add_strike(16, 8, vec![top_bar("A", 8), top_bar("B", 8), top_bar("C", 8)]);
    source.add_strike(16, 12, vec![top_bar("a-hira", 12), top_bar("i-hira", 12)]);
    source.map(0x3044, "i-hira");
    source.map(0x42, "B");
    source.map(0x41, "A");
    source.map(0x3042, "a-hira");
    source.map(0x43, "C");
    source
}

fn shape_ranges(shapes: &[GlyphShape]) -> Vec<(u16, u16, u16)> {
    shapes.iter().map(|s| (s.first_gid, s.last_gid, s.width)).collect()
}

#[test]
fn two_strikes_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("test.fhft");
    extract::convert_to_file(&latin_and_kana(), &out_path).unwrap();

    let data = std::fs::read(&out_path).unwrap();
    let font = FontFile::parse(&data).unwrap();
    assert_eq!(font.metadata.version, 2);
    assert_eq!(font.metadata.name, "Test Sans 16");
    assert_eq!(font.height(), 16);
    assert_eq!(font.glyph_metadata.max_width, 12);
    assert_eq!(shape_ranges(&font.shapes), vec![(0, 2, 8), (3, 4, 12)]);

    let cm1b = &font.tables[0];
    assert_eq!(cm1b.width, CodepointWidth::One);
    assert_eq!(cm1b.items(), &[CmapItem::new(0x41, 0), CmapItem::new(0x42, 1), CmapItem::new(0x43, 2)]);
    let cm2b = &font.tables[1];
    assert_eq!(cm2b.items(), &[CmapItem::new(0x3042, 3), CmapItem::new(0x3044, 4)]);
    assert!(font.tables[2].items().is_empty());
    assert!(font.tables[3].items().is_empty());

    let gid = font.lookup('い' as u32).unwrap();
    assert_eq!(font.glyph_columns(gid).unwrap(), &[0x8000u16; 12][..]);
    assert_eq!(font.glyph_columns(font.lookup('B' as u32).unwrap()).unwrap(), &[0x8000u16; 8][..]);
    assert_eq!(font.lookup('D' as u32), None);
}

#[test]
fn wide_strike_first_is_renumbered() {
    let mut source = MemorySource::new("reordered");
    source.add_strike(16, 12, vec![top_bar("a-hira", 12)]);
    source.add_strike(16, 8, vec![top_bar("A", 8), top_bar("B", 8)]);
    source.map(0x41, "A");
    source.map(0x3042, "a-hira");

    let font = extract::convert(&source).unwrap();
    assert_eq!(shape_ranges(&font.glyphs.shapes), vec![(0, 1, 8), (2, 2, 12)]);
    assert_eq!(font.cmap.table(CodepointWidth::Two).items(), &[CmapItem::new(0x3042, 2)]);
}

#[test]
fn chunk_tree_layout() {
    let bytes = extract::convert(&latin_and_kana()).unwrap().serialize().unwrap();
    let mut out = Vec::new();
    RawChunk::parse(&bytes).unwrap().dump(&mut out).unwrap();
    let tags: Vec<String> = String::from_utf8(out).unwrap().lines()
        .skip(1)
        .map(|l| l.trim_start().split(' ').nth(1).unwrap_or_default().to_string())
        .collect();
    assert_eq!(tags, vec!["FTMT", "LIST", "CM1B", "CM2B", "CM3B", "CM4B", "LIST", "GLMT", "LIST", "GLSP", "GLSP"]);
}

#[test]
fn mixed_heights_write_nothing() {
    let mut source = latin_and_kana();
    source.add_strike(12, 6, vec![("small".to_string(), vec![ 0u8; 12 ])]);

    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("mixed.fhft");
    let err = extract::convert_to_file(&source, &out_path).unwrap_err();
    assert_eq!(err.downcast_ref::<FhftError>(), Some(&FhftError::NonFixedHeight(vec![12, 16])));
    assert!(!out_path.exists());
}
