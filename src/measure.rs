//! Width and cursor queries for single-line text editors and terminal grids.

use crate::atlas::TextureAtlas;
use crate::font::Font;

/// Horizontal extent of one character cell.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextPosition {
    pub left_offset: f32,
    pub right_offset: f32,
    pub char_offset: usize,
}

const TAB_WIDTH: usize = 4;

fn advance(font: &mut Font, atlas: &mut TextureAtlas, ch: char) -> f32 {
    if ch == '\t' {
        return TAB_WIDTH as f32 * advance(font, atlas, ' ');
    }
    font.glyph(atlas, ch as i32)
        .map(|g| g.advance_x)
        .unwrap_or(0.0)
}

/// Running right edges: entry `i` is the width of the first `i + 1` characters.
fn right_edges(font: &mut Font, atlas: &mut TextureAtlas, text: &str) -> Vec<f32> {
    let mut width = 0.0;
    text.chars()
        .map(|ch| {
            width += advance(font, atlas, ch);
            width
        })
        .collect()
}

/// Sum of advances, with a tab counting as four spaces. Kerning is ignored.
pub fn text_width(font: &mut Font, atlas: &mut TextureAtlas, text: &str) -> f32 {
    right_edges(font, atlas, text).last().copied().unwrap_or(0.0)
}

/// The character cell containing horizontal `offset`.
///
/// Past the end of the text this is the cell a cursor would occupy after the
/// last character, one space wide.
pub fn position_at_offset(
    font: &mut Font,
    atlas: &mut TextureAtlas,
    text: &str,
    offset: f32,
) -> TextPosition {
    let edges = right_edges(font, atlas, text);
    let mut pos = TextPosition::default();
    for i in 0..=edges.len() {
        let right = match edges.get(i) {
            Some(&r) => r,
            None => edges.last().copied().unwrap_or(0.0) + advance(font, atlas, ' '),
        };
        pos.left_offset = pos.right_offset;
        pos.right_offset = right;
        pos.char_offset = i;
        if right >= offset {
            break;
        }
    }
    pos
}

/// Left and right edges of the character at `index`, clamped to the text.
pub fn offsets_for_position(
    font: &mut Font,
    atlas: &mut TextureAtlas,
    text: &str,
    index: usize,
) -> TextPosition {
    let edges = right_edges(font, atlas, text);
    if edges.is_empty() {
        return TextPosition::default();
    }
    let i = index.min(edges.len());
    TextPosition {
        left_offset: if i == 0 { 0.0 } else { edges[i - 1] },
        right_offset: edges[i.min(edges.len() - 1)],
        char_offset: i,
    }
}

/// How many `(columns, rows)` of monospaced cells fit in `width x height`,
/// using the space advance and the font line height.
pub fn char_grid(font: &mut Font, atlas: &mut TextureAtlas, width: f32, height: f32) -> (usize, usize) {
    let cell = advance(font, atlas, ' ');
    let line = font.metrics().height.ceil();
    let columns = if cell > 0.0 { (width / cell) as usize } else { 0 };
    let rows = if line > 0.0 { (height / line) as usize } else { 0 };
    (columns, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font_cache::FontSpec;
    use crate::test_support::FixedRasterizer;

    fn setup() -> (Font, TextureAtlas) {
        let font = Font::new(
            "Mono",
            "mem",
            &FontSpec::new("Mono", 16.0),
            Box::new(FixedRasterizer::new(8.0).with_metrics(12.0, -4.0, 18.5)),
        );
        (font, TextureAtlas::new(128, 128, 1))
    }

    #[test]
    fn test_width_counts_tabs_as_four_spaces() {
        let (mut font, mut atlas) = setup();
        assert_eq!(text_width(&mut font, &mut atlas, ""), 0.0);
        assert_eq!(text_width(&mut font, &mut atlas, "abc"), 24.0);
        assert_eq!(text_width(&mut font, &mut atlas, "a\tb"), 48.0);
    }

    #[test]
    fn test_position_at_offset() {
        let (mut font, mut atlas) = setup();
        let p = position_at_offset(&mut font, &mut atlas, "abcd", 13.0);
        assert_eq!(
            p,
            TextPosition {
                left_offset: 8.0,
                right_offset: 16.0,
                char_offset: 1
            }
        );

        // Beyond the text: the cell after the last character.
        let p = position_at_offset(&mut font, &mut atlas, "ab", 100.0);
        assert_eq!((p.left_offset, p.right_offset, p.char_offset), (16.0, 24.0, 2));

        let p = position_at_offset(&mut font, &mut atlas, "", 3.0);
        assert_eq!((p.left_offset, p.right_offset, p.char_offset), (0.0, 8.0, 0));
    }

    #[test]
    fn test_offsets_for_position() {
        let (mut font, mut atlas) = setup();
        let p = offsets_for_position(&mut font, &mut atlas, "abcd", 0);
        assert_eq!((p.left_offset, p.right_offset, p.char_offset), (0.0, 8.0, 0));
        let p = offsets_for_position(&mut font, &mut atlas, "abcd", 2);
        assert_eq!((p.left_offset, p.right_offset, p.char_offset), (16.0, 24.0, 2));
        let p = offsets_for_position(&mut font, &mut atlas, "abcd", 9);
        assert_eq!((p.left_offset, p.right_offset, p.char_offset), (32.0, 32.0, 4));
    }

    #[test]
    fn test_char_grid() {
        let (mut font, mut atlas) = setup();
        // Cells are 8 wide and ceil(18.5) = 19 tall.
        assert_eq!(char_grid(&mut font, &mut atlas, 100.0, 60.0), (12, 3));
    }
}
