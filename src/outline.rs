use crate::rasterizer::GlyphBitmap;
use crate::style::OutlineType;

/// Turns a filled coverage bitmap into an outline of `thickness` pixels.
///
/// The bitmap grows by the thickness on every side so outer strokes are not
/// clipped; offsets move with it so the glyph stays in place.
pub fn apply(bitmap: &GlyphBitmap, kind: OutlineType, thickness: f32) -> GlyphBitmap {
    if kind == OutlineType::None || bitmap.width == 0 || bitmap.height == 0 {
        return bitmap.clone();
    }

    let r = thickness.round().max(1.0) as i32;
    let grown = pad(bitmap, r as u32);
    let (w, h) = (grown.width as i32, grown.height as i32);

    let coverage = match kind {
        OutlineType::Outer => {
            let dilated = morph(&grown.coverage, w, h, r, u8::max);
            subtract(&dilated, &grown.coverage)
        }
        OutlineType::Inner => {
            let eroded = morph(&grown.coverage, w, h, r, u8::min);
            subtract(&grown.coverage, &eroded)
        }
        OutlineType::Line => {
            let dilated = morph(&grown.coverage, w, h, r, u8::max);
            let eroded = morph(&grown.coverage, w, h, r, u8::min);
            subtract(&dilated, &eroded)
        }
        OutlineType::None => grown.coverage.clone(),
    };

    GlyphBitmap { coverage, ..grown }
}

fn pad(bitmap: &GlyphBitmap, r: u32) -> GlyphBitmap {
    let width = bitmap.width + 2 * r;
    let height = bitmap.height + 2 * r;
    let mut coverage = vec![0u8; (width * height) as usize];
    for y in 0..bitmap.height {
        let src = (y * bitmap.width) as usize;
        let dst = ((y + r) * width + r) as usize;
        coverage[dst..dst + bitmap.width as usize]
            .copy_from_slice(&bitmap.coverage[src..src + bitmap.width as usize]);
    }
    GlyphBitmap {
        width,
        height,
        offset_x: bitmap.offset_x - r as i32,
        offset_y: bitmap.offset_y + r as i32,
        coverage,
        ..bitmap.clone()
    }
}

/// Min or max filter over a disc of radius `r`. Pixels outside count as empty.
fn morph(src: &[u8], w: i32, h: i32, r: i32, pick: fn(u8, u8) -> u8) -> Vec<u8> {
    let mut out = vec![0u8; src.len()];
    for y in 0..h {
        for x in 0..w {
            let mut acc = src[(y * w + x) as usize];
            for dy in -r..=r {
                for dx in -r..=r {
                    if dx * dx + dy * dy > r * r {
                        continue;
                    }
                    let (sx, sy) = (x + dx, y + dy);
                    let v = if sx < 0 || sy < 0 || sx >= w || sy >= h {
                        0
                    } else {
                        src[(sy * w + sx) as usize]
                    };
                    acc = pick(acc, v);
                }
            }
            out[(y * w + x) as usize] = acc;
        }
    }
    out
}

fn subtract(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b).map(|(x, y)| x.saturating_sub(*y)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> GlyphBitmap {
        // 4x4 solid block.
        GlyphBitmap {
            width: 4,
            height: 4,
            offset_x: 1,
            offset_y: 4,
            advance_x: 6.0,
            advance_y: 0.0,
            coverage: vec![255; 16],
        }
    }

    fn at(b: &GlyphBitmap, x: u32, y: u32) -> u8 {
        b.coverage[(y * b.width + x) as usize]
    }

    #[test]
    fn test_none_is_identity() {
        assert_eq!(apply(&square(), OutlineType::None, 2.0), square());
    }

    #[test]
    fn test_outer_ring_leaves_inside_empty() {
        let out = apply(&square(), OutlineType::Outer, 1.0);
        assert_eq!((out.width, out.height), (6, 6));
        assert_eq!((out.offset_x, out.offset_y), (0, 5));
        assert_eq!(out.advance_x, 6.0);
        // Inside of the original square.
        assert_eq!(at(&out, 2, 2), 0);
        // Directly left of it.
        assert_eq!(at(&out, 0, 2), 255);
        // Disc kernel: the diagonal corner stays empty.
        assert_eq!(at(&out, 0, 0), 0);
    }

    #[test]
    fn test_inner_ring_stays_inside() {
        let out = apply(&square(), OutlineType::Inner, 1.0);
        assert_eq!(at(&out, 1, 1), 255);
        assert_eq!(at(&out, 0, 2), 0);
        assert_eq!(at(&out, 2, 2), 0);
    }

    #[test]
    fn test_line_covers_both_sides() {
        let out = apply(&square(), OutlineType::Line, 1.0);
        assert_eq!(at(&out, 0, 2), 255);
        assert_eq!(at(&out, 1, 2), 255);
    }
}
