use crate::error::{Result, TextError};
use ab_glyph::{Font as _, FontArc, Glyph, PxScale, ScaleFont as _};
use std::path::Path;

/// Vertical metrics of a font at one pixel size. Distances are y-up from
/// the baseline, so `descender` and `underline_position` are usually negative.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FontMetrics {
    /// Baseline-to-baseline distance.
    pub height: f32,
    pub linegap: f32,
    pub ascender: f32,
    pub descender: f32,
    pub underline_position: f32,
    pub underline_thickness: f32,
}

/// Coverage bitmap of one character, one byte per pixel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GlyphBitmap {
    pub width: u32,
    pub height: u32,
    /// Pen to left edge of the bitmap.
    pub offset_x: i32,
    /// Baseline to top edge of the bitmap.
    pub offset_y: i32,
    pub advance_x: f32,
    pub advance_y: f32,
    pub coverage: Vec<u8>,
}

/// A font face opened at a fixed pixel size.
pub trait Rasterizer {
    fn metrics(&self) -> FontMetrics;

    /// Renders `ch`. Characters with no outline of their own (spaces) give an
    /// empty bitmap with a valid advance; characters the face lacks are
    /// [`TextError::GlyphNotFound`].
    fn rasterize(&mut self, ch: char) -> Result<GlyphBitmap>;

    /// Horizontal adjustment between `left` followed by `right`.
    fn kerning(&mut self, left: char, right: char) -> f32;
}

/// Opens font files into rasterizers.
pub trait FontLoader {
    fn load(&mut self, path: &Path, size: f32) -> anyhow::Result<Box<dyn Rasterizer>>;
}

pub fn load_font_from_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| anyhow::anyhow!("Failed to load font from {}: {}", path.display(), e))
}

pub struct AbGlyphRasterizer {
    font: FontArc,
    scale: PxScale,
}

impl AbGlyphRasterizer {
    pub fn new(font: FontArc, size: f32) -> Self {
        Self {
            font,
            scale: PxScale::from(size.max(1.0)),
        }
    }

    pub fn from_bytes(bytes: Vec<u8>, size: f32) -> anyhow::Result<Self> {
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| anyhow::anyhow!("Failed to parse font: {}", e))?;
        Ok(Self::new(font, size))
    }
}

impl Rasterizer for AbGlyphRasterizer {
    fn metrics(&self) -> FontMetrics {
        let scaled = self.font.as_scaled(self.scale);
        let ascender = scaled.ascent();
        let descender = scaled.descent();
        let linegap = scaled.line_gap();
        // ab_glyph does not expose the post table, so derive the underline
        // from the pixel size.
        let size = self.scale.y;
        FontMetrics {
            height: ascender - descender + linegap,
            linegap,
            ascender,
            descender,
            underline_position: (-size * 0.1).round().min(-2.0),
            underline_thickness: (size / 16.0).round().max(1.0),
        }
    }

    fn rasterize(&mut self, ch: char) -> Result<GlyphBitmap> {
        let id = self.font.glyph_id(ch);
        if id.0 == 0 {
            return Err(TextError::GlyphNotFound {
                charcode: ch as i32,
            });
        }
        let scaled = self.font.as_scaled(self.scale);
        let advance_x = scaled.h_advance(id);

        let glyph = Glyph {
            id,
            scale: self.scale,
            position: ab_glyph::point(0.0, 0.0),
        };
        let Some(outlined) = scaled.outline_glyph(glyph) else {
            return Ok(GlyphBitmap {
                advance_x,
                ..GlyphBitmap::default()
            });
        };

        let bounds = outlined.px_bounds();
        let width = (bounds.max.x - bounds.min.x).ceil().max(1.0) as u32;
        let height = (bounds.max.y - bounds.min.y).ceil().max(1.0) as u32;
        let mut coverage = vec![0u8; (width * height) as usize];
        outlined.draw(|x, y, v| {
            if x < width && y < height {
                let idx = (y * width + x) as usize;
                let a = (v * 255.0).round().clamp(0.0, 255.0) as u8;
                coverage[idx] = coverage[idx].max(a);
            }
        });

        Ok(GlyphBitmap {
            width,
            height,
            offset_x: bounds.min.x as i32,
            offset_y: -(bounds.min.y as i32),
            advance_x,
            advance_y: 0.0,
            coverage,
        })
    }

    fn kerning(&mut self, left: char, right: char) -> f32 {
        let scaled = self.font.as_scaled(self.scale);
        scaled.kern(self.font.glyph_id(left), self.font.glyph_id(right))
    }
}

/// Loads TrueType/OpenType files with ab_glyph.
#[derive(Debug, Default, Clone, Copy)]
pub struct AbGlyphLoader;

impl FontLoader for AbGlyphLoader {
    fn load(&mut self, path: &Path, size: f32) -> anyhow::Result<Box<dyn Rasterizer>> {
        let bytes = load_font_from_file(path)?;
        let rasterizer = AbGlyphRasterizer::from_bytes(bytes, size)
            .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
        Ok(Box::new(rasterizer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_reported() {
        let err = AbGlyphLoader
            .load(Path::new("/definitely/not/here.ttf"), 16.0)
            .err()
            .unwrap();
        assert!(err.to_string().contains("not/here.ttf"));
    }

    #[test]
    fn test_garbage_bytes_are_rejected() {
        assert!(AbGlyphRasterizer::from_bytes(vec![0u8; 64], 16.0).is_err());
    }
}
