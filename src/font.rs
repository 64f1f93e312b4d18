use crate::Pt;
use crate::atlas::TextureAtlas;
use crate::error::{Result, TextError};
use crate::font_cache::FontSpec;
use crate::glyph_cache::{EMPTY_GLYPH, Glyph, GlyphCache};
use crate::outline;
use crate::packer::PackerRect;
use crate::rasterizer::{FontMetrics, Rasterizer};
use crate::style::OutlineType;
use std::path::{Path, PathBuf};

/// One face at one size and outline setting, with its lazily filled glyph table.
///
/// The atlas is shared between fonts and passed in by the owner on every
/// call that may rasterize.
pub struct Font {
    name: String,
    path: PathBuf,
    size: Pt,
    outline: OutlineType,
    outline_thickness: Pt,
    metrics: FontMetrics,
    glyphs: GlyphCache,
    rasterizer: Box<dyn Rasterizer>,
}

impl Font {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        spec: &FontSpec,
        rasterizer: Box<dyn Rasterizer>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size: spec.size,
            outline: spec.outline,
            outline_thickness: spec.outline_thickness,
            metrics: rasterizer.metrics(),
            glyphs: GlyphCache::new(),
            rasterizer,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> Pt {
        self.size
    }

    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    /// Already rasterized glyph, without touching the atlas.
    pub fn find_glyph(&self, charcode: i32) -> Option<&Glyph> {
        self.glyphs.get(charcode)
    }

    /// Glyph for `charcode`, rasterized into `atlas` on first use.
    /// [`EMPTY_GLYPH`] yields the solid blank cell used by decorations.
    pub fn glyph(&mut self, atlas: &mut TextureAtlas, charcode: i32) -> Result<&Glyph> {
        if !self.glyphs.contains(charcode) {
            if charcode == EMPTY_GLYPH {
                self.insert_empty(atlas)?;
            } else {
                let ch = u32::try_from(charcode)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or(TextError::GlyphNotFound { charcode })?;
                self.insert_char(atlas, ch)?;
            }
        }
        self.glyphs
            .get(charcode)
            .ok_or(TextError::GlyphNotFound { charcode })
    }

    /// Rasterizes every character of `text` not yet in the table.
    /// Returns how many could not be loaded.
    pub fn load_glyphs(&mut self, atlas: &mut TextureAtlas, text: &str) -> usize {
        let mut missed = 0;
        for ch in text.chars() {
            if ch == '\n' || self.glyphs.contains(ch as i32) {
                continue;
            }
            if let Err(err) = self.insert_char(atlas, ch) {
                log::debug!("{}: cannot load {ch:?}: {err}", self.name);
                missed += 1;
            }
        }
        missed
    }

    /// Kerning applied before `charcode` when it follows `previous`.
    /// Looked up once per pair and cached on the glyph; unknown glyphs give 0.
    pub fn kerning(&mut self, charcode: i32, previous: i32) -> f32 {
        let Some(glyph) = self.glyphs.get_mut(charcode) else {
            return 0.0;
        };
        if let Some(k) = glyph.cached_kerning(previous) {
            return k;
        }
        let pair = (
            u32::try_from(previous).ok().and_then(char::from_u32),
            u32::try_from(charcode).ok().and_then(char::from_u32),
        );
        let k = match pair {
            (Some(left), Some(right)) => self.rasterizer.kerning(left, right),
            _ => 0.0,
        };
        glyph.kerning.insert(previous, k);
        k
    }

    fn insert_empty(&mut self, atlas: &mut TextureAtlas) -> Result<()> {
        let region = atlas.allocate(5, 5)?;
        let depth = atlas.depth() as usize;
        let solid = vec![0xFFu8; 4 * 4 * depth];
        let rect = PackerRect {
            x: region.x,
            y: region.y,
            w: 4,
            h: 4,
        };
        atlas.set_region(rect, &solid, 4 * depth)?;

        // Sample the centre texel only, away from any filtered edge.
        let (w, h) = (atlas.width() as f32, atlas.height() as f32);
        let uv = [
            (region.x + 2) as f32 / w,
            (region.y + 2) as f32 / h,
            (region.x + 3) as f32 / w,
            (region.y + 3) as f32 / h,
        ];
        self.glyphs.insert(Glyph {
            charcode: EMPTY_GLYPH,
            width: 0,
            height: 0,
            offset_x: 0,
            offset_y: 0,
            advance_x: 0.0,
            advance_y: 0.0,
            uv,
            kerning: Default::default(),
        });
        Ok(())
    }

    fn insert_char(&mut self, atlas: &mut TextureAtlas, ch: char) -> Result<()> {
        let bitmap = self.rasterizer.rasterize(ch)?;
        let bitmap = outline::apply(&bitmap, self.outline, self.outline_thickness.as_f32());

        let mut uv = [0.0; 4];
        if bitmap.width > 0 && bitmap.height > 0 {
            // One texel gutter right and below keeps neighbours from bleeding in.
            let region = atlas.allocate(bitmap.width + 1, bitmap.height + 1)?;
            let rect = PackerRect {
                x: region.x,
                y: region.y,
                w: bitmap.width,
                h: bitmap.height,
            };
            let depth = atlas.depth() as usize;
            let texels: Vec<u8> = if depth == 1 {
                bitmap.coverage.clone()
            } else {
                bitmap
                    .coverage
                    .iter()
                    .flat_map(|&a| std::iter::repeat_n(a, depth))
                    .collect()
            };
            atlas.set_region(rect, &texels, bitmap.width as usize * depth)?;
            uv = atlas.uv(&rect);
        }

        self.glyphs.insert(Glyph {
            charcode: ch as i32,
            width: bitmap.width,
            height: bitmap.height,
            offset_x: bitmap.offset_x,
            offset_y: bitmap.offset_y,
            advance_x: bitmap.advance_x,
            advance_y: bitmap.advance_y,
            uv,
            kerning: Default::default(),
        });
        Ok(())
    }
}
