use rustc_hash::FxHashMap;

/// Charcode of the blank cell every font reserves for decoration quads.
pub const EMPTY_GLYPH: i32 = -1;

/// A rasterized character: where it sits in the atlas and how it advances.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub charcode: i32,
    pub width: u32,
    pub height: u32,
    pub offset_x: i32,
    pub offset_y: i32,
    pub advance_x: f32,
    pub advance_y: f32,
    /// `[s0, t0, s1, t1]`
    pub uv: [f32; 4],
    /// Adjustment keyed by the charcode of the preceding character.
    pub(crate) kerning: FxHashMap<i32, f32>,
}

impl Glyph {
    pub fn cached_kerning(&self, previous: i32) -> Option<f32> {
        self.kerning.get(&previous).copied()
    }
}

/// Glyphs of one font keyed by charcode.
pub(crate) struct GlyphCache {
    cache: FxHashMap<i32, Glyph>,
}

impl GlyphCache {
    pub(crate) fn new() -> Self {
        Self {
            cache: FxHashMap::default(),
        }
    }

    pub(crate) fn get(&self, charcode: i32) -> Option<&Glyph> {
        self.cache.get(&charcode)
    }

    pub(crate) fn get_mut(&mut self, charcode: i32) -> Option<&mut Glyph> {
        self.cache.get_mut(&charcode)
    }

    pub(crate) fn insert(&mut self, glyph: Glyph) {
        self.cache.insert(glyph.charcode, glyph);
    }

    pub(crate) fn contains(&self, charcode: i32) -> bool {
        self.cache.contains_key(&charcode)
    }

    pub(crate) fn len(&self) -> usize {
        self.cache.len()
    }
}

impl Default for GlyphCache {
    fn default() -> Self {
        Self::new()
    }
}
