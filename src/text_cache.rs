//! Frame-coherent cache of shaped strings.
//!
//! Entries live in one of two generations. Every `get` during a frame moves
//! the entry into `this_frame`; `advance_frame` destroys whatever is still in
//! `last_frame` and demotes `this_frame`. Text shown every frame is shaped
//! once, text that disappears is dropped one frame later.
//!
//! `advance_frame` must run exactly once between frames. Skipping it lets the
//! cache grow without bound; calling it twice evicts text the current frame
//! still draws (it will be reshaped on the next `get`).

use crate::config::TextConfig;
use crate::error::Result;
use crate::font_cache::{FontCache, FontId};
use crate::hash::text_key;
use crate::measure::{self, TextPosition};
use crate::shaper::TextBuffer;
use crate::style::TextStyle;
use rustc_hash::FxHashMap;
use ultraviolet::Vec2;

/// A string shaped once at pen (0, 0), ready to be drawn anywhere.
#[derive(Debug)]
pub struct ShapedText {
    key: u32,
    serial: u64,
    style: TextStyle,
    text: String,
    font: FontId,
    buffer: TextBuffer,
    pen: Vec2,
}

impl ShapedText {
    pub fn key(&self) -> u32 {
        self.key
    }

    /// Unique per shaping run; a reshaped string gets a new serial.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn font(&self) -> FontId {
        self.font
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    /// Pen position after the last character.
    pub fn pen(&self) -> Vec2 {
        self.pen
    }

    fn matches(&self, style: &TextStyle, text: &str) -> bool {
        self.text == text && &self.style == style
    }
}

type Generation = FxHashMap<u32, Vec<ShapedText>>;

pub struct TextShapeCache {
    this_frame: Generation,
    last_frame: Generation,
    fonts: FontCache,
    /// Atlas generation the cached geometry was shaped against.
    atlas_generation: u64,
    frame: u64,
    next_serial: u64,
    shaped: u64,
    evicted: u64,
}

impl TextShapeCache {
    pub fn new(config: &TextConfig) -> Self {
        Self::with_fonts(FontCache::new(config))
    }

    pub fn with_fonts(fonts: FontCache) -> Self {
        Self {
            this_frame: Generation::default(),
            last_frame: Generation::default(),
            atlas_generation: fonts.atlas().generation(),
            fonts,
            frame: 0,
            next_serial: 0,
            shaped: 0,
            evicted: 0,
        }
    }

    /// Shaped geometry for `text` in `style`, reusing the entry from this or
    /// the previous frame when there is one.
    ///
    /// Keys are a 32-bit hash of style and text; entries sharing a key are
    /// told apart by comparing the style and the text themselves.
    pub fn get(&mut self, style: &TextStyle, text: &str) -> Result<&ShapedText> {
        self.sync_atlas();
        let key = text_key(style.style_hash(), text);

        if let Some(i) = Self::position(&self.this_frame, key, style, text) {
            return Ok(&self.this_frame[&key][i]);
        }

        let entry = match Self::take(&mut self.last_frame, key, style, text) {
            Some(entry) => entry,
            None => self.shape(key, style, text)?,
        };
        let bucket = self.this_frame.entry(key).or_default();
        bucket.push(entry);
        Ok(&bucket[bucket.len() - 1])
    }

    fn position(table: &Generation, key: u32, style: &TextStyle, text: &str) -> Option<usize> {
        table.get(&key)?.iter().position(|e| e.matches(style, text))
    }

    fn take(table: &mut Generation, key: u32, style: &TextStyle, text: &str) -> Option<ShapedText> {
        let bucket = table.get_mut(&key)?;
        let i = bucket.iter().position(|e| e.matches(style, text))?;
        let entry = bucket.swap_remove(i);
        if bucket.is_empty() {
            table.remove(&key);
        }
        Some(entry)
    }

    fn shape(&mut self, key: u32, style: &TextStyle, text: &str) -> Result<ShapedText> {
        let font = self.fonts.get_from_style(style)?;
        let mut buffer = TextBuffer::new();
        let mut pen = Vec2::zero();
        buffer.add_text(&mut self.fonts, &mut pen, style, text)?;

        self.next_serial += 1;
        self.shaped += 1;
        log::debug!("new text cache entry {key:#010x} for {text:?}");
        Ok(ShapedText {
            key,
            serial: self.next_serial,
            style: style.clone(),
            text: text.to_string(),
            font,
            buffer,
            pen,
        })
    }

    /// Drops every entry if the atlas was cleared behind the cache's back,
    /// e.g. through `fonts_mut().clear()`.
    fn sync_atlas(&mut self) {
        let generation = self.fonts.atlas().generation();
        if generation == self.atlas_generation {
            return;
        }
        let n = self.drop_entries();
        log::debug!("atlas cleared, dropped {n} text cache entries");
        self.atlas_generation = generation;
    }

    fn drop_entries(&mut self) -> usize {
        let n: usize = self.this_frame.values().chain(self.last_frame.values()).map(Vec::len).sum();
        self.this_frame.clear();
        self.last_frame.clear();
        self.evicted += n as u64;
        n
    }

    /// Ends the current frame: entries unused for a whole frame are dropped.
    pub fn advance_frame(&mut self) {
        self.sync_atlas();
        let promoted = std::mem::take(&mut self.this_frame);
        let stale = std::mem::replace(&mut self.last_frame, promoted);
        let dropped: usize = stale.values().map(Vec::len).sum();
        if dropped > 0 {
            log::debug!("frame {}: evicted {dropped} text cache entries", self.frame);
        }
        self.evicted += dropped as u64;
        self.frame += 1;
    }

    /// Whether `get` would return without shaping.
    pub fn contains(&self, style: &TextStyle, text: &str) -> bool {
        if self.fonts.atlas().generation() != self.atlas_generation {
            return false;
        }
        let key = text_key(style.style_hash(), text);
        Self::position(&self.this_frame, key, style, text).is_some()
            || Self::position(&self.last_frame, key, style, text).is_some()
    }

    /// Drops every entry, every font and the atlas contents.
    pub fn clear(&mut self) {
        self.drop_entries();
        self.fonts.clear();
        self.atlas_generation = self.fonts.atlas().generation();
    }

    pub fn len(&self) -> usize {
        self.this_frame_len() + self.last_frame.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn this_frame_len(&self) -> usize {
        self.this_frame.values().map(Vec::len).sum()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Number of shaping runs since creation.
    pub fn shape_count(&self) -> u64 {
        self.shaped
    }

    pub fn evicted_count(&self) -> u64 {
        self.evicted
    }

    pub fn fonts(&self) -> &FontCache {
        &self.fonts
    }

    pub fn fonts_mut(&mut self) -> &mut FontCache {
        &mut self.fonts
    }

    pub fn text_width(&mut self, style: &TextStyle, text: &str) -> Result<f32> {
        let id = self.fonts.get_from_style(style)?;
        let (font, atlas) = self.fonts.font_and_atlas(id)?;
        Ok(measure::text_width(font, atlas, text))
    }

    pub fn position_at_offset(&mut self, style: &TextStyle, text: &str, offset: f32) -> Result<TextPosition> {
        let id = self.fonts.get_from_style(style)?;
        let (font, atlas) = self.fonts.font_and_atlas(id)?;
        Ok(measure::position_at_offset(font, atlas, text, offset))
    }

    pub fn offsets_for_position(&mut self, style: &TextStyle, text: &str, index: usize) -> Result<TextPosition> {
        let id = self.fonts.get_from_style(style)?;
        let (font, atlas) = self.fonts.font_and_atlas(id)?;
        Ok(measure::offsets_for_position(font, atlas, text, index))
    }

    /// `(columns, rows)` of monospaced cells in a `width x height` area.
    pub fn char_grid(&mut self, style: &TextStyle, width: f32, height: f32) -> Result<(usize, usize)> {
        let id = self.fonts.get_from_style(style)?;
        let (font, atlas) = self.fonts.font_and_atlas(id)?;
        Ok(measure::char_grid(font, atlas, width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TextError;
    use crate::test_support::{FixedLoader, FixedRasterizer, MemoryResolver, init_logging};

    fn cache() -> TextShapeCache {
        init_logging();
        TextShapeCache::with_fonts(FontCache::with_backend(
            &TextConfig::default().with_atlas_size(256, 256),
            Box::new(MemoryResolver {
                absent: vec!["Missing".to_string()],
            }),
            Box::new(FixedLoader::new(FixedRasterizer::new(10.0))),
        ))
    }

    fn identity(entry: &ShapedText) -> (u64, *const u8) {
        (entry.serial(), entry.buffer().vertices().as_ptr().cast())
    }

    #[test]
    fn test_same_frame_hits_are_idempotent() {
        let mut cache = cache();
        let style = TextStyle::new("Mono", 12.0);
        let a = identity(cache.get(&style, "hello").unwrap());
        let b = identity(cache.get(&style, "hello").unwrap());
        assert_eq!(a, b);
        assert_eq!(cache.shape_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_retained_across_one_advance() {
        let mut cache = cache();
        let style = TextStyle::new("Mono", 12.0);
        let first = identity(cache.get(&style, "score: 10").unwrap());

        cache.advance_frame();
        assert_eq!(cache.this_frame_len(), 0);
        let second = identity(cache.get(&style, "score: 10").unwrap());
        assert_eq!(first, second);
        assert_eq!(cache.shape_count(), 1);

        // Used every frame: survives indefinitely.
        for _ in 0..5 {
            cache.advance_frame();
            assert_eq!(identity(cache.get(&style, "score: 10").unwrap()), first);
        }
        assert_eq!(cache.shape_count(), 1);
        assert_eq!(cache.evicted_count(), 0);
    }

    #[test]
    fn test_evicted_after_two_unused_advances() {
        let mut cache = cache();
        let style = TextStyle::new("Mono", 12.0);
        let first = cache.get(&style, "gone").unwrap().serial();

        cache.advance_frame();
        assert!(cache.contains(&style, "gone"));
        cache.advance_frame();
        assert!(!cache.contains(&style, "gone"));
        assert_eq!(cache.evicted_count(), 1);
        assert!(cache.is_empty());

        let again = cache.get(&style, "gone").unwrap().serial();
        assert_ne!(first, again);
        assert_eq!(cache.shape_count(), 2);
        assert_eq!(cache.frame(), 2);
    }

    #[test]
    fn test_double_advance_evicts_current_frame_text() {
        let mut cache = cache();
        let style = TextStyle::new("Mono", 12.0);
        cache.get(&style, "hud").unwrap();
        cache.advance_frame();
        cache.get(&style, "hud").unwrap();
        // Misuse: two advances at one frame boundary.
        cache.advance_frame();
        cache.advance_frame();
        assert!(!cache.contains(&style, "hud"));
        cache.get(&style, "hud").unwrap();
        assert_eq!(cache.shape_count(), 2);
    }

    #[test]
    fn test_without_advance_every_entry_is_kept() {
        let mut cache = cache();
        let style = TextStyle::new("Mono", 12.0);
        for i in 0..50 {
            cache.get(&style, &format!("line {i}")).unwrap();
        }
        assert_eq!(cache.len(), 50);
        assert_eq!(cache.this_frame_len(), 50);
        assert_eq!(cache.shape_count(), 50);
        assert_eq!(cache.evicted_count(), 0);
        assert_eq!(cache.frame(), 0);
    }

    #[test]
    fn test_atlas_clear_through_fonts_drops_entries() {
        let mut cache = cache();
        let style = TextStyle::new("Mono", 12.0);
        let first = cache.get(&style, "a").unwrap().serial();
        cache.advance_frame();
        cache.get(&style, "b").unwrap();
        assert_eq!(cache.len(), 2);

        cache.fonts_mut().clear();
        assert!(!cache.contains(&style, "a"));

        // 'x' now takes the cell 'a' used to have.
        let x_uv = cache.get(&style, "x").unwrap().buffer().vertices()[0].uv;
        let (serial, a_uv, font) = {
            let a = cache.get(&style, "a").unwrap();
            (a.serial(), a.buffer().vertices()[0].uv, a.font())
        };
        assert_ne!(serial, first);
        assert_ne!(a_uv, x_uv);
        let glyph = cache.fonts().font(font).unwrap().find_glyph('a' as i32).unwrap();
        assert_eq!(a_uv, [glyph.uv[0], glyph.uv[1]]);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.evicted_count(), 2);
        assert_eq!(cache.shape_count(), 4);
    }

    #[test]
    fn test_same_text_different_styles() {
        let mut cache = cache();
        let white = TextStyle::new("Mono", 12.0);
        let red = TextStyle::new("Mono", 12.0).with_color([1.0, 0.0, 0.0, 1.0]);

        let a = cache.get(&white, "ok").unwrap().key();
        let b = cache.get(&red, "ok").unwrap().key();
        assert_ne!(a, b);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.fonts().len(), 1);

        // Only the red one is used next frame; the white one ages out alone.
        cache.advance_frame();
        cache.get(&red, "ok").unwrap();
        cache.advance_frame();
        assert!(cache.contains(&red, "ok"));
        assert!(!cache.contains(&white, "ok"));
    }

    #[test]
    fn test_colliding_keys_are_kept_apart() {
        let mut cache = cache();
        let style = TextStyle::new("Mono", 12.0);
        let real = cache.get(&style, "b").unwrap().serial();

        // File an entry for other text under the key of "a".
        let key_a = text_key(style.style_hash(), "a");
        let key_b = text_key(style.style_hash(), "b");
        let impostor = cache.this_frame.remove(&key_b).unwrap();
        cache.this_frame.insert(key_a, impostor);

        let entry = cache.get(&style, "a").unwrap();
        assert_eq!(entry.text(), "a");
        assert_ne!(entry.serial(), real);
        assert_eq!(cache.this_frame[&key_a].len(), 2);
    }

    #[test]
    fn test_entry_geometry() {
        let mut cache = cache();
        let style = TextStyle::new("Mono", 12.0);
        let entry = cache.get(&style, "AB\nC").unwrap();
        assert_eq!(entry.buffer().vertex_count(), 12);
        assert_eq!(entry.buffer().index_count(), 18);
        assert_eq!(entry.pen(), Vec2::new(10.0, -20.0));
        assert_eq!(entry.text(), "AB\nC");
    }

    #[test]
    fn test_font_errors_propagate() {
        let mut cache = cache();
        let style = TextStyle::new("Missing", 12.0);
        assert!(matches!(cache.get(&style, "x"), Err(TextError::FontLoad { .. })));
        assert!(cache.is_empty());
        assert!(cache.text_width(&style, "x").is_err());
    }

    #[test]
    fn test_measurement_forwards() {
        let mut cache = cache();
        let style = TextStyle::new("Mono", 12.0);
        assert_eq!(cache.text_width(&style, "abc").unwrap(), 30.0);
        let pos = cache.position_at_offset(&style, "abc", 15.0).unwrap();
        assert_eq!(pos.char_offset, 1);
        let pos = cache.offsets_for_position(&style, "abc", 2).unwrap();
        assert_eq!((pos.left_offset, pos.right_offset), (20.0, 30.0));
        assert_eq!(cache.char_grid(&style, 95.0, 45.0).unwrap(), (9, 2));
        // Measuring does not shape.
        assert_eq!(cache.shape_count(), 0);
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut cache = cache();
        let style = TextStyle::new("Mono", 12.0);
        cache.get(&style, "a").unwrap();
        cache.advance_frame();
        cache.get(&style, "b").unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.fonts().is_empty());
        assert_eq!(cache.fonts().atlas().used(), 0);
    }
}
