//! Turns styled strings into glyph and decoration quads.
//!
//! Coordinates are y-up pixels: the pen sits on the baseline and moves down
//! (towards negative y) for each new line.

use crate::atlas::TextureAtlas;
use crate::buffer::{BufferObject, BufferSink};
use crate::error::Result;
use crate::font::Font;
use crate::font_cache::FontCache;
use crate::glyph_cache::{EMPTY_GLYPH, Glyph};
use crate::style::TextStyle;
use bytemuck::{Pod, Zeroable};
use ultraviolet::Vec2;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GlyphVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 4],
    /// Fractional pixel part of the unsnapped x, for subpixel filtering.
    pub shift: f32,
    pub gamma: f32,
}

const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

/// Placement data copied out of a [`Glyph`] so the font can be borrowed again.
#[derive(Clone, Copy)]
struct Placement {
    width: f32,
    height: f32,
    offset_x: f32,
    offset_y: f32,
    advance_x: f32,
    uv: [f32; 4],
}

impl From<&Glyph> for Placement {
    fn from(g: &Glyph) -> Self {
        Self {
            width: g.width as f32,
            height: g.height as f32,
            offset_x: g.offset_x as f32,
            offset_y: g.offset_y as f32,
            advance_x: g.advance_x,
            uv: g.uv,
        }
    }
}

/// Vertex and index stream for a block of text, plus the line state needed
/// to keep appending to it.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    vertices: BufferObject<GlyphVertex>,
    indices: BufferObject<u32>,
    pen_origin: Vec2,
    line_start: usize,
    line_ascender: f32,
    line_descender: f32,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self {
            vertices: BufferObject::new(),
            indices: BufferObject::new(),
            pen_origin: Vec2::zero(),
            line_start: 0,
            line_ascender: 0.0,
            line_descender: 0.0,
        }
    }
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertices(&self) -> &[GlyphVertex] {
        self.vertices.as_slice()
    }

    pub fn indices(&self) -> &[u32] {
        self.indices.as_slice()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Where the first line started; newlines return the pen to its x.
    pub fn pen_origin(&self) -> Vec2 {
        self.pen_origin
    }

    /// Appends `text` at `pen`, leaving `pen` after the last character.
    ///
    /// The first text in an empty buffer fixes the line origin. Text added to
    /// a non-empty buffer starts one ascender lower than `pen`.
    pub fn add_text(
        &mut self,
        fonts: &mut FontCache,
        pen: &mut Vec2,
        style: &TextStyle,
        text: &str,
    ) -> Result<()> {
        let id = fonts.get_from_style(style)?;
        if text.is_empty() {
            return Ok(());
        }
        let (font, atlas) = fonts.font_and_atlas(id)?;

        if self.vertices.is_empty() {
            self.pen_origin = *pen;
        } else {
            pen.y -= font.metrics().ascender;
        }
        self.add_run(font, atlas, pen, style, text);
        Ok(())
    }

    /// Appends several differently styled runs on the same line flow.
    pub fn add_runs(
        &mut self,
        fonts: &mut FontCache,
        pen: &mut Vec2,
        runs: &[(&TextStyle, &str)],
    ) -> Result<()> {
        if self.vertices.is_empty() {
            self.pen_origin = *pen;
        }
        for (style, text) in runs {
            let id = fonts.get_from_style(style)?;
            if text.is_empty() {
                continue;
            }
            let (font, atlas) = fonts.font_and_atlas(id)?;
            self.add_run(font, atlas, pen, style, text);
        }
        Ok(())
    }

    fn add_run(
        &mut self,
        font: &mut Font,
        atlas: &mut TextureAtlas,
        pen: &mut Vec2,
        style: &TextStyle,
        text: &str,
    ) {
        let missed = font.load_glyphs(atlas, text);
        if missed > 0 {
            log::debug!("{}: {missed} characters of {text:?} have no glyph", font.name());
        }

        let mut previous = None;
        for ch in text.chars() {
            self.add_char(font, atlas, pen, style, ch, previous);
            previous = Some(ch);
        }
    }

    /// Lays out one character. Returns `false` when nothing was emitted
    /// (newline or missing glyph).
    pub fn add_char(
        &mut self,
        font: &mut Font,
        atlas: &mut TextureAtlas,
        pen: &mut Vec2,
        style: &TextStyle,
        current: char,
        previous: Option<char>,
    ) -> bool {
        let m = *font.metrics();

        if current == '\n' {
            pen.x = self.pen_origin.x;
            if previous == Some('\n') {
                // Empty line: no descender seen, use a synthetic gap.
                pen.y -= m.height * 1.1;
            } else {
                pen.y -= self.line_descender + m.height;
            }
            self.line_descender = 0.0;
            self.line_ascender = 0.0;
            self.line_start = self.vertices.len();
            return false;
        }

        if m.ascender > self.line_ascender {
            let y = pen.y;
            pen.y -= m.ascender - self.line_ascender;
            self.move_last_line((y - pen.y).trunc());
            self.line_ascender = m.ascender;
        }
        if m.descender < self.line_descender {
            self.line_descender = m.descender;
        }

        let glyph = match font.glyph(atlas, current as i32).map(Placement::from) {
            Ok(g) => g,
            Err(err) => {
                log::warn!("{}: skipping {current:?}: {err}", font.name());
                return false;
            }
        };
        let blank = match font.glyph(atlas, EMPTY_GLYPH).map(|g| g.uv) {
            Ok(uv) => uv,
            Err(err) => {
                log::warn!("{}: no blank cell, skipping {current:?}: {err}", font.name());
                return false;
            }
        };

        let mut kerning = 0.0;
        if let Some(previous) = previous {
            kerning = font.kerning(current as i32, previous as i32);
            pen.x += kerning;
        }

        let gamma = style.gamma;
        let x0 = pen.x - kerning;
        let x1 = x0 + glyph.advance_x;

        if style.background[3] > 0.0 {
            let y0 = (pen.y + m.descender).trunc();
            let y1 = (y0 + m.height + m.linegap).trunc();
            self.push_quad([x0, y0, x1, y1], true, blank, style.background, gamma);
        }

        if let Some(color) = style.underline {
            let y0 = (pen.y + m.underline_position).trunc();
            let y1 = (y0 + m.underline_thickness).trunc();
            self.push_quad([x0, y0, x1, y1], true, blank, color, gamma);
        }

        if let Some(color) = style.overline {
            let y0 = (pen.y + m.ascender.trunc()).trunc();
            let y1 = (y0 + m.underline_thickness.trunc()).trunc();
            self.push_quad([x0, y0, x1, y1], true, blank, color, gamma);
        }

        if let Some(color) = style.strikethrough {
            let y0 = (pen.y + (0.33 * m.ascender).trunc()).trunc();
            let y1 = (y0 + m.underline_thickness.trunc()).trunc();
            self.push_quad([x0, y0, x1, y1], true, blank, color, gamma);
        }

        {
            let x0 = pen.x + glyph.offset_x;
            let y0 = (pen.y + glyph.offset_y).trunc();
            let x1 = x0 + glyph.width;
            let y1 = (y0 - glyph.height).trunc();
            self.push_quad([x0, y0, x1, y1], false, glyph.uv, style.foreground, gamma);
        }

        pen.x += glyph.advance_x * (1.0 + style.spacing);
        true
    }

    /// Emits one quad. Decoration edges snap to whole pixels; glyph edges
    /// keep their fraction. `shift` always comes from the unsnapped x.
    fn push_quad(&mut self, rect: [f32; 4], snap_x: bool, uv: [f32; 4], color: [f32; 4], gamma: f32) {
        let [x0, y0, x1, y1] = rect;
        let [s0, t0, s1, t1] = uv;
        let vertex = |x: f32, y: f32, s: f32, t: f32| GlyphVertex {
            position: [if snap_x { x.trunc() } else { x }, y, 0.0],
            uv: [s, t],
            color,
            shift: x - x.trunc(),
            gamma,
        };
        let base = self.vertices.append(&[
            vertex(x0, y0, s0, t0),
            vertex(x0, y1, s0, t1),
            vertex(x1, y1, s1, t1),
            vertex(x1, y0, s1, t0),
        ]) as u32;
        self.indices.append(&QUAD_INDICES.map(|i| i + base));
    }

    /// Moves the vertices of the current line down by `dy`.
    fn move_last_line(&mut self, dy: f32) {
        let end = self.vertices.len();
        if self.line_start >= end || dy == 0.0 {
            return;
        }
        for v in self.vertices.slice_mut(self.line_start..end) {
            v.position[1] -= dy;
        }
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.line_start = 0;
        self.line_ascender = 0.0;
        self.line_descender = 0.0;
    }

    /// Pushes pending vertex and index changes. Returns whether anything was sent.
    pub fn commit(&mut self, vertex_sink: &mut dyn BufferSink, index_sink: &mut dyn BufferSink) -> bool {
        let v = self.vertices.commit(vertex_sink);
        let i = self.indices.commit(index_sink);
        v || i
    }
}
