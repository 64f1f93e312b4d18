use crate::Pt;
use crate::font_cache::FontSpec;
use crate::hash::hash32;
use std::hash::{Hash, Hasher};

/// How glyph coverage is turned into an outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutlineType {
    #[default]
    None,
    /// Stroke centred on the glyph edge.
    Line,
    /// Stroke inside the glyph edge.
    Inner,
    /// Stroke outside the glyph edge.
    Outer,
}

/// Everything that changes how a run of text looks.
///
/// Font fields pick the glyph table; the rest only affects the emitted
/// vertices. Two styles are equal when every field matches bit for bit.
#[derive(Debug, Clone)]
pub struct TextStyle {
    pub(crate) family: String,
    pub(crate) size: Pt,
    pub(crate) bold: bool,
    pub(crate) italic: bool,
    pub(crate) foreground: [f32; 4],
    pub(crate) background: [f32; 4],
    pub(crate) spacing: f32,
    pub(crate) gamma: f32,
    pub(crate) outline: OutlineType,
    pub(crate) outline_thickness: Pt,
    pub(crate) underline: Option<[f32; 4]>,
    pub(crate) overline: Option<[f32; 4]>,
    pub(crate) strikethrough: Option<[f32; 4]>,
}

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

impl TextStyle {
    /// White text on a transparent background, no decorations.
    pub fn new(family: impl Into<String>, size: impl Into<Pt>) -> Self {
        Self {
            family: family.into(),
            size: size.into(),
            bold: false,
            italic: false,
            foreground: WHITE,
            background: [0.0; 4],
            spacing: 0.0,
            gamma: 1.0,
            outline: OutlineType::None,
            outline_thickness: Pt(1.0),
            underline: None,
            overline: None,
            strikethrough: None,
        }
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.foreground = color;
        self
    }

    /// A background quad is emitted behind each glyph when alpha is above zero.
    pub fn with_background(mut self, color: [f32; 4]) -> Self {
        self.background = color;
        self
    }

    /// Extra advance as a fraction of each glyph's own advance.
    pub fn with_spacing(mut self, spacing: f32) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_outline(mut self, outline: OutlineType, thickness: impl Into<Pt>) -> Self {
        self.outline = outline;
        self.outline_thickness = thickness.into();
        self
    }

    pub fn with_underline(mut self, color: [f32; 4]) -> Self {
        self.underline = Some(color);
        self
    }

    pub fn with_overline(mut self, color: [f32; 4]) -> Self {
        self.overline = Some(color);
        self
    }

    pub fn with_strikethrough(mut self, color: [f32; 4]) -> Self {
        self.strikethrough = Some(color);
        self
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn size(&self) -> Pt {
        self.size
    }

    /// The part of the style that selects a font instance.
    pub fn font_spec(&self) -> FontSpec {
        FontSpec {
            family: self.family.clone(),
            size: self.size,
            bold: self.bold,
            italic: self.italic,
            outline: self.outline,
            outline_thickness: self.outline_thickness,
        }
    }

    /// 32-bit hash over every field.
    pub fn style_hash(&self) -> u32 {
        hash32(self)
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self::new("DejaVuSans", 16.0)
    }
}

fn color_bits(c: &[f32; 4]) -> [u32; 4] {
    c.map(f32::to_bits)
}

impl PartialEq for TextStyle {
    fn eq(&self, other: &Self) -> bool {
        self.family == other.family
            && self.size == other.size
            && self.bold == other.bold
            && self.italic == other.italic
            && color_bits(&self.foreground) == color_bits(&other.foreground)
            && color_bits(&self.background) == color_bits(&other.background)
            && self.spacing.to_bits() == other.spacing.to_bits()
            && self.gamma.to_bits() == other.gamma.to_bits()
            && self.outline == other.outline
            && self.outline_thickness == other.outline_thickness
            && self.underline.as_ref().map(color_bits) == other.underline.as_ref().map(color_bits)
            && self.overline.as_ref().map(color_bits) == other.overline.as_ref().map(color_bits)
            && self.strikethrough.as_ref().map(color_bits)
                == other.strikethrough.as_ref().map(color_bits)
    }
}

impl Eq for TextStyle {}

impl Hash for TextStyle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.family.hash(state);
        self.size.hash(state);
        self.bold.hash(state);
        self.italic.hash(state);
        color_bits(&self.foreground).hash(state);
        color_bits(&self.background).hash(state);
        self.spacing.to_bits().hash(state);
        self.gamma.to_bits().hash(state);
        self.outline.hash(state);
        self.outline_thickness.hash(state);
        self.underline.as_ref().map(color_bits).hash(state);
        self.overline.as_ref().map(color_bits).hash(state);
        self.strikethrough.as_ref().map(color_bits).hash(state);
    }
}
