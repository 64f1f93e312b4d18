use crate::font_cache::FontId;

/// Failures surfaced by the atlas, glyph tables and caches.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TextError {
    /// The atlas has no skyline span left for a `width` x `height` request.
    #[error("texture atlas full: no room for {width}x{height} region")]
    AtlasFull { width: u32, height: u32 },

    /// The rasterizer has no outline for this character.
    #[error("no glyph for charcode {charcode}")]
    GlyphNotFound { charcode: i32 },

    #[error("failed to load font {name}: {reason}")]
    FontLoad { name: String, reason: String },

    /// A region write or allocation that does not fit the atlas surface.
    #[error("invalid atlas region {x},{y} {w}x{h}")]
    InvalidRegion { x: u32, y: u32, w: u32, h: u32 },

    #[error("unknown font id {0:?}")]
    UnknownFont(FontId),
}

pub type Result<T> = std::result::Result<T, TextError>;
