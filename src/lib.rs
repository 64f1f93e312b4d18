//! textcat - retained-mode text rendering on wgpu.
//!
//! Glyphs are rasterized once into a shared skyline-packed atlas, strings are
//! shaped once into vertex/index buffers, and shaped strings are kept alive
//! for as long as they are drawn every frame.
//!
//! # Example
//! ```no_run
//! use textcat::{TextConfig, TextShapeCache, TextStyle};
//!
//! let mut cache = TextShapeCache::new(&TextConfig::from_env());
//! let style = TextStyle::new("DejaVuSans", 16.0).with_underline([1.0, 1.0, 1.0, 1.0]);
//!
//! for frame in 0..3 {
//!     let shaped = cache.get(&style, &format!("frame {frame}")).unwrap();
//!     println!("{} quads", shaped.buffer().vertex_count() / 4);
//!     cache.advance_frame();
//! }
//! ```

mod atlas;
mod buffer;
mod config;
mod error;
mod font;
mod font_cache;
mod glyph_cache;
mod hash;
mod measure;
mod outline;
mod packer;
mod pt;
mod rasterizer;
mod resolve;
mod shaper;
mod style;
mod text_cache;
mod text_renderer;
mod texture;

#[cfg(test)]
mod test_support;

pub use atlas::{AtlasUpload, MIN_ATLAS_SIZE, TextureAtlas, UploadRegion};
pub use buffer::{BufferObject, BufferSink, DirtyState, PendingUpload};
pub use config::TextConfig;
pub use error::{Result, TextError};
pub use font::Font;
pub use font_cache::{FontCache, FontId, FontSpec};
pub use glyph_cache::{EMPTY_GLYPH, Glyph};
pub use measure::TextPosition;
pub use packer::{AtlasPacker, PackerRect, SkylineNode};
pub use pt::Pt;
pub use rasterizer::{
    AbGlyphLoader, AbGlyphRasterizer, FontLoader, FontMetrics, GlyphBitmap, Rasterizer,
    load_font_from_file,
};
pub use resolve::{DirectoryResolver, ResourceResolver};
pub use shaper::{GlyphVertex, TextBuffer};
pub use style::{OutlineType, TextStyle};
pub use text_cache::{ShapedText, TextShapeCache};
pub use text_renderer::TextRenderer;
