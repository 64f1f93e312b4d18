//! Deterministic font stand-ins so the caches can be tested without font files.

use crate::error::{Result, TextError};
use crate::rasterizer::{FontLoader, FontMetrics, GlyphBitmap, Rasterizer};
use crate::resolve::ResourceResolver;
use std::cell::Cell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Every printable character is a `width x height` block filled with its own
/// low byte; spaces have no bitmap; `missing` characters do not exist.
#[derive(Clone)]
pub(crate) struct FixedRasterizer {
    pub metrics: FontMetrics,
    pub advance: f32,
    pub width: u32,
    pub height: u32,
    pub missing: Vec<char>,
    pub kerning: HashMap<(char, char), f32>,
    pub rasterized: Rc<Cell<usize>>,
    pub kerning_queries: Rc<Cell<usize>>,
}

impl FixedRasterizer {
    pub(crate) fn new(advance: f32) -> Self {
        Self {
            metrics: FontMetrics {
                height: 20.0,
                linegap: 0.0,
                ascender: 0.0,
                descender: 0.0,
                underline_position: -2.0,
                underline_thickness: 1.0,
            },
            advance,
            width: 6,
            height: 8,
            missing: Vec::new(),
            kerning: HashMap::new(),
            rasterized: Rc::new(Cell::new(0)),
            kerning_queries: Rc::new(Cell::new(0)),
        }
    }

    pub(crate) fn with_metrics(mut self, ascender: f32, descender: f32, height: f32) -> Self {
        self.metrics.ascender = ascender;
        self.metrics.descender = descender;
        self.metrics.height = height;
        self
    }
}

impl Rasterizer for FixedRasterizer {
    fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    fn rasterize(&mut self, ch: char) -> Result<GlyphBitmap> {
        self.rasterized.set(self.rasterized.get() + 1);
        if self.missing.contains(&ch) || ch.is_control() {
            return Err(TextError::GlyphNotFound {
                charcode: ch as i32,
            });
        }
        if ch == ' ' {
            return Ok(GlyphBitmap {
                advance_x: self.advance,
                ..GlyphBitmap::default()
            });
        }
        Ok(GlyphBitmap {
            width: self.width,
            height: self.height,
            offset_x: 1,
            offset_y: self.height as i32,
            advance_x: self.advance,
            advance_y: 0.0,
            coverage: vec![ch as u32 as u8; (self.width * self.height) as usize],
        })
    }

    fn kerning(&mut self, left: char, right: char) -> f32 {
        self.kerning_queries.set(self.kerning_queries.get() + 1);
        self.kerning.get(&(left, right)).copied().unwrap_or(0.0)
    }
}

/// Hands out clones of a template rasterizer and remembers what was opened.
pub(crate) struct FixedLoader {
    pub template: FixedRasterizer,
    pub opened: Rc<std::cell::RefCell<Vec<(PathBuf, f32)>>>,
}

impl FixedLoader {
    pub(crate) fn new(template: FixedRasterizer) -> Self {
        Self {
            template,
            opened: Rc::default(),
        }
    }
}

impl FontLoader for FixedLoader {
    fn load(&mut self, path: &Path, size: f32) -> anyhow::Result<Box<dyn Rasterizer>> {
        if path.to_string_lossy().contains("Broken") {
            return Err(anyhow::anyhow!("Failed to parse font: {}", path.display()));
        }
        self.opened.borrow_mut().push((path.to_path_buf(), size));
        Ok(Box::new(self.template.clone()))
    }
}

/// Resolves every name except those listed as absent.
#[derive(Default)]
pub(crate) struct MemoryResolver {
    pub absent: Vec<String>,
}

impl ResourceResolver for MemoryResolver {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        if self.absent.iter().any(|a| a == name) {
            None
        } else {
            Some(PathBuf::from(format!("mem/fonts/{name}.ttf")))
        }
    }
}
