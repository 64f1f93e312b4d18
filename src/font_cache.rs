use crate::Pt;
use crate::atlas::TextureAtlas;
use crate::config::TextConfig;
use crate::error::{Result, TextError};
use crate::font::Font;
use crate::glyph_cache::EMPTY_GLYPH;
use crate::hash::hash32;
use crate::rasterizer::{AbGlyphLoader, FontLoader};
use crate::resolve::{DirectoryResolver, ResourceResolver};
use crate::style::{OutlineType, TextStyle};
use rustc_hash::{FxHashMap, FxHashSet};

/// Handle of a font inside a [`FontCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontId(pub(crate) u32);

/// The style fields that select a distinct font instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontSpec {
    pub family: String,
    pub size: Pt,
    pub bold: bool,
    pub italic: bool,
    pub outline: OutlineType,
    pub outline_thickness: Pt,
}

impl FontSpec {
    pub fn new(family: impl Into<String>, size: impl Into<Pt>) -> Self {
        Self {
            family: family.into(),
            size: size.into(),
            bold: false,
            italic: false,
            outline: OutlineType::None,
            outline_thickness: Pt(1.0),
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

    pub fn with_outline(mut self, outline: OutlineType, thickness: impl Into<Pt>) -> Self {
        self.outline = outline;
        self.outline_thickness = thickness.into();
        self
    }

    /// Resource name: the family followed by `Bold` and `Italic` as set,
    /// e.g. `DejaVuSansBoldItalic`.
    pub fn resource_name(&self) -> String {
        format!(
            "{}{}{}",
            self.family,
            if self.bold { "Bold" } else { "" },
            if self.italic { "Italic" } else { "" }
        )
    }
}

struct FontEntry {
    spec: FontSpec,
    font: Font,
}

/// Fonts keyed by a hash of their [`FontSpec`], all packing glyphs into one atlas.
///
/// Ids are the spec hash. A second spec hashing to an occupied id moves
/// forward to the next free one, so equal ids always mean equal specs.
/// Deleted ids stay on the collision chain as tombstones until reused.
pub struct FontCache {
    atlas: TextureAtlas,
    fonts: FxHashMap<FontId, FontEntry>,
    deleted: FxHashSet<FontId>,
    resolver: Box<dyn ResourceResolver>,
    loader: Box<dyn FontLoader>,
    preload: String,
}

impl FontCache {
    /// Fonts from the configured directories, rasterized with ab_glyph.
    pub fn new(config: &TextConfig) -> Self {
        Self::with_backend(
            config,
            Box::new(DirectoryResolver::new(config.font_roots.clone())),
            Box::new(AbGlyphLoader),
        )
    }

    pub fn with_backend(
        config: &TextConfig,
        resolver: Box<dyn ResourceResolver>,
        loader: Box<dyn FontLoader>,
    ) -> Self {
        Self {
            atlas: TextureAtlas::new(config.atlas_width, config.atlas_height, config.atlas_depth),
            fonts: FxHashMap::default(),
            deleted: FxHashSet::default(),
            resolver,
            loader,
            preload: config.preload.clone(),
        }
    }

    pub fn get_from_style(&mut self, style: &TextStyle) -> Result<FontId> {
        self.get_from_spec(style.font_spec())
    }

    pub fn get_from_description(
        &mut self,
        family: &str,
        size: impl Into<Pt>,
        bold: bool,
        italic: bool,
    ) -> Result<FontId> {
        self.get_from_spec(
            FontSpec::new(family, size)
                .with_bold(bold)
                .with_italic(italic),
        )
    }

    /// Font whose file is `fonts/{name}.ttf` (or `.otf`), with no style
    /// suffixes added to the name.
    pub fn get_from_resource_name(&mut self, name: &str, size: impl Into<Pt>) -> Result<FontId> {
        self.get_from_spec(FontSpec::new(name, size))
    }

    pub fn get_from_spec(&mut self, spec: FontSpec) -> Result<FontId> {
        let mut id = FontId(hash32(&spec));
        let mut reuse = None;
        loop {
            match self.fonts.get(&id) {
                Some(entry) if entry.spec == spec => return Ok(id),
                Some(entry) => {
                    log::debug!("font id {:#010x} taken by {:?}, trying next", id.0, entry.spec);
                }
                None if self.deleted.contains(&id) => {
                    if reuse.is_none() {
                        reuse = Some(id);
                    }
                }
                None => break,
            }
            id = FontId(id.0.wrapping_add(1));
        }
        let id = reuse.unwrap_or(id);

        let font = self.open(&spec).inspect_err(|err| log::error!("{err}"))?;
        log::debug!(
            "opened font {} at {}px as {:#010x}",
            font.name(),
            spec.size,
            id.0
        );
        self.deleted.remove(&id);
        self.fonts.insert(id, FontEntry { spec, font });
        Ok(id)
    }

    fn open(&mut self, spec: &FontSpec) -> Result<Font> {
        let name = spec.resource_name();
        let path = self.resolver.resolve(&name).ok_or_else(|| TextError::FontLoad {
            name: name.clone(),
            reason: "no .ttf or .otf file found".to_string(),
        })?;
        let rasterizer = self
            .loader
            .load(&path, spec.size.as_f32())
            .map_err(|e| TextError::FontLoad {
                name: name.clone(),
                reason: format!("{e:#}"),
            })?;

        let mut font = Font::new(name, path, spec, rasterizer);
        font.glyph(&mut self.atlas, EMPTY_GLYPH)?;
        let missed = font.load_glyphs(&mut self.atlas, &self.preload);
        if missed > 0 {
            log::warn!("{}: {missed} preload glyphs unavailable", font.name());
        }
        Ok(font)
    }

    pub fn font(&self, id: FontId) -> Result<&Font> {
        self.fonts
            .get(&id)
            .map(|e| &e.font)
            .ok_or(TextError::UnknownFont(id))
    }

    pub fn spec(&self, id: FontId) -> Option<&FontSpec> {
        self.fonts.get(&id).map(|e| &e.spec)
    }

    /// The font together with the shared atlas it rasterizes into.
    pub fn font_and_atlas(&mut self, id: FontId) -> Result<(&mut Font, &mut TextureAtlas)> {
        let entry = self.fonts.get_mut(&id).ok_or(TextError::UnknownFont(id))?;
        Ok((&mut entry.font, &mut self.atlas))
    }

    /// Drops one font. Its atlas regions stay allocated until the atlas is cleared.
    pub fn delete_font(&mut self, id: FontId) -> bool {
        if self.fonts.remove(&id).is_none() {
            return false;
        }
        self.deleted.insert(id);
        true
    }

    /// Drops every font and resets the atlas.
    pub fn clear(&mut self) {
        self.fonts.clear();
        self.deleted.clear();
        self.atlas.clear();
    }

    pub fn atlas(&self) -> &TextureAtlas {
        &self.atlas
    }

    pub fn atlas_mut(&mut self) -> &mut TextureAtlas {
        &mut self.atlas
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}
