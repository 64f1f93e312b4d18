//! Atlas and font lookup settings, with environment overrides.

use crate::atlas::MIN_ATLAS_SIZE;
use std::path::PathBuf;
use std::sync::OnceLock;

static ENV_CONFIG: OnceLock<TextConfig> = OnceLock::new();

#[derive(Debug, Clone, PartialEq)]
pub struct TextConfig {
    pub atlas_width: u32,
    pub atlas_height: u32,
    /// Bytes per atlas texel: 1 for coverage, 3 for LCD subpixel, 4 for RGBA.
    pub atlas_depth: u32,
    /// Directories searched for `fonts/{name}.ttf`.
    pub font_roots: Vec<PathBuf>,
    /// Characters rasterized as soon as a font is opened.
    pub preload: String,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            atlas_width: 1024,
            atlas_height: 1024,
            atlas_depth: 1,
            font_roots: vec![PathBuf::from(".")],
            preload: " ".to_string(),
        }
    }
}

impl TextConfig {
    /// Defaults overridden by `TEXTCAT_ATLAS_SIZE` (`512` or `1024x512`),
    /// `TEXTCAT_ATLAS_DEPTH` and `TEXTCAT_FONT_PATH` (a search path list).
    /// The environment is read once per process.
    pub fn from_env() -> Self {
        ENV_CONFIG
            .get_or_init(|| Self::default().with_overrides(|key| std::env::var(key).ok()))
            .clone()
    }

    pub(crate) fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = var("TEXTCAT_ATLAS_SIZE") {
            match parse_atlas_size(&v) {
                Some((w, h)) => {
                    self.atlas_width = w;
                    self.atlas_height = h;
                }
                None => log::warn!("ignoring TEXTCAT_ATLAS_SIZE={v:?}"),
            }
        }
        if let Some(v) = var("TEXTCAT_ATLAS_DEPTH") {
            match v.trim().parse::<u32>() {
                Ok(d @ (1 | 3 | 4)) => self.atlas_depth = d,
                _ => log::warn!("ignoring TEXTCAT_ATLAS_DEPTH={v:?}, expected 1, 3 or 4"),
            }
        }
        if let Some(v) = var("TEXTCAT_FONT_PATH") {
            let roots: Vec<PathBuf> = std::env::split_paths(&v)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            if !roots.is_empty() {
                self.font_roots = roots;
            }
        }
        self
    }

    /// Sides below [`MIN_ATLAS_SIZE`] are raised to it.
    pub fn with_atlas_size(mut self, width: u32, height: u32) -> Self {
        self.atlas_width = width.max(MIN_ATLAS_SIZE);
        self.atlas_height = height.max(MIN_ATLAS_SIZE);
        self
    }

    pub fn with_atlas_depth(mut self, depth: u32) -> Self {
        self.atlas_depth = depth;
        self
    }

    pub fn with_font_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.font_roots.insert(0, root.into());
        self
    }

    pub fn with_preload(mut self, chars: impl Into<String>) -> Self {
        self.preload = chars.into();
        self
    }
}

fn parse_atlas_size(v: &str) -> Option<(u32, u32)> {
    let v = v.trim().to_ascii_lowercase();
    let (w, h) = match v.split_once('x') {
        Some((w, h)) => (w.trim().parse().ok()?, h.trim().parse().ok()?),
        None => {
            let s = v.parse().ok()?;
            (s, s)
        }
    };
    if w < MIN_ATLAS_SIZE || h < MIN_ATLAS_SIZE {
        return None;
    }
    Some((w, h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_parse_atlas_size() {
        assert_eq!(parse_atlas_size("512"), Some((512, 512)));
        assert_eq!(parse_atlas_size(" 1024X256 "), Some((1024, 256)));
        assert_eq!(parse_atlas_size("2"), None);
        assert_eq!(parse_atlas_size("big"), None);
    }

    #[test]
    fn test_overrides() {
        let cfg = TextConfig::default().with_overrides(env(&[
            ("TEXTCAT_ATLAS_SIZE", "256x128"),
            ("TEXTCAT_ATLAS_DEPTH", "3"),
            ("TEXTCAT_FONT_PATH", "/usr/share"),
        ]));
        assert_eq!((cfg.atlas_width, cfg.atlas_height, cfg.atlas_depth), (256, 128, 3));
        assert_eq!(cfg.font_roots, vec![PathBuf::from("/usr/share")]);
    }

    #[test]
    fn test_bad_overrides_keep_defaults() {
        let cfg = TextConfig::default().with_overrides(env(&[
            ("TEXTCAT_ATLAS_SIZE", "huge"),
            ("TEXTCAT_ATLAS_DEPTH", "2"),
        ]));
        assert_eq!(cfg, TextConfig::default());
    }

    #[test]
    fn test_zero_atlas_size_is_raised() {
        let cfg = TextConfig::default().with_atlas_size(0, 1);
        assert_eq!((cfg.atlas_width, cfg.atlas_height), (MIN_ATLAS_SIZE, MIN_ATLAS_SIZE));
    }
}
