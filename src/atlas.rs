use crate::buffer::{BufferObject, PendingUpload};
use crate::error::{Result, TextError};
use crate::packer::{AtlasPacker, PackerRect};

/// Full-width band of atlas rows to copy to the GPU texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadRegion {
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Bytes per texel.
    pub depth: u32,
}

/// Receiver of atlas uploads, usually a texture.
pub trait AtlasUpload {
    /// `bytes` holds `region.height` tightly packed rows of
    /// `region.width * region.depth` bytes.
    fn upload(&mut self, region: UploadRegion, bytes: &[u8]);
}

/// Shared glyph surface: a skyline packer over a `width x height x depth`
/// byte image.
///
/// Writes are staged on the CPU and pushed by `commit`, which copies every
/// row between the first and the last byte touched since the previous commit.
pub struct TextureAtlas {
    packer: AtlasPacker,
    depth: u32,
    surface: BufferObject<u8>,
    generation: u64,
}

/// Smallest side with room for the one texel border and one usable texel.
pub const MIN_ATLAS_SIZE: u32 = 3;

impl TextureAtlas {
    /// Sides below [`MIN_ATLAS_SIZE`] are raised to it; a depth other than
    /// 1, 3 or 4 falls back to 1.
    pub fn new(width: u32, height: u32, depth: u32) -> Self {
        let (w, h) = (width.max(MIN_ATLAS_SIZE), height.max(MIN_ATLAS_SIZE));
        if (w, h) != (width, height) {
            log::warn!("texture atlas {width}x{height} too small, using {w}x{h}");
        }
        let depth = if matches!(depth, 1 | 3 | 4) {
            depth
        } else {
            log::warn!("texture atlas depth {depth} unsupported, using 1");
            1
        };
        Self {
            packer: AtlasPacker::new(w, h),
            depth,
            surface: BufferObject::filled(0, w as usize * h as usize * depth as usize),
            generation: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.packer.width()
    }

    pub fn height(&self) -> u32 {
        self.packer.height()
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Allocated area in pixels.
    pub fn used(&self) -> u64 {
        self.packer.used()
    }

    /// Bumped by every `clear`. Texture coordinates taken under an older
    /// generation point at cells that may now hold other glyphs.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn data(&self) -> &[u8] {
        self.surface.as_slice()
    }

    pub fn is_dirty(&self) -> bool {
        self.surface.pending().is_some()
    }

    pub fn allocate(&mut self, width: u32, height: u32) -> Result<PackerRect> {
        if width == 0 || height == 0 {
            return Err(TextError::InvalidRegion {
                x: 0,
                y: 0,
                w: width,
                h: height,
            });
        }
        self.packer.insert_raw(width, height).ok_or_else(|| {
            log::warn!(
                "texture atlas {}x{} full, {} px used; cannot place {}x{}",
                self.width(),
                self.height(),
                self.used(),
                width,
                height
            );
            TextError::AtlasFull { width, height }
        })
    }

    /// Copies `rect.h` rows of `rect.w * depth` bytes from `data` into the
    /// surface. Row `i` of the source starts at `i * stride`.
    pub fn set_region(&mut self, rect: PackerRect, data: &[u8], stride: usize) -> Result<()> {
        let invalid = TextError::InvalidRegion {
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
        };
        let (w, h) = (self.width(), self.height());
        if rect.x == 0
            || rect.y == 0
            || rect.x.checked_add(rect.w).is_none_or(|right| right > w - 1)
            || rect.y.checked_add(rect.h).is_none_or(|bottom| bottom > h - 1)
        {
            return Err(invalid);
        }

        let row_bytes = rect.w as usize * self.depth as usize;
        if rect.h > 0 {
            let needed = (rect.h as usize - 1)
                .checked_mul(stride)
                .and_then(|n| n.checked_add(row_bytes));
            if needed.is_none_or(|n| data.len() < n) {
                return Err(invalid);
            }
        }

        for i in 0..rect.h as usize {
            let dst = (((rect.y as usize + i) * w as usize) + rect.x as usize) * self.depth as usize;
            let src = i * stride;
            self.surface.update(dst, &data[src..src + row_bytes]);
        }
        Ok(())
    }

    /// Uploads the rows touched since the last commit; everything on the
    /// first commit and after `clear`. Returns `false` if nothing was sent.
    pub fn commit(&mut self, target: &mut dyn AtlasUpload) -> bool {
        let row_bytes = (self.width() * self.depth) as usize;
        let (first_row, bytes) = match self.surface.pending() {
            Some(PendingUpload::Create(bytes)) => (0, bytes),
            Some(PendingUpload::Update { offset, bytes }) => {
                let first = offset / row_bytes;
                let last = (offset + bytes.len()).div_ceil(row_bytes);
                let data = self.surface.as_slice();
                (first, &data[first * row_bytes..last * row_bytes])
            }
            None => {
                log::trace!("atlas commit skipped: nothing dirty");
                return false;
            }
        };

        let region = UploadRegion {
            y: first_row as u32,
            width: self.width(),
            height: (bytes.len() / row_bytes) as u32,
            depth: self.depth,
        };
        log::debug!("atlas upload rows {}..{}", region.y, region.y + region.height);
        target.upload(region, bytes);
        self.surface.mark_clean();
        true
    }

    /// Forgets every region and zeroes the surface. Previously returned
    /// rectangles (and the glyphs using them) become invalid.
    pub fn clear(&mut self) {
        self.packer.clear();
        let len = self.surface.len();
        self.surface.clear();
        self.surface.append(&vec![0u8; len]);
        self.generation += 1;
    }

    /// Texture coordinates `[s0, t0, s1, t1]` of `rect`.
    pub fn uv(&self, rect: &PackerRect) -> [f32; 4] {
        self.packer.get_uv_param(rect)
    }

    /// The surface as an image, for debugging glyph placement.
    #[cfg(feature = "utils")]
    pub fn to_image(&self) -> image::DynamicImage {
        let (w, h) = (self.width(), self.height());
        let data = self.surface.as_slice().to_vec();
        match self.depth {
            3 => image::RgbImage::from_raw(w, h, data).map(image::DynamicImage::ImageRgb8),
            4 => image::RgbaImage::from_raw(w, h, data).map(image::DynamicImage::ImageRgba8),
            _ => image::GrayImage::from_raw(w, h, data).map(image::DynamicImage::ImageLuma8),
        }
        .unwrap_or_else(|| image::DynamicImage::new_luma8(w, h))
    }

    #[cfg(feature = "utils")]
    pub fn save_png(&self, path: impl AsRef<std::path::Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        self.to_image()
            .save(path)
            .map_err(|e| anyhow::anyhow!("Failed to save atlas to {}: {}", path.display(), e))
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::{AtlasUpload, UploadRegion};

    /// Texture stand-in that applies uploads to a plain byte image.
    pub(crate) struct RecordingTexture {
        pub row_bytes: usize,
        pub bytes: Vec<u8>,
        pub regions: Vec<UploadRegion>,
    }

    impl RecordingTexture {
        pub(crate) fn new(width: u32, height: u32, depth: u32) -> Self {
            Self {
                row_bytes: (width * depth) as usize,
                bytes: vec![0xAA; (width * height * depth) as usize],
                regions: Vec::new(),
            }
        }
    }

    impl AtlasUpload for RecordingTexture {
        fn upload(&mut self, region: UploadRegion, bytes: &[u8]) {
            let start = region.y as usize * self.row_bytes;
            self.bytes[start..start + bytes.len()].copy_from_slice(bytes);
            self.regions.push(region);
        }
    }
}
