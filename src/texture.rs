use crate::atlas::{AtlasUpload, UploadRegion};

/// GPU copy of the glyph atlas.
///
/// Depth 1 atlases map to `R8Unorm`. Depth 3 and 4 map to `Rgba8Unorm`;
/// three-byte texels are widened on upload with an opaque alpha.
pub(crate) struct AtlasTexture {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: wgpu::TextureFormat,
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl Drop for AtlasTexture {
    fn drop(&mut self) {
        self.texture.destroy();
    }
}

impl AtlasTexture {
    pub fn new(device: &wgpu::Device, width: u32, height: u32, depth: u32) -> anyhow::Result<Self> {
        let format = match depth {
            1 => wgpu::TextureFormat::R8Unorm,
            3 | 4 => wgpu::TextureFormat::Rgba8Unorm,
            _ => return Err(anyhow::anyhow!("unsupported atlas depth: {}", depth)),
        };
        let limit = device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > limit || height > limit {
            return Err(anyhow::anyhow!(
                "invalid atlas size {}x{} (device limit {})",
                width,
                height,
                limit
            ));
        }

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("text_atlas"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Self {
            width,
            height,
            depth,
            format,
            texture,
            view,
        })
    }

    fn texel_bytes(&self) -> u32 {
        if self.depth == 1 { 1 } else { 4 }
    }

    /// Writes whole rows starting at `y`. `rows` is tightly packed in atlas layout.
    pub fn write_rows(&self, queue: &wgpu::Queue, y: u32, height: u32, rows: &[u8]) {
        let texels = widen(rows, self.depth);
        let bytes_per_row = self.width * self.texel_bytes();
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let aligned_bpr = bytes_per_row.div_ceil(align) * align;

        let padded;
        let data = if aligned_bpr == bytes_per_row {
            texels.as_ref()
        } else {
            let mut buf = vec![0u8; (aligned_bpr * height) as usize];
            for (src, dst) in texels
                .chunks_exact(bytes_per_row as usize)
                .zip(buf.chunks_exact_mut(aligned_bpr as usize))
            {
                dst[..bytes_per_row as usize].copy_from_slice(src);
            }
            padded = buf;
            padded.as_slice()
        };

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x: 0, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(aligned_bpr),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width: self.width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }
}

/// RGB texels become RGBA, anything else passes through.
fn widen(rows: &[u8], depth: u32) -> std::borrow::Cow<'_, [u8]> {
    if depth != 3 {
        return std::borrow::Cow::Borrowed(rows);
    }
    let mut out = Vec::with_capacity(rows.len() / 3 * 4);
    for rgb in rows.chunks_exact(3) {
        out.extend_from_slice(rgb);
        out.push(0xFF);
    }
    std::borrow::Cow::Owned(out)
}

/// Atlas commit target bound to a queue for the duration of one commit.
pub(crate) struct AtlasUploader<'a> {
    pub texture: &'a AtlasTexture,
    pub queue: &'a wgpu::Queue,
}

impl AtlasUpload for AtlasUploader<'_> {
    fn upload(&mut self, region: UploadRegion, bytes: &[u8]) {
        debug_assert_eq!(region.width, self.texture.width);
        debug_assert_eq!(region.depth, self.texture.depth);
        self.texture.write_rows(self.queue, region.y, region.height, bytes);
    }
}
