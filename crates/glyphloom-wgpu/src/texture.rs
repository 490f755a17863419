// GPU copy of an atlas coverage image, re-uploaded when the atlas handle moves.

use glyphloom_atlas::{FontAtlas, TextureHandle};

/// What [`AtlasTexture::sync`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtlasSync {
    /// Handle unchanged since the last sync.
    Unchanged,
    /// Pixels re-uploaded into the existing texture.
    Uploaded,
    /// Extents changed; the texture and its view are new, so bind groups
    /// referencing the old view must be rebuilt.
    Recreated,
}

pub struct AtlasTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
    synced: Option<TextureHandle>,
}

impl AtlasTexture {
    /// Allocate a texture sized for `atlas`. Nothing is uploaded until [`sync`](Self::sync).
    pub fn new(device: &wgpu::Device, atlas: &FontAtlas) -> Self {
        let (width, height) = atlas.image().dimensions();
        let (texture, view) = create(device, width, height);
        Self {
            texture,
            view,
            width,
            height,
            synced: None,
        }
    }

    pub fn sync(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, atlas: &FontAtlas) -> AtlasSync {
        let handle = atlas.texture();
        if self.synced == Some(handle) {
            return AtlasSync::Unchanged;
        }

        let image = atlas.image();
        let (width, height) = image.dimensions();
        let recreated = (width, height) != (self.width, self.height);
        if recreated {
            log::debug!(
                "Atlas texture {}x{} -> {}x{}",
                self.width,
                self.height,
                width,
                height
            );
            let (texture, view) = create(device, width, height);
            self.texture = texture;
            self.view = view;
            self.width = width;
            self.height = height;
        }

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.synced = Some(handle);

        if recreated {
            AtlasSync::Recreated
        } else {
            AtlasSync::Uploaded
        }
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Handle of the atlas state last uploaded.
    pub fn synced(&self) -> Option<TextureHandle> {
        self.synced
    }
}

fn create(device: &wgpu::Device, width: u32, height: u32) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("glyphloom_atlas"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::R8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}
