//! GPU textures and texture creation utilities.
//!
//! This module provides [`Texture2D`], a sampled 2D image with a full mip
//! chain, plus the depth and fallback textures the renderer needs.

use std::path::Path;

use image::{DynamicImage, GenericImageView, imageops::FilterType};

use crate::{error::TextureError, resources};

/// Channel layout a texture is stored with on the GPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channels {
    Red,
    Rg,
    /// Stored as RGBA with opaque alpha, wgpu has no three channel format.
    Rgb,
    Rgba,
}

impl Channels {
    pub fn format(self) -> wgpu::TextureFormat {
        match self {
            Channels::Red => wgpu::TextureFormat::R8Unorm,
            Channels::Rg => wgpu::TextureFormat::Rg8Unorm,
            Channels::Rgb | Channels::Rgba => wgpu::TextureFormat::Rgba8UnormSrgb,
        }
    }

    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            Channels::Red => 1,
            Channels::Rg => 2,
            Channels::Rgb | Channels::Rgba => 4,
        }
    }

    /// The natural layout for an image with `count` colour channels.
    pub fn from_count(count: u8) -> Self {
        match count {
            1 => Channels::Red,
            2 => Channels::Rg,
            4 => Channels::Rgba,
            _ => Channels::Rgb,
        }
    }
}

/// Pixel interpolation for minification, magnification and mip selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    Linear,
    Nearest,
}

impl From<FilterMode> for wgpu::FilterMode {
    fn from(filter: FilterMode) -> Self {
        match filter {
            FilterMode::Linear => wgpu::FilterMode::Linear,
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
        }
    }
}

impl From<FilterMode> for wgpu::MipmapFilterMode {
    fn from(filter: FilterMode) -> Self {
        match filter {
            FilterMode::Linear => wgpu::MipmapFilterMode::Linear,
            FilterMode::Nearest => wgpu::MipmapFilterMode::Nearest,
        }
    }
}

/// Pixel data of every mip level, ready for upload.
#[derive(Debug)]
pub struct MipChain {
    pub width: u32,
    pub height: u32,
    pub channels: Channels,
    pub levels: Vec<Vec<u8>>,
}

/// Number of mip levels down to 1x1 for the given extent.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Flip, convert and downsample `img` into a full mip chain.
pub fn build_mip_chain(
    img: &DynamicImage,
    flip: bool,
    channels: Channels,
) -> Result<MipChain, TextureError> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(TextureError::Empty { width, height });
    }
    let base = if flip { img.flipv() } else { img.clone() };
    let levels = (0..mip_level_count(width, height))
        .map(|level| {
            let level_width = (width >> level).max(1);
            let level_height = (height >> level).max(1);
            let level_img = if level == 0 {
                base.clone()
            } else {
                base.resize_exact(level_width, level_height, FilterType::Triangle)
            };
            convert_pixels(&level_img, channels)
        })
        .collect();
    Ok(MipChain {
        width,
        height,
        channels,
        levels,
    })
}

fn convert_pixels(img: &DynamicImage, channels: Channels) -> Vec<u8> {
    let rgba = img.to_rgba8();
    match channels {
        Channels::Red => rgba.pixels().map(|p| p.0[0]).collect(),
        Channels::Rg => rgba.pixels().flat_map(|p| [p.0[0], p.0[1]]).collect(),
        Channels::Rgb => rgba
            .pixels()
            .flat_map(|p| [p.0[0], p.0[1], p.0[2], 255])
            .collect(),
        Channels::Rgba => rgba.into_raw(),
    }
}

/// A sampled GPU texture with its view and sampler.
///
/// Typically created via [`from_path`](Self::from_path) or
/// [`from_bytes`](Self::from_bytes). Cloning only clones the handles.
#[derive(Clone, Debug)]
pub struct Texture2D {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Texture2D {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Load an image file from disk.
    ///
    /// * `flip` flips the image vertically, most image formats store the top row first
    /// * `filter` selects the pixel interpolation
    /// * `channels` is the layout the pixels are stored with on the GPU
    pub async fn from_path(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: impl AsRef<Path>,
        flip: bool,
        filter: FilterMode,
        channels: Channels,
    ) -> Result<Self, TextureError> {
        let path = path.as_ref();
        let bytes = resources::load_binary(path)
            .await
            .map_err(|source| TextureError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let label = path.to_string_lossy();
        Self::from_bytes(device, queue, &bytes, &label, flip, filter, channels)
    }

    /// Load a texture from encoded image bytes (PNG, JPEG, ...).
    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        label: &str,
        flip: bool,
        filter: FilterMode,
        channels: Channels,
    ) -> Result<Self, TextureError> {
        let img = image::load_from_memory(bytes)?;
        Self::from_image(device, queue, &img, Some(label), flip, filter, channels)
    }

    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &DynamicImage,
        label: Option<&str>,
        flip: bool,
        filter: FilterMode,
        channels: Channels,
    ) -> Result<Self, TextureError> {
        let chain = build_mip_chain(img, flip, channels)?;
        Ok(Self::from_mip_chain(device, queue, &chain, label, filter))
    }

    pub fn from_mip_chain(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        chain: &MipChain,
        label: Option<&str>,
        filter: FilterMode,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: chain.width,
            height: chain.height,
            depth_or_array_layers: 1,
        };
        let format = chain.channels.format();
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: chain.levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (level, pixels) in chain.levels.iter().enumerate() {
            let width = (chain.width >> level).max(1);
            let height = (chain.height >> level).max(1);
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &texture,
                    mip_level: level as u32,
                    origin: wgpu::Origin3d::ZERO,
                },
                pixels,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(chain.channels.bytes_per_pixel() * width),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_sampler(device, filter);
        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// `size` is [width, height] in pixels; zero extents are clamped to one.
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            lod_min_clamp: 0.0,
            lod_max_clamp: 100.0,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// A 1x1 opaque white texture bound to samplers nobody assigned a texture to.
    pub fn create_fallback(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let chain = MipChain {
            width: 1,
            height: 1,
            channels: Channels::Rgba,
            levels: vec![vec![255, 255, 255, 255]],
        };
        Self::from_mip_chain(device, queue, &chain, Some("fallback texture"), FilterMode::Nearest)
    }

    /// Bind group entries for this texture at the given texture and sampler bindings.
    pub fn bind_entries(
        &self,
        texture_binding: u32,
        sampler_binding: u32,
    ) -> [wgpu::BindGroupEntry<'_>; 2] {
        [
            wgpu::BindGroupEntry {
                binding: texture_binding,
                resource: wgpu::BindingResource::TextureView(&self.view),
            },
            wgpu::BindGroupEntry {
                binding: sampler_binding,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            },
        ]
    }
}

pub fn create_sampler(device: &wgpu::Device, filter: FilterMode) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: filter.into(),
        min_filter: filter.into(),
        mipmap_filter: filter.into(),
        ..Default::default()
    })
}
