//! Textures on both sides of the GPU seam.
//!
//! This module provides the engine-facing [`Texture`], shared between every
//! mesh that references the same image file, the decoded [`TextureImage`]
//! handed to a [`Gpu`] for upload, and [`GpuTexture`], the wgpu resource the
//! wgpu backend produces.

use std::fmt;

use anyhow::*;
use image::{DynamicImage, GenericImageView, imageops::FilterType};

use crate::context::Gpu;

/// The role a material assigns to a texture, independent of its file format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureKind {
    None,
    Diffuse,
    Specular,
    Ambient,
    Emissive,
    Height,
    Normal,
    Shininess,
    Opacity,
    Displacement,
    Lightmap,
    Reflection,
    Unknown,
}

impl TextureKind {
    /// Material slots in the order their textures are bound to texture units.
    ///
    /// `None` is not a slot. The order is fixed so that unit assignment is the
    /// same on every run.
    pub const SLOTS: [TextureKind; 12] = [
        TextureKind::Diffuse,
        TextureKind::Specular,
        TextureKind::Ambient,
        TextureKind::Emissive,
        TextureKind::Height,
        TextureKind::Normal,
        TextureKind::Shininess,
        TextureKind::Opacity,
        TextureKind::Displacement,
        TextureKind::Lightmap,
        TextureKind::Reflection,
        TextureKind::Unknown,
    ];

    /// Whether texels of this kind are colours (stored as sRGB) rather than data.
    pub fn is_color(self) -> bool {
        matches!(
            self,
            TextureKind::Diffuse | TextureKind::Ambient | TextureKind::Emissive
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            TextureKind::None => "none",
            TextureKind::Diffuse => "diffuse",
            TextureKind::Specular => "specular",
            TextureKind::Ambient => "ambient",
            TextureKind::Emissive => "emissive",
            TextureKind::Height => "height",
            TextureKind::Normal => "normal",
            TextureKind::Shininess => "shininess",
            TextureKind::Opacity => "opacity",
            TextureKind::Displacement => "displacement",
            TextureKind::Lightmap => "lightmap",
            TextureKind::Reflection => "reflection",
            TextureKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TextureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Texel layout of a decoded image, chosen from its channel count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    R8,
    Rg8,
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    pub fn from_channels(channels: u8) -> Option<Self> {
        match channels {
            1 => Some(PixelFormat::R8),
            2 => Some(PixelFormat::Rg8),
            3 => Some(PixelFormat::Rgb8),
            4 => Some(PixelFormat::Rgba8),
            _ => None,
        }
    }

    pub fn channels(self) -> u32 {
        match self {
            PixelFormat::R8 => 1,
            PixelFormat::Rg8 => 2,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// A decoded image with its full mip chain, ready to be uploaded.
///
/// `levels[0]` is the full resolution image, every following level halves
/// both dimensions (never below one texel) down to 1x1.
#[derive(Clone, Debug)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub levels: Vec<Vec<u8>>,
}

impl TextureImage {
    /// Number of mip levels for an image of the given size.
    pub fn mip_level_count(width: u32, height: u32) -> u32 {
        32 - width.max(height).max(1).leading_zeros()
    }

    /// Size of mip `level` for a base image of `width` x `height`.
    pub fn level_size(width: u32, height: u32, level: u32) -> (u32, u32) {
        ((width >> level).max(1), (height >> level).max(1))
    }

    /// Convert `img` to `format` and build its mip chain on the CPU.
    pub fn from_dynamic(img: &DynamicImage, format: PixelFormat) -> Self {
        let (width, height) = img.dimensions();
        let level_count = Self::mip_level_count(width, height);
        let mut levels = Vec::with_capacity(level_count as usize);
        let mut current = img.clone();
        for level in 0..level_count {
            if level > 0 {
                let (w, h) = Self::level_size(width, height, level);
                current = current.resize_exact(w, h, FilterType::Triangle);
            }
            levels.push(texels(&current, format));
        }
        Self {
            width,
            height,
            format,
            levels,
        }
    }

    pub fn mip_levels(&self) -> u32 {
        self.levels.len() as u32
    }
}

fn texels(img: &DynamicImage, format: PixelFormat) -> Vec<u8> {
    match format {
        PixelFormat::R8 => img.to_luma8().into_raw(),
        PixelFormat::Rg8 => img.to_luma_alpha8().into_raw(),
        PixelFormat::Rgb8 => img.to_rgb8().into_raw(),
        PixelFormat::Rgba8 => img.to_rgba8().into_raw(),
    }
}

/// A texture shared by every mesh that references the same source file.
///
/// `handle` is `None` when the file could not be decoded; such a texture is
/// still cached so the failed load is not retried.
pub struct Texture<G: Gpu> {
    handle: Option<G::Texture>,
    kind: TextureKind,
    path: String,
    width: u32,
    height: u32,
}

impl<G: Gpu> Texture<G> {
    pub fn new(handle: G::Texture, kind: TextureKind, path: &str, width: u32, height: u32) -> Self {
        Self {
            handle: Some(handle),
            kind,
            path: path.to_string(),
            width,
            height,
        }
    }

    /// A texture whose file failed to load.
    pub fn invalid(kind: TextureKind, path: &str) -> Self {
        Self {
            handle: None,
            kind,
            path: path.to_string(),
            width: 0,
            height: 0,
        }
    }

    pub fn handle(&self) -> Option<&G::Texture> {
        self.handle.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.handle.is_some()
    }

    pub fn kind(&self) -> TextureKind {
        self.kind
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl<G: Gpu> fmt::Debug for Texture<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("kind", &self.kind)
            .field("path", &self.path)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("valid", &self.is_valid())
            .finish()
    }
}

/// A wgpu texture with a view, an optional sampler and, for textures that are
/// bound to a texture unit, the bind group holding both.
#[derive(Clone, Debug)]
pub struct GpuTexture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
    pub bind_group: Option<wgpu::BindGroup>,
}

impl GpuTexture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// # Arguments
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
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

        Self {
            texture,
            view,
            sampler: None,
            bind_group: None,
        }
    }

    /// A 1x1 opaque white texture bound to units that have nothing else bound.
    pub fn create_fallback(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let image = TextureImage {
            width: 1,
            height: 1,
            format: PixelFormat::Rgba8,
            levels: vec![vec![255, 255, 255, 255]],
        };
        Self::from_image(device, queue, layout, &image, "fallback texture", false)
    }

    /// Upload every mip level of `image` and create the unit bind group.
    ///
    /// # Arguments
    ///
    /// * `layout` is the texture unit layout, see [`texture_unit_layout`]
    /// * `label` is used as a debug name for the GPU resource
    /// * `srgb` toggles between sRGB (true) and linear (false) colour space for
    ///   RGB(A) images; one and two channel images are always linear
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        image: &TextureImage,
        label: &str,
        srgb: bool,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let (format, bytes_per_texel) = match image.format {
            PixelFormat::R8 => (wgpu::TextureFormat::R8Unorm, 1),
            PixelFormat::Rg8 => (wgpu::TextureFormat::Rg8Unorm, 2),
            // wgpu has no three channel format, RGB is widened on upload
            PixelFormat::Rgb8 | PixelFormat::Rgba8 if srgb => {
                (wgpu::TextureFormat::Rgba8UnormSrgb, 4)
            }
            PixelFormat::Rgb8 | PixelFormat::Rgba8 => (wgpu::TextureFormat::Rgba8Unorm, 4),
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: image.mip_levels(),
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (level, texels) in image.levels.iter().enumerate() {
            let (width, height) = TextureImage::level_size(image.width, image.height, level as u32);
            let data = match image.format {
                PixelFormat::Rgb8 => widen_rgb(texels),
                _ => texels.clone(),
            };
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &texture,
                    mip_level: level as u32,
                    origin: wgpu::Origin3d::ZERO,
                },
                &data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_texel * width),
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
        let sampler = create_default_sampler(device);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
            label: Some(label),
        });

        Self {
            texture,
            view,
            sampler: Some(sampler),
            bind_group: Some(bind_group),
        }
    }
}

fn widen_rgb(texels: &[u8]) -> Vec<u8> {
    texels
        .chunks_exact(3)
        .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], 255])
        .collect()
}

/// Layout of one texture unit: a filterable 2D texture and its sampler.
pub fn texture_unit_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("texture_unit_bind_group_layout"),
    })
}

/// Repeat on every axis, linear magnification and trilinear minification.
pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

/// Decode the image file at `path` into a [`TextureImage`].
///
/// The storage format follows the channel count of the decoded file. A count
/// without a matching format is logged and stored as RGBA.
pub fn decode_image(path: &std::path::Path) -> Result<TextureImage> {
    let img = image::open(path).with_context(|| format!("Could not decode {}", path.display()))?;
    let channels = img.color().channel_count();
    let format = PixelFormat::from_channels(channels).unwrap_or_else(|| {
        log::error!(
            "Texture with unknown colour channel count {} at {}, storing it as RGBA",
            channels,
            path.display()
        );
        PixelFormat::Rgba8
    });
    Ok(TextureImage::from_dynamic(&img, format))
}
