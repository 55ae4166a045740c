//! Texel-block geometry of the formats the image primer can stage.

use ash::vk;
use ash::vk::Format as F;

use crate::error::ModelError;

/// One plane of a multi-planar format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plane {
    pub format: vk::Format,
    pub element_size: u32,
    pub width_divisor: u32,
    pub height_divisor: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Color,
    /// Block-compressed color.
    Compressed,
    /// Byte size of each aspect when copied to or from a buffer.
    DepthStencil {
        depth: Option<u32>,
        stencil: Option<u32>,
    },
    Planar(&'static [Plane]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    pub format: vk::Format,
    /// Bytes per texel block as stored in the image.
    pub element_size: u32,
    pub block_width: u32,
    pub block_height: u32,
    pub kind: FormatKind,
}

/// Size and extent of one `(aspect, level)` as tightly packed buffer data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelSize {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub width_in_blocks: u32,
    pub height_in_blocks: u32,
    pub element_size: u32,
    pub size: u64,
}

impl LevelSize {
    /// Size rounded up to the 8-byte alignment used between levels of a
    /// staging buffer.
    pub fn aligned_size(&self) -> u64 {
        round_up(self.size, 8)
    }
}

pub fn round_up(v: u64, align: u64) -> u64 {
    if align == 0 {
        return v;
    }
    v.div_ceil(align) * align
}

fn div_ceil(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        a.div_ceil(b)
    }
}

const fn color(format: vk::Format, element_size: u32) -> FormatInfo {
    FormatInfo {
        format,
        element_size,
        block_width: 1,
        block_height: 1,
        kind: FormatKind::Color,
    }
}

const fn block(format: vk::Format, element_size: u32, w: u32, h: u32) -> FormatInfo {
    FormatInfo {
        format,
        element_size,
        block_width: w,
        block_height: h,
        kind: FormatKind::Compressed,
    }
}

const fn depth_stencil(
    format: vk::Format,
    element_size: u32,
    depth: Option<u32>,
    stencil: Option<u32>,
) -> FormatInfo {
    FormatInfo {
        format,
        element_size,
        block_width: 1,
        block_height: 1,
        kind: FormatKind::DepthStencil { depth, stencil },
    }
}

const fn planar(format: vk::Format, planes: &'static [Plane]) -> FormatInfo {
    FormatInfo {
        format,
        element_size: 0,
        block_width: 1,
        block_height: 1,
        kind: FormatKind::Planar(planes),
    }
}

const fn plane(format: vk::Format, element_size: u32, wd: u32, hd: u32) -> Plane {
    Plane {
        format,
        element_size,
        width_divisor: wd,
        height_divisor: hd,
    }
}

const PLANES_8_2P_420: &[Plane] = &[plane(F::R8_UNORM, 1, 1, 1), plane(F::R8G8_UNORM, 2, 2, 2)];
const PLANES_8_2P_422: &[Plane] = &[plane(F::R8_UNORM, 1, 1, 1), plane(F::R8G8_UNORM, 2, 2, 1)];
const PLANES_8_3P_420: &[Plane] = &[
    plane(F::R8_UNORM, 1, 1, 1),
    plane(F::R8_UNORM, 1, 2, 2),
    plane(F::R8_UNORM, 1, 2, 2),
];
const PLANES_8_3P_422: &[Plane] = &[
    plane(F::R8_UNORM, 1, 1, 1),
    plane(F::R8_UNORM, 1, 2, 1),
    plane(F::R8_UNORM, 1, 2, 1),
];
const PLANES_8_3P_444: &[Plane] = &[
    plane(F::R8_UNORM, 1, 1, 1),
    plane(F::R8_UNORM, 1, 1, 1),
    plane(F::R8_UNORM, 1, 1, 1),
];
const PLANES_16_2P_420: &[Plane] = &[
    plane(F::R16_UNORM, 2, 1, 1),
    plane(F::R16G16_UNORM, 4, 2, 2),
];
const PLANES_16_2P_422: &[Plane] = &[
    plane(F::R16_UNORM, 2, 1, 1),
    plane(F::R16G16_UNORM, 4, 2, 1),
];
const PLANES_16_3P_420: &[Plane] = &[
    plane(F::R16_UNORM, 2, 1, 1),
    plane(F::R16_UNORM, 2, 2, 2),
    plane(F::R16_UNORM, 2, 2, 2),
];

/// Look up the block geometry of `format`.
pub fn format_info(format: vk::Format) -> Result<FormatInfo, ModelError> {
    let info = match format {
        // ── 8-bit ───────────────────────────────────────────
        F::R4G4_UNORM_PACK8
        | F::R8_UNORM
        | F::R8_SNORM
        | F::R8_USCALED
        | F::R8_SSCALED
        | F::R8_UINT
        | F::R8_SINT
        | F::R8_SRGB => color(format, 1),

        // ── 16-bit ──────────────────────────────────────────
        F::R4G4B4A4_UNORM_PACK16
        | F::B4G4R4A4_UNORM_PACK16
        | F::R5G6B5_UNORM_PACK16
        | F::B5G6R5_UNORM_PACK16
        | F::R5G5B5A1_UNORM_PACK16
        | F::B5G5R5A1_UNORM_PACK16
        | F::A1R5G5B5_UNORM_PACK16
        | F::R8G8_UNORM
        | F::R8G8_SNORM
        | F::R8G8_USCALED
        | F::R8G8_SSCALED
        | F::R8G8_UINT
        | F::R8G8_SINT
        | F::R8G8_SRGB
        | F::R16_UNORM
        | F::R16_SNORM
        | F::R16_USCALED
        | F::R16_SSCALED
        | F::R16_UINT
        | F::R16_SINT
        | F::R16_SFLOAT => color(format, 2),

        // ── 24-bit ──────────────────────────────────────────
        F::R8G8B8_UNORM
        | F::R8G8B8_SNORM
        | F::R8G8B8_USCALED
        | F::R8G8B8_SSCALED
        | F::R8G8B8_UINT
        | F::R8G8B8_SINT
        | F::R8G8B8_SRGB
        | F::B8G8R8_UNORM
        | F::B8G8R8_SNORM
        | F::B8G8R8_UINT
        | F::B8G8R8_SINT
        | F::B8G8R8_SRGB => color(format, 3),

        // ── 32-bit ──────────────────────────────────────────
        F::R8G8B8A8_UNORM
        | F::R8G8B8A8_SNORM
        | F::R8G8B8A8_USCALED
        | F::R8G8B8A8_SSCALED
        | F::R8G8B8A8_UINT
        | F::R8G8B8A8_SINT
        | F::R8G8B8A8_SRGB
        | F::B8G8R8A8_UNORM
        | F::B8G8R8A8_SNORM
        | F::B8G8R8A8_UINT
        | F::B8G8R8A8_SINT
        | F::B8G8R8A8_SRGB
        | F::A8B8G8R8_UNORM_PACK32
        | F::A8B8G8R8_SNORM_PACK32
        | F::A8B8G8R8_UINT_PACK32
        | F::A8B8G8R8_SINT_PACK32
        | F::A8B8G8R8_SRGB_PACK32
        | F::A2R10G10B10_UNORM_PACK32
        | F::A2R10G10B10_UINT_PACK32
        | F::A2B10G10R10_UNORM_PACK32
        | F::A2B10G10R10_UINT_PACK32
        | F::R16G16_UNORM
        | F::R16G16_SNORM
        | F::R16G16_UINT
        | F::R16G16_SINT
        | F::R16G16_SFLOAT
        | F::R32_UINT
        | F::R32_SINT
        | F::R32_SFLOAT
        | F::B10G11R11_UFLOAT_PACK32
        | F::E5B9G9R9_UFLOAT_PACK32 => color(format, 4),

        F::R16G16B16_UNORM
        | F::R16G16B16_SNORM
        | F::R16G16B16_UINT
        | F::R16G16B16_SINT
        | F::R16G16B16_SFLOAT => color(format, 6),

        F::R16G16B16A16_UNORM
        | F::R16G16B16A16_SNORM
        | F::R16G16B16A16_UINT
        | F::R16G16B16A16_SINT
        | F::R16G16B16A16_SFLOAT
        | F::R32G32_UINT
        | F::R32G32_SINT
        | F::R32G32_SFLOAT
        | F::R64_UINT
        | F::R64_SINT
        | F::R64_SFLOAT => color(format, 8),

        F::R32G32B32_UINT | F::R32G32B32_SINT | F::R32G32B32_SFLOAT => color(format, 12),

        F::R32G32B32A32_UINT
        | F::R32G32B32A32_SINT
        | F::R32G32B32A32_SFLOAT
        | F::R64G64_UINT
        | F::R64G64_SINT
        | F::R64G64_SFLOAT => color(format, 16),

        F::R64G64B64_UINT | F::R64G64B64_SINT | F::R64G64B64_SFLOAT => color(format, 24),
        F::R64G64B64A64_UINT | F::R64G64B64A64_SINT | F::R64G64B64A64_SFLOAT => {
            color(format, 32)
        }

        // ── Depth / stencil ─────────────────────────────────
        F::D16_UNORM => depth_stencil(format, 2, Some(2), None),
        F::X8_D24_UNORM_PACK32 => depth_stencil(format, 4, Some(4), None),
        F::D32_SFLOAT => depth_stencil(format, 4, Some(4), None),
        F::S8_UINT => depth_stencil(format, 1, None, Some(1)),
        F::D16_UNORM_S8_UINT => depth_stencil(format, 3, Some(2), Some(1)),
        F::D24_UNORM_S8_UINT => depth_stencil(format, 4, Some(4), Some(1)),
        F::D32_SFLOAT_S8_UINT => depth_stencil(format, 8, Some(4), Some(1)),

        // ── BC ──────────────────────────────────────────────
        F::BC1_RGB_UNORM_BLOCK
        | F::BC1_RGB_SRGB_BLOCK
        | F::BC1_RGBA_UNORM_BLOCK
        | F::BC1_RGBA_SRGB_BLOCK
        | F::BC4_UNORM_BLOCK
        | F::BC4_SNORM_BLOCK => block(format, 8, 4, 4),
        F::BC2_UNORM_BLOCK
        | F::BC2_SRGB_BLOCK
        | F::BC3_UNORM_BLOCK
        | F::BC3_SRGB_BLOCK
        | F::BC5_UNORM_BLOCK
        | F::BC5_SNORM_BLOCK
        | F::BC6H_UFLOAT_BLOCK
        | F::BC6H_SFLOAT_BLOCK
        | F::BC7_UNORM_BLOCK
        | F::BC7_SRGB_BLOCK => block(format, 16, 4, 4),

        // ── ETC2 / EAC ──────────────────────────────────────
        F::ETC2_R8G8B8_UNORM_BLOCK
        | F::ETC2_R8G8B8_SRGB_BLOCK
        | F::ETC2_R8G8B8A1_UNORM_BLOCK
        | F::ETC2_R8G8B8A1_SRGB_BLOCK
        | F::EAC_R11_UNORM_BLOCK
        | F::EAC_R11_SNORM_BLOCK => block(format, 8, 4, 4),
        F::ETC2_R8G8B8A8_UNORM_BLOCK
        | F::ETC2_R8G8B8A8_SRGB_BLOCK
        | F::EAC_R11G11_UNORM_BLOCK
        | F::EAC_R11G11_SNORM_BLOCK => block(format, 16, 4, 4),

        // ── ASTC ────────────────────────────────────────────
        F::ASTC_4X4_UNORM_BLOCK | F::ASTC_4X4_SRGB_BLOCK => block(format, 16, 4, 4),
        F::ASTC_5X4_UNORM_BLOCK | F::ASTC_5X4_SRGB_BLOCK => block(format, 16, 5, 4),
        F::ASTC_5X5_UNORM_BLOCK | F::ASTC_5X5_SRGB_BLOCK => block(format, 16, 5, 5),
        F::ASTC_6X5_UNORM_BLOCK | F::ASTC_6X5_SRGB_BLOCK => block(format, 16, 6, 5),
        F::ASTC_6X6_UNORM_BLOCK | F::ASTC_6X6_SRGB_BLOCK => block(format, 16, 6, 6),
        F::ASTC_8X5_UNORM_BLOCK | F::ASTC_8X5_SRGB_BLOCK => block(format, 16, 8, 5),
        F::ASTC_8X6_UNORM_BLOCK | F::ASTC_8X6_SRGB_BLOCK => block(format, 16, 8, 6),
        F::ASTC_8X8_UNORM_BLOCK | F::ASTC_8X8_SRGB_BLOCK => block(format, 16, 8, 8),
        F::ASTC_10X5_UNORM_BLOCK | F::ASTC_10X5_SRGB_BLOCK => block(format, 16, 10, 5),
        F::ASTC_10X6_UNORM_BLOCK | F::ASTC_10X6_SRGB_BLOCK => block(format, 16, 10, 6),
        F::ASTC_10X8_UNORM_BLOCK | F::ASTC_10X8_SRGB_BLOCK => block(format, 16, 10, 8),
        F::ASTC_10X10_UNORM_BLOCK | F::ASTC_10X10_SRGB_BLOCK => block(format, 16, 10, 10),
        F::ASTC_12X10_UNORM_BLOCK | F::ASTC_12X10_SRGB_BLOCK => block(format, 16, 12, 10),
        F::ASTC_12X12_UNORM_BLOCK | F::ASTC_12X12_SRGB_BLOCK => block(format, 16, 12, 12),

        // ── Multi-planar YCbCr ──────────────────────────────
        F::G8_B8R8_2PLANE_420_UNORM => planar(format, PLANES_8_2P_420),
        F::G8_B8R8_2PLANE_422_UNORM => planar(format, PLANES_8_2P_422),
        F::G8_B8_R8_3PLANE_420_UNORM => planar(format, PLANES_8_3P_420),
        F::G8_B8_R8_3PLANE_422_UNORM => planar(format, PLANES_8_3P_422),
        F::G8_B8_R8_3PLANE_444_UNORM => planar(format, PLANES_8_3P_444),
        F::G10X6_B10X6R10X6_2PLANE_420_UNORM_3PACK16
        | F::G12X4_B12X4R12X4_2PLANE_420_UNORM_3PACK16
        | F::G16_B16R16_2PLANE_420_UNORM => planar(format, PLANES_16_2P_420),
        F::G10X6_B10X6R10X6_2PLANE_422_UNORM_3PACK16
        | F::G12X4_B12X4R12X4_2PLANE_422_UNORM_3PACK16
        | F::G16_B16R16_2PLANE_422_UNORM => planar(format, PLANES_16_2P_422),
        F::G10X6_B10X6_R10X6_3PLANE_420_UNORM_3PACK16
        | F::G12X4_B12X4_R12X4_3PLANE_420_UNORM_3PACK16
        | F::G16_B16_R16_3PLANE_420_UNORM => planar(format, PLANES_16_3P_420),

        other => return Err(ModelError::UnknownFormat(other.as_raw())),
    };
    Ok(info)
}

const PLANE_ASPECTS: [vk::ImageAspectFlags; 3] = [
    vk::ImageAspectFlags::PLANE_0,
    vk::ImageAspectFlags::PLANE_1,
    vk::ImageAspectFlags::PLANE_2,
];

impl FormatInfo {
    pub fn is_compressed(&self) -> bool {
        matches!(self.kind, FormatKind::Compressed)
    }

    pub fn is_planar(&self) -> bool {
        matches!(self.kind, FormatKind::Planar(_))
    }

    /// Every aspect an image of this format has.
    pub fn aspects(&self) -> vk::ImageAspectFlags {
        match self.kind {
            FormatKind::Color | FormatKind::Compressed => vk::ImageAspectFlags::COLOR,
            FormatKind::DepthStencil { depth, stencil } => {
                let mut mask = vk::ImageAspectFlags::empty();
                if depth.is_some() {
                    mask |= vk::ImageAspectFlags::DEPTH;
                }
                if stencil.is_some() {
                    mask |= vk::ImageAspectFlags::STENCIL;
                }
                mask
            }
            FormatKind::Planar(planes) => PLANE_ASPECTS[..planes.len()]
                .iter()
                .fold(vk::ImageAspectFlags::empty(), |m, a| m | *a),
        }
    }

    /// Single-bit aspects in the order the primer visits them.
    pub fn aspect_bits(&self) -> Vec<vk::ImageAspectFlags> {
        let all = self.aspects();
        [
            vk::ImageAspectFlags::COLOR,
            vk::ImageAspectFlags::DEPTH,
            vk::ImageAspectFlags::STENCIL,
            vk::ImageAspectFlags::PLANE_0,
            vk::ImageAspectFlags::PLANE_1,
            vk::ImageAspectFlags::PLANE_2,
        ]
        .into_iter()
        .filter(|a| all.contains(*a))
        .collect()
    }

    pub fn plane(&self, aspect: vk::ImageAspectFlags) -> Option<Plane> {
        let FormatKind::Planar(planes) = self.kind else {
            return None;
        };
        let idx = PLANE_ASPECTS.iter().position(|a| *a == aspect)?;
        planes.get(idx).copied()
    }

    /// Bytes per texel block of `aspect` when packed in a buffer.
    pub fn aspect_element_size(&self, aspect: vk::ImageAspectFlags) -> Option<u32> {
        match self.kind {
            FormatKind::Color | FormatKind::Compressed => {
                (aspect == vk::ImageAspectFlags::COLOR).then_some(self.element_size)
            }
            FormatKind::DepthStencil { depth, stencil } => {
                if aspect == vk::ImageAspectFlags::DEPTH {
                    depth
                } else if aspect == vk::ImageAspectFlags::STENCIL {
                    stencil
                } else {
                    None
                }
            }
            FormatKind::Planar(_) => self.plane(aspect).map(|p| p.element_size),
        }
    }

    /// Buffer size and extent of `aspect` at mip `level` for an image of
    /// `extent`.
    pub fn level_size(
        &self,
        aspect: vk::ImageAspectFlags,
        extent: [u32; 3],
        level: u32,
    ) -> Option<LevelSize> {
        let element_size = self.aspect_element_size(aspect)?;
        let mip = |v: u32| (v.checked_shr(level).unwrap_or(0)).max(1);
        let (mut width, mut height) = (mip(extent[0]), mip(extent[1]));
        let depth = mip(extent[2]);
        if let Some(p) = self.plane(aspect) {
            width = div_ceil(width, p.width_divisor);
            height = div_ceil(height, p.height_divisor);
        }
        let width_in_blocks = div_ceil(width, self.block_width);
        let height_in_blocks = div_ceil(height, self.block_height);
        let size = u64::from(width_in_blocks)
            * u64::from(height_in_blocks)
            * u64::from(depth)
            * u64::from(element_size);
        Some(LevelSize {
            width,
            height,
            depth,
            width_in_blocks,
            height_in_blocks,
            element_size,
            size,
        })
    }
}

/// Uncompressed format whose texel has the byte size of one compressed
/// block, used to stage block-compressed data.
pub fn block_staging_format(element_size: u32) -> Option<vk::Format> {
    match element_size {
        8 => Some(vk::Format::R32G32_UINT),
        16 => Some(vk::Format::R32G32B32A32_UINT),
        _ => None,
    }
}
