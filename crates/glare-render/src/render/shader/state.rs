//! Fixed-function state modes and their compiled wgpu equivalents.
//!
//! Every mode parses from a description token; unknown tokens fall back to
//! the mode's default instead of failing.

use bitflags::bitflags;

/// Color blending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    Opaque,
    #[default]
    Alpha,
    Additive,
}

impl BlendMode {
    pub fn parse(token: &str) -> Self {
        match token {
            "opaque" => BlendMode::Opaque,
            "alpha" => BlendMode::Alpha,
            "add" | "additive" => BlendMode::Additive,
            _ => BlendMode::default(),
        }
    }

    pub fn blend_state(self) -> wgpu::BlendState {
        match self {
            BlendMode::Opaque => wgpu::BlendState::REPLACE,
            BlendMode::Alpha => wgpu::BlendState::ALPHA_BLENDING,
            BlendMode::Additive => wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            },
        }
    }
}

/// Depth comparison. `Greater` is the default for reversed-Z depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompareOp {
    Never,
    Always,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    #[default]
    Greater,
    GreaterEqual,
}

impl CompareOp {
    /// Unknown tokens compare `Always`.
    pub fn parse(token: &str) -> Self {
        match token {
            "never" => CompareOp::Never,
            "l" => CompareOp::Less,
            "leq" => CompareOp::LessEqual,
            "eq" => CompareOp::Equal,
            "neq" => CompareOp::NotEqual,
            "g" => CompareOp::Greater,
            "geq" => CompareOp::GreaterEqual,
            _ => CompareOp::Always,
        }
    }

    pub fn to_wgpu(self) -> wgpu::CompareFunction {
        match self {
            CompareOp::Never => wgpu::CompareFunction::Never,
            CompareOp::Always => wgpu::CompareFunction::Always,
            CompareOp::Equal => wgpu::CompareFunction::Equal,
            CompareOp::NotEqual => wgpu::CompareFunction::NotEqual,
            CompareOp::Less => wgpu::CompareFunction::Less,
            CompareOp::LessEqual => wgpu::CompareFunction::LessEqual,
            CompareOp::Greater => wgpu::CompareFunction::Greater,
            CompareOp::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullMode {
    None,
    Front,
    #[default]
    Back,
}

impl CullMode {
    pub fn parse(token: &str) -> Self {
        match token {
            "none" => CullMode::None,
            "front" => CullMode::Front,
            "back" => CullMode::Back,
            _ => CullMode::default(),
        }
    }

    pub fn to_wgpu(self) -> Option<wgpu::Face> {
        match self {
            CullMode::None => None,
            CullMode::Front => Some(wgpu::Face::Front),
            CullMode::Back => Some(wgpu::Face::Back),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMode {
    #[default]
    Solid,
    Wire,
}

impl FillMode {
    pub fn parse(token: &str) -> Self {
        match token {
            "solid" => FillMode::Solid,
            "wire" | "wireframe" => FillMode::Wire,
            _ => FillMode::default(),
        }
    }

    pub fn to_wgpu(self) -> wgpu::PolygonMode {
        match self {
            FillMode::Solid => wgpu::PolygonMode::Fill,
            FillMode::Wire => wgpu::PolygonMode::Line,
        }
    }
}

/// Rasterizer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterMode {
    pub cull: CullMode,
    pub fill: FillMode,
    pub front_ccw: bool,
    pub depth_clip: bool,
}

impl Default for RasterMode {
    fn default() -> Self {
        Self {
            cull: CullMode::Back,
            fill: FillMode::Solid,
            front_ccw: true,
            depth_clip: true,
        }
    }
}

impl RasterMode {
    pub fn primitive_state(self) -> wgpu::PrimitiveState {
        wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: if self.front_ccw {
                wgpu::FrontFace::Ccw
            } else {
                wgpu::FrontFace::Cw
            },
            cull_mode: self.cull.to_wgpu(),
            polygon_mode: self.fill.to_wgpu(),
            unclipped_depth: !self.depth_clip,
            conservative: false,
        }
    }
}

/// Depth test configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthMode {
    pub compare: CompareOp,
    pub write: bool,
}

impl Default for DepthMode {
    fn default() -> Self {
        Self {
            compare: CompareOp::Greater,
            write: true,
        }
    }
}

impl DepthMode {
    pub fn depth_stencil_state(self, format: wgpu::TextureFormat) -> wgpu::DepthStencilState {
        wgpu::DepthStencilState {
            format,
            depth_write_enabled: self.write,
            depth_compare: self.compare.to_wgpu(),
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }
}

bitflags! {
    /// Which derived states are stale.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DirtyFlags: u8 {
        const BLEND = 1 << 0;
        const DEPTH_STENCIL = 1 << 1;
        const RASTERIZER = 1 << 2;
        const VBO_LAYOUT = 1 << 3;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tokens_use_defaults() {
        assert_eq!(BlendMode::parse("multiply"), BlendMode::Alpha);
        assert_eq!(CullMode::parse(""), CullMode::Back);
        assert_eq!(FillMode::parse("points"), FillMode::Solid);
        assert_eq!(CompareOp::parse("gt"), CompareOp::Always);
    }

    #[test]
    fn compare_tokens() {
        assert_eq!(CompareOp::parse("l"), CompareOp::Less);
        assert_eq!(CompareOp::parse("leq"), CompareOp::LessEqual);
        assert_eq!(CompareOp::parse("eq"), CompareOp::Equal);
        assert_eq!(CompareOp::parse("g"), CompareOp::Greater);
        assert_eq!(CompareOp::parse("geq"), CompareOp::GreaterEqual);
    }

    #[test]
    fn raster_mode_maps_winding_and_cull() {
        let p = RasterMode {
            cull: CullMode::None,
            fill: FillMode::Wire,
            front_ccw: false,
            depth_clip: false,
        }
        .primitive_state();
        assert_eq!(p.front_face, wgpu::FrontFace::Cw);
        assert_eq!(p.cull_mode, None);
        assert_eq!(p.polygon_mode, wgpu::PolygonMode::Line);
        assert!(p.unclipped_depth);
    }

    #[test]
    fn dirty_flags_insert_remove() {
        let mut d = DirtyFlags::empty();
        d.insert(DirtyFlags::BLEND | DirtyFlags::RASTERIZER);
        assert!(d.contains(DirtyFlags::BLEND));
        assert!(!d.contains(DirtyFlags::DEPTH_STENCIL));
        d.remove(DirtyFlags::BLEND);
        assert_eq!(d, DirtyFlags::RASTERIZER);
    }
}
