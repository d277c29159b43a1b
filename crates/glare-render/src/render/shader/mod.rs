//! Shaders: two compiled stages plus the fixed-function state that goes with
//! them.
//!
//! State changes only mark a dirty flag. The affected wgpu state is rebuilt
//! right before the next draw by [`Shader::update_all_mode`], and the render
//! pipeline is rebuilt by [`Shader::reconcile`] when anything it depends on
//! changed.

mod stage;
mod state;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::desc::DescNode;
use crate::device::{GpuDevice, GpuPipeline, PipelineDesc};

use super::layout::BufferLayout;

pub use stage::{ShaderStage, ShaderStageKind};
pub use state::{
    BlendMode, CompareOp, CullMode, DepthMode, DirtyFlags, FillMode, RasterMode,
};

/// How many times each derived state was rebuilt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateRebuilds {
    pub blend: u32,
    pub depth_stencil: u32,
    pub rasterizer: u32,
    pub pipeline: u32,
}

type TargetFormats = (wgpu::TextureFormat, Option<wgpu::TextureFormat>);

pub struct Shader {
    name: String,
    vertex: ShaderStage,
    pixel: ShaderStage,

    blend_mode: BlendMode,
    depth_mode: DepthMode,
    raster_mode: RasterMode,

    blend_state: wgpu::BlendState,
    depth_state: DepthMode,
    primitive_state: wgpu::PrimitiveState,

    layout: Option<Arc<BufferLayout>>,
    dirty: DirtyFlags,

    pipeline: Option<GpuPipeline>,
    pipeline_targets: Option<TargetFormats>,
    pipeline_stale: bool,

    rebuilds: StateRebuilds,
}

impl Shader {
    /// A shader over two compiled stages with every mode at its default.
    pub fn new(name: impl Into<String>, vertex: ShaderStage, pixel: ShaderStage) -> Self {
        let mut shader = Self {
            name: name.into(),
            vertex,
            pixel,
            blend_mode: BlendMode::default(),
            depth_mode: DepthMode::default(),
            raster_mode: RasterMode::default(),
            blend_state: BlendMode::default().blend_state(),
            depth_state: DepthMode::default(),
            primitive_state: RasterMode::default().primitive_state(),
            layout: None,
            dirty: DirtyFlags::empty(),
            pipeline: None,
            pipeline_targets: None,
            pipeline_stale: true,
            rebuilds: StateRebuilds::default(),
        };
        shader.reset_shader_mode();
        shader
    }

    /// Compiles both stages from one WGSL file.
    pub fn load_wgsl(
        device: &dyn GpuDevice,
        path: impl AsRef<Path>,
        vs_entry: &str,
        ps_entry: &str,
    ) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read shader {}", path.display()))?;
        let filename = path.display().to_string();

        let vertex =
            ShaderStage::compile(device, &source, ShaderStageKind::Vertex, &filename, vs_entry)?;
        let pixel =
            ShaderStage::compile(device, &source, ShaderStageKind::Pixel, &filename, ps_entry)?;

        let name = path
            .file_stem()
            .map_or_else(|| filename.clone(), |s| s.to_string_lossy().into_owned());
        Ok(Self::new(name, vertex, pixel))
    }

    /// Builds a shader from a `<shader><pass .../></shader>` description.
    ///
    /// The pass `src` is resolved against `base_dir`. Mode tokens that are
    /// missing or unknown fall back to their defaults.
    pub fn from_desc(device: &dyn GpuDevice, desc: &DescNode, base_dir: &Path) -> Result<Self> {
        let pass = desc.child("pass");
        let src = pass
            .attr("src")
            .with_context(|| format!("<{}> pass has no src attribute", desc.name()))?;

        let vs = pass.child("vert").attr_str("vs", "Vert");
        let ps = pass.child("pixel").attr_str("ps", "Pixel");

        let mut shader = Self::load_wgsl(device, base_dir.join(src), &vs, &ps)?;
        if let Some(name) = desc.attr("name") {
            shader.name = name.to_string();
        }

        let depth = pass.child("depth");
        shader.set_depth_stencil_mode(
            CompareOp::parse(&depth.attr_str("comp", "g")),
            depth.attr_bool("write", true),
        );

        shader.set_blend_mode(BlendMode::parse(&pass.child("blend").attr_str("mode", "alpha")));

        let raster = pass.child("raster");
        shader.set_rasterizer_mode(RasterMode {
            cull: CullMode::parse(&raster.attr_str("cull", "back")),
            fill: FillMode::parse(&raster.attr_str("fill", "solid")),
            front_ccw: raster.attr_bool("front_ccw", true),
            depth_clip: raster.attr_bool("depth_clip", true),
        });

        shader.update_all_mode();
        Ok(shader)
    }

    /// Loads a description file; shader sources resolve next to it.
    pub fn load_from_desc_file(device: &dyn GpuDevice, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let desc = DescNode::load(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_desc(device, &desc, base_dir)
            .with_context(|| format!("failed to build shader from {}", path.display()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertex_stage(&self) -> &ShaderStage {
        &self.vertex
    }

    pub fn pixel_stage(&self) -> &ShaderStage {
        &self.pixel
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn depth_mode(&self) -> DepthMode {
        self.depth_mode
    }

    pub fn raster_mode(&self) -> RasterMode {
        self.raster_mode
    }

    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    pub fn rebuilds(&self) -> StateRebuilds {
        self.rebuilds
    }

    pub fn layout(&self) -> Option<&Arc<BufferLayout>> {
        self.layout.as_ref()
    }

    // ── modes ─────────────────────────────────────────────────────────────

    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
        self.dirty.insert(DirtyFlags::BLEND);
    }

    pub fn set_depth_stencil_mode(&mut self, compare: CompareOp, write: bool) {
        self.depth_mode = DepthMode { compare, write };
        self.dirty.insert(DirtyFlags::DEPTH_STENCIL);
    }

    pub fn set_rasterizer_mode(&mut self, mode: RasterMode) {
        self.raster_mode = mode;
        self.dirty.insert(DirtyFlags::RASTERIZER);
    }

    /// Rebuilds each dirty state and clears exactly its flag.
    ///
    /// Returns true when anything was rebuilt.
    pub fn update_all_mode(&mut self) -> bool {
        let mut rebuilt = false;

        if self.dirty.contains(DirtyFlags::BLEND) {
            self.blend_state = self.blend_mode.blend_state();
            self.rebuilds.blend += 1;
            self.dirty.remove(DirtyFlags::BLEND);
            rebuilt = true;
        }

        if self.dirty.contains(DirtyFlags::DEPTH_STENCIL) {
            self.depth_state = self.depth_mode;
            self.rebuilds.depth_stencil += 1;
            self.dirty.remove(DirtyFlags::DEPTH_STENCIL);
            rebuilt = true;
        }

        if self.dirty.contains(DirtyFlags::RASTERIZER) {
            self.primitive_state = self.raster_mode.primitive_state();
            self.rebuilds.rasterizer += 1;
            self.dirty.remove(DirtyFlags::RASTERIZER);
            rebuilt = true;
        }

        if rebuilt {
            self.pipeline_stale = true;
        }
        rebuilt
    }

    /// Restores every mode to its default and rebuilds the states.
    pub fn reset_shader_mode(&mut self) {
        self.set_blend_mode(BlendMode::default());
        self.set_depth_stencil_mode(CompareOp::default(), true);
        self.set_rasterizer_mode(RasterMode::default());
        self.update_all_mode();
    }

    /// Binds the vertex layout the pipeline is built for. Rebinding the same
    /// layout is a no-op.
    pub fn create_vbo_layout(&mut self, layout: &Arc<BufferLayout>) {
        if self
            .layout
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, layout))
        {
            return;
        }
        self.layout = Some(Arc::clone(layout));
        self.dirty.insert(DirtyFlags::VBO_LAYOUT);
    }

    // ── pipeline ──────────────────────────────────────────────────────────

    /// Brings every derived state up to date and returns the pipeline for
    /// the given targets, rebuilding it only when something changed.
    pub fn reconcile(
        &mut self,
        device: &dyn GpuDevice,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Result<&GpuPipeline> {
        self.update_all_mode();

        let Some(layout) = self.layout.clone() else {
            anyhow::bail!("shader '{}' has no vertex layout bound", self.name);
        };

        let targets = (color_format, depth_format);
        let needs_rebuild = self.pipeline.is_none()
            || self.pipeline_stale
            || self.dirty.contains(DirtyFlags::VBO_LAYOUT)
            || self.pipeline_targets != Some(targets);

        if needs_rebuild {
            let primitive = self.supported_primitive_state(device.features());
            let label = format!("{} pipeline", self.name);

            let pipeline = device.create_pipeline(&PipelineDesc {
                label: &label,
                vertex_module: self.vertex.module(),
                vertex_entry: self.vertex.entry(),
                pixel_module: self.pixel.module(),
                pixel_entry: self.pixel.entry(),
                vertex_layout: layout.vertex_buffer_layout(),
                blend: self.blend_state,
                primitive,
                depth_stencil: depth_format.map(|f| self.depth_state.depth_stencil_state(f)),
                color_format,
            })?;

            log::debug!("shader '{}': pipeline rebuilt for {targets:?}", self.name);
            self.pipeline = Some(pipeline);
            self.pipeline_targets = Some(targets);
            self.pipeline_stale = false;
            self.dirty.remove(DirtyFlags::VBO_LAYOUT);
            self.rebuilds.pipeline += 1;
        }

        self.pipeline
            .as_ref()
            .with_context(|| format!("shader '{}' has no pipeline", self.name))
    }

    /// The compiled primitive state with options the device lacks turned off.
    fn supported_primitive_state(&self, features: wgpu::Features) -> wgpu::PrimitiveState {
        let mut primitive = self.primitive_state;
        if primitive.polygon_mode == wgpu::PolygonMode::Line
            && !features.contains(wgpu::Features::POLYGON_MODE_LINE)
        {
            log::warn!("shader '{}': wireframe fill unsupported, drawing solid", self.name);
            primitive.polygon_mode = wgpu::PolygonMode::Fill;
        }
        if primitive.unclipped_depth && !features.contains(wgpu::Features::DEPTH_CLIP_CONTROL) {
            log::warn!("shader '{}': depth clip control unsupported, clipping", self.name);
            primitive.unclipped_depth = false;
        }
        primitive
    }
}
