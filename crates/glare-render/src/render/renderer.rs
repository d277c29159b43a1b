use anyhow::{anyhow, Context, Result};
use bytemuck::{Pod, Zeroable};
use winit::dpi::PhysicalSize;

use crate::coords::{IVec2, Rgba, Vec2, Vec3};
use crate::device::{
    ClientWindow, Gpu, GpuDevice, GpuFrame, GpuImage, GpuInit, GpuView, SurfaceErrorAction,
};

use super::buffer::{ConstantBuffer, INDEX_FORMAT};
use super::mesh::Mesh;
use super::sampler::{SamplerCache, TextureFilter};
use super::shader::Shader;
use super::surface::Surface;
use super::texture::Texture2D;

/// Renderer configuration.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Cleared into the frame by [`crate::core::FrameCtx::render`].
    pub clear_color: Rgba,
    /// Depth cleared at the start of each frame. Depth is reversed: near is 1.
    pub depth_clear: f32,
    pub depth_format: wgpu::TextureFormat,
    /// Prefix of every GPU object label created by the renderer.
    pub label: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear_color: Rgba::BLACK,
            depth_clear: 0.0,
            depth_format: wgpu::TextureFormat::Depth32Float,
            label: "glare".to_string(),
        }
    }
}

/// Group 0, binding 0.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraConstants {
    /// Column-major.
    pub view_projection: [[f32; 4]; 4],
}

impl CameraConstants {
    /// Orthographic camera over `bottom_left..top_right` with +Y up.
    ///
    /// `z = near` maps to depth 1 and `z = far` to depth 0.
    pub fn orthographic(bottom_left: Vec2, top_right: Vec2, near: f32, far: f32) -> Self {
        let size = top_right - bottom_left;
        let sx = 2.0 / size.x;
        let sy = 2.0 / size.y;
        let sz = -1.0 / (far - near);

        Self {
            view_projection: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, sz, 0.0],
                [
                    -(top_right.x + bottom_left.x) / size.x,
                    -(top_right.y + bottom_left.y) / size.y,
                    far / (far - near),
                    1.0,
                ],
            ],
        }
    }

    pub fn transform(&self, p: Vec3) -> Vec3 {
        let m = &self.view_projection;
        Vec3::new(
            m[0][0] * p.x + m[1][0] * p.y + m[2][0] * p.z + m[3][0],
            m[0][1] * p.x + m[1][1] * p.y + m[2][1] * p.z + m[3][1],
            m[0][2] * p.x + m[1][2] * p.y + m[2][2] * p.z + m[3][2],
        )
    }
}

/// Group 0, binding 1.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ModelConstants {
    /// Column-major.
    pub model: [[f32; 4]; 4],
    pub tint: [f32; 4],
}

impl Default for ModelConstants {
    fn default() -> Self {
        Self::transform(Vec3::ZERO, 0.0, 1.0, Rgba::WHITE)
    }
}

impl ModelConstants {
    /// Uniform scale, then rotation about +Z, then translation.
    pub fn transform(translation: Vec3, rotation: f32, scale: f32, tint: Rgba) -> Self {
        let (sin, cos) = rotation.sin_cos();
        Self {
            model: [
                [cos * scale, sin * scale, 0.0, 0.0],
                [-sin * scale, cos * scale, 0.0, 0.0],
                [0.0, 0.0, scale, 0.0],
                [translation.x, translation.y, translation.z, 1.0],
            ],
            tint: tint.to_array(),
        }
    }
}

struct ActiveFrame {
    frame: GpuFrame,
    /// The swapchain image, wrapped without ownership.
    back_buffer: Texture2D,
    /// Render straight into the back buffer instead of the frame texture.
    direct: bool,
    /// Draws recorded since the last constant-buffer write.
    pending_draws: bool,
}

/// Immediate-mode renderer on top of [`Gpu`].
///
/// Frames render into an off-screen texture (plus a depth target) that is
/// copied to the swapchain image at [`Renderer::end_frame`]. When the surface
/// does not accept copies, frames render straight into the swapchain image.
pub struct Renderer<'w> {
    gpu: Gpu<'w>,
    config: RendererConfig,

    camera: ConstantBuffer,
    model: ConstantBuffer,
    /// Bind group over the constant buffers and the generations it was built for.
    constants_group: Option<(wgpu::BindGroup, [u64; 2])>,

    samplers: SamplerCache,
    default_texture: Texture2D,
    material_group: Option<wgpu::BindGroup>,

    frame: Option<ActiveFrame>,
    frame_target: Option<Texture2D>,
    depth_target: Option<Texture2D>,
}

impl<'w> Renderer<'w> {
    /// Creates the GPU context for `window` and the renderer's shared resources.
    pub fn new<W: ClientWindow>(
        window: &'w W,
        init: GpuInit,
        config: RendererConfig,
    ) -> Result<Self> {
        let gpu = pollster::block_on(Gpu::new(window, init))?;

        let mut camera = ConstantBuffer::new("glare camera constants");
        let identity = CameraConstants::orthographic(-Vec2::ONE, Vec2::ONE, 0.0, 1.0);
        camera.buffer(&gpu, bytemuck::bytes_of(&identity));

        let mut model = ConstantBuffer::new("glare model constants");
        model.buffer(&gpu, bytemuck::bytes_of(&ModelConstants::default()));

        let default_texture = Texture2D::from_surface(
            &gpu,
            format!("{} default white", config.label),
            &Surface::new(1, 1, Rgba::WHITE),
        );

        log::info!(
            "renderer ready on {} ({:?})",
            gpu.adapter_info().name,
            gpu.adapter_info().backend
        );

        Ok(Self {
            gpu,
            config,
            camera,
            model,
            constants_group: None,
            samplers: SamplerCache::new(),
            default_texture,
            material_group: None,
            frame: None,
            frame_target: None,
            depth_target: None,
        })
    }

    pub fn gpu(&self) -> &Gpu<'w> {
        &self.gpu
    }

    /// The device resources are created on.
    pub fn device(&self) -> &dyn GpuDevice {
        &self.gpu
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Drawable size in physical pixels.
    pub fn size(&self) -> IVec2 {
        let size = self.gpu.size();
        IVec2::new(size.width as i32, size.height as i32)
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.gpu.resize(new_size);
    }

    /// The texture draws land in during the current frame.
    pub fn color_target(&self) -> Option<&Texture2D> {
        let frame = self.frame.as_ref()?;
        if frame.direct {
            Some(&frame.back_buffer)
        } else {
            self.frame_target.as_ref()
        }
    }

    pub fn depth_target(&self) -> Option<&Texture2D> {
        self.depth_target.as_ref()
    }

    pub fn is_in_frame(&self) -> bool {
        self.frame.is_some()
    }

    // ── frame ─────────────────────────────────────────────────────────────

    /// Acquires the next swapchain image.
    ///
    /// Returns `Ok(false)` when the frame should be skipped (surface
    /// reconfigured or briefly unavailable).
    pub fn begin_frame(&mut self) -> Result<bool> {
        if self.frame.take().is_some() {
            log::warn!("begin_frame: previous frame was never ended; dropped");
        }

        let frame = match self.gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                return match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => Ok(false),
                    SurfaceErrorAction::Fatal => Err(anyhow!("surface is lost beyond recovery")),
                };
            }
        };

        let back_buffer = Texture2D::wrap(
            format!("{} back buffer", self.config.label),
            GpuImage::Wgpu(frame.surface_texture.texture.clone()),
        );
        let direct = !self.gpu.surface_accepts_copies();
        self.ensure_targets(&back_buffer, direct)?;

        self.frame = Some(ActiveFrame {
            frame,
            back_buffer,
            direct,
            pending_draws: false,
        });
        Ok(true)
    }

    /// Recreates the frame and depth textures when the back buffer size changed.
    /// The frame texture matches the back buffer's size and format.
    fn ensure_targets(&mut self, back_buffer: &Texture2D, direct: bool) -> Result<()> {
        let size = back_buffer.size();
        let (width, height) = (size.x as u32, size.y as u32);
        let label = &self.config.label;

        if self.depth_target.as_ref().map(Texture2D::size) != Some(size) {
            self.depth_target = Some(Texture2D::render_target(
                &self.gpu,
                format!("{label} depth"),
                width,
                height,
                self.config.depth_format,
            ));
        }

        if direct {
            self.frame_target = None;
        } else if self.frame_target.as_ref().map(Texture2D::size) != Some(size) {
            self.frame_target = Some(frame_target_for(&self.gpu, label, back_buffer)?);
            log::debug!("frame targets resized to {width}x{height}");
        }
        Ok(())
    }

    /// Copies the frame texture to the swapchain image, submits and presents.
    pub fn end_frame(&mut self) {
        let Some(mut active) = self.frame.take() else {
            log::warn!("end_frame without begin_frame");
            return;
        };

        if !active.direct {
            if let Some(target) = &self.frame_target {
                copy_image(&mut active.frame.encoder, &active.back_buffer, target);
            }
        }

        self.gpu.submit(active.frame);
    }

    /// Submits recorded draws so that the next constant write cannot reach them.
    fn flush_pending_draws(&mut self) {
        let Some(active) = self.frame.as_mut() else {
            return;
        };
        if !active.pending_draws {
            return;
        }

        let label = format!("{} frame encoder", self.config.label);
        let encoder = std::mem::replace(&mut active.frame.encoder, self.gpu.create_encoder(&label));
        self.gpu.submit_commands(encoder);
        active.pending_draws = false;
    }

    // ── clears ────────────────────────────────────────────────────────────

    pub fn clear_render_target(&mut self, color: Rgba) {
        let Some(active) = self.frame.as_mut() else {
            log::warn!("clear_render_target outside a frame");
            return;
        };
        let target = if active.direct {
            Some(&active.back_buffer)
        } else {
            self.frame_target.as_ref()
        };
        let Some(view) = target
            .and_then(|t| t.view_handle(&self.gpu))
            .and_then(GpuView::as_wgpu)
        else {
            return;
        };

        let _pass = begin_pass(
            &mut active.frame.encoder,
            "glare clear color",
            view,
            wgpu::LoadOp::Clear(color.to_wgpu()),
            None,
        );
    }

    pub fn clear_depth(&mut self, value: f32) {
        let Some(active) = self.frame.as_mut() else {
            log::warn!("clear_depth outside a frame");
            return;
        };
        let color = if active.direct {
            Some(&active.back_buffer)
        } else {
            self.frame_target.as_ref()
        };
        let (Some(color), Some(depth)) = (
            color.and_then(|t| t.view_handle(&self.gpu)).and_then(GpuView::as_wgpu),
            self.depth_target
                .as_ref()
                .and_then(|t| t.view_handle(&self.gpu))
                .and_then(GpuView::as_wgpu),
        ) else {
            return;
        };

        let _pass = begin_pass(
            &mut active.frame.encoder,
            "glare clear depth",
            color,
            wgpu::LoadOp::Load,
            Some((depth, wgpu::LoadOp::Clear(value))),
        );
    }

    // ── state ─────────────────────────────────────────────────────────────

    pub fn set_camera(&mut self, camera: &CameraConstants) {
        self.flush_pending_draws();
        self.camera.buffer(&self.gpu, bytemuck::bytes_of(camera));
    }

    pub fn set_model(&mut self, model: &ModelConstants) {
        self.flush_pending_draws();
        self.model.buffer(&self.gpu, bytemuck::bytes_of(model));
    }

    /// Binds `texture` (the default white texture when `None` or imageless)
    /// with the sampler for `filter`.
    pub fn bind_texture(&mut self, texture: Option<&Texture2D>, filter: TextureFilter) -> Result<()> {
        let texture = texture
            .filter(|t| t.has_image())
            .unwrap_or(&self.default_texture);

        let view = texture
            .view_handle(&self.gpu)
            .and_then(GpuView::as_wgpu)
            .with_context(|| format!("texture '{}' has no wgpu view", texture.name()))?;
        let sampler = self
            .samplers
            .get(&self.gpu, filter)
            .as_wgpu()
            .context("sampler was not created by a wgpu device")?;

        let group = self
            .gpu
            .device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("glare material bind group"),
                layout: &self.gpu.layouts().material,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            });

        self.material_group = Some(group);
        Ok(())
    }

    /// Rebuilds the constants bind group after either buffer was recreated.
    fn refresh_constants_group(&mut self) -> Result<()> {
        let generations = [self.camera.generation(), self.model.generation()];
        if matches!(&self.constants_group, Some((_, g)) if *g == generations) {
            return Ok(());
        }

        let camera = self
            .camera
            .handle()
            .and_then(|b| b.as_wgpu())
            .context("camera constants were never uploaded")?;
        let model = self
            .model
            .handle()
            .and_then(|b| b.as_wgpu())
            .context("model constants were never uploaded")?;

        let group = self
            .gpu
            .device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("glare constants bind group"),
                layout: &self.gpu.layouts().constants,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: camera.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: model.as_entire_binding(),
                    },
                ],
            });

        self.constants_group = Some((group, generations));
        Ok(())
    }

    // ── draws ─────────────────────────────────────────────────────────────

    /// Uploads stale geometry, brings the shader's pipeline up to date and
    /// records one draw with the bound camera, model and texture.
    pub fn draw_mesh(&mut self, shader: &mut Shader, mesh: &mut Mesh) -> Result<()> {
        anyhow::ensure!(self.frame.is_some(), "draw_mesh outside a frame");

        mesh.update_gpu_mesh(&self.gpu);
        let count = mesh.element_count() as u32;
        let Some(vbo) = mesh.vertex_buffer() else {
            return Ok(());
        };
        if count == 0 {
            return Ok(());
        }

        if let Some(layout) = mesh.layout() {
            shader.create_vbo_layout(layout);
        }

        let color_format = self.gpu.surface_format();
        let pipeline = shader
            .reconcile(&self.gpu, color_format, Some(self.config.depth_format))?
            .as_wgpu()
            .context("shader pipeline was not created by a wgpu device")?;

        self.refresh_constants_group()?;
        if self.material_group.is_none() {
            self.bind_texture(None, TextureFilter::default())?;
        }

        let vertices = vbo
            .handle()
            .and_then(|b| b.as_wgpu())
            .context("mesh vertex buffer is not a wgpu buffer")?;
        let indices = if mesh.is_indexed() {
            let ibo = mesh.index_buffer().context("indexed mesh has no index buffer")?;
            Some(
                ibo.handle()
                    .and_then(|b| b.as_wgpu())
                    .context("mesh index buffer is not a wgpu buffer")?,
            )
        } else {
            None
        };

        let (Some((constants, _)), Some(material), Some(active)) = (
            self.constants_group.as_ref(),
            self.material_group.as_ref(),
            self.frame.as_mut(),
        ) else {
            anyhow::bail!("draw_mesh: frame state is incomplete");
        };

        let color = if active.direct {
            Some(&active.back_buffer)
        } else {
            self.frame_target.as_ref()
        };
        let color = color
            .and_then(|t| t.view_handle(&self.gpu))
            .and_then(GpuView::as_wgpu)
            .context("frame has no color target")?;
        let depth = self
            .depth_target
            .as_ref()
            .and_then(|t| t.view_handle(&self.gpu))
            .and_then(GpuView::as_wgpu)
            .context("frame has no depth target")?;

        let mut pass = begin_pass(
            &mut active.frame.encoder,
            "glare draw",
            color,
            wgpu::LoadOp::Load,
            Some((depth, wgpu::LoadOp::Load)),
        );

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, constants, &[]);
        pass.set_bind_group(1, material, &[]);
        pass.set_vertex_buffer(0, vertices.slice(..));

        match indices {
            Some(indices) => {
                pass.set_index_buffer(indices.slice(..), INDEX_FORMAT);
                pass.draw_indexed(0..count, 0, 0..1);
            }
            None => pass.draw(0..count, 0..1),
        }
        drop(pass);

        active.pending_draws = true;
        Ok(())
    }

    /// Copies `src` into `dst`, clipped to the smaller of the two.
    ///
    /// # Panics
    /// When `dst` is immutable.
    pub fn copy_texture(&mut self, dst: &Texture2D, src: &Texture2D) {
        assert!(
            !dst.is_immutable(),
            "copy_texture: destination '{}' is immutable",
            dst.name()
        );

        match self.frame.as_mut() {
            Some(active) => copy_image(&mut active.frame.encoder, dst, src),
            None => {
                let mut encoder = self.gpu.create_encoder("glare copy encoder");
                copy_image(&mut encoder, dst, src);
                self.gpu.submit_commands(encoder);
            }
        }
    }
}

/// The off-screen texture a frame renders into before it is copied to
/// `back_buffer`.
fn frame_target_for(
    device: &dyn GpuDevice,
    label: &str,
    back_buffer: &Texture2D,
) -> Result<Texture2D> {
    Texture2D::new_matching(device, format!("{label} frame"), back_buffer)
}

fn begin_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    color: &wgpu::TextureView,
    color_load: wgpu::LoadOp<wgpu::Color>,
    depth: Option<(&wgpu::TextureView, wgpu::LoadOp<f32>)>,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: color,
            resolve_target: None,
            ops: wgpu::Operations {
                load: color_load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: depth.map(|(view, load)| {
            wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: Some(wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    })
}

fn copy_image(encoder: &mut wgpu::CommandEncoder, dst: &Texture2D, src: &Texture2D) {
    let (Some(src_image), Some(dst_image)) = (
        src.image().and_then(GpuImage::as_wgpu),
        dst.image().and_then(GpuImage::as_wgpu),
    ) else {
        log::warn!("copy '{}' -> '{}': missing image", src.name(), dst.name());
        return;
    };

    let extent = wgpu::Extent3d {
        width: src_image.width().min(dst_image.width()),
        height: src_image.height().min(dst_image.height()),
        depth_or_array_layers: 1,
    };
    encoder.copy_texture_to_texture(
        src_image.as_image_copy(),
        dst_image.as_image_copy(),
        extent,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::texture::{ImageOwnership, TextureUsage};

    fn close(a: Vec3, b: Vec3) -> bool {
        (a.x - b.x).abs() < 1e-5 && (a.y - b.y).abs() < 1e-5 && (a.z - b.z).abs() < 1e-5
    }

    #[test]
    fn orthographic_maps_bounds_to_ndc() {
        let cam = CameraConstants::orthographic(Vec2::new(0.0, 0.0), Vec2::new(200.0, 100.0), 0.0, 1.0);
        assert!(close(cam.transform(Vec3::new(0.0, 0.0, 0.0)), Vec3::new(-1.0, -1.0, 1.0)));
        assert!(close(cam.transform(Vec3::new(200.0, 100.0, 1.0)), Vec3::new(1.0, 1.0, 0.0)));
        assert!(close(cam.transform(Vec3::new(100.0, 50.0, 0.5)), Vec3::new(0.0, 0.0, 0.5)));
    }

    #[test]
    fn depth_is_reversed() {
        let cam = CameraConstants::orthographic(-Vec2::ONE, Vec2::ONE, 0.0, 10.0);
        let near = cam.transform(Vec3::new(0.0, 0.0, 0.0)).z;
        let far = cam.transform(Vec3::new(0.0, 0.0, 10.0)).z;
        assert!(near > far);
    }

    #[test]
    fn model_default_is_identity() {
        let m = ModelConstants::default();
        assert_eq!(m.model[0], [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(m.model[3], [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(m.tint, Rgba::WHITE.to_array());
    }

    #[test]
    fn model_rotates_then_translates() {
        let m = ModelConstants::transform(
            Vec3::new(10.0, 0.0, 0.0),
            std::f32::consts::FRAC_PI_2,
            2.0,
            Rgba::WHITE,
        );
        let c = m.model;
        // (1, 0) → scaled (2, 0) → rotated (0, 2) → translated (10, 2)
        let x = c[0][0] + c[3][0];
        let y = c[0][1] + c[3][1];
        assert!((x - 10.0).abs() < 1e-5);
        assert!((y - 2.0).abs() < 1e-5);
    }

    #[test]
    fn frame_target_matches_back_buffer() {
        let device = crate::device::HeadlessDevice::new();
        let swapchain =
            Texture2D::render_target(&device, "swap", 640, 360, wgpu::TextureFormat::Bgra8UnormSrgb);
        let back_buffer = Texture2D::wrap("back", swapchain.image().unwrap().clone());

        let target = frame_target_for(&device, "glare", &back_buffer).unwrap();
        assert_eq!(target.size(), back_buffer.size());
        assert_eq!(target.format(), back_buffer.format());
        assert_eq!(target.ownership(), ImageOwnership::Owned);
        assert!(target.usage().contains(TextureUsage::RENDER_TARGET | TextureUsage::SHADER_RESOURCE));
    }

    #[test]
    fn constants_have_uniform_friendly_sizes() {
        assert_eq!(std::mem::size_of::<CameraConstants>(), 64);
        assert_eq!(std::mem::size_of::<ModelConstants>(), 80);
    }

    #[test]
    fn default_config_clears_to_far_plane() {
        let config = RendererConfig::default();
        assert_eq!(config.depth_clear, 0.0);
        assert_eq!(config.depth_format, wgpu::TextureFormat::Depth32Float);
    }
}
