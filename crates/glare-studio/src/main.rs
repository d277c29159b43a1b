use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{Context, Result};
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{Key, NamedKey};

use glare_render::coords::{Aabb2, IVec2, Rgba, Vec2, Vec3};
use glare_render::core::{App, AppControl, FrameCtx};
use glare_render::logging::{init_logging, LoggingConfig};
use glare_render::render::mesh_builder;
use glare_render::render::{
    AnimSource, CameraConstants, Mesh, ModelConstants, Renderer, RendererConfig,
    ResourceManager, Shader, Surface, Texture2D, TextureFilter, VertexPcu,
};
use glare_render::window::{Runtime, RuntimeConfig};

/// Edge of one cell of the procedural sprite sheet, in pixels.
const CELL: u32 = 64;

fn assets() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("assets")
}

/// A 4×2 sheet of colored discs with a white ring that widens from cell to
/// cell, so a clip over a row reads as a pulse.
fn cell_surface() -> Surface {
    const COLORS: [Rgba; 8] = [
        Rgba::RED,
        Rgba::LIME,
        Rgba::BLUE,
        Rgba::YELLOW,
        Rgba::CYAN,
        Rgba::MAGENTA,
        Rgba::CORNFLOWER,
        Rgba::GRAY,
    ];

    let (width, height) = (CELL * 4, CELL * 2);
    let mut surface = Surface::new(width, height, Rgba::TRANSPARENT);
    let half = CELL as f32 * 0.5;

    for y in 0..height {
        for x in 0..width {
            let cell = (y / CELL * 4 + x / CELL) as usize;
            let local = Vec2::new((x % CELL) as f32 + 0.5 - half, (y % CELL) as f32 + 0.5 - half);
            let d = local.length();
            if d > half - 4.0 {
                continue;
            }

            let ring = 6.0 + 6.0 * (cell % 4) as f32;
            let color = if (d - ring).abs() < 2.5 {
                Rgba::WHITE
            } else {
                COLORS[cell]
            };
            surface.set_texel(IVec2::new(x as i32, y as i32), color);
        }
    }
    surface
}

struct Actor {
    source: AnimSource,
    position: Vec2,
    size: f32,
    mesh: Mesh,
}

struct Scene {
    sprite_shader: Shader,
    wire_shader: Shader,
    actors: Vec<Actor>,
    shapes: Mesh,
    grid: Mesh,
    spin: f32,
}

impl Scene {
    fn draw(&mut self, r: &mut Renderer<'_>, camera: &CameraConstants) -> Result<()> {
        r.set_camera(camera);

        r.set_model(&ModelConstants::default());
        r.bind_texture(None, TextureFilter::MinPointMagPoint)?;
        r.draw_mesh(&mut self.wire_shader, &mut self.grid)?;

        r.set_model(&ModelConstants::transform(
            Vec3::new(0.0, -160.0, 0.0),
            self.spin * 0.5,
            1.0,
            Rgba::WHITE,
        ));
        r.draw_mesh(&mut self.sprite_shader, &mut self.shapes)?;

        for actor in &mut self.actors {
            actor.mesh.clear();
            mesh_builder::add_aabb2(
                &mut actor.mesh,
                &Aabb2::from_center(Vec2::ZERO, Vec2::ONE * (actor.size * 0.5)),
                Some(actor.source.current_frame_uvs()),
            );

            let texture = actor.source.texture();
            r.bind_texture(texture.as_deref(), TextureFilter::MinPointMagPoint)?;
            r.set_model(&ModelConstants::transform(
                actor.position.into(),
                0.0,
                1.0,
                Rgba::WHITE,
            ));
            r.draw_mesh(&mut self.sprite_shader, &mut actor.mesh)?;
        }

        Ok(())
    }
}

#[derive(Default)]
struct Studio {
    resources: ResourceManager,
    scene: Option<Scene>,
}

impl App for Studio {
    fn on_start(&mut self, renderer: &mut Renderer<'_>) -> Result<()> {
        let device = renderer.device();
        let assets = assets();
        let layout = self.resources.acquire_layout_of::<VertexPcu>();

        let cells = self.resources.register_texture(
            "cells",
            Texture2D::from_surface(device, "cells", &cell_surface()),
        );
        self.resources
            .load_sprite_sheet_from_texture("cells_grid", Rc::clone(&cells), IVec2::new(4, 2));
        let halves = self.resources.load_sprite_sheet_from_desc(
            device,
            "cells_halves",
            assets.join("cells.sheet.xml"),
        )?;
        self.resources
            .load_sprite_anim_from_desc("walk", assets.join("walk.anim.xml"))?;

        let walker = self.resources.sprite_anim_copy("walk")?;
        let mut bouncer = self.resources.sprite_anim_copy("walk")?;
        anyhow::ensure!(bouncer.set_current_clip("bounce"), "walk.anim.xml has no bounce clip");
        let still = halves
            .sprite(1)
            .context("cells.sheet.xml defines fewer than two sprites")?
            .clone();

        let actor = |source, position, size| Actor {
            source,
            position,
            size,
            mesh: Mesh::with_layout(Arc::clone(&layout)),
        };
        let actors = vec![
            actor(AnimSource::Clip(walker), Vec2::new(-220.0, 60.0), 128.0),
            actor(AnimSource::Clip(bouncer), Vec2::new(0.0, 60.0), 128.0),
            actor(AnimSource::Static(still), Vec2::new(220.0, 60.0), 160.0),
        ];

        let mut shapes = Mesh::with_layout(Arc::clone(&layout));
        shapes.builder_brush.color = Rgba::YELLOW;
        mesh_builder::add_disk(&mut shapes, Vec2::new(-120.0, 0.0), 40.0, 32, &Aabb2::UNIT);
        shapes.builder_brush.color = Rgba::CYAN;
        mesh_builder::add_ring(&mut shapes, Vec2::new(0.0, 0.0), 28.0, 44.0, 32, &Aabb2::UNIT);
        shapes.builder_brush.color = Rgba::MAGENTA;
        mesh_builder::add_line2(&mut shapes, Vec2::new(80.0, -30.0), Vec2::new(160.0, 30.0), 6.0);

        let mut grid = Mesh::with_layout(layout);
        grid.set_indexed(false);
        grid.builder_brush.color = Rgba::new(1.0, 1.0, 1.0, 0.25);
        mesh_builder::add_grid2(&mut grid, Vec2::new(-480.0, -270.0), Vec2::new(480.0, 270.0), 12, 6);

        self.scene = Some(Scene {
            sprite_shader: Shader::load_from_desc_file(device, assets.join("sprite.shader.xml"))?,
            wire_shader: Shader::load_from_desc_file(device, assets.join("wire.shader.xml"))?,
            actors,
            shapes,
            grid,
            spin: 0.0,
        });

        log::info!(
            "studio ready: {} actors, {} shape vertices",
            self.scene.as_ref().map_or(0, |s| s.actors.len()),
            self.scene.as_ref().map_or(0, |s| s.shapes.vertex_count()),
        );
        Ok(())
    }

    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.logical_key == Key::Named(NamedKey::Escape) =>
            {
                AppControl::Exit
            }
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let Some(scene) = self.scene.as_mut() else {
            return AppControl::Exit;
        };

        let dt = ctx.time.dt;
        scene.spin += dt;
        for actor in &mut scene.actors {
            actor.source.advance_time(dt);
        }

        let half = ctx.renderer.size().to_vec2() * 0.5;
        let camera = CameraConstants::orthographic(-half, half, 0.0, 1.0);

        ctx.render(|r| scene.draw(r, &camera))
    }
}

/// `--dump-sheet <path>` writes the procedural sprite sheet as a PNG and exits.
fn dump_sheet(path: &Path) -> Result<()> {
    cell_surface().write_png(path)?;
    log::info!("sprite sheet written to {}", path.display());
    Ok(())
}

fn main() {
    init_logging(LoggingConfig::default());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.as_slice() {
        [flag, path] if flag == "--dump-sheet" => dump_sheet(Path::new(path)),
        _ => {
            let config = RuntimeConfig {
                title: "glare studio".to_string(),
                renderer: RendererConfig {
                    clear_color: Rgba::new(0.08, 0.08, 0.1, 1.0),
                    ..RendererConfig::default()
                },
                ..RuntimeConfig::default()
            };
            Runtime::run(config, Studio::default())
        }
    };

    if let Err(e) = result {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}
