//! Main entry point for the starfield viewer.
//!
//! This module handles:
//! - Command-line argument parsing
//! - Window creation and event loop
//! - Translating window input into orbit-control calls
//! - Hover tooltips and constellation drawing via ray picking
//! - PNG export (interactive and headless)
//!
//! # Controls
//! - Left drag: orbit, right drag: pan, middle drag / wheel: dolly
//! - Arrow keys: pan one step
//! - D: toggle constellation drawing, then click two stars to connect them
//! - C: clear constellations, E: export PNG, R: reset camera
//! - Q/Escape: exit

use clap::Parser;
use glam::Vec2;
use starfield_renderer::{
    catalog::{Catalog, DEFAULT_WORLD_SCALE},
    controls::{ControlsEvent, InteractionMode, OrbitControls},
    gpu::GpuContext,
    picking,
    star::{StarColor, StarInstance},
    Renderer, DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH,
};
use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use winit::{
    dpi::PhysicalPosition,
    event::{
        ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, Touch, TouchPhase,
        WindowEvent,
    },
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

#[derive(Parser, Debug)]
#[command(name = "starfield")]
#[command(about = "Interactive 3D starfield viewer for Gaia star catalogs")]
struct Args {
    /// Path to the star catalog CSV
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// World units per catalog parsec
    #[arg(long, default_value_t = DEFAULT_WORLD_SCALE)]
    scale: f32,

    /// Window width in pixels
    #[arg(long, default_value_t = DEFAULT_WINDOW_WIDTH)]
    width: u32,

    /// Window height in pixels
    #[arg(long, default_value_t = DEFAULT_WINDOW_HEIGHT)]
    height: u32,

    /// Render a single frame to the specified file path (headless mode)
    #[arg(long)]
    save_frame: Option<PathBuf>,
}

// Drag shorter than this counts as a click for star selection.
const CLICK_TOLERANCE: f32 = 4.0;
const FRAME_DURATION: Duration = Duration::from_millis(16); // ~60 FPS
const WINDOW_TITLE: &str = "Starfield";

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let catalog = load_catalog(&args)?;
    // Keep the picking list identical to what the renderer draws.
    let instances = starfield_renderer::renderable_stars(&catalog.instances(args.scale)).to_vec();
    log::info!("{} stars in scene", instances.len());

    let size = winit::dpi::PhysicalSize::new(args.width, args.height);
    if let Some(output_path) = args.save_frame {
        return run_headless(&instances, size, &output_path);
    }

    let event_loop = EventLoop::new()?;
    let window = WindowBuilder::new()
        .with_title(WINDOW_TITLE)
        .with_inner_size(size)
        .build(&event_loop)?;

    let gpu = pollster::block_on(GpuContext::new())?;
    let mut renderer = pollster::block_on(Renderer::new(Some(&window), &gpu, size, true))?;
    renderer.set_stars(&gpu, &instances);

    let viewport = Vec2::new(size.width as f32, size.height as f32);
    let mut controls = OrbitControls::new(renderer.camera_mut(), viewport);
    // Scene feel of the reference viewer: inertial coasting.
    controls.enable_damping = true;
    controls.damping_factor = 0.05;

    let mut app = AppState {
        catalog,
        instances,
        drawing_mode: false,
        selected: Vec::new(),
        cursor: Vec2::ZERO,
        press_cursor: Vec2::ZERO,
        touches: Vec::new(),
        last_update: Instant::now(),
    };

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::AboutToWait => {
                if app.last_update.elapsed() >= FRAME_DURATION {
                    controls.update(renderer.camera_mut());
                    for event in controls.drain_events() {
                        if event != ControlsEvent::Change {
                            log::debug!("controls session event: {:?}", event);
                        }
                    }
                    app.last_update = Instant::now();
                    window.request_redraw();
                }
            }
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => elwt.exit(),
                WindowEvent::Resized(physical_size) => {
                    renderer.resize(&gpu, physical_size);
                    controls.set_viewport(Vec2::new(
                        physical_size.width as f32,
                        physical_size.height as f32,
                    ));
                }
                WindowEvent::MouseInput { state, button, .. } => match state {
                    ElementState::Pressed => {
                        app.press_cursor = app.cursor;
                        controls.on_mouse_down(button, app.cursor);
                    }
                    ElementState::Released => {
                        if button == MouseButton::Left {
                            handle_click(&mut app, &gpu, &mut renderer);
                        }
                        controls.on_mouse_up(button);
                    }
                },
                WindowEvent::CursorMoved { position, .. } => {
                    handle_cursor_moved(&mut app, &mut controls, &mut renderer, &window, position);
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    // DOM wheel convention: positive delta_y dollies out.
                    let delta_y = match delta {
                        MouseScrollDelta::LineDelta(_, y) => -y,
                        MouseScrollDelta::PixelDelta(pos) => -pos.y as f32,
                    };
                    controls.on_mouse_wheel(renderer.camera_mut(), delta_y);
                }
                WindowEvent::Touch(touch) => {
                    handle_touch(&mut app, &mut controls, &mut renderer, touch);
                }
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            physical_key: PhysicalKey::Code(code),
                            state: ElementState::Pressed,
                            ..
                        },
                    ..
                } => {
                    handle_key(&mut app, &mut controls, &gpu, &mut renderer, code, elwt);
                }
                WindowEvent::RedrawRequested => {
                    handle_redraw(&mut renderer, &gpu, &window, elwt);
                }
                _ => {}
            },
            _ => {}
        }
    })?;

    Ok(())
}

struct AppState {
    catalog: Catalog,
    instances: Vec<StarInstance>,
    drawing_mode: bool,
    selected: Vec<usize>,
    cursor: Vec2,
    press_cursor: Vec2,
    // Active touch points in start order, matching the DOM touches array.
    touches: Vec<(u64, Vec2)>,
    last_update: Instant,
}

fn load_catalog(args: &Args) -> anyhow::Result<Catalog> {
    match &args.catalog {
        Some(path) => Catalog::load(path),
        None => {
            log::info!("no catalog given, using built-in demo field");
            Ok(demo_catalog())
        }
    }
}

/// A handful of stars so the viewer shows something without a catalog.
fn demo_catalog() -> Catalog {
    use glam::Vec3;
    use starfield_renderer::star::Star;

    let specs: [(u64, [f32; 3], f32); 5] = [
        (1, [0.0, 0.0, 0.0], 0.4),
        (2, [3.0, 1.0, -2.0], -0.3),
        (3, [-4.0, -1.0, 2.0], 1.2),
        (4, [2.0, -3.0, 4.0], 2.0),
        (5, [-1.0, 4.0, -4.0], 3.0),
    ];
    let stars = specs
        .iter()
        .map(|&(source_id, pos, bp_rp)| Star {
            source_id,
            position: Vec3::from_array(pos),
            stellar_radius: None,
            bp_rp: Some(bp_rp),
            temperature: None,
            lifestage: None,
            color: StarColor::classify(Some(bp_rp), None),
        })
        .collect::<Vec<_>>();

    let min = Vec3::new(-4.0, -3.0, -4.0);
    let max = Vec3::new(3.0, 4.0, 4.0);
    Catalog { stars, min, max }
}

fn viewport_of(renderer: &Renderer) -> Vec2 {
    let (width, height) = renderer.size();
    Vec2::new(width as f32, height as f32)
}

fn handle_cursor_moved(
    app: &mut AppState,
    controls: &mut OrbitControls,
    renderer: &mut Renderer,
    window: &winit::window::Window,
    position: PhysicalPosition<f64>,
) {
    app.cursor = Vec2::new(position.x as f32, position.y as f32);
    controls.on_mouse_move(renderer.camera_mut(), app.cursor);

    // Hover tooltip, only while no gesture is active.
    if controls.interaction_mode() == InteractionMode::None {
        let viewport = viewport_of(renderer);
        match picking::pick_star(renderer.camera(), app.cursor, viewport, &app.instances) {
            Some(hit) => {
                let star = &app.catalog.stars[hit.index];
                window.set_title(&format!("{}: {}", WINDOW_TITLE, star.tooltip()));
            }
            None => window.set_title(WINDOW_TITLE),
        }
    }
}

fn handle_click(app: &mut AppState, gpu: &GpuContext, renderer: &mut Renderer) {
    if !app.drawing_mode || app.cursor.distance(app.press_cursor) > CLICK_TOLERANCE {
        return;
    }
    let viewport = viewport_of(renderer);
    let Some(hit) = picking::pick_star(renderer.camera(), app.cursor, viewport, &app.instances)
    else {
        return;
    };

    let star = &app.catalog.stars[hit.index];
    log::info!("selected star: {}", star.tooltip());
    app.selected.push(hit.index);
    if app.selected.len() == 2 {
        let a = app.instances[app.selected[0]].center();
        let b = app.instances[app.selected[1]].center();
        renderer.add_constellation(gpu, a, b);
        app.selected.clear();
    }
}

fn handle_touch(
    app: &mut AppState,
    controls: &mut OrbitControls,
    renderer: &mut Renderer,
    touch: Touch,
) {
    let position = Vec2::new(touch.location.x as f32, touch.location.y as f32);
    match touch.phase {
        TouchPhase::Started => {
            app.touches.push((touch.id, position));
            let points = touch_points(&app.touches);
            controls.on_touch_start(&points);
        }
        TouchPhase::Moved => {
            if let Some(entry) = app.touches.iter_mut().find(|(id, _)| *id == touch.id) {
                entry.1 = position;
            }
            let points = touch_points(&app.touches);
            controls.on_touch_move(renderer.camera_mut(), &points);
        }
        TouchPhase::Ended | TouchPhase::Cancelled => {
            app.touches.retain(|(id, _)| *id != touch.id);
            controls.on_touch_end();
        }
    }
}

fn touch_points(touches: &[(u64, Vec2)]) -> Vec<Vec2> {
    touches.iter().map(|(_, p)| *p).collect()
}

fn handle_key(
    app: &mut AppState,
    controls: &mut OrbitControls,
    gpu: &GpuContext,
    renderer: &mut Renderer,
    code: KeyCode,
    elwt: &winit::event_loop::EventLoopWindowTarget<()>,
) {
    match code {
        KeyCode::KeyQ | KeyCode::Escape => elwt.exit(),
        KeyCode::KeyD => {
            app.drawing_mode = !app.drawing_mode;
            app.selected.clear();
            log::info!(
                "constellation drawing {}",
                if app.drawing_mode { "on" } else { "off" }
            );
        }
        KeyCode::KeyC => {
            renderer.clear_constellations();
            app.selected.clear();
        }
        KeyCode::KeyE => {
            if let Err(e) = export_png(gpu, renderer, Path::new("constellation.png")) {
                log::error!("PNG export failed: {:#}", e);
            }
        }
        KeyCode::KeyR => {
            controls.reset(renderer.camera_mut());
        }
        _ => controls.on_key_down(renderer.camera_mut(), code),
    }
}

fn handle_redraw(
    renderer: &mut Renderer,
    gpu: &GpuContext,
    window: &winit::window::Window,
    elwt: &winit::event_loop::EventLoopWindowTarget<()>,
) {
    match renderer.render(gpu) {
        Ok(()) => {}
        Err(wgpu::SurfaceError::Lost) => renderer.resize(gpu, window.inner_size()),
        Err(wgpu::SurfaceError::OutOfMemory) => elwt.exit(),
        Err(e) => log::error!("render error: {:?}", e),
    }
}

fn run_headless(
    instances: &[StarInstance],
    size: winit::dpi::PhysicalSize<u32>,
    output_path: &Path,
) -> anyhow::Result<()> {
    log::info!("headless mode, saving frame to {}", output_path.display());

    let gpu = pollster::block_on(GpuContext::new())?;
    let mut renderer = pollster::block_on(Renderer::new(None, &gpu, size, true))?;
    renderer.set_stars(&gpu, instances);
    renderer.render_to_texture(&gpu);
    export_png(&gpu, &renderer, output_path)?;

    println!("Frame saved to {}", output_path.display());
    Ok(())
}

fn export_png(gpu: &GpuContext, renderer: &Renderer, path: &Path) -> anyhow::Result<()> {
    let frame = renderer
        .capture_frame(gpu)
        .ok_or_else(|| anyhow::anyhow!("frame capture failed"))?;

    let (width, height) = renderer.size();
    let rgba = match renderer.surface_format() {
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => {
            convert_bgra_to_rgba(&frame)
        }
        _ => frame,
    };
    image::save_buffer(path, &rgba, width, height, image::ColorType::Rgba8)?;
    log::info!("saved {}x{} PNG to {}", width, height, path.display());
    Ok(())
}

fn convert_bgra_to_rgba(bgra: &[u8]) -> Vec<u8> {
    let mut rgba = bgra.to_vec();
    for pixel in rgba.chunks_exact_mut(4) {
        pixel.swap(0, 2);
    }
    rgba
}
