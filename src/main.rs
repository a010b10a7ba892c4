/// Demo application
/// Opens a window, flies a camera through the scene and shows the depth buffer
use glam::Vec3;
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;
use std::error::Error;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use occlusion_culler::*;
use winit::{
    dpi::PhysicalSize,
    event::*,
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowBuilder},
};

const CITY_SEED: u64 = 0x5EED;
const CITY_GRID: usize = 12;

type Surface = softbuffer::Surface<Arc<Window>, Arc<Window>>;

fn main() -> std::result::Result<(), Box<dyn Error>> {
    env_logger::init();

    println!("=== Occlusion Culler - Software Depth Rasterizer ===");
    println!("Usage: occlusion_culler [scene dir] [max batches]");
    println!("Controls:");
    println!("  W/S        - Move forward/back");
    println!("  A/D        - Strafe");
    println!("  Arrows     - Look around");
    println!("  Shift/Ctrl - Faster/slower");
    println!("  P          - Print and reset function counters");
    println!("  ESC        - Exit");
    println!();

    let mut args = std::env::args().skip(1);
    let scene_dir = args.next().map(PathBuf::from);
    let mut config = CullerConfig::default();
    if let Some(max_batches) = args.next() {
        config.max_batches = max_batches.parse()?;
    }

    let load_start = Instant::now();
    let (scene, mut camera) = match &scene_dir {
        Some(dir) => (Scene::load(dir, &config)?, Camera::castle_preset(&config)),
        None => (
            Scene::procedural_city(CITY_SEED, CITY_GRID, &config)?,
            Camera::new(
                Vec3::new(0.0, 12.0, 100.0),
                Vec3::new(0.0, -0.1, -1.0),
                Vec3::Y,
                &config,
            ),
        ),
    };
    println!(
        "Scene ready in {:.2}ms: {} triangles, {} occluders, {} quads\n",
        load_start.elapsed().as_secs_f64() * 1000.0,
        scene.total_triangles(),
        scene.occluders().len(),
        scene.quad_count()
    );

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Occlusion Culler")
            .with_inner_size(PhysicalSize::new(config.width as u32, config.height as u32))
            .with_resizable(false)
            .build(&event_loop)?,
    );

    let context = softbuffer::Context::new(window.clone())?;
    let mut surface = softbuffer::Surface::new(&context, window.clone())?;

    let mut pipeline = FramePipeline::new(Rasterizer::new(&config)?);
    let mut depth_image = DepthImage::new(config.width, config.height);
    let mut controller = CameraController::new();

    let mut last_frame = Instant::now();
    let mut title_timer = Instant::now();

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    elwt.exit();
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    let pressed = event.state == ElementState::Pressed;

                    if let PhysicalKey::Code(keycode) = event.physical_key {
                        match keycode {
                            KeyCode::KeyW => controller.forward_pressed = pressed,
                            KeyCode::KeyS => controller.backward_pressed = pressed,
                            KeyCode::KeyA => controller.left_pressed = pressed,
                            KeyCode::KeyD => controller.right_pressed = pressed,
                            KeyCode::ArrowUp => controller.pitch_up_pressed = pressed,
                            KeyCode::ArrowDown => controller.pitch_down_pressed = pressed,
                            KeyCode::ArrowLeft => controller.yaw_left_pressed = pressed,
                            KeyCode::ArrowRight => controller.yaw_right_pressed = pressed,
                            KeyCode::ShiftLeft | KeyCode::ShiftRight => controller.fast = pressed,
                            KeyCode::ControlLeft | KeyCode::ControlRight => {
                                controller.slow = pressed
                            }
                            KeyCode::KeyP if pressed => {
                                FUNCTION_COUNTERS.snapshot().print_report();
                                FUNCTION_COUNTERS.reset();
                            }
                            KeyCode::Escape if pressed => {
                                elwt.exit();
                            }
                            _ => {}
                        }
                    }
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let dt_ms = (now - last_frame).as_secs_f32() * 1000.0;
                    last_frame = now;

                    controller.update_camera(&mut camera, dt_ms);

                    let stats = pipeline.render_frame(&scene, &camera);
                    if let Err(err) = present(&mut pipeline, &mut depth_image, &mut surface) {
                        log::error!("presenting frame failed: {}", err);
                        elwt.exit();
                        return;
                    }

                    if title_timer.elapsed().as_millis() >= 250 {
                        let timer = pipeline.timer();
                        window.set_title(&format!(
                            "Occlusion Culler | FPS: {} | {:.3}ms | {}",
                            timer.fps(),
                            timer.average_ms(),
                            stats
                        ));
                        title_timer = Instant::now();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}

/// Read back the depth buffer, tonemap it into the window surface and
/// present.
fn present(
    pipeline: &mut FramePipeline,
    depth_image: &mut DepthImage,
    surface: &mut Surface,
) -> std::result::Result<(), Box<dyn Error>> {
    pipeline.read_back(depth_image)?;

    let width = NonZeroU32::new(depth_image.width() as u32).ok_or("zero-width depth image")?;
    let height = NonZeroU32::new(depth_image.height() as u32).ok_or("zero-height depth image")?;
    surface.resize(width, height)?;

    let mut buffer = surface.buffer_mut()?;
    depth_image.tonemap(&mut buffer)?;
    buffer.present()?;

    pipeline.mark_presented();
    Ok(())
}
