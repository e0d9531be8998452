mod camera;
mod config_loader;
mod error;
mod input_map;
mod loader;
mod render;
mod scene;
mod scene_packer;
mod scene_uploader;
mod scenes;
mod time;
mod transform;
mod utility;
mod vulkan;

use std::sync::Arc;

use anyhow::Context as _;
use ash::vk;
use env_logger::Env;
use log::{debug, info, warn};
use ultraviolet::Vec2;
use winit::dpi::{self, PhysicalSize};
use winit::event::{DeviceEvent, ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use winit::event_loop::EventLoop;
use winit::window::{Window, WindowBuilder};

use camera::freecam_controller::FreecamController;
use camera::{Camera, CameraSettings};
use config_loader::{Config, ConfigFileLoader};
use input_map::InputMap;
use render::{RayTracingRenderer, SwapchainIndex};
use scene::Scene;
use scene_uploader::GpuScene;
use time::Time;
use vulkan::command_pool::CommandPool;
use vulkan::context::Context;
use vulkan::swapchain::SwapchainContainer;

const CONFIG_PATH: &str = "config.json";
const WINDOW_TITLE: &str = "Round Tracer";

/// Command buffer and synchronisation of one frame in flight
struct FrameSync {
    command_buffer: vk::CommandBuffer,
    /// wait semaphore
    image_available: vk::Semaphore,
    /// signal semaphore
    render_finished: vk::Semaphore,
    in_flight: vk::Fence,
}

impl FrameSync {
    fn new(context: &Context, command_buffer: vk::CommandBuffer) -> Self {
        let device = &context.device;
        let semaphore_info = vk::SemaphoreCreateInfo::builder();
        let fence_info = vk::FenceCreateInfo::builder().flags(vk::FenceCreateFlags::SIGNALED);

        let image_available = unsafe { device.create_semaphore(&semaphore_info, None) }
            .expect("Could not create image available semaphore");
        let render_finished = unsafe { device.create_semaphore(&semaphore_info, None) }
            .expect("Could not create render finished semaphore");
        let in_flight =
            unsafe { device.create_fence(&fence_info, None) }.expect("Could not create fence");

        Self {
            command_buffer,
            image_available,
            render_finished,
            in_flight,
        }
    }

    fn destroy(&self, context: &Context) {
        unsafe {
            context.device.destroy_semaphore(self.image_available, None);
            context.device.destroy_semaphore(self.render_finished, None);
            context.device.destroy_fence(self.in_flight, None);
        }
    }
}

// Rust will drop these fields in the order they are declared
struct RayTracerApp {
    renderer: RayTracingRenderer,
    /// Owns the buffers and images the descriptor sets point at
    _gpu_scene: GpuScene,
    scene: Scene,

    input_map: InputMap,
    time: Time,
    freecam_controller: FreecamController,
    camera: Camera,

    frames: Vec<FrameSync>,
    frame_index: usize,
    should_recreate_swapchain: bool,

    command_pool: CommandPool,
    swapchain: SwapchainContainer,
    context: Arc<Context>,

    /// Application window
    window: Window,
}

impl RayTracerApp {
    pub fn new(event_loop: &EventLoop<()>, config: &Config) -> anyhow::Result<Self> {
        let window = WindowBuilder::new()
            .with_title(WINDOW_TITLE)
            .with_inner_size(dpi::PhysicalSize {
                width: config.window_width,
                height: config.window_height,
            })
            .build(event_loop)
            .context("Could not create window")?;

        let description = scenes::build(config.scene, &config.assets_path, config.random_seed)
            .with_context(|| format!("Could not build the {:?} scene", config.scene))?;
        let scene = description.scene;
        info!(
            "Scene {:?} has {} models and {} instances",
            config.scene,
            scene.models().len(),
            scene.instances().len()
        );

        let window_size = window.inner_size();
        let mut camera = Camera::new(CameraSettings {
            fov: config.field_of_view.to_radians(),
            ..Default::default()
        });
        camera.set_aspect_ratio(window_size.width, window_size.height);
        let freecam_controller = FreecamController::looking_at(
            description.camera.eye,
            description.camera.direction,
            config.camera_speed,
            config.mouse_sensitivity,
        );
        camera.update_camera(&freecam_controller);

        let context = Arc::new(Context::new(event_loop, &window)?);
        let swapchain =
            SwapchainContainer::new(context.clone(), window_size, config.present_mode.into());
        let command_pool = CommandPool::new(context.clone());

        let gpu_scene = GpuScene::upload(&command_pool, &scene)?;

        let frame_count = config.frames_in_flight();
        let renderer = RayTracingRenderer::new(
            &command_pool,
            &gpu_scene,
            &swapchain,
            frame_count,
            config.push_constants(),
        )?;

        let frames = command_pool
            .allocate_command_buffers(frame_count as u32)
            .into_iter()
            .map(|command_buffer| FrameSync::new(&context, command_buffer))
            .collect();

        Ok(Self {
            window,
            context,
            swapchain,
            command_pool,

            frames,
            frame_index: 0,
            should_recreate_swapchain: false,

            input_map: InputMap::new(),
            freecam_controller,
            camera,
            time: Time::new(),

            renderer,
            _gpu_scene: gpu_scene,
            scene,
        })
    }

    pub fn main_loop(mut self, event_loop: EventLoop<()>) -> ! {
        event_loop.run(move |event, _, control_flow| {
            control_flow.set_poll();

            match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::CloseRequested => {
                        control_flow.set_exit();
                    }
                    WindowEvent::Resized(PhysicalSize { width, height }) => {
                        self.camera.set_aspect_ratio(width, height);
                        self.should_recreate_swapchain = true;
                    }
                    WindowEvent::Focused(false) => {
                        self.input_map.release_all();
                    }
                    WindowEvent::KeyboardInput {
                        input:
                            KeyboardInput {
                                virtual_keycode,
                                state,
                                ..
                            },
                        ..
                    } => {
                        match (virtual_keycode, state) {
                            (Some(VirtualKeyCode::Escape), ElementState::Pressed) => {
                                control_flow.set_exit();
                            }
                            (Some(virtual_keycode), ElementState::Pressed) => {
                                self.input_map.update_key_press(virtual_keycode)
                            }
                            (Some(virtual_keycode), ElementState::Released) => {
                                self.input_map.update_key_release(virtual_keycode)
                            }
                            (None, _) => (),
                        };
                    }
                    WindowEvent::MouseInput { button, state, .. } => match state {
                        ElementState::Pressed => self.input_map.update_mouse_press(button),
                        ElementState::Released => self.input_map.update_mouse_release(button),
                    },
                    _ => {}
                },
                Event::DeviceEvent {
                    event: DeviceEvent::MouseMotion { delta: (dx, dy) },
                    ..
                } => {
                    self.input_map
                        .accumulate_mouse_delta(Vec2::new(dx as f32, dy as f32));
                }
                Event::MainEventsCleared => {
                    self.window.request_redraw();
                }
                Event::RedrawRequested(_window_id) => {
                    self.update();
                    self.input_map.clear_mouse_delta();
                    self.draw_frame();
                }
                _ => (),
            }
        })
    }

    fn update(&mut self) {
        if let Some(frames_per_second) = self.time.update() {
            self.window.set_title(&format!(
                "{} - {:.0} fps, {} samples",
                WINDOW_TITLE,
                frames_per_second,
                self.renderer.accumulated_samples()
            ));
        }
        self.freecam_controller
            .update(&self.input_map, self.time.delta_seconds());
        self.camera.update_camera(&self.freecam_controller);
    }

    fn recreate_swapchain(&mut self, window_size: PhysicalSize<u32>) {
        self.swapchain.recreate(window_size);
        self.renderer.resize(&self.command_pool, &self.swapchain);
        self.should_recreate_swapchain = false;
        debug!(
            "Swapchain recreated at {}x{}",
            self.swapchain.extent.width, self.swapchain.extent.height
        );
    }

    fn draw_frame(&mut self) {
        let window_size = self.window.inner_size();
        if window_size.width == 0 || window_size.height == 0 {
            return;
        }

        let frame = &self.frames[self.frame_index];
        let (command_buffer, image_available, render_finished, in_flight) = (
            frame.command_buffer,
            frame.image_available,
            frame.render_finished,
            frame.in_flight,
        );
        let device = &self.context.device;

        unsafe { device.wait_for_fences(std::slice::from_ref(&in_flight), true, u64::MAX) }
            .expect("Could not wait for fences");

        if self.should_recreate_swapchain {
            self.recreate_swapchain(window_size);
        }

        let acquire_result = unsafe {
            self.swapchain.loader.acquire_next_image(
                self.swapchain.inner,
                u64::MAX,
                image_available,
                vk::Fence::null(),
            )
        };
        let present_index = match acquire_result {
            Ok((index, suboptimal)) => {
                if suboptimal {
                    self.should_recreate_swapchain = true;
                }
                index
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.should_recreate_swapchain = true;
                return;
            }
            Err(error) => panic!("Could not acquire next image: {:?}", error),
        };

        // only reset once work is certain to be submitted, or the next wait never returns
        let device = &self.context.device;
        unsafe { device.reset_fences(std::slice::from_ref(&in_flight)) }
            .expect("Could not reset fences");

        self.renderer.update_uniforms(
            self.frame_index,
            &self.camera,
            &self.scene,
            self.input_map.is_camera_moving(),
        );

        unsafe { device.reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty()) }
            .expect("Could not reset command buffer");
        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { device.begin_command_buffer(command_buffer, &begin_info) }
            .expect("Could not begin command buffer");

        self.renderer.record(
            command_buffer,
            self.frame_index,
            &self.swapchain,
            SwapchainIndex::new(present_index as usize),
        );

        unsafe { device.end_command_buffer(command_buffer) }
            .expect("Could not end command buffer");

        // the swapchain image is first touched by the copy
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(std::slice::from_ref(&image_available))
            .wait_dst_stage_mask(std::slice::from_ref(&vk::PipelineStageFlags::TRANSFER))
            .command_buffers(std::slice::from_ref(&command_buffer))
            .signal_semaphores(std::slice::from_ref(&render_finished))
            .build();
        unsafe {
            device.queue_submit(
                self.context.queue,
                std::slice::from_ref(&submit_info),
                in_flight,
            )
        }
        .expect("Could not submit to queue");

        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(std::slice::from_ref(&render_finished))
            .swapchains(std::slice::from_ref(&self.swapchain.inner))
            .image_indices(std::slice::from_ref(&present_index));
        let result = unsafe {
            self.swapchain
                .loader
                .queue_present(self.context.queue, &present_info)
        };
        match result {
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.should_recreate_swapchain = true;
            }
            Ok(false) => {}
            Err(error) => panic!("Could not present queue: {:?}", error),
        };

        self.frame_index = (self.frame_index + 1) % self.frames.len();
    }
}

impl Drop for RayTracerApp {
    fn drop(&mut self) {
        unsafe { self.context.device.device_wait_idle() }
            .expect("Could not wait for device idle");

        let command_buffers: Vec<_> = self
            .frames
            .iter()
            .map(|frame| frame.command_buffer)
            .collect();
        self.command_pool.free_command_buffers(&command_buffers);
        for frame in &self.frames {
            frame.destroy(&self.context);
        }
    }
}

fn load_config() -> Config {
    let mut loader = ConfigFileLoader::new(CONFIG_PATH);
    match loader.load_config() {
        Ok(config) => config.clone(),
        Err(error) => {
            warn!("{:#}, using the default config", error);
            Config::default()
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = load_config();
    let event_loop = EventLoop::new();

    let app = RayTracerApp::new(&event_loop, &config)?;
    app.main_loop(event_loop)
}
