//! Core engine implementation
//!
//! The [`Engine`] owns every piece of per-process state the frame loop
//! needs: the display with its windows, the graphics device, the input
//! store, the camera and the frame timer. One iteration of [`Engine::run`]
//! goes through these steps in order:
//!
//! 1. tick the frame timer
//! 2. drain platform events into the input store and the camera
//! 3. open the input frame and call `update`
//! 4. make the default window current when several exist
//! 5. call `render`
//! 6. trace the frame rate, close the input frame, present
//!
//! Edge queries made in `update` therefore see this frame's transitions
//! before the snapshots advance.

use crate::application::{Application, FnApplication};
use crate::assets::{FileImageSource, FileShaderSource};
use crate::core::EngineConfig;
use crate::foundation::time::{Clock, FpsCounter, FrameTimer};
use crate::input::{InputEvent, InputManager};
use crate::render::{Camera, DeviceRef};
use crate::window::{Display, Platform, Window, WindowError};
use thiserror::Error;

/// Main engine struct
///
/// The engine coordinates the window layer, input and timing, and drives
/// an [`Application`] through the main loop.
pub struct Engine {
    config: EngineConfig,
    display: Display,
    device: Option<DeviceRef>,
    input: InputManager,
    camera: Camera,
    timer: FrameTimer,
    fps: FpsCounter,
    clock: Clock,
    app: Option<Box<dyn Application>>,
    initialized: bool,
    running: bool,
    cursor_locked: bool,
}

impl Engine {
    /// Create a new engine on the given windowing platform
    ///
    /// Nothing is initialized yet; call [`Engine::init`] next.
    pub fn new(config: EngineConfig, platform: Box<dyn Platform>) -> Self {
        log::info!("Creating engine on {} platform", platform.name());
        Self {
            timer: FrameTimer::new(config.timing.delta),
            fps: FpsCounter::new(config.timing.fps_log_interval),
            config,
            display: Display::new(platform),
            device: None,
            input: InputManager::new(),
            camera: Camera::default(),
            clock: Clock::new(),
            app: None,
            initialized: false,
            running: false,
            cursor_locked: false,
        }
    }

    /// Start the windowing subsystem and install the camera and application
    ///
    /// Fails when the engine is already initialized or the platform cannot
    /// start.
    pub fn init(&mut self, camera: Camera, app: impl Application + 'static) -> Result<(), EngineError> {
        if self.initialized {
            log::error!("Engine already initialized");
            return Err(EngineError::AlreadyInitialized);
        }
        self.display.init()?;
        self.camera = camera;
        self.app = Some(Box::new(app));
        self.initialized = true;
        log::info!("Engine initialized");
        Ok(())
    }

    /// [`Engine::init`] with plain render and update closures
    pub fn init_with_callbacks(
        &mut self,
        camera: Camera,
        render: impl FnMut(&mut FrameContext<'_>, f32) + 'static,
        update: impl FnMut(&mut FrameContext<'_>, f32) + 'static,
    ) -> Result<(), EngineError> {
        self.init(camera, FnApplication::new(render, update))
    }

    /// Open a window and make it current
    ///
    /// The first window also loads the graphics device from its context.
    /// Every window gets a full-size viewport and depth testing.
    pub fn create_window(&mut self, title: &str, width: u32, height: u32) -> Result<(), EngineError> {
        if !self.initialized {
            log::error!("Cannot create window '{}': engine not initialized", title);
            return Err(EngineError::NotInitialized);
        }
        self.display.create_window(title, width, height)?;

        let device = match &self.device {
            Some(device) => device.clone(),
            None => {
                let device = match self.display.create_device() {
                    Ok(device) => device,
                    Err(e) => {
                        log::error!("Graphics device unavailable: {}", e);
                        self.display.destroy_window(title);
                        return Err(e.into());
                    }
                };
                log::info!("Graphics device ready ({})", device.backend_name());
                self.device = Some(device.clone());
                device
            }
        };
        device.set_viewport(0, 0, width as i32, height as i32);
        device.set_depth_test(true);
        Ok(())
    }

    /// Destroy a window by title; returns whether it existed
    pub fn destroy_window(&mut self, title: &str) -> bool {
        self.display.destroy_window(title)
    }

    /// Make a window current, presenting the outgoing one
    pub fn activate_window(&mut self, title: &str) -> Result<(), EngineError> {
        Ok(self.display.activate_window(title)?)
    }

    /// Run the main loop until a quit event, [`Engine::exit_now`] or the
    /// last window closing
    ///
    /// `Application::cleanup` runs before this returns, also when a hook
    /// failed.
    pub fn run(&mut self) -> Result<(), EngineError> {
        if !self.initialized {
            log::error!("Engine run before init");
            return Err(EngineError::NotInitialized);
        }
        if self.display.window_count() == 0 {
            log::error!("Engine run without a window");
            return Err(EngineError::NoWindow);
        }
        let Some(mut app) = self.app.take() else {
            return Err(EngineError::NotInitialized);
        };

        self.refresh_projection();
        self.timer.reset();
        self.running = true;

        log::info!("Starting main loop...");
        let result = self.run_frames(app.as_mut());
        let cleanup = app.cleanup(&mut self.frame_context());
        self.app = Some(app);
        self.running = false;

        result?;
        cleanup.map_err(|e| EngineError::Application(format!("App cleanup: {}", e)))?;
        log::info!("Main loop finished after {} frames", self.timer.frame_count());
        Ok(())
    }

    fn run_frames(&mut self, app: &mut dyn Application) -> Result<(), EngineError> {
        app.initialize(&mut self.frame_context())
            .map_err(|e| EngineError::Application(format!("App initialization: {}", e)))?;

        while self.running {
            self.timer.tick();
            let delta_time = self.timer.delta_time();

            if !self.pump_events() {
                break;
            }

            self.input.begin_frame();
            let frame = self.run_frame(app, delta_time);
            if let Some(fps) = self.fps.frame(self.timer.raw_delta()) {
                log::trace!("FPS: {:.1}", fps);
            }
            self.input.end_frame();
            frame?;
            self.display.present();
        }
        Ok(())
    }

    fn run_frame(&mut self, app: &mut dyn Application, delta_time: f32) -> Result<(), EngineError> {
        app.update(&mut self.frame_context(), delta_time)
            .map_err(|e| EngineError::Application(format!("App update: {}", e)))?;
        self.sync_cursor_lock();

        if self.display.window_count() > 1 {
            if let Some(default) = self.display.default_window().map(str::to_string) {
                self.display.activate_window(&default)?;
            }
        }
        self.display.begin_frame();

        app.render(&mut self.frame_context(), delta_time)
            .map_err(|e| EngineError::Application(format!("App render: {}", e)))
    }

    /// Drain pending platform events; returns false once no window is left
    fn pump_events(&mut self) -> bool {
        while let Some(event) = self.display.poll_event() {
            self.input.process(&event);
            match event {
                InputEvent::Quit => {
                    log::info!("Quit requested");
                    self.running = false;
                }
                InputEvent::WindowClose(native) => {
                    self.display.handle_close(native);
                }
                InputEvent::Resized { window, width, height } => {
                    let is_current = self.display.current().map(Window::native) == Some(window);
                    if self.display.handle_resize(window, width, height).is_some() && is_current {
                        if let Some(device) = &self.device {
                            device.set_viewport(0, 0, width as i32, height as i32);
                        }
                        self.refresh_projection();
                    }
                }
                InputEvent::MouseMove { rel_x, rel_y, .. } if self.config.camera.mouse_look => {
                    // Screen y grows downwards, pitch grows upwards
                    self.camera.process_mouse_movement(rel_x, -rel_y, true);
                }
                InputEvent::MouseWheel(delta) => {
                    self.camera.process_mouse_scroll(delta);
                    self.refresh_projection();
                }
                _ => {}
            }
        }

        if self.display.window_count() == 0 {
            log::info!("Last window closed");
            self.running = false;
            return false;
        }
        true
    }

    fn refresh_projection(&mut self) {
        let aspect = self.display.current().map_or(1.0, Window::aspect_ratio);
        let projection = &self.config.projection;
        self.camera
            .set_projection(self.camera.zoom(), aspect, projection.near, projection.far);
    }

    fn sync_cursor_lock(&mut self) {
        let wanted = self.input.is_cursor_locked();
        if wanted != self.cursor_locked {
            self.display.set_cursor_locked(wanted);
            self.cursor_locked = wanted;
            log::debug!("Cursor {}", if wanted { "locked" } else { "released" });
        }
    }

    fn frame_context(&mut self) -> FrameContext<'_> {
        FrameContext {
            camera: &mut self.camera,
            input: &mut self.input,
            display: &mut self.display,
            device: self.device.as_ref(),
            config: &self.config,
            timer: &self.timer,
            clock: &self.clock,
            running: &mut self.running,
        }
    }

    /// Ask the loop to stop after the current iteration
    pub fn exit_now(&mut self) {
        self.running = false;
    }

    /// Release the application, the device, every window and the platform
    ///
    /// Safe to call repeatedly; also runs on drop.
    pub fn shutdown(&mut self) {
        if !self.initialized && !self.display.is_initialized() {
            return;
        }
        log::info!("Shutting down engine...");
        // GPU objects held by the application go while a context still exists
        self.app = None;
        self.device = None;
        self.display.shutdown();
        self.initialized = false;
        self.running = false;
        log::info!("Engine shutdown complete");
    }

    /// Seconds since the engine was created
    pub fn get_time(&self) -> f32 {
        self.clock.seconds()
    }

    /// The camera
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// The camera, mutably
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// The input store
    pub fn input(&self) -> &InputManager {
        &self.input
    }

    /// The windows
    pub fn display(&self) -> &Display {
        &self.display
    }

    /// The graphics device, once a window exists
    pub fn device(&self) -> Option<&DeviceRef> {
        self.device.as_ref()
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// `init` succeeded and `shutdown` has not run since
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The loop is running and nobody asked it to stop
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Frames completed so far
    pub fn frame_count(&self) -> u64 {
        self.timer.frame_count()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("display", &self.display)
            .field("initialized", &self.initialized)
            .field("running", &self.running)
            .field("frames", &self.timer.frame_count())
            .finish_non_exhaustive()
    }
}

/// What application hooks see of the running engine
pub struct FrameContext<'a> {
    camera: &'a mut Camera,
    input: &'a mut InputManager,
    display: &'a mut Display,
    device: Option<&'a DeviceRef>,
    config: &'a EngineConfig,
    timer: &'a FrameTimer,
    clock: &'a Clock,
    running: &'a mut bool,
}

impl<'a> FrameContext<'a> {
    /// The camera
    pub fn camera(&self) -> &Camera {
        self.camera
    }

    /// The camera, mutably
    pub fn camera_mut(&mut self) -> &mut Camera {
        self.camera
    }

    /// Input state for this frame
    pub fn input(&self) -> &InputManager {
        self.input
    }

    /// Capture or release the cursor; applied after `update` returns
    pub fn set_cursor_locked(&mut self, locked: bool) {
        self.input.set_cursor_locked(locked);
    }

    /// The graphics device
    ///
    /// # Panics
    /// When no window, and so no context, exists yet.
    pub fn device(&self) -> &'a DeviceRef {
        match self.device {
            Some(device) => device,
            None => panic!("no graphics device: create a window before using the GPU"),
        }
    }

    /// The graphics device, if a context exists
    pub fn try_device(&self) -> Option<&'a DeviceRef> {
        self.device
    }

    /// The windows
    pub fn display(&self) -> &Display {
        self.display
    }

    /// Make a window current, presenting the outgoing one
    pub fn activate_window(&mut self, title: &str) -> Result<(), WindowError> {
        self.display.activate_window(title)
    }

    /// Shader files under the configured shader path
    pub fn shader_source(&self) -> FileShaderSource {
        FileShaderSource::new(&self.config.assets.shader_path)
    }

    /// Image files under the configured texture path
    pub fn image_source(&self) -> FileImageSource {
        FileImageSource::new(&self.config.assets.texture_path)
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    /// Seconds since the engine was created
    pub fn time(&self) -> f32 {
        self.clock.seconds()
    }

    /// Delta handed to this frame's hooks
    pub fn delta_time(&self) -> f32 {
        self.timer.delta_time()
    }

    /// Frames ticked so far, this one included
    pub fn frame_count(&self) -> u64 {
        self.timer.frame_count()
    }

    /// Ask the loop to stop after this iteration
    pub fn exit_now(&mut self) {
        *self.running = false;
    }

    /// The loop will run another iteration
    pub fn is_running(&self) -> bool {
        *self.running
    }
}

impl std::fmt::Debug for FrameContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameContext")
            .field("frame", &self.timer.frame_count())
            .field("current_window", &self.display.current_window())
            .finish_non_exhaustive()
    }
}

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// `init` was called twice
    #[error("Engine already initialized")]
    AlreadyInitialized,

    /// An operation needs `init` first
    #[error("Engine not initialized")]
    NotInitialized,

    /// `run` needs at least one window
    #[error("No window to render into")]
    NoWindow,

    /// Window layer failure
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// An application hook failed
    #[error("Application error: {0}")]
    Application(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::AppError;
    use crate::foundation::math::Vec3;
    use crate::foundation::time::DeltaMode;
    use crate::input::Key;
    use crate::render::device::DeviceCall;
    use crate::window::{HeadlessPlatform, NativeWindowId, PlatformCall};
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn engine() -> (Engine, HeadlessPlatform) {
        let platform = HeadlessPlatform::new();
        let config = EngineConfig::default().with_delta_mode(DeltaMode::Raw);
        (Engine::new(config, Box::new(platform.clone())), platform)
    }

    /// Records hook calls and answers update with a closure
    struct Recorder {
        log: Rc<RefCell<Vec<String>>>,
        on_update: Box<dyn FnMut(&mut FrameContext<'_>)>,
    }

    impl Recorder {
        fn new(log: &Rc<RefCell<Vec<String>>>) -> Self {
            Self {
                log: log.clone(),
                on_update: Box::new(|_| {}),
            }
        }

        fn on_update(mut self, f: impl FnMut(&mut FrameContext<'_>) + 'static) -> Self {
            self.on_update = Box::new(f);
            self
        }
    }

    impl Application for Recorder {
        fn initialize(&mut self, _ctx: &mut FrameContext<'_>) -> Result<(), AppError> {
            self.log.borrow_mut().push("initialize".to_string());
            Ok(())
        }

        fn update(&mut self, ctx: &mut FrameContext<'_>, _dt: f32) -> Result<(), AppError> {
            self.log.borrow_mut().push(format!("update {}", ctx.frame_count()));
            (self.on_update)(ctx);
            Ok(())
        }

        fn render(&mut self, ctx: &mut FrameContext<'_>, _dt: f32) -> Result<(), AppError> {
            self.log.borrow_mut().push(format!("render {}", ctx.frame_count()));
            Ok(())
        }

        fn cleanup(&mut self, _ctx: &mut FrameContext<'_>) -> Result<(), AppError> {
            self.log.borrow_mut().push("cleanup".to_string());
            Ok(())
        }
    }

    #[test]
    fn test_hooks_run_in_frame_order() {
        let (mut engine, platform) = engine();
        let log = Rc::new(RefCell::new(Vec::new()));
        engine.init(Camera::default(), Recorder::new(&log)).unwrap();
        engine.create_window("main", 800, 600).unwrap();
        platform.push_idle_frames(2);

        engine.run().unwrap();

        // The third frame sees the scripted quit and still completes
        assert_eq!(
            *log.borrow(),
            vec![
                "initialize", "update 1", "render 1", "update 2", "render 2", "update 3", "render 3",
                "cleanup"
            ]
        );
        assert_eq!(engine.frame_count(), 3);
        assert_eq!(platform.swaps().len(), 3);
    }

    #[test]
    fn test_update_sees_press_edge_once() {
        let (mut engine, platform) = engine();
        let presses = Rc::new(RefCell::new(Vec::new()));
        let seen = presses.clone();
        engine
            .init_with_callbacks(Camera::default(), |_, _| {}, move |ctx, _| {
                seen.borrow_mut().push((ctx.input().was_up(Key::Space), ctx.input().is_down(Key::Space)));
            })
            .unwrap();
        engine.create_window("main", 800, 600).unwrap();
        platform.push_frame([InputEvent::KeyDown(Key::Space)]);
        platform.push_idle_frames(1);
        platform.push_frame([InputEvent::KeyUp(Key::Space)]);

        engine.run().unwrap();

        assert_eq!(
            presses.borrow()[..3],
            [(true, true), (false, true), (false, false)]
        );
    }

    #[test]
    fn test_exit_now_finishes_the_iteration() {
        let (mut engine, platform) = engine();
        platform.quit_when_idle(false);
        let log = Rc::new(RefCell::new(Vec::new()));
        let app = Recorder::new(&log).on_update(|ctx| {
            if ctx.frame_count() == 2 {
                ctx.exit_now();
            }
        });
        engine.init(Camera::default(), app).unwrap();
        engine.create_window("main", 800, 600).unwrap();

        engine.run().unwrap();

        assert_eq!(log.borrow().last().map(String::as_str), Some("cleanup"));
        assert!(log.borrow().contains(&"render 2".to_string()));
        assert!(!log.borrow().contains(&"update 3".to_string()));
        assert!(!engine.is_running());
    }

    #[test]
    fn test_closing_last_window_stops_before_update() {
        let (mut engine, platform) = engine();
        platform.quit_when_idle(false);
        let log = Rc::new(RefCell::new(Vec::new()));
        engine.init(Camera::default(), Recorder::new(&log)).unwrap();
        engine.create_window("main", 800, 600).unwrap();
        let id = engine.display().window("main").unwrap().native();
        platform.push_idle_frames(1);
        platform.push_frame([InputEvent::WindowClose(id)]);

        engine.run().unwrap();

        assert_eq!(*log.borrow(), vec!["initialize", "update 1", "render 1", "cleanup"]);
        assert_eq!(engine.display().window_count(), 0);
        assert!(platform.open_windows().is_empty());
    }

    #[test]
    fn test_closing_one_of_two_windows_keeps_running() {
        let (mut engine, platform) = engine();
        engine.init_with_callbacks(Camera::default(), |_, _| {}, |_, _| {}).unwrap();
        engine.create_window("main", 800, 600).unwrap();
        engine.create_window("tools", 400, 300).unwrap();
        let tools = engine.display().window("tools").unwrap().native();
        platform.push_frame([InputEvent::WindowClose(tools)]);
        platform.push_idle_frames(1);

        engine.run().unwrap();

        assert_eq!(engine.frame_count(), 3);
        assert_eq!(engine.display().current_window(), Some("main"));
    }

    #[test]
    fn test_default_window_is_current_during_render() {
        let (mut engine, _platform) = engine();
        let current = Rc::new(RefCell::new(Vec::new()));
        let seen = current.clone();
        engine
            .init_with_callbacks(
                Camera::default(),
                move |ctx, _| {
                    seen.borrow_mut().push(ctx.display().current_window().map(str::to_string));
                    ctx.activate_window("tools").unwrap();
                },
                |_, _| {},
            )
            .unwrap();
        engine.create_window("main", 800, 600).unwrap();
        engine.create_window("tools", 400, 300).unwrap();

        engine.run().unwrap();

        assert_eq!(*current.borrow(), vec![Some("main".to_string())]);
    }

    #[test]
    fn test_first_window_creates_device_once() {
        let (mut engine, platform) = engine();
        engine.init_with_callbacks(Camera::default(), |_, _| {}, |_, _| {}).unwrap();
        assert!(engine.device().is_none());
        engine.create_window("main", 800, 600).unwrap();
        engine.create_window("tools", 400, 300).unwrap();

        let devices = platform
            .calls()
            .iter()
            .filter(|c| matches!(c, PlatformCall::CreateDevice(_)))
            .count();
        assert_eq!(devices, 1);
        assert!(platform.device().calls().contains(&DeviceCall::Viewport {
            x: 0,
            y: 0,
            width: 400,
            height: 300
        }));
    }

    #[test]
    fn test_device_failure_is_an_error() {
        let (mut engine, platform) = engine();
        platform.fail_device(true);
        engine.init_with_callbacks(Camera::default(), |_, _| {}, |_, _| {}).unwrap();
        assert!(matches!(
            engine.create_window("main", 800, 600),
            Err(EngineError::Window(WindowError::CreationFailed { .. }))
        ));
        assert!(engine.device().is_none());
        assert_eq!(engine.display().window_count(), 0);
    }

    #[test]
    fn test_init_twice_fails() {
        let (mut engine, _platform) = engine();
        engine.init_with_callbacks(Camera::default(), |_, _| {}, |_, _| {}).unwrap();
        assert!(matches!(
            engine.init_with_callbacks(Camera::default(), |_, _| {}, |_, _| {}),
            Err(EngineError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_platform_init_failure_is_reported() {
        let (mut engine, platform) = engine();
        platform.fail_init(true);
        assert!(matches!(
            engine.init_with_callbacks(Camera::default(), |_, _| {}, |_, _| {}),
            Err(EngineError::Window(WindowError::InitializationFailed(_)))
        ));
        assert!(!engine.is_initialized());
    }

    #[test]
    fn test_run_preconditions() {
        let (mut engine, _platform) = engine();
        assert!(matches!(engine.run(), Err(EngineError::NotInitialized)));
        assert!(matches!(engine.create_window("main", 1, 1), Err(EngineError::NotInitialized)));
        engine.init_with_callbacks(Camera::default(), |_, _| {}, |_, _| {}).unwrap();
        assert!(matches!(engine.run(), Err(EngineError::NoWindow)));
    }

    #[test]
    fn test_scroll_and_resize_refresh_projection() {
        let (mut engine, platform) = engine();
        engine.init_with_callbacks(Camera::default(), |_, _| {}, |_, _| {}).unwrap();
        engine.create_window("main", 800, 600).unwrap();
        let id = engine.display().window("main").unwrap().native();
        platform.push_frame([
            InputEvent::MouseWheel(15.0),
            InputEvent::Resized {
                window: id,
                width: 1000,
                height: 500,
            },
        ]);

        engine.run().unwrap();

        let mut expected = Camera::default();
        expected.set_projection(30.0, 2.0, 0.1, 100.0);
        assert_relative_eq!(engine.camera().zoom(), 30.0);
        assert_relative_eq!(engine.camera().projection(), expected.projection(), epsilon = 1e-6);
        assert!(platform.device().calls().contains(&DeviceCall::Viewport {
            x: 0,
            y: 0,
            width: 1000,
            height: 500
        }));
    }

    #[test]
    fn test_mouse_motion_turns_camera() {
        let (mut engine, platform) = engine();
        engine.init_with_callbacks(Camera::at(Vec3::zeros()), |_, _| {}, |_, _| {}).unwrap();
        engine.create_window("main", 800, 600).unwrap();
        platform.push_frame([InputEvent::MouseMove {
            x: 410.0,
            y: 290.0,
            rel_x: 10.0,
            rel_y: -10.0,
        }]);

        engine.run().unwrap();

        let mut expected = Camera::at(Vec3::zeros());
        expected.process_mouse_movement(10.0, 10.0, true);
        assert_relative_eq!(engine.camera().yaw(), expected.yaw());
        assert_relative_eq!(engine.camera().pitch(), expected.pitch());
        assert!(engine.camera().pitch() > 0.0);
    }

    #[test]
    fn test_cursor_lock_is_applied_after_update() {
        let (mut engine, platform) = engine();
        engine
            .init_with_callbacks(Camera::default(), |_, _| {}, |ctx, _| ctx.set_cursor_locked(true))
            .unwrap();
        engine.create_window("main", 800, 600).unwrap();

        engine.run().unwrap();

        let locks = platform
            .calls()
            .iter()
            .filter(|c| matches!(c, PlatformCall::CursorLocked(_, true)))
            .count();
        assert_eq!(locks, 1);
        assert!(platform.is_cursor_locked(NativeWindowId(1)));
    }

    #[test]
    fn test_failing_update_still_cleans_up() {
        struct Failing(Rc<RefCell<bool>>);
        impl Application for Failing {
            fn update(&mut self, _ctx: &mut FrameContext<'_>, _dt: f32) -> Result<(), AppError> {
                Err(AppError::Custom("boom".to_string()))
            }
            fn render(&mut self, _ctx: &mut FrameContext<'_>, _dt: f32) -> Result<(), AppError> {
                Ok(())
            }
            fn cleanup(&mut self, _ctx: &mut FrameContext<'_>) -> Result<(), AppError> {
                *self.0.borrow_mut() = true;
                Ok(())
            }
        }

        let (mut engine, platform) = engine();
        let cleaned = Rc::new(RefCell::new(false));
        engine.init(Camera::default(), Failing(cleaned.clone())).unwrap();
        engine.create_window("main", 800, 600).unwrap();
        platform.push_idle_frames(3);

        assert!(matches!(engine.run(), Err(EngineError::Application(_))));
        assert!(*cleaned.borrow());
        assert!(platform.swaps().is_empty());
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let (mut engine, platform) = engine();
        engine.init_with_callbacks(Camera::default(), |_, _| {}, |_, _| {}).unwrap();
        engine.create_window("main", 800, 600).unwrap();
        engine.shutdown();
        engine.shutdown();
        drop(engine);

        let shutdowns = platform.calls().iter().filter(|c| **c == PlatformCall::Shutdown).count();
        assert_eq!(shutdowns, 1);
        assert!(platform.open_windows().is_empty());
    }

    #[test]
    fn test_time_is_monotonic() {
        let (engine, _platform) = engine();
        let first = engine.get_time();
        let second = engine.get_time();
        assert!(first >= 0.0);
        assert!(second >= first);
    }

    #[test]
    #[should_panic(expected = "no graphics device")]
    fn test_device_without_window_panics() {
        let (mut engine, _platform) = engine();
        engine.frame_context().device();
    }
}
