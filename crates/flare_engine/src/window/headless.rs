//! Scripted platform without native windows
//!
//! Events are queued as per-frame batches; each drain of
//! [`Platform::poll_event`] hands out exactly one batch. Once the script runs
//! out the platform reports [`InputEvent::Quit`], so a frame loop under test
//! always terminates. Clones share state, which lets a test keep a handle
//! after boxing the platform into an engine.

use super::{NativeWindowId, Platform, WindowError};
use crate::input::InputEvent;
use crate::render::device::{DeviceRef, HeadlessDevice};
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

/// Platform operation recorded by [`HeadlessPlatform`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    /// `init`
    Init,
    /// `create_window`
    CreateWindow(NativeWindowId, String),
    /// `make_current`
    MakeCurrent(NativeWindowId),
    /// `swap`
    Swap(NativeWindowId),
    /// `destroy_window`
    DestroyWindow(NativeWindowId),
    /// `create_device`
    CreateDevice(NativeWindowId),
    /// `set_cursor_locked`
    CursorLocked(NativeWindowId, bool),
    /// `shutdown`
    Shutdown,
}

struct State {
    initialized: bool,
    fail_init: bool,
    fail_windows: bool,
    fail_device: bool,
    quit_when_idle: bool,
    next_id: u32,
    windows: BTreeMap<NativeWindowId, String>,
    current: Option<NativeWindowId>,
    frames: VecDeque<Vec<InputEvent>>,
    batch: Option<VecDeque<InputEvent>>,
    cursor_locked: BTreeMap<NativeWindowId, bool>,
    calls: Vec<PlatformCall>,
    device: Rc<HeadlessDevice>,
}

/// Windowing platform that replays scripted events and hands out a
/// [`HeadlessDevice`]
#[derive(Clone)]
pub struct HeadlessPlatform {
    state: Rc<RefCell<State>>,
}

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessPlatform {
    /// Uninitialized platform with an empty script
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                initialized: false,
                fail_init: false,
                fail_windows: false,
                fail_device: false,
                quit_when_idle: true,
                next_id: 0,
                windows: BTreeMap::new(),
                current: None,
                frames: VecDeque::new(),
                batch: None,
                cursor_locked: BTreeMap::new(),
                calls: Vec::new(),
                device: Rc::new(HeadlessDevice::new()),
            })),
        }
    }

    /// Queue the events of one frame
    pub fn push_frame(&self, events: impl IntoIterator<Item = InputEvent>) {
        self.state.borrow_mut().frames.push_back(events.into_iter().collect());
    }

    /// Queue `count` frames without events
    pub fn push_idle_frames(&self, count: usize) {
        let mut state = self.state.borrow_mut();
        for _ in 0..count {
            state.frames.push_back(Vec::new());
        }
    }

    /// Report `Quit` once the script is exhausted (default on)
    pub fn quit_when_idle(&self, quit: bool) {
        self.state.borrow_mut().quit_when_idle = quit;
    }

    /// Make `init` fail
    pub fn fail_init(&self, fail: bool) {
        self.state.borrow_mut().fail_init = fail;
    }

    /// Make `create_window` fail
    pub fn fail_window_creation(&self, fail: bool) {
        self.state.borrow_mut().fail_windows = fail;
    }

    /// Make `create_device` fail
    pub fn fail_device(&self, fail: bool) {
        self.state.borrow_mut().fail_device = fail;
    }

    /// Device handed out by `create_device`
    pub fn device(&self) -> Rc<HeadlessDevice> {
        self.state.borrow().device.clone()
    }

    /// Every call recorded so far
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.state.borrow().calls.clone()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Windows swapped, in order
    pub fn swaps(&self) -> Vec<NativeWindowId> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                PlatformCall::Swap(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Window whose context is current
    pub fn current(&self) -> Option<NativeWindowId> {
        self.state.borrow().current
    }

    /// Open windows
    pub fn open_windows(&self) -> Vec<NativeWindowId> {
        self.state.borrow().windows.keys().copied().collect()
    }

    /// Last cursor lock state of a window
    pub fn is_cursor_locked(&self, window: NativeWindowId) -> bool {
        self.state.borrow().cursor_locked.get(&window).copied().unwrap_or(false)
    }

    /// Frames of script not yet delivered
    pub fn pending_frames(&self) -> usize {
        self.state.borrow().frames.len()
    }
}

impl Platform for HeadlessPlatform {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn init(&mut self) -> Result<(), WindowError> {
        let mut state = self.state.borrow_mut();
        if state.fail_init {
            return Err(WindowError::InitializationFailed("scripted failure".to_string()));
        }
        state.initialized = true;
        state.calls.push(PlatformCall::Init);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.state.borrow().initialized
    }

    fn create_window(&mut self, title: &str, _width: u32, _height: u32) -> Result<NativeWindowId, WindowError> {
        let mut state = self.state.borrow_mut();
        if state.fail_windows {
            return Err(WindowError::CreationFailed {
                title: title.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        state.next_id += 1;
        let id = NativeWindowId(state.next_id);
        state.windows.insert(id, title.to_string());
        state.calls.push(PlatformCall::CreateWindow(id, title.to_string()));
        Ok(id)
    }

    fn make_current(&mut self, window: NativeWindowId) {
        let mut state = self.state.borrow_mut();
        if state.windows.contains_key(&window) {
            state.current = Some(window);
            state.calls.push(PlatformCall::MakeCurrent(window));
        }
    }

    fn swap(&mut self, window: NativeWindowId) {
        let mut state = self.state.borrow_mut();
        if state.windows.contains_key(&window) {
            state.calls.push(PlatformCall::Swap(window));
        }
    }

    fn destroy_window(&mut self, window: NativeWindowId) {
        let mut state = self.state.borrow_mut();
        if state.windows.remove(&window).is_some() {
            if state.current == Some(window) {
                state.current = None;
            }
            state.calls.push(PlatformCall::DestroyWindow(window));
        }
    }

    fn poll_event(&mut self) -> Option<InputEvent> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        if state.batch.is_none() {
            let batch = match state.frames.pop_front() {
                Some(events) => events.into(),
                None if state.quit_when_idle => VecDeque::from([InputEvent::Quit]),
                None => VecDeque::new(),
            };
            state.batch = Some(batch);
        }
        let event = state.batch.as_mut().and_then(VecDeque::pop_front);
        if event.is_none() {
            state.batch = None;
        }
        event
    }

    fn create_device(&mut self, window: NativeWindowId) -> Result<DeviceRef, WindowError> {
        let mut state = self.state.borrow_mut();
        if state.fail_device || !state.windows.contains_key(&window) {
            return Err(WindowError::CreationFailed {
                title: state.windows.get(&window).cloned().unwrap_or_default(),
                reason: "no graphics device".to_string(),
            });
        }
        state.calls.push(PlatformCall::CreateDevice(window));
        let device: DeviceRef = state.device.clone();
        Ok(device)
    }

    fn set_cursor_locked(&mut self, window: NativeWindowId, locked: bool) {
        let mut state = self.state.borrow_mut();
        if state.windows.contains_key(&window) {
            state.cursor_locked.insert(window, locked);
            state.calls.push(PlatformCall::CursorLocked(window, locked));
        }
    }

    fn shutdown(&mut self) {
        let mut state = self.state.borrow_mut();
        if state.initialized {
            state.windows.clear();
            state.current = None;
            state.initialized = false;
            state.calls.push(PlatformCall::Shutdown);
        }
    }
}
