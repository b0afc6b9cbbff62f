//! Window-less backend.
//!
//! Records what the engine draws instead of rasterizing it. The paired
//! [`HeadlessController`] shares the backend state, so a test (or a server
//! loop) can inject key presses, request a close, and inspect frames after
//! handing the backend to [`Graphics`](super::Graphics).

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use super::{GraphicsError, RenderBackend, Sprite, Texture, TextureId};
use crate::input::{Key, KeyboardState};
use crate::physics::DebugLine;
use crate::vector2::Vector2;

/// A sprite as it was submitted for a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnSprite {
    pub texture: TextureId,
    pub position: Vector2,
    pub rotation: f64,
}

#[derive(Debug, Default)]
struct HeadlessState {
    /// Keys as reported by the "device".
    pending: KeyboardState,
    /// Keys as of the last poll.
    keyboard: KeyboardState,
    close_requested: bool,
    closed: bool,
    title: String,
    view_center: Vector2,
    next_texture: u32,
    frame_sprites: Vec<DrawnSprite>,
    frame_lines: usize,
    last_sprites: Vec<DrawnSprite>,
    last_lines: usize,
    frames_presented: u64,
}

/// Backend without a window.
pub struct HeadlessBackend {
    state: Rc<RefCell<HeadlessState>>,
    vsync: bool,
}

/// Handle for driving a [`HeadlessBackend`] from outside.
#[derive(Clone)]
pub struct HeadlessController {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessBackend {
    /// Create a backend and its controller. `vsync` only affects how the
    /// engine schedules ticks; nothing waits on a display.
    pub fn new(vsync: bool) -> (Self, HeadlessController) {
        let state = Rc::new(RefCell::new(HeadlessState::default()));
        let controller = HeadlessController {
            state: Rc::clone(&state),
        };
        (Self { state, vsync }, controller)
    }
}

impl RenderBackend for HeadlessBackend {
    fn poll_events(&mut self) -> bool {
        let mut state = self.state.borrow_mut();
        if state.close_requested {
            state.closed = true;
        }
        state.keyboard = state.pending;
        !state.closed
    }

    fn keyboard(&self) -> KeyboardState {
        self.state.borrow().keyboard
    }

    fn vsync(&self) -> bool {
        self.vsync
    }

    fn load_texture(&mut self, path: &Path) -> Result<Texture, GraphicsError> {
        let (width, height) =
            image::image_dimensions(path).map_err(|source| GraphicsError::Texture {
                path: path.to_owned(),
                source,
            })?;
        let mut state = self.state.borrow_mut();
        let id = TextureId(state.next_texture);
        state.next_texture += 1;
        Ok(Texture {
            id,
            size: Vector2::new(f64::from(width), f64::from(height)),
        })
    }

    fn begin_frame(&mut self) {
        let mut state = self.state.borrow_mut();
        state.frame_sprites.clear();
        state.frame_lines = 0;
    }

    fn set_view_center(&mut self, center: Vector2) {
        self.state.borrow_mut().view_center = center;
    }

    fn draw_sprite(&mut self, sprite: &Sprite) {
        self.state.borrow_mut().frame_sprites.push(DrawnSprite {
            texture: sprite.texture.id,
            position: sprite.position,
            rotation: sprite.rotation,
        });
    }

    fn draw_lines(&mut self, lines: &[DebugLine]) {
        self.state.borrow_mut().frame_lines += lines.len();
    }

    fn present(&mut self) {
        let mut state = self.state.borrow_mut();
        state.last_sprites = std::mem::take(&mut state.frame_sprites);
        state.last_lines = state.frame_lines;
        state.frames_presented += 1;
    }

    fn set_title(&mut self, title: &str) {
        self.state.borrow_mut().title = title.to_owned();
    }
}

impl HeadlessController {
    /// Hold `key` from the next poll on.
    pub fn press(&self, key: Key) {
        self.state.borrow_mut().pending.set(key, true);
    }

    /// Release `key` from the next poll on.
    pub fn release(&self, key: Key) {
        self.state.borrow_mut().pending.set(key, false);
    }

    /// Close the "window" at the next poll.
    pub fn request_close(&self) {
        self.state.borrow_mut().close_requested = true;
    }

    pub fn frames_presented(&self) -> u64 {
        self.state.borrow().frames_presented
    }

    /// Sprites submitted in the last presented frame, in draw order.
    pub fn last_frame_sprites(&self) -> Vec<DrawnSprite> {
        self.state.borrow().last_sprites.clone()
    }

    /// Overlay lines submitted in the last presented frame.
    pub fn last_frame_lines(&self) -> usize {
        self.state.borrow().last_lines
    }

    pub fn title(&self) -> String {
        self.state.borrow().title.clone()
    }

    pub fn view_center(&self) -> Vector2 {
        self.state.borrow().view_center
    }

    /// Number of distinct textures loaded so far.
    pub fn textures_loaded(&self) -> u32 {
        self.state.borrow().next_texture
    }
}
