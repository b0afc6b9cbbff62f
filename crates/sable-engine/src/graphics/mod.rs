//! Sprite pool and frame lifecycle over a pluggable render backend.
//!
//! [`Graphics`] owns every [`Sprite`] (in a [`SpritePool`]) and drives a
//! [`RenderBackend`] through the per-frame calls the engine makes:
//!
//! 1. [`clear`](Graphics::clear) polls window events and starts a frame;
//!    it returns `false` once the window has been closed.
//! 2. [`render`](Graphics::render) draws every sprite in creation order.
//! 3. [`render_debug`](Graphics::render_debug) draws overlay lines.
//! 4. [`present`](Graphics::present) shows the frame and maintains the FPS
//!    counter in the window title.
//!
//! Two backends ship with the crate: [`HeadlessBackend`] (no window, used by
//! tests and servers) and, behind the `renderer` feature, a winit + wgpu
//! window backend.

mod headless;
#[cfg(feature = "renderer")]
pub mod window;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::arena::Arena;
use crate::arena_key;
use crate::input::KeyboardState;
use crate::physics::DebugLine;
use crate::vector2::Vector2;

pub use headless::{DrawnSprite, HeadlessBackend, HeadlessController};

arena_key! {
    /// Handle to a sprite owned by [`Graphics`].
    pub struct SpriteId;
}

/// Storage for every sprite, indexed by [`SpriteId`].
pub type SpritePool = Arena<SpriteId, Sprite>;

/// Errors raised by the render layer.
#[derive(Debug, thiserror::Error)]
pub enum GraphicsError {
    /// A texture file could not be read or decoded.
    #[error("failed to load texture {path}: {source}")]
    Texture {
        /// Texture file.
        path: PathBuf,
        /// Decoder error.
        source: image::ImageError,
    },

    /// The backend failed to create or drive the window/surface.
    #[error("render backend error: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// Textures and sprites
// ---------------------------------------------------------------------------

/// Backend-issued texture id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// A loaded texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Texture {
    /// Backend id.
    pub id: TextureId,
    /// Pixel size.
    pub size: Vector2,
}

/// A textured quad with a transform.
///
/// The quad is `texture.size` pixels large. `origin` is the point of the
/// texture (in texture pixels) that sits at `position` and about which the
/// sprite rotates.
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    pub texture: Texture,
    /// World position of the origin, in pixels.
    pub position: Vector2,
    /// Clockwise rotation, in degrees.
    pub rotation: f64,
    /// Local origin, in texture pixels.
    pub origin: Vector2,
}

impl Sprite {
    /// A sprite at the world origin with its local origin at the top-left.
    pub fn new(texture: Texture) -> Self {
        Self {
            texture,
            position: Vector2::ZERO,
            rotation: 0.0,
            origin: Vector2::ZERO,
        }
    }

    /// The four corners in world space, clockwise from the top-left.
    pub fn corners(&self) -> [Vector2; 4] {
        let size = self.texture.size;
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        let local = [
            Vector2::new(0.0, 0.0),
            Vector2::new(size.x, 0.0),
            Vector2::new(size.x, size.y),
            Vector2::new(0.0, size.y),
        ];
        local.map(|corner| {
            let p = corner - self.origin;
            self.position + Vector2::new(p.x * cos - p.y * sin, p.x * sin + p.y * cos)
        })
    }
}

// ---------------------------------------------------------------------------
// RenderBackend
// ---------------------------------------------------------------------------

/// Window/surface implementation behind [`Graphics`].
pub trait RenderBackend {
    /// Process pending window events. Returns `false` once the window is
    /// closed.
    fn poll_events(&mut self) -> bool;

    /// Keys held as of the last [`poll_events`](Self::poll_events).
    fn keyboard(&self) -> KeyboardState;

    /// Whether presentation is synchronized to the display refresh.
    fn vsync(&self) -> bool;

    /// Load a texture file.
    fn load_texture(&mut self, path: &Path) -> Result<Texture, GraphicsError>;

    /// Start a frame cleared to black.
    fn begin_frame(&mut self);

    /// Center the view on a world position.
    fn set_view_center(&mut self, center: Vector2);

    /// Queue one sprite.
    fn draw_sprite(&mut self, sprite: &Sprite);

    /// Queue overlay lines.
    fn draw_lines(&mut self, lines: &[DebugLine]);

    /// Show the frame.
    fn present(&mut self);

    /// Set the window title.
    fn set_title(&mut self, title: &str);
}

// ---------------------------------------------------------------------------
// Graphics
// ---------------------------------------------------------------------------

/// Owns the sprite pool and the render backend.
pub struct Graphics {
    backend: Box<dyn RenderBackend>,
    sprites: SpritePool,
    textures: HashMap<PathBuf, Texture>,
    title: String,
    view_center: Vector2,
    frames: u32,
    fps_clock: Instant,
}

impl Graphics {
    /// Wrap a backend. The title gets an FPS suffix, updated once a second.
    pub fn new(title: &str, backend: Box<dyn RenderBackend>) -> Self {
        let mut graphics = Self {
            backend,
            sprites: SpritePool::new(),
            textures: HashMap::new(),
            title: title.to_owned(),
            view_center: Vector2::ZERO,
            frames: 0,
            fps_clock: Instant::now(),
        };
        graphics.backend.set_title(&format!("{title} 0 FPS"));
        graphics
    }

    /// Poll events and start a frame. Returns `false` if the window closed.
    pub fn clear(&mut self) -> bool {
        if !self.backend.poll_events() {
            tracing::info!("window closed");
            return false;
        }
        self.backend.begin_frame();
        true
    }

    /// Draw every sprite in creation order.
    pub fn render(&mut self) {
        for sprite in self.sprites.values() {
            self.backend.draw_sprite(sprite);
        }
    }

    /// Draw overlay lines on top of the sprites.
    pub fn render_debug(&mut self, lines: &[DebugLine]) {
        self.backend.draw_lines(lines);
    }

    /// Show the frame and refresh the FPS counter once a second.
    pub fn present(&mut self) {
        self.backend.present();
        self.frames += 1;
        if self.fps_clock.elapsed() >= Duration::from_secs(1) {
            let title = format!("{} {} FPS", self.title, self.frames);
            self.backend.set_title(&title);
            self.fps_clock = Instant::now();
            self.frames = 0;
        }
    }

    /// Load (or reuse) a texture and create a sprite for it.
    pub fn add_sprite(&mut self, path: &Path) -> Result<SpriteId, GraphicsError> {
        let texture = match self.textures.get(path) {
            Some(texture) => *texture,
            None => {
                let texture = self.backend.load_texture(path)?;
                tracing::debug!(path = %path.display(), size = %texture.size, "texture loaded");
                self.textures.insert(path.to_owned(), texture);
                texture
            }
        };
        Ok(self.sprites.insert(Sprite::new(texture)))
    }

    /// Remove every sprite. Loaded textures stay cached.
    pub fn reset(&mut self) {
        self.sprites.clear();
    }

    /// Center the view on a world position.
    pub fn set_view_center(&mut self, center: Vector2) {
        self.view_center = center;
        self.backend.set_view_center(center);
    }

    // -- accessors ----------------------------------------------------------

    pub fn sprite(&self, id: SpriteId) -> Option<&Sprite> {
        self.sprites.get(id)
    }

    pub fn sprite_mut(&mut self, id: SpriteId) -> Option<&mut Sprite> {
        self.sprites.get_mut(id)
    }

    /// The sprite pool.
    pub fn sprites(&self) -> &SpritePool {
        &self.sprites
    }

    /// The sprite pool, mutably.
    pub fn sprites_mut(&mut self) -> &mut SpritePool {
        &mut self.sprites
    }

    /// Keys held as of the last [`clear`](Self::clear).
    pub fn keyboard(&self) -> KeyboardState {
        self.backend.keyboard()
    }

    /// Whether the backend presents with vsync.
    pub fn vsync(&self) -> bool {
        self.backend.vsync()
    }

    pub fn view_center(&self) -> Vector2 {
        self.view_center
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
