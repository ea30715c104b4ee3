//! The seam between the overlay core and a concrete rendering stack.
//!
//! The core never talks to a window system or a GPU directly. An
//! [`OverlayBackend`] supplies the library load, the companion surface and the
//! renderer; the desktop backend does this with winit and wgpu.

use crate::camera::PerspectiveCamera;
use crate::config::OverlayConfig;
use crate::error::{BindError, RenderError};
use crate::library::PendingLibrary;
use crate::scene::SceneGraph;
use crate::surface::{CompanionStyle, CompanionSurface, SizeSample};

/// Draws a scene into the companion surface.
pub trait Renderer {
    /// Resize the output to match the companion surface.
    fn set_size(&mut self, size: SizeSample);

    fn render(&mut self, scene: &SceneGraph, camera: &PerspectiveCamera)
    -> Result<(), RenderError>;
}

/// Constructors for everything the overlay needs from the rendering stack.
pub trait OverlayBackend {
    /// Whatever the platform requires to create a surface (an event loop, a
    /// document). Passed through from the caller on `create`.
    type Platform: ?Sized;
    /// The loaded rendering library.
    type Library;
    type Surface: CompanionSurface;
    type Renderer: Renderer;

    /// Begin loading the rendering library. Must not block.
    fn load_library(&mut self) -> PendingLibrary<Self::Library>;

    fn create_companion(
        &mut self,
        platform: &Self::Platform,
        style: &CompanionStyle,
    ) -> Result<Self::Surface, BindError>;

    fn create_renderer(
        &mut self,
        library: &Self::Library,
        surface: &Self::Surface,
        config: &OverlayConfig,
    ) -> Result<Self::Renderer, BindError>;
}
