//! winit windows as host and companion surfaces.

use std::sync::{Arc, Weak};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowLevel};

use crate::backend::OverlayBackend;
use crate::config::OverlayConfig;
use crate::desktop::gpu::GpuLibrary;
use crate::desktop::mesh_pass::MeshRenderer;
use crate::error::BindError;
use crate::library::PendingLibrary;
use crate::surface::{CompanionStyle, CompanionSurface, HostSurface, HostSurfaceLocator, Layering, SizeSample};

/// Finds the host by reading a window it does not own.
///
/// Holds only a weak reference: once the host window is dropped the host is
/// reported missing.
#[derive(Clone, Debug)]
pub struct WindowLocator {
    window: Weak<Window>,
}

impl WindowLocator {
    pub fn new(window: &Arc<Window>) -> Self {
        Self {
            window: Arc::downgrade(window),
        }
    }
}

impl HostSurfaceLocator for WindowLocator {
    fn locate(&self) -> Option<HostSurface> {
        let window = self.window.upgrade()?;
        if window.is_minimized() == Some(true) {
            return None;
        }
        // Some platforms (Wayland) never report positions.
        let origin = window
            .inner_position()
            .or_else(|_| window.outer_position())
            .unwrap_or_default();
        let size = window.inner_size();
        Some(HostSurface::new((origin.x, origin.y), size.width, size.height))
    }
}

/// An undecorated, transparent window that never takes input.
pub struct CompanionWindow {
    window: Arc<Window>,
    origin: (i32, i32),
    size: SizeSample,
    visible: bool,
}

impl CompanionWindow {
    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }
}

impl CompanionSurface for CompanionWindow {
    fn size(&self) -> SizeSample {
        self.size
    }

    fn align_to(&mut self, host: &HostSurface) {
        if host.origin != self.origin {
            self.window
                .set_outer_position(PhysicalPosition::new(host.origin.0, host.origin.1));
            self.origin = host.origin;
        }
        if host.size != self.size {
            let _ = self.window.request_inner_size(PhysicalSize::new(
                host.size.width.max(1),
                host.size.height.max(1),
            ));
            self.size = host.size;
        }
    }

    fn set_visible(&mut self, visible: bool) {
        if visible != self.visible {
            self.window.set_visible(visible);
            self.visible = visible;
        }
    }

    fn is_visible(&self) -> bool {
        self.visible
    }
}

/// winit windows and a wgpu renderer.
#[derive(Debug, Default)]
pub struct DesktopBackend;

impl DesktopBackend {
    pub fn new() -> Self {
        Self
    }
}

impl OverlayBackend for DesktopBackend {
    type Platform = ActiveEventLoop;
    type Library = GpuLibrary;
    type Surface = CompanionWindow;
    type Renderer = MeshRenderer;

    fn load_library(&mut self) -> PendingLibrary<GpuLibrary> {
        GpuLibrary::load()
    }

    fn create_companion(
        &mut self,
        event_loop: &ActiveEventLoop,
        style: &CompanionStyle,
    ) -> Result<CompanionWindow, BindError> {
        let level = match style.layering {
            Layering::AlwaysOnTop => WindowLevel::AlwaysOnTop,
            Layering::StackedAboveHost => WindowLevel::Normal,
        };
        let attrs = Window::default_attributes()
            .with_title(style.title.as_str())
            .with_decorations(false)
            .with_resizable(false)
            .with_transparent(style.transparent)
            .with_active(false)
            .with_window_level(level)
            .with_position(PhysicalPosition::new(style.origin.0, style.origin.1))
            .with_inner_size(PhysicalSize::new(
                style.size.width.max(1),
                style.size.height.max(1),
            ));

        let window = event_loop
            .create_window(attrs)
            .map_err(|e| BindError::Surface {
                reason: e.to_string(),
            })?;

        if style.input_passthrough {
            if let Err(e) = window.set_cursor_hittest(false) {
                log::warn!("companion window cannot pass input through: {e}");
            }
        }

        Ok(CompanionWindow {
            window: Arc::new(window),
            origin: style.origin,
            size: style.size,
            visible: true,
        })
    }

    fn create_renderer(
        &mut self,
        library: &GpuLibrary,
        surface: &CompanionWindow,
        config: &OverlayConfig,
    ) -> Result<MeshRenderer, BindError> {
        MeshRenderer::new(library, Arc::clone(surface.window()), surface.size(), config)
    }
}
