//! Surface binding: companion surface, renderer, scene and viewpoint in one step.

use crate::backend::OverlayBackend;
use crate::camera::PerspectiveCamera;
use crate::config::OverlayConfig;
use crate::context::RenderContext;
use crate::error::BindError;
use crate::scene::SceneGraph;
use crate::surface::{CompanionStyle, CompanionSurface, HostSurfaceLocator};

/// The context type produced for a backend.
pub type BackendContext<B> =
    RenderContext<<B as OverlayBackend>::Surface, <B as OverlayBackend>::Renderer>;

/// Whether `bind` did any work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindOutcome {
    Created,
    AlreadyBound,
}

/// Bind a companion surface over the host, unless one already exists.
///
/// On success `slot` holds a complete context. On failure `slot` is left as
/// it was; nothing half-built survives.
pub fn bind<B: OverlayBackend>(
    backend: &mut B,
    platform: &B::Platform,
    library: &B::Library,
    locator: &dyn HostSurfaceLocator,
    config: &OverlayConfig,
    slot: &mut Option<BackendContext<B>>,
) -> Result<BindOutcome, BindError> {
    if slot.is_some() {
        return Ok(BindOutcome::AlreadyBound);
    }

    let host = locator.locate().ok_or(BindError::HostSurfaceNotFound)?;
    let style = CompanionStyle::over(&host, config.layering, config.title.clone());

    let companion = backend.create_companion(platform, &style)?;
    let renderer = backend.create_renderer(library, &companion, config)?;

    let size = companion.size();
    let camera = PerspectiveCamera::new(config.fov_degrees, size.aspect(), config.near, config.far)
        .at(0.0, 0.0, config.camera_distance);

    log::info!(
        "bound companion surface {}x{} at ({}, {})",
        size.width,
        size.height,
        host.origin.0,
        host.origin.1
    );

    *slot = Some(RenderContext {
        companion,
        renderer,
        scene: SceneGraph::new(),
        camera,
    });

    Ok(BindOutcome::Created)
}
