use crate::camera::PerspectiveCamera;
use crate::scene::SceneGraph;
use crate::surface::{CompanionSurface, HostSurface};

/// Everything a bound overlay renders with.
///
/// All four parts are created together by the binder and live as long as the
/// overlay; there is no way to hold a context with some of them missing.
pub struct RenderContext<S, R> {
    pub companion: S,
    pub renderer: R,
    pub scene: SceneGraph,
    pub camera: PerspectiveCamera,
}

impl<S, R> RenderContext<S, R>
where
    S: CompanionSurface,
    R: crate::backend::Renderer,
{
    /// Bring the companion, the renderer output and the viewpoint in line
    /// with the host's current geometry.
    pub fn sync_to(&mut self, host: &HostSurface) {
        self.companion.align_to(host);
        let size = self.companion.size();
        self.renderer.set_size(size);
        self.camera.set_aspect(size.aspect());
    }

    /// Aspect ratio of the companion surface as currently sized.
    pub fn surface_aspect(&self) -> f32 {
        self.companion.size().aspect()
    }
}
