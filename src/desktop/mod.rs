//! Desktop rendition of the overlay: winit windows and a wgpu renderer.
//!
//! The host is a winit window the overlay only reads. The companion is a
//! second, borderless, transparent window kept over it and excluded from
//! hit testing. The rendering library is a wgpu device acquired on a worker
//! thread.

mod app;
mod gpu;
mod mesh_pass;
mod window;

pub use app::{HostConfig, run_overlay};
pub use gpu::{GpuLibrary, SurfaceTarget};
pub use mesh_pass::MeshRenderer;
pub use window::{CompanionWindow, DesktopBackend, WindowLocator};
