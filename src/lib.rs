//! # overlay3d
//!
//! **A 3D overlay that rides on top of a 2D surface it does not own.**
//!
//! The overlay keeps a transparent, input-inert companion surface exactly over
//! a host surface, re-reading the host every frame so the companion follows
//! it through resizes and moves. Objects are added through fire-and-forget
//! commands; nothing here ever returns an error to the command caller.
//!
//! ## Quick Start
//!
//! ```no_run
//! use overlay3d::desktop::{HostConfig, run_overlay};
//! use overlay3d::{Command, ObjectSpec, OverlayConfig};
//!
//! fn main() {
//!     overlay3d::init_logging(Default::default());
//!     run_overlay(
//!         HostConfig::new().title("My canvas"),
//!         OverlayConfig::default(),
//!         vec![Command::CreateScene, Command::CreateObject(ObjectSpec::new())],
//!     )
//!     .unwrap();
//! }
//! ```
//!
//! ## Lifecycle
//!
//! [`OverlayController`] moves through `Uninitialized → LibraryLoading →
//! Active ⇄ Paused`. The rendering library loads off-thread; the controller
//! polls it on `create` and on every tick, and binds the companion surface as
//! soon as both the library and the host are available.
//!
//! ## Backends
//!
//! The core is backend-agnostic. [`OverlayBackend`] supplies the library
//! load, the companion surface and the renderer; [`HostSurfaceLocator`]
//! supplies the host. The [`desktop`] module implements both with winit and
//! wgpu.

mod backend;
mod binder;
mod camera;
mod color;
mod command;
mod config;
mod context;
pub mod desktop;
mod error;
mod frame;
mod geometry;
mod library;
mod lifecycle;
mod loader;
mod logging;
mod pending;
mod scene;
mod surface;

#[cfg(test)]
mod testing;

pub use backend::{OverlayBackend, Renderer};
pub use binder::{BackendContext, BindOutcome, bind};
pub use camera::PerspectiveCamera;
pub use color::{Color, ColorParseError};
pub use command::{BoxSize, Command, ObjectSpec};
pub use config::OverlayConfig;
pub use context::RenderContext;
pub use error::{BindError, CommandError, GeometryError, LibraryLoadError, RenderError, WorkerLost};
pub use frame::{FrameSynchronizer, NextFrame, StopHandle, TickReport};
pub use geometry::{GeometryFormat, ParsedModel, RawGeometry, Vertex3d, load_model, parse_model};
pub use library::{LibraryLoader, LibraryStatus, PendingLibrary};
pub use lifecycle::{LifecycleState, OverlayController};
pub use loader::{FileObjectLoader, LoadedObject, ObjectLoader, PendingObject};
pub use logging::{LoggingConfig, init_logging};
pub use pending::{Completer, Pending, Poll};
pub use scene::{ObjectId, SceneGraph, SceneObject, Shape, Transform};
pub use surface::{
    CompanionStyle, CompanionSurface, HostSurface, HostSurfaceLocator, Layering, SizeSample,
};
