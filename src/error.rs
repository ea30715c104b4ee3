//! Error types for the overlay.
//!
//! None of these escape the command surface: the lifecycle controller and the
//! frame synchronizer catch them and log. They exist so that every internal
//! step can use `?` and so tests can assert on the exact failure.

use std::path::PathBuf;

/// Failure to establish the companion surface and its renderer.
#[derive(thiserror::Error, Debug)]
pub enum BindError {
    /// The host surface locator resolved to nothing.
    #[error("host surface not found")]
    HostSurfaceNotFound,

    /// The companion surface could not be created.
    #[error("failed to create companion surface: {reason}")]
    Surface { reason: String },

    /// The renderer could not be bound to the companion surface.
    #[error("failed to create renderer: {reason}")]
    Renderer { reason: String },
}

/// Failure to bring up the rendering library.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LibraryLoadError {
    /// No graphics adapter satisfied the request.
    #[error("no suitable graphics adapter: {reason}")]
    NoAdapter { reason: String },

    /// The adapter refused to hand out a device.
    #[error("failed to request device: {reason}")]
    RequestDevice { reason: String },

    /// The loader thread went away without reporting a result.
    #[error("library loader exited without a result")]
    WorkerLost,
}

/// Failure of a single command. Never affects the frame loop.
#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    /// A size/position/rotation/color argument had the wrong shape.
    #[error("invalid argument `{argument}`: {reason}")]
    InvalidArgumentShape { argument: String, reason: String },

    /// The opcode is not one this overlay understands.
    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    /// The scene does not exist yet; call create first.
    #[error("scene not ready; create the 3D scene first")]
    NotReady,

    /// An external object could not be loaded.
    #[error("failed to load `{url}`: {source}")]
    Load {
        url: String,
        #[source]
        source: GeometryError,
    },
}

impl CommandError {
    pub(crate) fn shape(argument: impl Into<String>, reason: impl ToString) -> Self {
        CommandError::InvalidArgumentShape {
            argument: argument.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors that can occur when loading geometry.
#[derive(thiserror::Error, Debug)]
pub enum GeometryError {
    /// File could not be read.
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File format could not be determined from the extension.
    #[error("unknown geometry format: '{0}'")]
    UnknownFormat(String),

    /// Only local files are supported.
    #[error("unsupported URL scheme: '{0}'")]
    UnsupportedScheme(String),

    /// The geometry data was invalid or corrupt.
    #[error("parse error: {0}")]
    Parse(String),

    /// The loader thread went away without reporting a result.
    #[error("object loader exited without a result")]
    WorkerLost,
}

/// Failure of a single render call. The frame loop logs it and carries on.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The surface was lost or outdated and has been reconfigured.
    #[error("surface lost; reconfigured")]
    Reconfigured,

    /// The surface timed out; the frame is skipped.
    #[error("surface timed out; frame skipped")]
    Timeout,

    /// The GPU ran out of memory.
    #[error("out of memory")]
    OutOfMemory,

    #[error("render failed: {0}")]
    Other(String),
}

/// Marker for a worker thread that dropped its result channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerLost;

impl From<WorkerLost> for LibraryLoadError {
    fn from(_: WorkerLost) -> Self {
        LibraryLoadError::WorkerLost
    }
}

impl From<WorkerLost> for GeometryError {
    fn from(_: WorkerLost) -> Self {
        GeometryError::WorkerLost
    }
}
