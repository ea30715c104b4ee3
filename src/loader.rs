//! External object loading.
//!
//! Loads are fire-and-forget from the caller's point of view: `load` returns a
//! [`PendingObject`] immediately and the controller attaches the result to the
//! scene on a later tick. A failed load is logged and leaves the scene alone.

use std::path::PathBuf;

use crate::color::Color;
use crate::error::GeometryError;
use crate::geometry::{self, RawGeometry};
use crate::pending::Pending;

/// A model that finished loading, ready to attach.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedObject {
    pub geometry: RawGeometry,
    pub color: Option<Color>,
}

pub type PendingObject = Pending<LoadedObject, GeometryError>;

/// Something that can turn a URL into scene geometry.
pub trait ObjectLoader {
    fn load(&self, url: &str) -> PendingObject;
}

/// Loads models from the local filesystem on a worker thread.
///
/// Accepts plain paths and `file://` URLs; other schemes are rejected.
/// Loaded geometry is recentered on the origin.
#[derive(Clone, Debug, Default)]
pub struct FileObjectLoader {
    root: Option<PathBuf>,
}

impl FileObjectLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `root` instead of the working directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// Map a URL to a filesystem path.
    pub fn resolve(&self, url: &str) -> Result<PathBuf, GeometryError> {
        let url = url.trim();
        let raw = if let Some(rest) = url.strip_prefix("file://") {
            rest
        } else if let Some((scheme, _)) = url.split_once("://") {
            return Err(GeometryError::UnsupportedScheme(scheme.to_string()));
        } else {
            url
        };

        let path = PathBuf::from(raw);
        Ok(match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path,
        })
    }
}

impl ObjectLoader for FileObjectLoader {
    fn load(&self, url: &str) -> PendingObject {
        let path = match self.resolve(url) {
            Ok(path) => path,
            Err(e) => return PendingObject::ready(Err(e)),
        };

        PendingObject::spawn("overlay3d-object-loader", move || {
            let model = geometry::load_model(&path)?;
            let mut geometry = model.geometry;
            geometry.recenter();
            log::debug!(
                "loaded {} ({} triangles)",
                path.display(),
                geometry.triangle_count()
            );
            Ok(LoadedObject {
                geometry,
                color: model.color,
            })
        })
    }
}
