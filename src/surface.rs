//! Host and companion surfaces.
//!
//! The host surface belongs to someone else: the overlay only ever *reads* it,
//! through a [`HostSurfaceLocator`]. Every lookup is fresh, because the host may
//! resize, move, or recreate its surface at any time.
//!
//! The companion surface is ours. It sits exactly over the host, never takes
//! input, and is resized to the host every frame.

use serde::Deserialize;

/// Width and height of a surface, sampled once per frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SizeSample {
    pub width: u32,
    pub height: u32,
}

impl SizeSample {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height. A zero-height sample yields 1.0 so the projection
    /// stays finite while the host is collapsed.
    pub fn aspect(self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A snapshot of the host surface: where it is and how big it is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostSurface {
    /// Top-left corner in the coordinate space the companion is placed in.
    pub origin: (i32, i32),
    pub size: SizeSample,
}

impl HostSurface {
    pub const fn new(origin: (i32, i32), width: u32, height: u32) -> Self {
        Self {
            origin,
            size: SizeSample::new(width, height),
        }
    }
}

/// Finds the host surface.
///
/// This is the single point where the overlay depends on the host's internal
/// structure. Returning `None` is not an error: the overlay logs it and tries
/// again next frame.
pub trait HostSurfaceLocator {
    fn locate(&self) -> Option<HostSurface>;
}

impl<F> HostSurfaceLocator for F
where
    F: Fn() -> Option<HostSurface>,
{
    fn locate(&self) -> Option<HostSurface> {
        self()
    }
}

/// How the companion surface is stacked relative to the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layering {
    /// Above the host and above every other surface of the host application.
    #[default]
    AlwaysOnTop,
    /// Directly above the host when created; other host layers may cover it.
    StackedAboveHost,
}

/// Everything needed to create a companion surface over a host.
#[derive(Clone, Debug, PartialEq)]
pub struct CompanionStyle {
    pub origin: (i32, i32),
    pub size: SizeSample,
    pub layering: Layering,
    /// Always true for the overlay: every pointer and keyboard event must
    /// reach the host.
    pub input_passthrough: bool,
    pub transparent: bool,
    pub title: String,
}

impl CompanionStyle {
    /// A transparent, input-inert style covering `host` exactly.
    pub fn over(host: &HostSurface, layering: Layering, title: impl Into<String>) -> Self {
        Self {
            origin: host.origin,
            size: host.size,
            layering,
            input_passthrough: true,
            transparent: true,
            title: title.into(),
        }
    }
}

/// The overlay's own surface.
pub trait CompanionSurface {
    /// Current size of the surface.
    fn size(&self) -> SizeSample;

    /// Move and resize the surface so it covers `host` exactly.
    fn align_to(&mut self, host: &HostSurface);

    fn set_visible(&mut self, visible: bool);

    fn is_visible(&self) -> bool;
}
