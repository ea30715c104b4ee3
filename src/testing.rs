//! In-memory backend and locator used by the unit tests.

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use crate::backend::{OverlayBackend, Renderer};
use crate::camera::PerspectiveCamera;
use crate::config::OverlayConfig;
use crate::error::{BindError, LibraryLoadError, RenderError};
use crate::library::PendingLibrary;
use crate::pending::Completer;
use crate::scene::SceneGraph;
use crate::surface::{CompanionStyle, CompanionSurface, HostSurface, HostSurfaceLocator, SizeSample};

/// Everything the fake backend observed.
#[derive(Debug, Default)]
pub struct Record {
    pub library_loads: usize,
    pub companions_created: usize,
    pub last_style: Option<CompanionStyle>,
    pub surface_size: SizeSample,
    pub surface_visible: bool,
    pub aligns: usize,
    pub renderer_size: SizeSample,
    pub renders: usize,
    /// Camera aspect and projection at each render.
    pub rendered_aspects: Vec<f32>,
    pub rendered_projections: Vec<glam::Mat4>,
    pub rendered_object_counts: Vec<usize>,
    pub fail_renders: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LibraryMode {
    Immediate,
    Manual,
}

type LibraryCompleter = Completer<(), LibraryLoadError>;

/// Shared view into a [`FakeBackend`] that survives moving the backend.
#[derive(Clone)]
pub struct Probe {
    record: Rc<RefCell<Record>>,
    completers: Rc<RefCell<Vec<LibraryCompleter>>>,
}

impl Probe {
    pub fn record(&self) -> Ref<'_, Record> {
        self.record.borrow()
    }

    pub fn fail_renders(&self, fail: bool) {
        self.record.borrow_mut().fail_renders = fail;
    }

    /// Finish the oldest outstanding library load.
    pub fn complete_library(&self, result: Result<(), LibraryLoadError>) {
        let completer = self.completers.borrow_mut().remove(0);
        completer.complete(result);
    }
}

pub struct FakeBackend {
    record: Rc<RefCell<Record>>,
    completers: Rc<RefCell<Vec<LibraryCompleter>>>,
    mode: LibraryMode,
    fail_renderer: bool,
}

impl FakeBackend {
    /// A backend whose library is available as soon as it is requested.
    pub fn new() -> Self {
        Self {
            record: Rc::default(),
            completers: Rc::default(),
            mode: LibraryMode::Immediate,
            fail_renderer: false,
        }
    }

    /// A backend whose library loads only finish through [`Probe::complete_library`].
    pub fn manual() -> Self {
        Self {
            mode: LibraryMode::Manual,
            ..Self::new()
        }
    }

    pub fn fail_renderer(&mut self, fail: bool) {
        self.fail_renderer = fail;
    }

    pub fn probe(&self) -> Probe {
        Probe {
            record: Rc::clone(&self.record),
            completers: Rc::clone(&self.completers),
        }
    }

    pub fn record(&self) -> Ref<'_, Record> {
        self.record.borrow()
    }
}

impl OverlayBackend for FakeBackend {
    type Platform = ();
    type Library = ();
    type Surface = FakeSurface;
    type Renderer = FakeRenderer;

    fn load_library(&mut self) -> PendingLibrary<()> {
        self.record.borrow_mut().library_loads += 1;
        match self.mode {
            LibraryMode::Immediate => PendingLibrary::ready(Ok(())),
            LibraryMode::Manual => {
                let (completer, pending) = PendingLibrary::channel();
                self.completers.borrow_mut().push(completer);
                pending
            }
        }
    }

    fn create_companion(
        &mut self,
        _platform: &(),
        style: &CompanionStyle,
    ) -> Result<FakeSurface, BindError> {
        let mut record = self.record.borrow_mut();
        record.companions_created += 1;
        record.last_style = Some(style.clone());
        record.surface_size = style.size;
        record.surface_visible = true;
        Ok(FakeSurface {
            record: Rc::clone(&self.record),
            size: style.size,
            visible: true,
        })
    }

    fn create_renderer(
        &mut self,
        _library: &(),
        surface: &FakeSurface,
        _config: &OverlayConfig,
    ) -> Result<FakeRenderer, BindError> {
        if self.fail_renderer {
            return Err(BindError::Renderer {
                reason: "fake renderer refused".into(),
            });
        }
        self.record.borrow_mut().renderer_size = surface.size;
        Ok(FakeRenderer {
            record: Rc::clone(&self.record),
        })
    }
}

pub struct FakeSurface {
    record: Rc<RefCell<Record>>,
    size: SizeSample,
    visible: bool,
}

impl CompanionSurface for FakeSurface {
    fn size(&self) -> SizeSample {
        self.size
    }

    fn align_to(&mut self, host: &HostSurface) {
        self.size = host.size;
        let mut record = self.record.borrow_mut();
        record.surface_size = host.size;
        record.aligns += 1;
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.record.borrow_mut().surface_visible = visible;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }
}

pub struct FakeRenderer {
    record: Rc<RefCell<Record>>,
}

impl Renderer for FakeRenderer {
    fn set_size(&mut self, size: SizeSample) {
        self.record.borrow_mut().renderer_size = size;
    }

    fn render(
        &mut self,
        scene: &SceneGraph,
        camera: &PerspectiveCamera,
    ) -> Result<(), RenderError> {
        let mut record = self.record.borrow_mut();
        if record.fail_renders {
            return Err(RenderError::Timeout);
        }
        record.renders += 1;
        record.rendered_aspects.push(camera.aspect());
        record.rendered_projections.push(camera.projection_matrix());
        record.rendered_object_counts.push(scene.len());
        Ok(())
    }
}

/// A host surface that tests can show, hide and resize at will.
#[derive(Clone, Default)]
pub struct FakeLocator {
    host: Rc<Cell<Option<HostSurface>>>,
    lookups: Rc<Cell<usize>>,
}

impl FakeLocator {
    pub fn showing(host: HostSurface) -> Self {
        let locator = Self::default();
        locator.set(Some(host));
        locator
    }

    pub fn hidden() -> Self {
        Self::default()
    }

    pub fn set(&self, host: Option<HostSurface>) {
        self.host.set(host);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.get()
    }
}

impl HostSurfaceLocator for FakeLocator {
    fn locate(&self) -> Option<HostSurface> {
        self.lookups.set(self.lookups.get() + 1);
        self.host.get()
    }
}
