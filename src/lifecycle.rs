//! The overlay lifecycle controller.
//!
//! ```text
//! Uninitialized --create--> LibraryLoading --library ready + bind--> Active <--pause/resume--> Paused
//!        ^                        |
//!        +---- library failed ----+
//! ```
//!
//! Nothing here returns an error to the caller of `create`, `pause` or
//! `resume`. Failures are logged and the controller stays in a state from
//! which calling `create` again (or simply ticking) makes progress.

use crate::backend::OverlayBackend;
use crate::binder::{self, BackendContext, BindOutcome};
use crate::color::Color;
use crate::command::{Command, ObjectSpec};
use crate::config::OverlayConfig;
use crate::error::{BindError, CommandError};
use crate::frame::{FrameSynchronizer, StopHandle, TickReport};
use crate::library::{LibraryLoader, LibraryStatus};
use crate::loader::{FileObjectLoader, ObjectLoader, PendingObject};
use crate::pending::Poll;
use crate::scene::{ObjectId, SceneGraph, SceneObject, Shape, Transform};
use crate::surface::{CompanionSurface, HostSurfaceLocator};
use serde_json::Value;
use std::sync::Arc;

/// Where the overlay is in its life.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    LibraryLoading,
    Active,
    Paused,
}

struct InFlightLoad {
    url: String,
    pending: PendingObject,
}

/// Owns everything the overlay is made of and drives it from one thread.
pub struct OverlayController<B: OverlayBackend> {
    backend: B,
    locator: Box<dyn HostSurfaceLocator>,
    loader: Box<dyn ObjectLoader>,
    config: OverlayConfig,
    library: LibraryLoader<B::Library>,
    context: Option<BackendContext<B>>,
    frames: FrameSynchronizer,
    paused: bool,
    animated: Option<ObjectId>,
    loads: Vec<InFlightLoad>,
    bind_failing: bool,
    /// A bind failed for a reason other than a missing host. Ticks stop
    /// retrying until the next `create`.
    bind_blocked: bool,
}

impl<B: OverlayBackend> OverlayController<B> {
    pub fn new(backend: B, locator: impl HostSurfaceLocator + 'static, config: OverlayConfig) -> Self {
        Self {
            backend,
            locator: Box::new(locator),
            loader: Box::new(FileObjectLoader::new()),
            frames: FrameSynchronizer::new(config.spin_per_tick),
            config,
            library: LibraryLoader::new(),
            context: None,
            paused: false,
            animated: None,
            loads: Vec::new(),
            bind_failing: false,
            bind_blocked: false,
        }
    }

    /// Replace the loader used by `load_external_object`.
    pub fn with_loader(mut self, loader: impl ObjectLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn state(&self) -> LifecycleState {
        match &self.context {
            Some(_) if self.paused => LifecycleState::Paused,
            Some(_) => LifecycleState::Active,
            None if self.library.is_idle() => LifecycleState::Uninitialized,
            None => LifecycleState::LibraryLoading,
        }
    }

    /// Create the 3D scene, or move it one step closer to existing.
    ///
    /// Safe to call any number of times: the library is loaded once and the
    /// companion surface is bound once. Calling it while paused resumes.
    /// Does nothing after `shutdown`.
    pub fn create(&mut self, platform: &B::Platform) {
        if self.is_shut_down() {
            log::debug!("create: overlay is shut down");
            return;
        }
        self.bind_blocked = false;
        match self.state() {
            LifecycleState::Uninitialized => {
                let backend = &mut self.backend;
                if self.library.begin(|| backend.load_library()) {
                    log::info!("loading rendering library");
                }
                self.advance(platform);
            }
            LifecycleState::LibraryLoading => self.advance(platform),
            LifecycleState::Active => log::debug!("create: overlay already active"),
            LifecycleState::Paused => self.resume(),
        }
    }

    /// Poll the library and bind once it is ready.
    fn advance(&mut self, platform: &B::Platform) {
        if self.context.is_some() {
            return;
        }

        let library = match self.library.poll() {
            LibraryStatus::Idle | LibraryStatus::Loading => return,
            LibraryStatus::Failed(e) => {
                log::error!("rendering library failed to load: {e}; create the scene again to retry");
                return;
            }
            LibraryStatus::Loaded(library) => library,
        };

        let bound = binder::bind(
            &mut self.backend,
            platform,
            library,
            self.locator.as_ref(),
            &self.config,
            &mut self.context,
        );

        match bound {
            Ok(BindOutcome::Created) => {
                self.bind_failing = false;
                self.bind_blocked = false;
                if self.paused {
                    if let Some(ctx) = &mut self.context {
                        ctx.companion.set_visible(false);
                    }
                    log::info!("overlay bound while paused");
                } else {
                    log::info!("overlay active");
                }
            }
            Ok(BindOutcome::AlreadyBound) => {}
            Err(e) => {
                let host_missing = matches!(e, BindError::HostSurfaceNotFound);
                if !self.bind_failing {
                    if host_missing {
                        log::error!("{e}; will retry on the next tick");
                    } else {
                        log::error!("failed to bind overlay: {e}; create the scene again to retry");
                    }
                }
                self.bind_failing = true;
                self.bind_blocked = !host_missing;
            }
        }
    }

    /// Hide the overlay and stop rendering. Size sync keeps running.
    pub fn pause(&mut self) {
        if !self.paused {
            log::info!("overlay paused");
        }
        self.paused = true;
        if let Some(ctx) = &mut self.context {
            ctx.companion.set_visible(false);
        }
    }

    /// Show the overlay and render again. Does nothing after `shutdown`.
    pub fn resume(&mut self) {
        if self.is_shut_down() {
            log::debug!("resume: overlay is shut down");
            return;
        }
        if self.paused {
            log::info!("overlay resumed");
        }
        self.paused = false;
        if let Some(ctx) = &mut self.context {
            ctx.companion.set_visible(true);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Add a box to the scene.
    pub fn create_object(&mut self, spec: ObjectSpec) -> Result<ObjectId, CommandError> {
        spec.validate()?;
        let ctx = self.context.as_mut().ok_or(CommandError::NotReady)?;

        let id = ctx.scene.add(SceneObject {
            shape: Shape::Box {
                width: spec.size.width,
                height: spec.size.height,
                depth: spec.size.depth,
            },
            color: spec.color,
            transform: Transform::new()
                .position(spec.position)
                .rotation(spec.rotation),
            label: "box".into(),
        });
        if self.config.spin_latest_object {
            self.animated = Some(id);
        }
        Ok(id)
    }

    /// Start loading an external model. It is attached to the scene on a
    /// later tick, or logged and dropped if loading fails.
    pub fn load_external_object(&mut self, url: &str) -> Result<(), CommandError> {
        if self.context.is_none() {
            return Err(CommandError::NotReady);
        }
        log::info!("loading external object from {url}");
        self.loads.push(InFlightLoad {
            url: url.to_string(),
            pending: self.loader.load(url),
        });
        Ok(())
    }

    /// Number of external loads still in flight.
    pub fn pending_loads(&self) -> usize {
        self.loads.len()
    }

    fn attach_finished_loads(&mut self) {
        let Some(ctx) = &mut self.context else {
            return;
        };

        self.loads.retain(|load| match load.pending.poll() {
            Poll::Pending => true,
            Poll::Ready(Ok(object)) => {
                ctx.scene.add(SceneObject {
                    shape: Shape::Mesh(Arc::new(object.geometry)),
                    color: object.color.unwrap_or(Color::WHITE),
                    transform: Transform::new(),
                    label: load.url.clone(),
                });
                false
            }
            Poll::Ready(Err(source)) => {
                let e = CommandError::Load {
                    url: load.url.clone(),
                    source,
                };
                log::error!("{e}");
                false
            }
        });
    }

    /// Execute a command, logging any failure.
    pub fn dispatch(&mut self, platform: &B::Platform, command: Command) {
        let result = match command {
            Command::CreateScene => {
                self.create(platform);
                Ok(())
            }
            Command::CreateObject(spec) => self.create_object(spec).map(drop),
            Command::LoadExternalObject { url } => self.load_external_object(&url),
            Command::Pause => {
                self.pause();
                Ok(())
            }
            Command::Resume => {
                self.resume();
                Ok(())
            }
        };

        if let Err(e) = result {
            log::error!("{e}");
        }
    }

    /// Parse and execute a block-style command.
    pub fn run_block(&mut self, platform: &B::Platform, opcode: &str, args: &Value) {
        match Command::parse(opcode, args) {
            Ok(command) => self.dispatch(platform, command),
            Err(e) => log::error!("{opcode}: {e}"),
        }
    }

    /// One frame: finish pending work, then synchronize and render.
    pub fn tick(&mut self, platform: &B::Platform) -> TickReport {
        if self.context.is_none() && !self.bind_blocked && !self.is_shut_down() {
            self.advance(platform);
        }
        if self.context.is_none() {
            return self.frames.idle();
        }

        self.attach_finished_loads();
        self.frames.tick(
            self.locator.as_ref(),
            self.context.as_mut(),
            self.paused,
            self.animated,
        )
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.frames.stop_handle()
    }

    pub fn is_shut_down(&self) -> bool {
        self.frames.stop_handle().is_stopped()
    }

    /// Stop the frame loop and hide the companion surface.
    pub fn shutdown(&mut self) {
        self.frames.stop_handle().stop();
        if let Some(ctx) = &mut self.context {
            ctx.companion.set_visible(false);
        }
        log::info!("overlay shut down");
    }

    pub fn scene(&self) -> Option<&SceneGraph> {
        self.context.as_ref().map(|ctx| &ctx.scene)
    }

    pub fn context(&self) -> Option<&BackendContext<B>> {
        self.context.as_ref()
    }

    /// The object that spins each tick, if any.
    pub fn animated_object(&self) -> Option<ObjectId> {
        self.animated
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GeometryError, LibraryLoadError};
    use crate::frame::NextFrame;
    use crate::geometry::RawGeometry;
    use crate::loader::LoadedObject;
    use crate::surface::{HostSurface, SizeSample};
    use crate::testing::{FakeBackend, FakeLocator};
    use glam::Vec3;
    use serde_json::json;

    fn host(w: u32, h: u32) -> HostSurface {
        HostSurface::new((0, 0), w, h)
    }

    fn controller(backend: FakeBackend, locator: &FakeLocator) -> OverlayController<FakeBackend> {
        OverlayController::new(backend, locator.clone(), OverlayConfig::default())
    }

    /// Succeeds for urls ending in `.ok`, fails for everything else.
    struct StubLoader;

    impl ObjectLoader for StubLoader {
        fn load(&self, url: &str) -> PendingObject {
            if url.ends_with(".ok") {
                PendingObject::ready(Ok(LoadedObject {
                    geometry: RawGeometry::cuboid(1.0, 1.0, 1.0),
                    color: None,
                }))
            } else {
                PendingObject::ready(Err(GeometryError::UnknownFormat(url.to_string())))
            }
        }
    }

    #[test]
    fn repeated_create_binds_once() {
        let locator = FakeLocator::showing(host(800, 600));
        let mut overlay = controller(FakeBackend::new(), &locator);

        for _ in 0..5 {
            overlay.create(&());
        }

        assert_eq!(overlay.state(), LifecycleState::Active);
        let record = overlay.backend().record();
        assert_eq!(record.library_loads, 1);
        assert_eq!(record.companions_created, 1);
    }

    #[test]
    fn companion_matches_host_on_bind() {
        let locator = FakeLocator::showing(host(800, 600));
        let mut overlay = controller(FakeBackend::new(), &locator);
        overlay.create(&());

        let ctx = overlay.context().unwrap();
        assert_eq!(ctx.companion.size(), SizeSample::new(800, 600));
        assert!((ctx.camera.aspect() - 1.333).abs() < 1e-3);
        let style = overlay.backend().record().last_style.clone().unwrap();
        assert!(style.input_passthrough && style.transparent);
    }

    #[test]
    fn create_before_library_is_ready_waits() {
        let locator = FakeLocator::showing(host(800, 600));
        let backend = FakeBackend::manual();
        let probe = backend.probe();
        let mut overlay = controller(backend, &locator);

        overlay.create(&());
        overlay.create(&());
        assert_eq!(overlay.state(), LifecycleState::LibraryLoading);
        assert!(overlay.context().is_none());
        assert_eq!(probe.record().companions_created, 0);
        assert_eq!(probe.record().library_loads, 1);
        assert_eq!(overlay.tick(&()).next, NextFrame::Schedule);

        probe.complete_library(Ok(()));
        let report = overlay.tick(&());
        assert_eq!(overlay.state(), LifecycleState::Active);
        assert!(report.rendered);
        assert_eq!(probe.record().companions_created, 1);
    }

    #[test]
    fn failed_library_load_can_be_retried() {
        let locator = FakeLocator::showing(host(800, 600));
        let backend = FakeBackend::manual();
        let probe = backend.probe();
        let mut overlay = controller(backend, &locator);

        overlay.create(&());
        probe.complete_library(Err(LibraryLoadError::NoAdapter {
            reason: "no gpu".into(),
        }));
        overlay.tick(&());
        assert_eq!(overlay.state(), LifecycleState::Uninitialized);

        overlay.tick(&());
        assert_eq!(probe.record().library_loads, 1);

        overlay.create(&());
        assert_eq!(overlay.state(), LifecycleState::LibraryLoading);
        probe.complete_library(Ok(()));
        overlay.create(&());
        assert_eq!(overlay.state(), LifecycleState::Active);
        assert_eq!(probe.record().library_loads, 2);
    }

    #[test]
    fn missing_host_at_bind_time_keeps_the_library() {
        let locator = FakeLocator::hidden();
        let mut overlay = controller(FakeBackend::new(), &locator);

        overlay.create(&());
        overlay.tick(&());
        assert_eq!(overlay.state(), LifecycleState::LibraryLoading);

        locator.set(Some(host(640, 480)));
        overlay.tick(&());
        assert_eq!(overlay.state(), LifecycleState::Active);
        let record = overlay.backend().record();
        assert_eq!(record.library_loads, 1);
        assert_eq!(record.companions_created, 1);
    }

    #[test]
    fn pause_resume_pause_matches_a_single_pause() {
        let locator = FakeLocator::showing(host(800, 600));
        let mut overlay = controller(FakeBackend::new(), &locator);
        let probe = overlay.backend().probe();
        overlay.create(&());

        overlay.pause();
        overlay.resume();
        assert!(probe.record().surface_visible);
        overlay.pause();

        assert_eq!(overlay.state(), LifecycleState::Paused);
        assert!(!probe.record().surface_visible);

        let before = probe.record().renders;
        locator.set(Some(host(1024, 768)));
        let report = overlay.tick(&());
        assert!(report.synced && !report.rendered);
        assert_eq!(probe.record().renders, before);
        assert_eq!(probe.record().surface_size, SizeSample::new(1024, 768));
    }

    #[test]
    fn create_while_paused_resumes() {
        let locator = FakeLocator::showing(host(800, 600));
        let mut overlay = controller(FakeBackend::new(), &locator);
        overlay.create(&());
        overlay.pause();

        overlay.create(&());
        assert_eq!(overlay.state(), LifecycleState::Active);
        assert!(overlay.backend().record().surface_visible);
        assert_eq!(overlay.backend().record().companions_created, 1);
    }

    #[test]
    fn pause_before_bind_is_remembered() {
        let locator = FakeLocator::showing(host(800, 600));
        let mut overlay = controller(FakeBackend::new(), &locator);

        overlay.pause();
        assert_eq!(overlay.state(), LifecycleState::Uninitialized);
        overlay.create(&());

        assert_eq!(overlay.state(), LifecycleState::Paused);
        assert!(!overlay.backend().record().surface_visible);
        assert!(!overlay.tick(&()).rendered);
    }

    #[test]
    fn sync_resumes_after_host_disappears() {
        let locator = FakeLocator::showing(host(800, 600));
        let mut overlay = controller(FakeBackend::new(), &locator);
        overlay.create(&());

        locator.set(None);
        for _ in 0..5 {
            let report = overlay.tick(&());
            assert_eq!(report.next, NextFrame::Schedule);
            assert!(!report.synced);
        }

        locator.set(Some(host(1280, 720)));
        let report = overlay.tick(&());
        assert!(report.synced && report.rendered);
        let ctx = overlay.context().unwrap();
        assert_eq!(ctx.companion.size(), SizeSample::new(1280, 720));
        assert_eq!(overlay.backend().record().companions_created, 1);
    }

    #[test]
    fn create_object_adds_one_box_with_its_transform() {
        let locator = FakeLocator::showing(host(800, 600));
        let mut overlay = controller(FakeBackend::new(), &locator);
        overlay.create(&());

        overlay.run_block(
            &(),
            "createCube",
            &json!({
                "color": "#00FF00",
                "size": r#"{"width": 2, "height": 1, "depth": 1}"#,
                "position": r#"{"x": 0, "y": 0, "z": -3}"#,
                "rotation": r#"{"x": 0, "y": 0, "z": 0}"#,
            }),
        );

        let scene = overlay.scene().unwrap();
        assert_eq!(scene.len(), 1);
        let object = &scene.objects()[0];
        assert_eq!(object.color, Color::GREEN);
        assert_eq!(
            object.shape,
            Shape::Box {
                width: 2.0,
                height: 1.0,
                depth: 1.0
            }
        );
        assert_eq!(object.transform.position, Vec3::new(0.0, 0.0, -3.0));
        assert_eq!(object.transform.rotation, Vec3::ZERO);
        assert_eq!(overlay.animated_object(), Some(ObjectId(0)));
    }

    #[test]
    fn latest_box_spins_each_running_tick() {
        let locator = FakeLocator::showing(host(800, 600));
        let mut overlay = controller(FakeBackend::new(), &locator);
        overlay.create(&());
        let first = overlay.create_object(ObjectSpec::new()).unwrap();
        let second = overlay.create_object(ObjectSpec::new()).unwrap();

        overlay.tick(&());
        overlay.tick(&());

        let scene = overlay.scene().unwrap();
        assert_eq!(scene.get(first).unwrap().transform.rotation, Vec3::ZERO);
        let spun = scene.get(second).unwrap().transform.rotation;
        assert!((spun.x - 0.02).abs() < 1e-6 && (spun.y - 0.02).abs() < 1e-6);
    }

    #[test]
    fn spinning_can_be_disabled() {
        let locator = FakeLocator::showing(host(800, 600));
        let config = OverlayConfig::default().spin_latest_object(false);
        let mut overlay = OverlayController::new(FakeBackend::new(), locator.clone(), config);
        overlay.create(&());
        overlay.create_object(ObjectSpec::new()).unwrap();

        overlay.tick(&());
        assert_eq!(overlay.animated_object(), None);
    }

    #[test]
    fn commands_before_create_are_dropped() {
        let locator = FakeLocator::showing(host(800, 600));
        let mut overlay = controller(FakeBackend::new(), &locator);

        assert!(matches!(
            overlay.create_object(ObjectSpec::new()),
            Err(CommandError::NotReady)
        ));
        assert!(matches!(
            overlay.load_external_object("model.stl"),
            Err(CommandError::NotReady)
        ));
        overlay.run_block(&(), "createCube", &json!({}));

        overlay.create(&());
        assert!(overlay.scene().unwrap().is_empty());
    }

    #[test]
    fn bad_arguments_fail_only_that_command() {
        let locator = FakeLocator::showing(host(800, 600));
        let mut overlay = controller(FakeBackend::new(), &locator);
        overlay.create(&());

        overlay.run_block(&(), "createCube", &json!({ "size": "{not json" }));
        overlay.run_block(&(), "createCube", &json!({ "color": "#00F" }));
        overlay.run_block(&(), "spinFaster", &Value::Null);

        assert_eq!(overlay.scene().unwrap().len(), 1);
        assert_eq!(overlay.scene().unwrap().objects()[0].color, Color::from_hex("#0000FF").unwrap());
        assert!(overlay.tick(&()).rendered);
    }

    #[test]
    fn external_loads_attach_on_tick_and_failures_leave_scene_alone() {
        let locator = FakeLocator::showing(host(800, 600));
        let mut overlay = controller(FakeBackend::new(), &locator).with_loader(StubLoader);
        overlay.create(&());

        overlay.run_block(&(), "loadAndRenderObject", &json!({ "URL": "walthead.ok" }));
        overlay.run_block(&(), "loadAndRenderObject", &json!({ "URL": "broken.bin" }));
        assert_eq!(overlay.pending_loads(), 2);
        assert!(overlay.scene().unwrap().is_empty());

        overlay.tick(&());
        assert_eq!(overlay.pending_loads(), 0);
        let scene = overlay.scene().unwrap();
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.objects()[0].label, "walthead.ok");
        assert_eq!(scene.objects()[0].color, Color::WHITE);
        assert_eq!(overlay.backend().record().rendered_object_counts.last(), Some(&1));
    }

    #[test]
    fn shutdown_stops_the_loop() {
        let locator = FakeLocator::showing(host(800, 600));
        let mut overlay = controller(FakeBackend::new(), &locator);
        overlay.create(&());
        assert_eq!(overlay.tick(&()).next, NextFrame::Schedule);

        overlay.shutdown();
        assert_eq!(overlay.tick(&()).next, NextFrame::Stop);
        assert!(!overlay.backend().record().surface_visible);
    }

    #[test]
    fn nothing_revives_the_overlay_after_shutdown() {
        let locator = FakeLocator::showing(host(800, 600));
        let mut overlay = controller(FakeBackend::new(), &locator);
        overlay.create(&());
        overlay.pause();
        overlay.shutdown();

        overlay.resume();
        overlay.create(&());
        overlay.run_block(&(), "resumeRendering", &Value::Null);

        assert!(!overlay.backend().record().surface_visible);
        assert!(overlay.is_shut_down());
        let report = overlay.tick(&());
        assert_eq!(report.next, NextFrame::Stop);
        assert!(!report.rendered);
        assert_eq!(overlay.backend().record().renders, 0);
    }

    #[test]
    fn shutdown_before_bind_prevents_binding() {
        let locator = FakeLocator::showing(host(800, 600));
        let backend = FakeBackend::manual();
        let fake = backend.probe();
        let mut overlay = controller(backend, &locator);
        overlay.create(&());
        overlay.shutdown();

        fake.complete_library(Ok(()));
        assert_eq!(overlay.tick(&()).next, NextFrame::Stop);
        overlay.create(&());
        assert!(overlay.context().is_none());
        assert_eq!(fake.record().companions_created, 0);
    }

    #[test]
    fn renderer_failure_waits_for_the_next_create() {
        let locator = FakeLocator::showing(host(800, 600));
        let mut backend = FakeBackend::new();
        backend.fail_renderer(true);
        let mut overlay = controller(backend, &locator);

        overlay.create(&());
        for _ in 0..5 {
            assert_eq!(overlay.tick(&()).next, NextFrame::Schedule);
        }
        assert_eq!(overlay.state(), LifecycleState::LibraryLoading);
        assert_eq!(overlay.backend().record().companions_created, 1);

        overlay.create(&());
        assert_eq!(overlay.backend().record().companions_created, 2);

        overlay.backend_mut().fail_renderer(false);
        overlay.tick(&());
        assert_eq!(overlay.backend().record().companions_created, 2);
        overlay.create(&());
        assert_eq!(overlay.state(), LifecycleState::Active);
        assert_eq!(overlay.backend().record().companions_created, 3);
        assert_eq!(overlay.backend().record().library_loads, 1);
    }
}
