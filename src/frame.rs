//! The per-frame synchronization step.
//!
//! One tick re-reads the host surface, drags the companion surface and the
//! viewpoint along with it, advances the animated object and renders. Nothing
//! that happens inside a tick can end the loop: a missing host or a failed
//! render is logged and the next frame is scheduled anyway. Only a
//! [`StopHandle`] ends it.

use glam::Vec2;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::backend::Renderer;
use crate::context::RenderContext;
use crate::scene::ObjectId;
use crate::surface::{CompanionSurface, HostSurfaceLocator, SizeSample};

/// Stops the frame loop for good. Cloneable and callable from any thread.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Whether the driver should schedule another tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextFrame {
    Schedule,
    Stop,
}

/// What happened during one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickReport {
    pub frame_index: u64,
    /// The host size sampled this tick, if the host was found.
    pub host: Option<SizeSample>,
    /// The companion surface and viewpoint were resized this tick.
    pub synced: bool,
    pub rendered: bool,
    pub next: NextFrame,
}

pub struct FrameSynchronizer {
    frame_index: u64,
    stop: StopHandle,
    spin: Vec2,
    host_missing: bool,
}

impl FrameSynchronizer {
    pub fn new(spin_per_tick: [f32; 2]) -> Self {
        Self {
            frame_index: 0,
            stop: StopHandle::default(),
            spin: Vec2::from(spin_per_tick),
            host_missing: false,
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Index the next tick will report.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Whether the last tick failed to find the host surface.
    pub fn host_missing(&self) -> bool {
        self.host_missing
    }

    /// Report for a tick with nothing bound yet. Does not advance the frame index.
    pub fn idle(&self) -> TickReport {
        TickReport {
            frame_index: self.frame_index,
            host: None,
            synced: false,
            rendered: false,
            next: if self.stop.is_stopped() {
                NextFrame::Stop
            } else {
                NextFrame::Schedule
            },
        }
    }

    /// Run one frame of synchronization.
    ///
    /// `context` is `None` until the overlay is bound; the host is still
    /// located so that its disappearance and return are reported consistently.
    pub fn tick<S, R>(
        &mut self,
        locator: &dyn HostSurfaceLocator,
        context: Option<&mut RenderContext<S, R>>,
        paused: bool,
        animated: Option<ObjectId>,
    ) -> TickReport
    where
        S: CompanionSurface,
        R: Renderer,
    {
        let mut report = TickReport {
            frame_index: self.frame_index,
            host: None,
            synced: false,
            rendered: false,
            next: NextFrame::Stop,
        };

        if self.stop.is_stopped() {
            return report;
        }

        self.frame_index = self.frame_index.wrapping_add(1);
        report.next = NextFrame::Schedule;

        let Some(host) = locator.locate() else {
            if !self.host_missing {
                log::error!("host surface not found; skipping frame sync until it reappears");
                self.host_missing = true;
            }
            return report;
        };
        if self.host_missing {
            log::info!(
                "host surface found again ({}x{}); resuming sync",
                host.size.width,
                host.size.height
            );
            self.host_missing = false;
        }
        report.host = Some(host.size);

        let Some(ctx) = context else {
            return report;
        };

        ctx.sync_to(&host);
        report.synced = true;

        if paused {
            return report;
        }

        if let Some(object) = animated.and_then(|id| ctx.scene.get_mut(id)) {
            object.transform.rotation.x += self.spin.x;
            object.transform.rotation.y += self.spin.y;
        }

        match ctx.renderer.render(&ctx.scene, &ctx.camera) {
            Ok(()) => report.rendered = true,
            Err(e) => log::warn!("frame {}: {e}", report.frame_index),
        }

        if self.stop.is_stopped() {
            report.next = NextFrame::Stop;
        }
        report
    }
}
