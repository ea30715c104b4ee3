//! A runnable host window with the overlay attached.
//!
//! The host is an ordinary winit window standing in for a canvas the overlay
//! does not own. The overlay ticks on every host redraw and asks for the next
//! one until its stop handle fires.

use glam::Vec3;
use std::collections::VecDeque;
use std::sync::Arc;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::Key;
use winit::window::{Window, WindowId};

use crate::color::Color;
use crate::command::{Command, ObjectSpec};
use crate::config::OverlayConfig;
use crate::desktop::window::{DesktopBackend, WindowLocator};
use crate::frame::NextFrame;
use crate::lifecycle::{LifecycleState, OverlayController};

/// Configuration for the host window.
pub struct HostConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            title: "overlay3d host".to_string(),
            width: 800,
            height: 600,
        }
    }
}

impl HostConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// Open a host window and drive an overlay over it.
///
/// `startup` commands run in order once the host exists. Scene commands wait
/// until the overlay is active. Keys on the host window:
///
/// | Key | Command |
/// |-----|---------|
/// | `C` | create the scene (or resume) |
/// | `P` | pause |
/// | `R` | resume |
/// | `B` | add a box |
pub fn run_overlay(
    host: HostConfig,
    config: OverlayConfig,
    startup: Vec<Command>,
) -> Result<(), winit::error::EventLoopError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = OverlayApp {
        host,
        config: Some(config),
        queued: startup.into(),
        running: None,
    };
    event_loop.run_app(&mut app)
}

struct Running {
    host_window: Arc<Window>,
    overlay: OverlayController<DesktopBackend>,
    boxes_added: usize,
}

struct OverlayApp {
    host: HostConfig,
    config: Option<OverlayConfig>,
    queued: VecDeque<Command>,
    running: Option<Running>,
}

const BOX_COLORS: [Color; 4] = [
    Color::RED,
    Color::GREEN,
    Color::rgb(0.2, 0.4, 1.0),
    Color::rgb(1.0, 0.8, 0.1),
];

fn command_for_key(key: &str, boxes_added: usize) -> Option<Command> {
    match key {
        "c" => Some(Command::CreateScene),
        "p" => Some(Command::Pause),
        "r" => Some(Command::Resume),
        "b" => {
            let slot = (boxes_added % 5) as f32 - 2.0;
            Some(Command::CreateObject(
                ObjectSpec::new()
                    .color(BOX_COLORS[boxes_added % BOX_COLORS.len()])
                    .position(Vec3::new(slot * 1.5, 0.0, 0.0)),
            ))
        }
        _ => None,
    }
}

impl Running {
    /// Run queued commands that can run now. Scene commands stay queued
    /// until the overlay is bound.
    fn drain(&mut self, event_loop: &ActiveEventLoop, queued: &mut VecDeque<Command>) {
        while let Some(command) = queued.front() {
            let ready = matches!(
                self.overlay.state(),
                LifecycleState::Active | LifecycleState::Paused
            );
            let runnable = ready
                || matches!(
                    command,
                    Command::CreateScene | Command::Pause | Command::Resume
                );
            if !runnable {
                break;
            }
            if let Some(command) = queued.pop_front() {
                self.overlay.dispatch(event_loop, command);
            }
        }
    }
}

impl ApplicationHandler for OverlayApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }
        let Some(config) = self.config.take() else {
            return;
        };

        let attrs = Window::default_attributes()
            .with_title(self.host.title.as_str())
            .with_inner_size(winit::dpi::LogicalSize::new(self.host.width, self.host.height));
        let host_window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("failed to create host window: {e}");
                event_loop.exit();
                return;
            }
        };

        let overlay =
            OverlayController::new(DesktopBackend::new(), WindowLocator::new(&host_window), config);
        host_window.request_redraw();
        self.running = Some(Running {
            host_window,
            overlay,
            boxes_added: 0,
        });
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let Some(running) = &mut self.running else {
            return;
        };
        if id != running.host_window.id() {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                running.overlay.shutdown();
                event_loop.exit();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Character(key),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                let key = key.to_lowercase();
                if let Some(command) = command_for_key(&key, running.boxes_added) {
                    if matches!(command, Command::CreateObject(_)) {
                        running.boxes_added += 1;
                    }
                    running.overlay.dispatch(event_loop, command);
                }
            }
            WindowEvent::RedrawRequested => {
                running.drain(event_loop, &mut self.queued);
                let report = running.overlay.tick(event_loop);
                match report.next {
                    NextFrame::Schedule => running.host_window.request_redraw(),
                    NextFrame::Stop => event_loop.exit(),
                }
            }
            _ => {}
        }
    }
}
