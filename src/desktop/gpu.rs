//! wgpu device acquisition and per-window surface configuration.
//!
//! The device is acquired once, off the event loop thread, and shared by
//! every surface created afterwards. A [`SurfaceTarget`] is one configured
//! window surface.

use std::sync::Arc;
use winit::window::Window;

use crate::error::{BindError, LibraryLoadError, RenderError};
use crate::library::PendingLibrary;
use crate::surface::SizeSample;

/// The loaded rendering library: a wgpu instance and a device to draw with.
pub struct GpuLibrary {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuLibrary {
    /// Acquire an adapter and device on a worker thread.
    pub fn load() -> PendingLibrary<GpuLibrary> {
        PendingLibrary::spawn("overlay3d-gpu-init", || pollster::block_on(Self::acquire()))
    }

    async fn acquire() -> Result<Self, LibraryLoadError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| LibraryLoadError::NoAdapter {
                reason: e.to_string(),
            })?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("overlay3d device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await
            .map_err(|e| LibraryLoadError::RequestDevice {
                reason: e.to_string(),
            })?;

        let info = adapter.get_info();
        log::info!("rendering library ready: {} ({:?})", info.name, info.backend);

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }
}

/// A window surface configured for the shared device.
pub struct SurfaceTarget {
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
}

impl SurfaceTarget {
    pub fn new(library: &GpuLibrary, window: Arc<Window>, size: SizeSample) -> Result<Self, BindError> {
        let surface = library
            .instance
            .create_surface(window)
            .map_err(|e| BindError::Surface {
                reason: e.to_string(),
            })?;

        if !library.adapter.is_surface_supported(&surface) {
            return Err(BindError::Surface {
                reason: "adapter cannot present to the companion window".into(),
            });
        }

        let caps = surface.get_capabilities(&library.adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or_else(|| BindError::Surface {
                reason: "surface reports no formats".into(),
            })?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: choose_alpha_mode(&caps),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&library.device, &config);
        log::debug!("companion surface: {format:?}, alpha {:?}", config.alpha_mode);

        Ok(Self { surface, config })
    }

    /// Reconfigure for a new size. Zero-sized requests are ignored; the
    /// surface keeps its last valid size.
    pub fn resize(&mut self, device: &wgpu::Device, size: SizeSample) {
        if size.is_empty() || (size.width, size.height) == (self.config.width, self.config.height) {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(device, &self.config);
    }

    pub fn width(&self) -> u32 {
        self.config.width
    }

    pub fn height(&self) -> u32 {
        self.config.height
    }

    /// Map a frame acquisition failure, reconfiguring lost surfaces.
    pub fn recover(&mut self, device: &wgpu::Device, err: wgpu::SurfaceError) -> RenderError {
        match err {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                self.surface.configure(device, &self.config);
                RenderError::Reconfigured
            }
            wgpu::SurfaceError::Timeout => RenderError::Timeout,
            wgpu::SurfaceError::OutOfMemory => RenderError::OutOfMemory,
            other => RenderError::Other(other.to_string()),
        }
    }
}

/// The overlay is composited over the host, so prefer a mode that honors
/// the alpha channel.
pub(crate) fn choose_alpha_mode(caps: &wgpu::SurfaceCapabilities) -> wgpu::CompositeAlphaMode {
    [
        wgpu::CompositeAlphaMode::PreMultiplied,
        wgpu::CompositeAlphaMode::PostMultiplied,
    ]
    .into_iter()
    .find(|mode| caps.alpha_modes.contains(mode))
    .or_else(|| caps.alpha_modes.first().copied())
    .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}
