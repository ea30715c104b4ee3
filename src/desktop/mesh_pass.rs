//! Flat-color mesh rendering into the companion surface.
//!
//! Two bind groups:
//! - **Group 0**: camera uniforms (view-projection)
//! - **Group 1**: model uniforms (model matrix, color), one buffer per object
//!
//! Scene objects are uploaded the first time they are seen. The scene graph
//! is append-only, so GPU meshes are kept in the same order as the objects
//! and matched by index.

use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::backend::Renderer;
use crate::camera::PerspectiveCamera;
use crate::config::OverlayConfig;
use crate::desktop::gpu::{GpuLibrary, SurfaceTarget};
use crate::error::{BindError, RenderError};
use crate::geometry::Vertex3d;
use crate::scene::{SceneGraph, SceneObject};
use crate::surface::SizeSample;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct CameraUniforms {
    view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ModelUniforms {
    model: [[f32; 4]; 4],
    color: [f32; 4],
}

impl ModelUniforms {
    fn of(object: &SceneObject) -> Self {
        let [r, g, b, a] = object.color.to_array();
        Self {
            model: object.transform.matrix().to_cols_array_2d(),
            // Premultiplied, to match the surface's composite mode.
            color: [r * a, g * a, b * a, a],
        }
    }
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    model_buffer: wgpu::Buffer,
    model_bind_group: wgpu::BindGroup,
}

struct DepthTarget {
    view: wgpu::TextureView,
    size: (u32, u32),
}

impl DepthTarget {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("overlay depth"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        Self {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            size: (width, height),
        }
    }
}

/// Renders a [`SceneGraph`] into a companion window.
pub struct MeshRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target: SurfaceTarget,
    pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    model_layout: wgpu::BindGroupLayout,
    depth: DepthTarget,
    meshes: Vec<GpuMesh>,
    clear: wgpu::Color,
}

impl MeshRenderer {
    pub fn new(
        library: &GpuLibrary,
        window: Arc<Window>,
        size: SizeSample,
        config: &OverlayConfig,
    ) -> Result<Self, BindError> {
        let device = &library.device;
        let target = SurfaceTarget::new(library, window, size)?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("overlay mesh shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/overlay_mesh.wgsl").into()),
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("overlay camera uniforms"),
            size: std::mem::size_of::<CameraUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let camera_layout = uniform_layout(device, "overlay camera layout", wgpu::ShaderStages::VERTEX);
        let model_layout = uniform_layout(
            device,
            "overlay model layout",
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        );

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("overlay camera bind group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("overlay mesh pipeline layout"),
            bind_group_layouts: &[&camera_layout, &model_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("overlay mesh pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[Vertex3d::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target.config.format,
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                // Loaded models do not guarantee consistent winding.
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let depth = DepthTarget::new(device, target.width(), target.height());

        Ok(Self {
            device: library.device.clone(),
            queue: library.queue.clone(),
            target,
            pipeline,
            camera_buffer,
            camera_bind_group,
            model_layout,
            depth,
            meshes: Vec::new(),
            clear: config.clear_color.to_wgpu(),
        })
    }

    /// Upload any objects added to the scene since the last frame.
    fn upload_new(&mut self, scene: &SceneGraph) {
        for object in &scene.objects()[self.meshes.len()..] {
            let geometry = object.shape.geometry();

            let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("overlay vertex buffer"),
                contents: bytemuck::cast_slice(&geometry.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("overlay index buffer"),
                contents: bytemuck::cast_slice(&geometry.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            let model_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("overlay model uniforms"),
                contents: bytemuck::bytes_of(&ModelUniforms::of(object)),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let model_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("overlay model bind group"),
                layout: &self.model_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: model_buffer.as_entire_binding(),
                }],
            });

            log::debug!(
                "uploaded {} ({} triangles)",
                object.label,
                geometry.triangle_count()
            );
            self.meshes.push(GpuMesh {
                vertex_buffer,
                index_buffer,
                index_count: geometry.indices.len() as u32,
                model_buffer,
                model_bind_group,
            });
        }
    }
}

fn uniform_layout(
    device: &wgpu::Device,
    label: &str,
    visibility: wgpu::ShaderStages,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

impl Renderer for MeshRenderer {
    fn set_size(&mut self, size: SizeSample) {
        self.target.resize(&self.device, size);
        let current = (self.target.width(), self.target.height());
        if self.depth.size != current {
            self.depth = DepthTarget::new(&self.device, current.0, current.1);
        }
    }

    fn render(
        &mut self,
        scene: &SceneGraph,
        camera: &PerspectiveCamera,
    ) -> Result<(), RenderError> {
        self.upload_new(scene);

        let frame = match self.target.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(e) => return Err(self.target.recover(&self.device, e)),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let camera_uniforms = CameraUniforms {
            view_proj: camera.view_projection().to_cols_array_2d(),
        };
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&camera_uniforms));
        for (mesh, object) in self.meshes.iter().zip(scene.objects()) {
            self.queue
                .write_buffer(&mesh.model_buffer, 0, bytemuck::bytes_of(&ModelUniforms::of(object)));
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("overlay frame encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("overlay mesh pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.camera_bind_group, &[]);
            // Empty buffers cannot be sliced; such meshes keep their slot but never draw.
            for mesh in self.meshes.iter().filter(|mesh| mesh.index_count > 0) {
                pass.set_bind_group(1, &mesh.model_bind_group, &[]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::scene::{Shape, Transform};
    use glam::Vec3;

    #[test]
    fn model_uniforms_carry_transform_and_premultiplied_color() {
        let object = SceneObject {
            shape: Shape::Box {
                width: 1.0,
                height: 1.0,
                depth: 1.0,
            },
            color: Color::rgba(1.0, 0.5, 0.0, 0.5),
            transform: Transform::new().position(Vec3::new(0.0, 0.0, -3.0)),
            label: "box".into(),
        };

        let uniforms = ModelUniforms::of(&object);
        assert_eq!(uniforms.color, [0.5, 0.25, 0.0, 0.5]);
        assert_eq!(uniforms.model[3], [0.0, 0.0, -3.0, 1.0]);
        assert_eq!(std::mem::size_of::<ModelUniforms>(), 80);
    }
}
