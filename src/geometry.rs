//! CPU-side geometry: the vertex format, box primitives, and model parsing.
//!
//! Geometry stays on the CPU until a renderer uploads it, so the scene graph
//! can be built and inspected without a GPU.
//!
//! # Supported Formats
//!
//! | Format | Extensions | Notes |
//! |--------|------------|-------|
//! | STL    | `.stl`     | Binary and ASCII, no UV coordinates |
//! | JSON   | `.json`    | `{ "vertices": [[x,y,z],..], "indices": [..], "color": "#RRGGBB" }` |

use glam::Vec3;
use serde::Deserialize;
use std::io::{Read, Seek};
use std::path::Path;

use crate::color::Color;
use crate::error::GeometryError;

/// A vertex with position, normal, and texture coordinates.
///
/// Each vertex occupies 32 bytes: position at offset 0, normal at 12, uv at 24.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex3d {
    /// Vertex buffer layout: position (loc 0), normal (loc 1), uv (loc 2).
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex3d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2],
    };

    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Triangle geometry before GPU upload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawGeometry {
    pub vertices: Vec<Vertex3d>,
    pub indices: Vec<u32>,
}

impl RawGeometry {
    pub fn new(vertices: Vec<Vertex3d>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// An axis-aligned box centered at the origin.
    ///
    /// Each face carries its own four vertices so normals stay flat.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let (x, y, z) = (width * 0.5, height * 0.5, depth * 0.5);

        // (normal, four corners counter-clockwise seen from outside)
        #[rustfmt::skip]
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([ 0.0,  0.0,  1.0], [[-x, -y,  z], [ x, -y,  z], [ x,  y,  z], [-x,  y,  z]]),
            ([ 0.0,  0.0, -1.0], [[ x, -y, -z], [-x, -y, -z], [-x,  y, -z], [ x,  y, -z]]),
            ([ 0.0,  1.0,  0.0], [[-x,  y,  z], [ x,  y,  z], [ x,  y, -z], [-x,  y, -z]]),
            ([ 0.0, -1.0,  0.0], [[-x, -y, -z], [ x, -y, -z], [ x, -y,  z], [-x, -y,  z]]),
            ([ 1.0,  0.0,  0.0], [[ x, -y,  z], [ x, -y, -z], [ x,  y, -z], [ x,  y,  z]]),
            ([-1.0,  0.0,  0.0], [[-x, -y, -z], [-x, -y,  z], [-x,  y,  z], [-x,  y, -z]]),
        ];
        const UVS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, corners) in faces {
            let base = vertices.len() as u32;
            for (corner, uv) in corners.into_iter().zip(UVS) {
                vertices.push(Vertex3d::new(corner, normal, uv));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }

        Self::new(vertices, indices)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Returns `(min, max)` corners of the bounding box.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for v in &self.vertices {
            let p = Vec3::from(v.position);
            min = min.min(p);
            max = max.max(p);
        }

        (min, max)
    }

    pub fn center(&self) -> Vec3 {
        let (min, max) = self.bounds();
        (min + max) * 0.5
    }

    pub fn translate(&mut self, offset: Vec3) {
        for v in &mut self.vertices {
            v.position = (Vec3::from(v.position) + offset).into();
        }
    }

    /// Moves the bounding box center to the origin.
    pub fn recenter(&mut self) {
        if self.vertices.is_empty() {
            return;
        }
        let center = self.center();
        self.translate(-center);
    }

    /// Checks that there is at least one triangle, that every index points at
    /// a vertex and that triangles are complete.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.indices.is_empty() || self.vertices.is_empty() {
            return Err(GeometryError::Parse("model has no triangles".into()));
        }
        if self.indices.len() % 3 != 0 {
            return Err(GeometryError::Parse(format!(
                "index count {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        if let Some(bad) = self
            .indices
            .iter()
            .find(|&&i| i as usize >= self.vertices.len())
        {
            return Err(GeometryError::Parse(format!(
                "index {bad} out of range for {} vertices",
                self.vertices.len()
            )));
        }
        Ok(())
    }
}

/// Model file formats the loader understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeometryFormat {
    Stl,
    Json,
}

impl GeometryFormat {
    /// Detect the format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self, GeometryError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "stl" => Ok(GeometryFormat::Stl),
            "json" => Ok(GeometryFormat::Json),
            _ => Err(GeometryError::UnknownFormat(ext)),
        }
    }
}

/// A parsed model: geometry plus the color it asked for, if any.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedModel {
    pub geometry: RawGeometry,
    pub color: Option<Color>,
}

/// Read and parse a model file, detecting the format from its extension.
pub fn load_model(path: &Path) -> Result<ParsedModel, GeometryError> {
    let format = GeometryFormat::from_path(path)?;
    let bytes = std::fs::read(path).map_err(|source| GeometryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_model(format, &bytes)
}

/// Parse model bytes of a known format.
pub fn parse_model(format: GeometryFormat, bytes: &[u8]) -> Result<ParsedModel, GeometryError> {
    let model = match format {
        GeometryFormat::Stl => ParsedModel {
            geometry: parse_stl(&mut std::io::Cursor::new(bytes))?,
            color: None,
        },
        GeometryFormat::Json => parse_json(bytes)?,
    };
    model.geometry.validate()?;
    Ok(model)
}

fn parse_stl<R: Read + Seek>(reader: &mut R) -> Result<RawGeometry, GeometryError> {
    let stl = stl_io::read_stl(reader)
        .map_err(|e| GeometryError::Parse(format!("STL parse error: {e}")))?;

    let mut vertices = Vec::with_capacity(stl.faces.len() * 3);
    let mut indices = Vec::with_capacity(stl.faces.len() * 3);

    // stl_io hands back an indexed mesh; flatten it so each face keeps its normal.
    for face in &stl.faces {
        let normal: [f32; 3] = face.normal.into();
        let base = vertices.len() as u32;
        for &vertex_idx in &face.vertices {
            let position: [f32; 3] = stl.vertices[vertex_idx].into();
            vertices.push(Vertex3d::new(position, normal, [0.0, 0.0]));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2]);
    }

    Ok(RawGeometry::new(vertices, indices))
}

#[derive(Deserialize)]
struct JsonModel {
    vertices: Vec<[f32; 3]>,
    #[serde(default)]
    normals: Option<Vec<[f32; 3]>>,
    #[serde(default)]
    indices: Option<Vec<u32>>,
    #[serde(default)]
    color: Option<Color>,
}

fn parse_json(bytes: &[u8]) -> Result<ParsedModel, GeometryError> {
    let model: JsonModel = serde_json::from_slice(bytes)
        .map_err(|e| GeometryError::Parse(format!("JSON model: {e}")))?;

    if let Some(normals) = &model.normals {
        if normals.len() != model.vertices.len() {
            return Err(GeometryError::Parse(format!(
                "{} normals for {} vertices",
                normals.len(),
                model.vertices.len()
            )));
        }
    }

    let vertices = model
        .vertices
        .iter()
        .enumerate()
        .map(|(i, &position)| {
            let normal = model
                .normals
                .as_ref()
                .map(|n| n[i])
                .unwrap_or([0.0, 0.0, 1.0]);
            Vertex3d::new(position, normal, [0.0, 0.0])
        })
        .collect::<Vec<_>>();

    // Without indices, consecutive vertex triples form triangles.
    let indices = model
        .indices
        .unwrap_or_else(|| (0..vertices.len() as u32).collect());

    Ok(ParsedModel {
        geometry: RawGeometry::new(vertices, indices),
        color: model.color,
    })
}
