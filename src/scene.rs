//! The scene graph root and the objects attached to it.
//!
//! Objects are append-only: once attached they belong to the scene, and the
//! only handle anyone keeps is an [`ObjectId`]. Renderers rely on this to
//! upload new objects incrementally.

use glam::{EulerRot, Mat4, Quat, Vec3};
use std::sync::Arc;

use crate::color::Color;
use crate::geometry::RawGeometry;

/// Handle to an object in a [`SceneGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId(pub(crate) usize);

impl ObjectId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Position, Euler rotation (XYZ order, radians), and scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn quat(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    /// Scale, then rotate, then translate.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.quat(), self.position)
    }
}

/// What an object is made of.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// A box primitive centered on the object's origin.
    Box { width: f32, height: f32, depth: f32 },
    /// Geometry loaded from an external model.
    Mesh(Arc<RawGeometry>),
}

impl Shape {
    /// Build the triangle geometry for this shape.
    pub fn geometry(&self) -> Arc<RawGeometry> {
        match self {
            Shape::Box {
                width,
                height,
                depth,
            } => Arc::new(RawGeometry::cuboid(*width, *height, *depth)),
            Shape::Mesh(geometry) => Arc::clone(geometry),
        }
    }
}

/// An object attached to the scene: a shape with a flat color and a transform.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneObject {
    pub shape: Shape,
    pub color: Color,
    pub transform: Transform,
    /// Where the object came from, for diagnostics.
    pub label: String,
}

/// The root of the scene graph.
#[derive(Debug, Default)]
pub struct SceneGraph {
    objects: Vec<SceneObject>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, object: SceneObject) -> ObjectId {
        let id = ObjectId(self.objects.len());
        log::debug!("scene: added {} as object {}", object.label, id.0);
        self.objects.push(object);
        id
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.0)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }
}
