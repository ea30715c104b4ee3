//! Block-style commands.
//!
//! Callers of the overlay issue commands and get nothing back: no return
//! value, no error. Arguments arrive as loosely typed JSON (often a JSON
//! document inside a string), so parsing is strict about shape but generous
//! about defaults.

use glam::Vec3;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::color::Color;
use crate::error::CommandError;

/// Box dimensions. Missing keys default to 1.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BoxSize {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

impl Default for BoxSize {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
        }
    }
}

/// An `{x, y, z}` argument. Missing keys default to 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
struct Xyz {
    x: f32,
    y: f32,
    z: f32,
}

impl From<Xyz> for Vec3 {
    fn from(v: Xyz) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

/// Everything needed to add a box to the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObjectSpec {
    pub color: Color,
    pub size: BoxSize,
    pub position: Vec3,
    /// Euler angles in radians, XYZ order.
    pub rotation: Vec3,
}

impl Default for ObjectSpec {
    fn default() -> Self {
        Self {
            color: Color::RED,
            size: BoxSize::default(),
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
        }
    }
}

impl ObjectSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn size(mut self, width: f32, height: f32, depth: f32) -> Self {
        self.size = BoxSize {
            width,
            height,
            depth,
        };
        self
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    /// Read `color`, `size`, `position` and `rotation` from a block argument object.
    ///
    /// ```
    /// use overlay3d::ObjectSpec;
    /// use serde_json::json;
    ///
    /// let spec = ObjectSpec::from_args(&json!({
    ///     "color": "#00FF00",
    ///     "size": "{\"width\": 2, \"height\": 1, \"depth\": 1}",
    ///     "position": {"x": 0, "y": 0, "z": -3},
    /// })).unwrap();
    /// assert_eq!(spec.size.width, 2.0);
    /// assert_eq!(spec.position.z, -3.0);
    /// ```
    pub fn from_args(args: &Value) -> Result<Self, CommandError> {
        let color = match args.get("color") {
            None | Some(Value::Null) => Color::RED,
            Some(Value::String(s)) if s.trim().is_empty() => Color::RED,
            Some(Value::String(s)) => Color::from_hex(s).map_err(|e| CommandError::shape("color", e))?,
            Some(other) => {
                return Err(CommandError::shape(
                    "color",
                    format!("expected a hex string, got {other}"),
                ));
            }
        };

        let spec = Self {
            color,
            size: arg::<BoxSize>(args, "size")?,
            position: arg::<Xyz>(args, "position")?.into(),
            rotation: arg::<Xyz>(args, "rotation")?.into(),
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Sizes must be positive and everything must be finite.
    pub fn validate(&self) -> Result<(), CommandError> {
        let BoxSize {
            width,
            height,
            depth,
        } = self.size;
        for (name, value) in [("width", width), ("height", height), ("depth", depth)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(CommandError::shape(
                    "size",
                    format!("{name} must be a positive number, got {value}"),
                ));
            }
        }
        if !self.position.is_finite() {
            return Err(CommandError::shape("position", "components must be finite"));
        }
        if !self.rotation.is_finite() {
            return Err(CommandError::shape("rotation", "components must be finite"));
        }
        Ok(())
    }
}

/// Fetch and decode one object-shaped argument. Absent, null and blank
/// arguments take the type's default; strings are parsed as embedded JSON.
/// Anything other than a JSON object is rejected, arrays included.
fn arg<T>(args: &Value, key: &str) -> Result<T, CommandError>
where
    T: DeserializeOwned + Default,
{
    let value = match args.get(key) {
        None | Some(Value::Null) => return Ok(T::default()),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(T::default()),
        Some(Value::String(s)) => {
            serde_json::from_str::<Value>(s).map_err(|e| CommandError::shape(key, e))?
        }
        Some(value) => value.clone(),
    };
    if !value.is_object() {
        return Err(CommandError::shape(key, "expected an object"));
    }
    T::deserialize(value).map_err(|e| CommandError::shape(key, e))
}

/// A command issued to the overlay.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    CreateScene,
    CreateObject(ObjectSpec),
    LoadExternalObject { url: String },
    Pause,
    Resume,
}

impl Command {
    /// Build a command from a block opcode and its arguments.
    ///
    /// Both the block opcodes (`create3DScene`, `createCube`,
    /// `loadAndRenderObject`, `pauseRendering`, `resumeRendering`) and the
    /// short names (`createScene`, `createObject`, `loadExternalObject`,
    /// `pause`, `resume`) are accepted.
    pub fn parse(opcode: &str, args: &Value) -> Result<Self, CommandError> {
        match opcode {
            "create3DScene" | "createScene" => Ok(Command::CreateScene),
            "createCube" | "createObject" => Ok(Command::CreateObject(ObjectSpec::from_args(args)?)),
            "loadAndRenderObject" | "loadExternalObject" => {
                let url = args
                    .get("URL")
                    .or_else(|| args.get("url"))
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .ok_or_else(|| CommandError::shape("URL", "expected a non-empty string"))?;
                Ok(Command::LoadExternalObject {
                    url: url.to_string(),
                })
            }
            "pauseRendering" | "pause" => Ok(Command::Pause),
            "resumeRendering" | "resume" => Ok(Command::Resume),
            other => Err(CommandError::UnknownCommand(other.to_string())),
        }
    }
}
