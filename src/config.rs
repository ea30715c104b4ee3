use serde::Deserialize;

use crate::color::Color;
use crate::surface::Layering;

/// Configuration for the overlay.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use overlay3d::OverlayConfig;
///
/// let config = OverlayConfig::from_json_str(r#"{ "fov_degrees": 60 }"#).unwrap();
/// assert_eq!(config.fov_degrees, 60.0);
/// assert_eq!(config.camera_distance, 5.0);
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Vertical field of view of the viewpoint, in degrees.
    pub fov_degrees: f32,
    /// Near clip plane.
    pub near: f32,
    /// Far clip plane.
    pub far: f32,
    /// Distance of the viewpoint from the origin along +Z.
    pub camera_distance: f32,
    /// Rotation added to the animated object each tick, in radians (x, y).
    pub spin_per_tick: [f32; 2],
    /// Whether the most recently created box becomes the animated object.
    pub spin_latest_object: bool,
    /// Clear color of the companion surface. Transparent so the host shows through.
    pub clear_color: Color,
    /// Stacking of the companion surface relative to the host.
    pub layering: Layering,
    /// Title given to the companion surface where the platform shows one.
    pub title: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            camera_distance: 5.0,
            spin_per_tick: [0.01, 0.01],
            spin_latest_object: true,
            clear_color: Color::TRANSPARENT,
            layering: Layering::default(),
            title: "overlay3d".to_string(),
        }
    }
}

impl OverlayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn fov(mut self, fov_degrees: f32) -> Self {
        self.fov_degrees = fov_degrees;
        self
    }

    pub fn clip_planes(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    pub fn camera_distance(mut self, distance: f32) -> Self {
        self.camera_distance = distance;
        self
    }

    pub fn spin(mut self, x: f32, y: f32) -> Self {
        self.spin_per_tick = [x, y];
        self
    }

    pub fn spin_latest_object(mut self, enabled: bool) -> Self {
        self.spin_latest_object = enabled;
        self
    }

    pub fn layering(mut self, layering: Layering) -> Self {
        self.layering = layering;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_overlay_viewpoint() {
        let config = OverlayConfig::default();
        assert_eq!(config.fov_degrees, 75.0);
        assert_eq!(config.near, 0.1);
        assert_eq!(config.far, 1000.0);
        assert_eq!(config.camera_distance, 5.0);
        assert_eq!(config.clear_color, Color::TRANSPARENT);
        assert_eq!(config.layering, Layering::AlwaysOnTop);
    }

    #[test]
    fn json_overrides_selected_fields() {
        let config = OverlayConfig::from_json_str(
            r##"{ "clear_color": "#000000", "layering": "stacked_above_host", "spin_per_tick": [0.0, 0.05] }"##,
        )
        .unwrap();
        assert_eq!(config.clear_color, Color::BLACK);
        assert_eq!(config.layering, Layering::StackedAboveHost);
        assert_eq!(config.spin_per_tick, [0.0, 0.05]);
        assert_eq!(config.fov_degrees, 75.0);
    }

    #[test]
    fn rejects_bad_color() {
        assert!(OverlayConfig::from_json_str(r#"{ "clear_color": "clear" }"#).is_err());
    }
}
