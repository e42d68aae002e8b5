//! Configuration options for the volume tool.

use std::path::Path;

use cloudscope_core::Result;
use serde::{Deserialize, Serialize};

use crate::session::DEFAULT_PLACEMENT_DEPTH_DIVISOR;

/// Tunables of the volume tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeToolOptions {
    /// Target on-screen size of labels, in pixels.
    pub label_screen_size: f32,

    /// World radius whose projection is used to size labels.
    pub label_reference_radius: f32,

    /// Divisor of the view-space depth when sizing volumes during placement.
    pub placement_depth_divisor: f32,

    /// Name given to volumes inserted without one.
    pub default_name: String,
}

impl Default for VolumeToolOptions {
    fn default() -> Self {
        Self {
            label_screen_size: 70.0,
            label_reference_radius: 1.0,
            placement_depth_divisor: DEFAULT_PLACEMENT_DEPTH_DIVISOR,
            default_name: "Volume".to_string(),
        }
    }
}

impl VolumeToolOptions {
    /// Sets the target on-screen label size.
    #[must_use]
    pub fn with_label_screen_size(mut self, pixels: f32) -> Self {
        self.label_screen_size = pixels;
        self
    }

    /// Sets the name given to unnamed volumes.
    #[must_use]
    pub fn with_default_name(mut self, name: impl Into<String>) -> Self {
        self.default_name = name.into();
        self
    }

    /// Parses options from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads options from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = VolumeToolOptions::default();
        assert!((options.label_screen_size - 70.0).abs() < f32::EPSILON);
        assert!((options.placement_depth_divisor - 5.0).abs() < f32::EPSILON);
        assert_eq!(options.default_name, "Volume");
    }

    #[test]
    fn test_from_json_overrides_some_fields() {
        let options = VolumeToolOptions::from_json(r#"{ "default_name": "Pile" }"#).unwrap();
        assert_eq!(options.default_name, "Pile");
        assert!((options.label_screen_size - 70.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_bad_json() {
        assert!(VolumeToolOptions::from_json("{").is_err());
    }
}
