//! Configuration options for the viewer.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::picking::PickOptions;
use crate::units::LengthUnit;

/// Viewer-wide configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerOptions {
    /// Unit of the scene's coordinates.
    pub length_unit: LengthUnit,

    /// Unit measurements are displayed in.
    pub length_unit_display: LengthUnit,

    /// Options for point-cloud picking.
    pub pick: PickOptions,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            length_unit: LengthUnit::meter(),
            length_unit_display: LengthUnit::meter(),
            pick: PickOptions::default(),
        }
    }
}

impl ViewerOptions {
    /// Sets the unit of the scene's coordinates.
    #[must_use]
    pub fn with_length_unit(mut self, unit: LengthUnit) -> Self {
        self.length_unit = unit;
        self
    }

    /// Sets the unit measurements are displayed in.
    #[must_use]
    pub fn with_display_unit(mut self, unit: LengthUnit) -> Self {
        self.length_unit_display = unit;
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
    fn test_partial_json_keeps_defaults() {
        let options = ViewerOptions::from_json(
            r#"{ "length_unit_display": { "code": "ft", "units_per_meter": 3.28084 } }"#,
        )
        .unwrap();
        assert_eq!(options.length_unit, LengthUnit::meter());
        assert_eq!(options.length_unit_display, LengthUnit::feet());
        assert!(!options.pick.pick_clipped);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = ViewerOptions::load("/nonexistent/cloudscope-options.json");
        assert!(matches!(result, Err(crate::CloudscopeError::IoError(_))));
    }
}
