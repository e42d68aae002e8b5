//! Length units used for internal coordinates and for display.

use serde::{Deserialize, Serialize};

/// A length unit described by its display code and how many of it make a meter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LengthUnit {
    /// Short symbol shown next to values (e.g. `m`, `ft`).
    pub code: String,
    /// Number of this unit in one meter.
    pub units_per_meter: f64,
}

impl LengthUnit {
    /// Creates a custom unit.
    pub fn new(code: impl Into<String>, units_per_meter: f64) -> Self {
        Self {
            code: code.into(),
            units_per_meter,
        }
    }

    /// Meters.
    pub fn meter() -> Self {
        Self::new("m", 1.0)
    }

    /// International feet.
    pub fn feet() -> Self {
        Self::new("ft", 3.28084)
    }

    /// Inches.
    pub fn inch() -> Self {
        Self::new("\u{2033}", 39.3701)
    }

    /// Ratio that converts a length in `self` to a length in `display`.
    #[must_use]
    pub fn ratio_to(&self, display: &LengthUnit) -> f64 {
        display.units_per_meter / self.units_per_meter
    }

    /// Converts a space (cubic length) measured in `self` into `display`.
    ///
    /// Space scales with the cube of the linear conversion.
    #[must_use]
    pub fn convert_space(&self, space: f64, display: &LengthUnit) -> f64 {
        space / self.units_per_meter.powi(3) * display.units_per_meter.powi(3)
    }
}

impl Default for LengthUnit {
    fn default() -> Self {
        Self::meter()
    }
}
