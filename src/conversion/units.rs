//! Unit types and conversion constants
//!
//! The six storage/recipe units and the two dimensions they belong to.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the conversion service
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("Unsupported unit: {0} (expected one of g, kg, oz, lb, ml, l)")]
    UnsupportedUnit(String),

    #[error("Unit types do not match: {from} is {from_dimension}, {to} is {to_dimension}")]
    DimensionMismatch {
        from: Unit,
        to: Unit,
        from_dimension: Dimension,
        to_dimension: Dimension,
    },
}

/// Physical dimension of a unit. Units of different dimensions never convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    /// Base unit: gram
    Mass,
    /// Base unit: milliliter
    Volume,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Mass => "mass",
            Dimension::Volume => "volume",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Base Unit Factors
// ============================================================================

/// Grams per kilogram
pub const G_PER_KG: f64 = 1000.0;
/// Grams per avoirdupois ounce
pub const G_PER_OZ: f64 = 28.349523125;
/// Grams per avoirdupois pound
pub const G_PER_LB: f64 = 453.59237;
/// Milliliters per liter
pub const ML_PER_L: f64 = 1000.0;

/// A supported unit of measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    G,
    Kg,
    Oz,
    Lb,
    Ml,
    L,
}

impl Unit {
    pub const ALL: [Unit; 6] = [Unit::G, Unit::Kg, Unit::Oz, Unit::Lb, Unit::Ml, Unit::L];

    pub fn dimension(&self) -> Dimension {
        match self {
            Unit::G | Unit::Kg | Unit::Oz | Unit::Lb => Dimension::Mass,
            Unit::Ml | Unit::L => Dimension::Volume,
        }
    }

    /// How many base units (g or ml) one of this unit holds
    pub fn base_factor(&self) -> f64 {
        match self {
            Unit::G => 1.0,
            Unit::Kg => G_PER_KG,
            Unit::Oz => G_PER_OZ,
            Unit::Lb => G_PER_LB,
            Unit::Ml => 1.0,
            Unit::L => ML_PER_L,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::G => "g",
            Unit::Kg => "kg",
            Unit::Oz => "oz",
            Unit::Lb => "lb",
            Unit::Ml => "ml",
            Unit::L => "l",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "g" => Ok(Unit::G),
            "kg" => Ok(Unit::Kg),
            "oz" => Ok(Unit::Oz),
            "lb" => Ok(Unit::Lb),
            "ml" => Ok(Unit::Ml),
            "l" => Ok(Unit::L),
            _ => Err(ConversionError::UnsupportedUnit(s.trim().to_string())),
        }
    }
}

impl ToSql for Unit {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Unit {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("G".parse::<Unit>(), Ok(Unit::G));
        assert_eq!(" Kg ".parse::<Unit>(), Ok(Unit::Kg));
        assert_eq!("L".parse::<Unit>(), Ok(Unit::L));
    }

    #[test]
    fn test_parse_rejects_unknown_units() {
        assert_eq!(
            "cup".parse::<Unit>(),
            Err(ConversionError::UnsupportedUnit("cup".to_string()))
        );
        assert!("".parse::<Unit>().is_err());
    }

    #[test]
    fn test_dimensions() {
        for unit in [Unit::G, Unit::Kg, Unit::Oz, Unit::Lb] {
            assert_eq!(unit.dimension(), Dimension::Mass);
        }
        for unit in [Unit::Ml, Unit::L] {
            assert_eq!(unit.dimension(), Dimension::Volume);
        }
    }

    #[test]
    fn test_display_matches_storage_form() {
        for unit in Unit::ALL {
            assert_eq!(unit.to_string().parse::<Unit>(), Ok(unit));
        }
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Unit::Lb).unwrap(), "\"lb\"");
        let unit: Unit = serde_json::from_str("\"ml\"").unwrap();
        assert_eq!(unit, Unit::Ml);
    }
}
