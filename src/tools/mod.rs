//! Costing Tools module
//!
//! Tool implementations behind the MCP server. Each function takes the
//! database pool, validates its input, and returns a serializable response
//! or an error message.

pub mod batches;
pub mod costing;
pub mod inventory;
pub mod menu;
pub mod status;

use crate::conversion::{same_dimension, Unit};

/// Trim a name and reject it if empty
pub(crate) fn validate_name(kind: &str, name: &str) -> Result<String, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("{} name cannot be empty", kind));
    }
    Ok(name.to_string())
}

pub(crate) fn validate_positive(field: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("{} must be greater than 0", field));
    }
    Ok(())
}

pub(crate) fn validate_non_negative(field: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{} cannot be negative", field));
    }
    Ok(())
}

/// A line's unit must be convertible to the unit it is priced or yielded in
pub(crate) fn validate_line_unit(line_unit: Unit, expected: Unit, component: &str) -> Result<(), String> {
    if !same_dimension(line_unit, expected) {
        return Err(format!(
            "Unit '{}' is {} but {} is measured in '{}' ({})",
            line_unit,
            line_unit.dimension(),
            component,
            expected,
            expected.dimension()
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_database() -> crate::db::Database {
    let db = crate::db::Database::in_memory().unwrap();
    db.with_conn(|conn| crate::db::migrations::run_migrations(conn)).unwrap();
    db
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("Item", "  Rice ").unwrap(), "Rice");
        assert!(validate_name("Item", "   ").is_err());
    }

    #[test]
    fn test_validate_numbers() {
        assert!(validate_positive("qty", 1.0).is_ok());
        assert!(validate_positive("qty", 0.0).is_err());
        assert!(validate_positive("qty", f64::NAN).is_err());
        assert!(validate_non_negative("price", 0.0).is_ok());
        assert!(validate_non_negative("price", -0.01).is_err());
    }

    #[test]
    fn test_validate_line_unit() {
        assert!(validate_line_unit(Unit::Oz, Unit::Kg, "Chicken").is_ok());
        let err = validate_line_unit(Unit::Ml, Unit::Lb, "Chicken").unwrap_err();
        assert!(err.contains("volume"));
        assert!(err.contains("Chicken"));
    }
}
