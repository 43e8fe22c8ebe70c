//! Unit conversion functions
//!
//! Every conversion normalizes through the dimension's base unit (grams or
//! milliliters). Crossing dimensions is an error; no density is ever assumed.

use super::units::{ConversionError, Unit};

/// True iff both units belong to the same dimension
pub fn same_dimension(u1: Unit, u2: Unit) -> bool {
    u1.dimension() == u2.dimension()
}

/// Convert a quantity between two units of the same dimension
pub fn convert(value: f64, from: Unit, to: Unit) -> Result<f64, ConversionError> {
    if from == to {
        return Ok(value);
    }
    if !same_dimension(from, to) {
        return Err(ConversionError::DimensionMismatch {
            from,
            to,
            from_dimension: from.dimension(),
            to_dimension: to.dimension(),
        });
    }

    Ok(value * from.base_factor() / to.base_factor())
}

/// Rebase a cost per `item_unit` to a cost per `target_unit`
///
/// `$2.50/lb` rebased to `oz` is `$2.50 × (1 oz in lb)`.
pub fn unit_cost_in(unit_cost: f64, item_unit: Unit, target_unit: Unit) -> Result<f64, ConversionError> {
    if item_unit == target_unit {
        return Ok(unit_cost);
    }
    let one_target_in_item = convert(1.0, target_unit, item_unit)?;
    Ok(unit_cost * one_target_in_item)
}

/// Like [`same_dimension`], for unit names. Unknown names are never compatible.
pub fn same_dimension_str(u1: &str, u2: &str) -> bool {
    match (u1.parse::<Unit>(), u2.parse::<Unit>()) {
        (Ok(a), Ok(b)) => same_dimension(a, b),
        _ => false,
    }
}

/// Like [`convert`], for unit names
pub fn convert_str(value: f64, from: &str, to: &str) -> Result<f64, ConversionError> {
    convert(value, from.parse()?, to.parse()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_same_dimension() {
        assert!(same_dimension(Unit::G, Unit::Lb));
        assert!(same_dimension(Unit::Ml, Unit::L));
        assert!(!same_dimension(Unit::G, Unit::Ml));
        assert!(!same_dimension(Unit::L, Unit::Oz));
    }

    #[test]
    fn test_same_dimension_str() {
        assert!(same_dimension_str("g", "lb"));
        assert!(!same_dimension_str("g", "ml"));
        assert!(!same_dimension_str("g", "cup"));
    }

    #[test]
    fn test_convert_known_factors() {
        assert!(approx(convert(1.0, Unit::Kg, Unit::G).unwrap(), 1000.0));
        assert!(approx(convert(1.0, Unit::Lb, Unit::G).unwrap(), 453.59237));
        assert!(approx(convert(16.0, Unit::Oz, Unit::Lb).unwrap(), 1.0));
        assert!(approx(convert(2.5, Unit::L, Unit::Ml).unwrap(), 2500.0));
    }

    #[test]
    fn test_convert_identity() {
        assert_eq!(convert(3.25, Unit::Oz, Unit::Oz).unwrap(), 3.25);
    }

    #[test]
    fn test_convert_round_trip() {
        let values = [0.0, 0.001, 1.0, 18144.0, 123456.789];
        for a in Unit::ALL {
            for b in Unit::ALL.into_iter().filter(|b| same_dimension(a, *b)) {
                for x in values {
                    let there = convert(x, a, b).unwrap();
                    let back = convert(there, b, a).unwrap();
                    assert!(approx(back, x), "{} {} -> {} -> {}", x, a, b, back);
                }
            }
        }
    }

    #[test]
    fn test_convert_across_dimensions_fails() {
        let err = convert(1.0, Unit::G, Unit::Ml).unwrap_err();
        assert!(matches!(err, ConversionError::DimensionMismatch { .. }));
        assert!(err.to_string().contains("do not match"));
    }

    #[test]
    fn test_convert_str() {
        assert!(approx(convert_str(1.0, "KG", "g").unwrap(), 1000.0));
        assert!(matches!(
            convert_str(1.0, "cup", "ml"),
            Err(ConversionError::UnsupportedUnit(_))
        ));
    }

    #[test]
    fn test_unit_cost_in() {
        // $2.50/lb is $2.50/16 per oz
        let per_oz = unit_cost_in(2.50, Unit::Lb, Unit::Oz).unwrap();
        assert!(approx(per_oz, 2.50 / 16.0));

        // $0.004/ml is $4/l
        let per_l = unit_cost_in(0.004, Unit::Ml, Unit::L).unwrap();
        assert!(approx(per_l, 4.0));

        assert_eq!(unit_cost_in(0.003, Unit::G, Unit::G).unwrap(), 0.003);
    }

    #[test]
    fn test_unit_cost_in_across_dimensions_fails() {
        assert!(unit_cost_in(1.0, Unit::G, Unit::L).is_err());
    }
}
