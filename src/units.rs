use std::collections::HashMap;

use lazy_static::lazy_static;

/// Cup-equivalent per one unit. Zero marks units that have no volume
/// conversion (weights, millilitres, countable items).
pub const CUP_EQUIVALENTS: &[(&str, f64)] = &[
    ("cup", 1.0),
    ("cups", 1.0),
    ("serving", 1.0),
    ("bowl", 1.5),
    ("plate", 2.0),
    ("tbsp", 0.0625),
    ("tablespoon", 0.0625),
    ("teaspoon", 0.0208),
    ("tsp", 0.0208),
    ("g", 0.0),
    ("ml", 0.0),
    ("n", 0.0),
];

lazy_static! {
    static ref DEFAULT_TABLE: UnitTable = UnitTable::default();
}

#[derive(Debug, Clone)]
pub struct UnitTable {
    cups: HashMap<String, f64>,
}

impl Default for UnitTable {
    fn default() -> Self {
        Self::from_pairs(CUP_EQUIVALENTS.iter().copied())
    }
}

impl UnitTable {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        let cups = pairs
            .into_iter()
            .map(|(unit, cups)| (unit.to_lowercase(), cups))
            .collect();
        Self { cups }
    }

    /// Cup-equivalent of `unit`, or `None` when the unit is unknown.
    pub fn cup_equivalent(&self, unit: &str) -> Option<f64> {
        self.cups.get(unit.trim().to_lowercase().as_str()).copied()
    }

    /// Multiplier that turns nutrition for `base_qty base_unit` into
    /// nutrition for `user_qty user_unit`.
    pub fn scale_factor(&self, user_qty: f64, user_unit: &str, base_qty: f64, base_unit: &str) -> f64 {
        let user_cups = self.cup_equivalent(user_unit).unwrap_or(0.0);
        let base_cups = self.cup_equivalent(base_unit).unwrap_or(0.0);
        if user_cups > 0.0 && base_cups > 0.0 {
            let base_equiv = base_qty * base_cups;
            if base_equiv != 0.0 {
                return (user_qty * user_cups) / base_equiv;
            }
        }
        if base_qty == 0.0 {
            user_qty
        } else {
            user_qty / base_qty
        }
    }
}

/// [`UnitTable::scale_factor`] against the built-in table.
pub fn scale_factor(user_qty: f64, user_unit: &str, base_qty: f64, base_unit: &str) -> f64 {
    DEFAULT_TABLE.scale_factor(user_qty, user_unit, base_qty, base_unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn countable_units_use_raw_ratio() {
        assert!(close(scale_factor(2.0, "n", 1.0, "n"), 2.0));
        assert!(close(scale_factor(3.0, "n", 1.0, "n"), 3.0));
    }

    #[test]
    fn volume_units_convert_through_cups() {
        assert!(close(scale_factor(1.0, "bowl", 1.0, "cup"), 1.5));
        assert!(close(scale_factor(1.0, "plate", 1.0, "cup"), 2.0));
        assert!(close(scale_factor(2.0, "cup", 1.0, "bowl"), 2.0 / 1.5));
        assert!(close(scale_factor(16.0, "tbsp", 1.0, "cup"), 1.0));
    }

    #[test]
    fn unit_lookup_ignores_case_and_padding() {
        assert!(close(scale_factor(1.0, " Bowl ", 1.0, "CUP"), 1.5));
    }

    #[test]
    fn mixed_or_unknown_units_fall_back_to_raw_ratio() {
        assert!(close(scale_factor(200.0, "g", 100.0, "g"), 2.0));
        assert!(close(scale_factor(2.0, "cup", 4.0, "g"), 0.5));
        assert!(close(scale_factor(3.0, "slice", 2.0, "cup"), 1.5));
    }

    #[test]
    fn zero_base_quantity_returns_user_quantity() {
        assert!(close(scale_factor(4.0, "n", 0.0, "n"), 4.0));
        assert!(close(scale_factor(2.0, "cup", 0.0, "cup"), 2.0));
    }

    #[test]
    fn custom_table_is_honoured() {
        let table = UnitTable::from_pairs([("ladle", 0.5), ("cup", 1.0)]);
        assert!(close(table.scale_factor(2.0, "ladle", 1.0, "cup"), 1.0));
        assert_eq!(table.cup_equivalent("bowl"), None);
    }
}
