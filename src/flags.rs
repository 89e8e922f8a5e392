//! Derived 0/1 flag columns.
//!
//! A [`FlagRule`] flags a row when one of its ingredients is in the rule's
//! set, or when a measurement reaches the beverage or food threshold.
//! Missing data never raises; it just leaves the flag at 0.

use std::collections::BTreeSet;

use crate::data::model::{Cell, Column, Table};
use crate::error::Result;

/// Aisle substrings that mark a product as a beverage.
const BEVERAGE_MARKERS: [&str; 2] = ["beverage", "tea"];

/// Measurement threshold, compared after multiplying by `scale`.
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    pub column: String,
    pub beverage: f64,
    pub food: f64,
    pub scale: f64,
}

impl Threshold {
    pub fn new(column: impl Into<String>, beverage: f64, food: f64) -> Self {
        Self {
            column: column.into(),
            beverage,
            food,
            scale: 1.0,
        }
    }

    pub fn scaled(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }
}

/// Declarative flag definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagRule {
    pub output: String,
    pub ingredients_column: Option<String>,
    /// Lowercased at construction.
    pub ingredient_set: BTreeSet<String>,
    pub threshold: Option<Threshold>,
    /// Without an aisle column every row is treated as food.
    pub aisle_column: Option<String>,
}

impl FlagRule {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            ingredients_column: None,
            ingredient_set: BTreeSet::new(),
            threshold: None,
            aisle_column: None,
        }
    }

    pub fn with_ingredients<I, S>(mut self, column: impl Into<String>, set: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ingredients_column = Some(column.into());
        self.ingredient_set = set
            .into_iter()
            .map(|s| s.as_ref().trim().to_lowercase())
            .collect();
        self
    }

    pub fn with_threshold(mut self, threshold: Threshold) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_aisle(mut self, column: Option<&str>) -> Self {
        self.aisle_column = column.map(str::to_string);
        self
    }

    pub fn ultra_processed<I, S>(ingredients: &str, set: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new("ultra_processed_flag").with_ingredients(ingredients, set)
    }

    pub fn nns<I, S>(ingredients: &str, set: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new("nns_flag").with_ingredients(ingredients, set)
    }

    /// Sugar ≥ 5 per 100 ml (beverage) or ≥ 10 per 100 g (food).
    pub fn high_sugar<I, S>(ingredients: &str, sugar: &str, aisle: Option<&str>, set: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new("high_sugar_flag")
            .with_ingredients(ingredients, set)
            .with_threshold(Threshold::new(sugar, 5.0, 10.0))
            .with_aisle(aisle)
    }

    /// Saturated fat ≥ 3 per 100 ml (beverage) or ≥ 4 per 100 g (food).
    pub fn high_saturated_fat<I, S>(
        ingredients: &str,
        sat_fat: &str,
        aisle: Option<&str>,
        set: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new("high_saturated_fat_flag")
            .with_ingredients(ingredients, set)
            .with_threshold(Threshold::new(sat_fat, 3.0, 4.0))
            .with_aisle(aisle)
    }

    /// Calories ≥ 100 kcal per 100 ml (beverage) or ≥ 275 per 100 g (food).
    pub fn high_calories(calories: &str, aisle: Option<&str>) -> Self {
        Self::new("high_calories_flag")
            .with_threshold(Threshold::new(calories, 100.0, 275.0))
            .with_aisle(aisle)
    }

    /// Sodium is recorded in grams; thresholds are 100 mg / 400 mg.
    pub fn high_sodium<I, S>(ingredients: &str, sodium: &str, aisle: Option<&str>, set: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new("high_sodium_flag")
            .with_ingredients(ingredients, set)
            .with_threshold(Threshold::new(sodium, 100.0, 400.0).scaled(1000.0))
            .with_aisle(aisle)
    }

    /// Compute the flag for every row.
    ///
    /// Reads the ingredient, threshold and aisle columns; each one that is
    /// named must exist.
    pub fn evaluate(&self, table: &Table) -> Result<Vec<Cell>> {
        let ingredients = self
            .ingredients_column
            .as_deref()
            .map(|c| table.column(c))
            .transpose()?;
        let measure = self
            .threshold
            .as_ref()
            .map(|t| table.column(&t.column))
            .transpose()?;
        let aisle = self
            .aisle_column
            .as_deref()
            .map(|c| table.column(c))
            .transpose()?;

        let flags = (0..table.num_rows())
            .map(|row| {
                let by_ingredient = ingredients.is_some_and(|col| self.ingredient_match(col, row));
                let by_measure = match (&self.threshold, measure) {
                    (Some(t), Some(col)) => exceeds(t, col, aisle, row),
                    _ => false,
                };
                Cell::flag(by_ingredient || by_measure)
            })
            .collect();
        Ok(flags)
    }

    fn ingredient_match(&self, col: &Column, row: usize) -> bool {
        if self.ingredient_set.is_empty() {
            return false;
        }
        col.cells[row]
            .ingredients()
            .is_some_and(|items| items.iter().any(|i| self.ingredient_set.contains(i)))
    }
}

pub fn is_beverage(aisle: &Cell) -> bool {
    aisle.as_text().is_some_and(|s| {
        let lower = s.to_lowercase();
        BEVERAGE_MARKERS.iter().any(|m| lower.contains(m))
    })
}

fn exceeds(t: &Threshold, measure: &Column, aisle: Option<&Column>, row: usize) -> bool {
    let Some(value) = measure.cells[row].coerce_number() else {
        return false;
    };
    let beverage = aisle.is_some_and(|col| is_beverage(&col.cells[row]));
    let limit = if beverage { t.beverage } else { t.food };
    value * t.scale >= limit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn products() -> Table {
        Table::new(vec![
            Column::new(
                "ingredients",
                vec![
                    "Water, Sugar, Citric Acid".into(),
                    Cell::Missing,
                    "oats, salt".into(),
                    "water, sucralose".into(),
                ],
            ),
            Column::new(
                "sugar",
                vec![Cell::Number(6.0), Cell::Missing, Cell::Number(9.0), "12".into()],
            ),
            Column::new(
                "aisle",
                vec!["Beverages".into(), "Snacks".into(), "Cereal".into(), Cell::Missing],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_ingredient_match_is_case_insensitive() {
        let rule = FlagRule::ultra_processed("ingredients", ["CITRIC ACID"]);
        let flags = rule.evaluate(&products()).unwrap();
        assert_eq!(flags, vec![Cell::flag(true), Cell::flag(false), Cell::flag(false), Cell::flag(false)]);
    }

    #[test]
    fn test_high_sugar_thresholds_by_aisle() {
        let rule = FlagRule::high_sugar("ingredients", "sugar", Some("aisle"), Vec::<String>::new());
        let flags = rule.evaluate(&products()).unwrap();
        // 6 in a beverage ≥ 5; 9 in food < 10; "12" text coerces and ≥ 10.
        assert_eq!(flags, vec![Cell::flag(true), Cell::flag(false), Cell::flag(false), Cell::flag(true)]);
    }

    #[test]
    fn test_missing_sugar_never_flags() {
        let rule = FlagRule::high_sugar("ingredients", "sugar", Some("aisle"), ["honey"]);
        let flags = rule.evaluate(&products()).unwrap();
        assert_eq!(flags[1], Cell::flag(false));
    }

    #[test]
    fn test_without_aisle_everything_is_food() {
        let rule = FlagRule::high_sugar("ingredients", "sugar", None, Vec::<String>::new());
        let flags = rule.evaluate(&products()).unwrap();
        assert_eq!(flags[0], Cell::flag(false));
    }

    #[test]
    fn test_high_sodium_scales_grams_to_mg() {
        let table = Table::new(vec![
            Column::new("ingredients", vec![Cell::Missing, Cell::Missing]),
            Column::new("sodium", vec![Cell::Number(0.4), Cell::Number(0.39)]),
        ])
        .unwrap();
        let rule = FlagRule::high_sodium("ingredients", "sodium", None, ["msg"]);
        assert_eq!(rule.evaluate(&table).unwrap(), vec![Cell::flag(true), Cell::flag(false)]);
    }

    #[test]
    fn test_named_columns_must_exist() {
        let rule = FlagRule::high_calories("energykcal", Some("aisle"));
        assert!(matches!(
            rule.evaluate(&products()),
            Err(Error::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_is_beverage() {
        assert!(is_beverage(&Cell::from("Iced TEA")));
        assert!(!is_beverage(&Cell::from("Dairy")));
        assert!(!is_beverage(&Cell::Missing));
    }
}
