//! JSON pipeline files for the `nutriclean run` command.
//!
//! ```json
//! {
//!   "input": "products.xlsx",
//!   "output": "cleaned.xlsx",
//!   "ingredient_sets": { "sodium": ["msg", "salt"] },
//!   "steps": [
//!     { "op": "convert_units", "column": "servingsize" },
//!     { "op": "standardize_column", "column": "sodium" },
//!     { "op": "flag_high_sodium", "ingredients": "ingredients",
//!       "measure": "sodium per 100", "set": "sodium" }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Deserialize;

use crate::data::loader::DEFAULT_SHEET;
use crate::error::{Error, Result};
use crate::normalizer::{MissingStrategy, Normalizer, DEFAULT_NUTRIENTS};

fn default_sheet() -> String {
    DEFAULT_SHEET.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub input: Option<PathBuf>,
    #[serde(default = "default_sheet")]
    pub sheet: String,
    pub output: Option<PathBuf>,
    /// Named ingredient sets referenced by flag steps.
    #[serde(default)]
    pub ingredient_sets: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Ingredient set of a flag step: the name of an entry in
/// `ingredient_sets`, or the ingredients written out inline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IngredientSet {
    Named(String),
    Inline(Vec<String>),
}

impl Default for IngredientSet {
    fn default() -> Self {
        IngredientSet::Inline(Vec::new())
    }
}

/// One normalizer operation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    // Text
    StripSpaces { column: String },
    RemoveText { column: String, text: String },
    CleanBracketedValues { column: String },
    ExtractBracketedValue { column: String },
    StripPercent { column: String },

    // Units
    ConvertFlOzToMl { column: String },
    ConvertOzToG { column: String },
    ConvertCupsToMl { column: String },
    ConvertTbspToG { column: String },
    ConvertTspToG { column: String },
    ConvertLToMl { column: String },
    ConvertMgToG { column: String },
    NormalizeGramVariants { column: String },
    ConvertUnits { column: String },
    ConvertPackageBasedSize { column: String },
    CoerceNumeric { column: String },
    Round { column: String, decimals: u32 },

    // Missing values and rows
    HandleMissing { column: String, strategy: MissingStrategy },
    DropBlankRows,
    ExtractBlankRows { column: String },
    SubSampleRows { column: String, n: usize },

    // Structure
    #[serde(rename = "drop")]
    DropColumns { columns: Vec<String> },
    MarkListColumn { column: String },
    SortColumnsAlphabetically,

    // Per-100
    StandardizeColumn { column: String },
    StandardizeNutrientColumns {
        #[serde(default)]
        nutrients: Option<Vec<String>>,
    },
    PricePerServing,

    // Flags
    FlagUltraProcessed {
        ingredients: String,
        #[serde(default)]
        set: IngredientSet,
    },
    FlagHighSugar {
        ingredients: String,
        measure: String,
        #[serde(default)]
        aisle: Option<String>,
        #[serde(default)]
        set: IngredientSet,
    },
    FlagHighSaturatedFat {
        ingredients: String,
        measure: String,
        #[serde(default)]
        aisle: Option<String>,
        #[serde(default)]
        set: IngredientSet,
    },
    FlagHighCalories {
        measure: String,
        #[serde(default)]
        aisle: Option<String>,
    },
    FlagHighSodium {
        ingredients: String,
        measure: String,
        #[serde(default)]
        aisle: Option<String>,
        #[serde(default)]
        set: IngredientSet,
    },
    FlagNns {
        ingredients: String,
        #[serde(default)]
        set: IngredientSet,
    },

    // Product titles
    ParseProductName { column: String },
    ExtractAndConvertWeight { column: String },
    FillServingSize { product: String, serving: String },
    FindServingInfo { column: String },
}

impl PipelineConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| Error::config(format!("cannot read {}: {err}", path.display())))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|err| Error::config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Every named ingredient set must be defined.
    pub fn validate(&self) -> Result<()> {
        for step in &self.steps {
            if let Some(set) = step.ingredient_set() {
                self.resolve(set)?;
            }
        }
        Ok(())
    }

    fn resolve(&self, set: &IngredientSet) -> Result<Vec<String>> {
        match set {
            IngredientSet::Inline(items) => Ok(items.clone()),
            IngredientSet::Named(name) => self
                .ingredient_sets
                .get(name)
                .cloned()
                .ok_or_else(|| Error::config(format!("unknown ingredient set '{name}'"))),
        }
    }

    /// Apply every step in order, stopping at the first failure.
    pub fn run(&self, normalizer: &mut Normalizer) -> Result<()> {
        if self.steps.is_empty() {
            warn!("pipeline has no steps");
        }
        for (i, step) in self.steps.iter().enumerate() {
            debug!("step {}: {step:?}", i + 1);
            self.apply(step, normalizer)?;
        }
        Ok(())
    }

    fn apply(&self, step: &Step, n: &mut Normalizer) -> Result<()> {
        match step {
            Step::StripSpaces { column } => n.strip_spaces(column),
            Step::RemoveText { column, text } => n.remove_text(column, text),
            Step::CleanBracketedValues { column } => n.clean_bracketed_values(column),
            Step::ExtractBracketedValue { column } => n.extract_bracketed_value(column),
            Step::StripPercent { column } => n.strip_percent(column),

            Step::ConvertFlOzToMl { column } => n.convert_fl_oz_to_ml(column),
            Step::ConvertOzToG { column } => n.convert_oz_to_g(column),
            Step::ConvertCupsToMl { column } => n.convert_cups_to_ml(column),
            Step::ConvertTbspToG { column } => n.convert_tbsp_to_g(column),
            Step::ConvertTspToG { column } => n.convert_tsp_to_g(column),
            Step::ConvertLToMl { column } => n.convert_l_to_ml(column),
            Step::ConvertMgToG { column } => n.convert_mg_to_g(column),
            Step::NormalizeGramVariants { column } => n.normalize_gram_variants(column),
            Step::ConvertUnits { column } => n.convert_units(column),
            Step::ConvertPackageBasedSize { column } => n.convert_package_based_size(column),
            Step::CoerceNumeric { column } => n.coerce_numeric(column),
            Step::Round { column, decimals } => n.round(column, *decimals),

            Step::HandleMissing { column, strategy } => n.handle_missing(column, *strategy),
            Step::DropBlankRows => {
                n.drop_blank_rows();
                Ok(())
            }
            Step::ExtractBlankRows { column } => n.extract_blank_rows(column),
            Step::SubSampleRows { column, n: count } => n.sub_sample_rows(column, *count),

            Step::DropColumns { columns } => {
                let names: Vec<&str> = columns.iter().map(String::as_str).collect();
                n.drop(&names)
            }
            Step::MarkListColumn { column } => n.mark_list_column(column),
            Step::SortColumnsAlphabetically => {
                n.sort_columns_alphabetically();
                Ok(())
            }

            Step::StandardizeColumn { column } => n.standardize_column(column),
            Step::StandardizeNutrientColumns { nutrients } => match nutrients {
                Some(list) => {
                    let names: Vec<&str> = list.iter().map(String::as_str).collect();
                    n.standardize_nutrient_columns(&names)
                }
                None => n.standardize_nutrient_columns(&DEFAULT_NUTRIENTS),
            },
            Step::PricePerServing => n.price_per_serving(),

            Step::FlagUltraProcessed { ingredients, set } => {
                n.flag_ultra_processed(ingredients, &self.resolve(set)?)
            }
            Step::FlagHighSugar { ingredients, measure, aisle, set } => {
                n.flag_high_sugar(ingredients, measure, aisle.as_deref(), &self.resolve(set)?)
            }
            Step::FlagHighSaturatedFat { ingredients, measure, aisle, set } => n
                .flag_high_saturated_fat(ingredients, measure, aisle.as_deref(), &self.resolve(set)?),
            Step::FlagHighCalories { measure, aisle } => {
                n.flag_high_calories(measure, aisle.as_deref())
            }
            Step::FlagHighSodium { ingredients, measure, aisle, set } => {
                n.flag_high_sodium(ingredients, measure, aisle.as_deref(), &self.resolve(set)?)
            }
            Step::FlagNns { ingredients, set } => n.flag_nns(ingredients, &self.resolve(set)?),

            Step::ParseProductName { column } => n.apply_parse_product_name(column),
            Step::ExtractAndConvertWeight { column } => n.extract_and_convert_weight(column),
            Step::FillServingSize { product, serving } => n.fill_serving_size(product, serving),
            Step::FindServingInfo { column } => n.find_serving_info(column),
        }
    }
}

impl Step {
    fn ingredient_set(&self) -> Option<&IngredientSet> {
        match self {
            Step::FlagUltraProcessed { set, .. }
            | Step::FlagHighSugar { set, .. }
            | Step::FlagHighSaturatedFat { set, .. }
            | Step::FlagHighSodium { set, .. }
            | Step::FlagNns { set, .. } => Some(set),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIPELINE: &str = r#"{
        "input": "products.xlsx",
        "ingredient_sets": { "sodium": ["msg"] },
        "steps": [
            { "op": "convert_fl_oz_to_ml", "column": "servingsize" },
            { "op": "handle_missing", "column": "sodium", "strategy": "zero" },
            { "op": "drop", "columns": ["notes"] },
            { "op": "drop_blank_rows" },
            { "op": "flag_high_sodium", "ingredients": "ingredients",
              "measure": "sodium per 100", "set": "sodium" },
            { "op": "flag_nns", "ingredients": "ingredients", "set": ["sucralose"] }
        ]
    }"#;

    #[test]
    fn test_parse_pipeline() {
        let config = PipelineConfig::from_json(PIPELINE).unwrap();
        assert_eq!(config.sheet, "Sheet1");
        assert_eq!(config.output, None);
        assert_eq!(config.steps.len(), 6);
        assert_eq!(
            config.steps[1],
            Step::HandleMissing { column: "sodium".into(), strategy: MissingStrategy::Zero }
        );
        assert_eq!(config.steps[2], Step::DropColumns { columns: vec!["notes".into()] });
        assert_eq!(config.steps[3], Step::DropBlankRows);
    }

    #[test]
    fn test_inline_and_named_sets() {
        let config = PipelineConfig::from_json(PIPELINE).unwrap();
        assert_eq!(
            config.resolve(&IngredientSet::Named("sodium".into())).unwrap(),
            vec!["msg".to_string()]
        );
        match &config.steps[5] {
            Step::FlagNns { set, .. } => {
                assert_eq!(set, &IngredientSet::Inline(vec!["sucralose".into()]))
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_unknown_set_is_config_error() {
        let text = r#"{ "steps": [
            { "op": "flag_ultra_processed", "ingredients": "ingredients", "set": "nope" }
        ] }"#;
        let err = PipelineConfig::from_json(text).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_unknown_op_is_config_error() {
        let err = PipelineConfig::from_json(r#"{ "steps": [ { "op": "explode" } ] }"#).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
