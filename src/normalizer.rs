//! The nutrition table normalizer.
//!
//! [`Normalizer`] owns one [`Table`] and mutates it in place. Every
//! operation names the columns it reads and writes. A failing operation
//! leaves the table as the previous successful operations left it; take a
//! [`Normalizer::snapshot`] first when a sequence has to be all-or-nothing.

use std::path::Path;

use log::{debug, error, info};
use serde::Deserialize;

use crate::data::export::save_table;
use crate::data::filter;
use crate::data::loader::load_file;
use crate::data::model::{Cell, ColumnKind, Table};
use crate::error::{Error, Result};
use crate::flags::FlagRule;
use crate::product;
use crate::text;
use crate::units::{self, Conversion};

/// Serving-size column that per-100 standardization depends on.
pub const SERVING_SIZE_COLUMN: &str = "servingsize";

/// Nutrients checked by [`Normalizer::standardize_nutrient_columns`] by default.
pub const DEFAULT_NUTRIENTS: [&str; 9] = [
    "energykcal",
    "fat",
    "saturatedfat",
    "transfat",
    "carbohydrates",
    "sugar",
    "salt",
    "fibre",
    "protein",
];

/// How [`Normalizer::handle_missing`] treats missing cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingStrategy {
    /// Fill with the column mean. Numeric columns only.
    Mean,
    /// Fill with 0.
    Zero,
    /// Remove the row.
    Drop,
}

pub struct Normalizer {
    table: Table,
}

impl Normalizer {
    /// Load `sheet` of the file at `path`.
    pub fn load(path: impl AsRef<Path>, sheet: &str) -> Result<Self> {
        let table = load_file(path.as_ref(), sheet)?;
        Ok(Self { table })
    }

    pub fn from_table(table: Table) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn into_table(self) -> Table {
        self.table
    }

    pub fn snapshot(&self) -> Table {
        self.table.clone()
    }

    pub fn restore(&mut self, table: Table) {
        self.table = table;
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    pub fn num_rows(&self) -> usize {
        self.table.num_rows()
    }

    pub fn num_columns(&self) -> usize {
        self.table.num_columns()
    }

    pub fn count_unique_entries(&self, column: &str) -> Result<usize> {
        self.table.unique_count(column)
    }

    /// First `n` rows as a separate table.
    pub fn preview(&self, n: usize) -> Table {
        self.table.head(n)
    }

    pub fn to_list(&self, column: &str) -> Result<Vec<Cell>> {
        Ok(self.table.column(column)?.cells.clone())
    }

    /// Share of cells that are missing, blank or the literal `"not found"`.
    pub fn missing_ratio(&self, column: &str) -> Result<f64> {
        let col = self.table.column(column)?;
        if col.is_empty() {
            return Ok(0.0);
        }
        let missing = col
            .cells
            .iter()
            .filter(|c| match c {
                Cell::Missing => true,
                Cell::Text(s) => {
                    let s = s.trim();
                    s.is_empty() || s.eq_ignore_ascii_case("not found")
                }
                _ => false,
            })
            .count();
        Ok(missing as f64 / col.len() as f64)
    }

    // -----------------------------------------------------------------------
    // Text cleanup (reads and writes `column`, which must be text)
    // -----------------------------------------------------------------------

    fn map_text_column(
        &mut self,
        column: &str,
        op: &str,
        mut f: impl FnMut(&str) -> Cell,
    ) -> Result<()> {
        let col = self.table.column_mut(column)?;
        col.require_kind(ColumnKind::Text)?;
        col.map_text(&mut f);
        debug!("{op}: '{column}' ({} rows)", col.len());
        Ok(())
    }

    pub fn strip_spaces(&mut self, column: &str) -> Result<()> {
        self.map_text_column(column, "strip_spaces", |s| text::strip_spaces(s).into())
    }

    pub fn remove_text(&mut self, column: &str, literal: &str) -> Result<()> {
        self.map_text_column(column, "remove_text", |s| text::remove_text(s, literal).into())
    }

    pub fn clean_bracketed_values(&mut self, column: &str) -> Result<()> {
        self.map_text_column(column, "clean_bracketed_values", |s| {
            text::clean_bracketed(s).into()
        })
    }

    pub fn extract_bracketed_value(&mut self, column: &str) -> Result<()> {
        self.map_text_column(column, "extract_bracketed_value", |s| {
            text::extract_bracketed(s).map_or_else(|| s.into(), Cell::Text)
        })
    }

    /// Drop `%` signs from a daily-value column.
    pub fn strip_percent(&mut self, column: &str) -> Result<()> {
        self.map_text_column(column, "strip_percent", |s| text::strip_percent(s).into())
    }

    // -----------------------------------------------------------------------
    // Units (reads and writes `column`; unmatched cells are kept)
    // -----------------------------------------------------------------------

    /// Rewrite matching cells as `"<value> <unit>"` strings.
    pub fn convert(&mut self, column: &str, conversion: Conversion) -> Result<()> {
        let col = self.table.column_mut(column)?;
        let mut changed = 0;
        for cell in &mut col.cells {
            let converted = conversion.apply_cell(cell);
            if converted != *cell {
                *cell = converted;
                changed += 1;
            }
        }
        debug!("convert {conversion:?}: '{column}' ({changed} of {} cells)", col.len());
        Ok(())
    }

    pub fn convert_fl_oz_to_ml(&mut self, column: &str) -> Result<()> {
        self.convert(column, Conversion::FlOzToMl)
    }

    pub fn convert_oz_to_g(&mut self, column: &str) -> Result<()> {
        self.convert(column, Conversion::OzToG)
    }

    pub fn convert_cups_to_ml(&mut self, column: &str) -> Result<()> {
        self.convert(column, Conversion::CupToMl)
    }

    pub fn convert_tbsp_to_g(&mut self, column: &str) -> Result<()> {
        self.convert(column, Conversion::TbspToG)
    }

    pub fn convert_tsp_to_g(&mut self, column: &str) -> Result<()> {
        self.convert(column, Conversion::TspToG)
    }

    pub fn convert_l_to_ml(&mut self, column: &str) -> Result<()> {
        self.convert(column, Conversion::LToMl)
    }

    pub fn convert_mg_to_g(&mut self, column: &str) -> Result<()> {
        self.convert(column, Conversion::MgToG)
    }

    pub fn normalize_gram_variants(&mut self, column: &str) -> Result<()> {
        self.convert(column, Conversion::GramVariants)
    }

    /// Trim text cells, then turn whole-cell `fl oz` / `cup(s)` / `mg` / `ml`
    /// measurements into bare numbers in ml or g.
    pub fn convert_units(&mut self, column: &str) -> Result<()> {
        let col = self.table.column_mut(column)?;
        col.map_text(|s| {
            let trimmed = s.trim();
            units::convert_suffix_units(trimmed).map_or_else(|| trimmed.into(), Cell::number)
        });
        debug!("convert_units: '{column}' ({} rows)", col.len());
        Ok(())
    }

    /// Replace package-style servings ("1 can") with approximate sizes.
    pub fn convert_package_based_size(&mut self, column: &str) -> Result<()> {
        let col = self.table.column_mut(column)?;
        col.map_text(|s| units::convert_package_size(s).map_or_else(|| s.into(), Cell::Text));
        debug!("convert_package_based_size: '{column}'");
        Ok(())
    }

    /// Text cells become their first numeric magnitude, or missing.
    pub fn coerce_numeric(&mut self, column: &str) -> Result<()> {
        let col = self.table.column_mut(column)?;
        for cell in &mut col.cells {
            *cell = units::coerce_cell(cell);
        }
        debug!("coerce_numeric: '{column}'");
        Ok(())
    }

    pub fn round(&mut self, column: &str, decimals: u32) -> Result<()> {
        let col = self.table.column_mut(column)?;
        col.require_kind(ColumnKind::Numeric)?;
        let scale = 10f64.powi(decimals as i32);
        for cell in &mut col.cells {
            if let Cell::Number(v) = cell {
                *v = (*v * scale).round() / scale;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Missing values and row filtering
    // -----------------------------------------------------------------------

    pub fn handle_missing(&mut self, column: &str, strategy: MissingStrategy) -> Result<()> {
        match strategy {
            MissingStrategy::Mean => {
                let col = self.table.column_mut(column)?;
                col.require_kind(ColumnKind::Numeric)?;
                let present: Vec<f64> = col.cells.iter().filter_map(Cell::as_number).collect();
                if present.is_empty() {
                    return Ok(());
                }
                let mean = present.iter().sum::<f64>() / present.len() as f64;
                fill_missing(&mut col.cells, mean);
            }
            MissingStrategy::Zero => {
                let col = self.table.column_mut(column)?;
                fill_missing(&mut col.cells, 0.0);
            }
            MissingStrategy::Drop => {
                let mask = filter::present_in(&self.table, column)?;
                self.retain(&mask, "handle_missing(drop)");
            }
        }
        Ok(())
    }

    /// Remove rows with a missing cell in any column.
    pub fn drop_blank_rows(&mut self) {
        let mask = filter::complete_rows(&self.table);
        self.retain(&mask, "drop_blank_rows");
    }

    /// Keep only the rows missing `column`.
    pub fn extract_blank_rows(&mut self, column: &str) -> Result<()> {
        let mask = filter::missing_in(&self.table, column)?;
        self.retain(&mask, "extract_blank_rows");
        Ok(())
    }

    /// Drop incomplete rows, then keep the first `n` rows for each distinct
    /// value of `column`.
    pub fn sub_sample_rows(&mut self, column: &str, n: usize) -> Result<()> {
        self.table.column(column)?;
        self.drop_blank_rows();
        let indices = filter::first_n_per_group(&self.table, column, n)?;
        self.table = self.table.take_rows(&indices);
        debug!("sub_sample_rows: {} rows kept", self.table.num_rows());
        Ok(())
    }

    fn retain(&mut self, mask: &[bool], op: &str) {
        let before = self.table.num_rows();
        self.table.retain_rows(mask);
        debug!("{op}: {} of {before} rows kept", self.table.num_rows());
    }

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    pub fn drop(&mut self, columns: &[&str]) -> Result<()> {
        self.table.drop_columns(columns)
    }

    /// Add or replace a column. Its length must match the row count.
    pub fn new_column(&mut self, name: &str, cells: Vec<Cell>) -> Result<()> {
        self.table.upsert_column(name, cells)
    }

    /// Store a comma-joined text column as genuine ingredient lists.
    ///
    /// Loaders cannot tell an ingredient column from other text, so this is
    /// the explicit conversion step. Flags accept either form.
    pub fn mark_list_column(&mut self, column: &str) -> Result<()> {
        let col = self.table.column_mut(column)?;
        if col.kind() == ColumnKind::List {
            return Ok(());
        }
        col.require_kind(ColumnKind::Text)?;
        col.map_text(|s| {
            Cell::List(
                s.split(',')
                    .map(str::trim)
                    .filter(|i| !i.is_empty())
                    .map(str::to_string)
                    .collect(),
            )
        });
        Ok(())
    }

    pub fn sort_columns_alphabetically(&mut self) {
        self.table.sort_columns_alphabetically();
    }

    // -----------------------------------------------------------------------
    // Per-100 standardization
    // -----------------------------------------------------------------------

    /// Write `"<column> per 100"` = value / serving size × 100.
    ///
    /// Reads `servingsize` (a number, or the first magnitude of text) and
    /// `column` (numeric or numeric text). Division by zero yields a missing cell. `column`
    /// itself is not modified.
    pub fn standardize_column(&mut self, column: &str) -> Result<()> {
        if !self.table.has_column(SERVING_SIZE_COLUMN) {
            return Err(Error::MissingCompanion {
                column: column.to_string(),
                required: SERVING_SIZE_COLUMN.to_string(),
            });
        }
        let values = &self.table.column(column)?.cells;
        let servings = &self.table.column(SERVING_SIZE_COLUMN)?.cells;

        let per_100: Vec<Cell> = values
            .iter()
            .zip(servings)
            .map(|(value, serving)| {
                let serving = units::coerce_cell(serving).as_number();
                match (value.coerce_number(), serving) {
                    (Some(v), Some(s)) => Cell::number(v / s * 100.0),
                    _ => Cell::Missing,
                }
            })
            .collect();

        let name = format!("{column} per 100");
        self.table.upsert_column(&name, per_100)?;
        debug!("standardize_column: wrote '{name}'");
        Ok(())
    }

    /// Zero every existing `"<n> per 100"` column on rows whose listed
    /// nutrients sum to 0 (missing counts as 0).
    pub fn standardize_nutrient_columns(&mut self, nutrients: &[&str]) -> Result<()> {
        let rows = self.table.num_rows();
        let mut sums = vec![0.0; rows];
        for name in nutrients {
            let col = self.table.column(name)?;
            for (sum, cell) in sums.iter_mut().zip(&col.cells) {
                *sum += cell.coerce_number().unwrap_or(0.0);
            }
        }
        for name in nutrients {
            let per_100 = format!("{name} per 100");
            if let Ok(col) = self.table.column_mut(&per_100) {
                for (cell, sum) in col.cells.iter_mut().zip(&sums) {
                    if *sum == 0.0 {
                        *cell = Cell::Number(0.0);
                    }
                }
            }
        }
        Ok(())
    }

    /// Write `price_per_serving` from `price` and `servingspercontainer`.
    pub fn price_per_serving(&mut self) -> Result<()> {
        let prices = &self.table.column("price")?.cells;
        let servings = &self.table.column("servingspercontainer")?.cells;
        let per_serving: Vec<Cell> = prices
            .iter()
            .zip(servings)
            .map(|(price, servings)| {
                match (price.coerce_number(), units::coerce_cell(servings).as_number()) {
                    (Some(p), Some(s)) => Cell::number(p / s),
                    _ => Cell::Missing,
                }
            })
            .collect();
        self.table.upsert_column("price_per_serving", per_serving)
    }

    // -----------------------------------------------------------------------
    // Flags (write a 0/1 column named by the rule)
    // -----------------------------------------------------------------------

    pub fn apply_flag(&mut self, rule: &FlagRule) -> Result<()> {
        let flags = rule.evaluate(&self.table)?;
        let flagged = flags.iter().filter(|c| **c == Cell::flag(true)).count();
        self.table.upsert_column(&rule.output, flags)?;
        debug!("{}: {flagged} of {} rows flagged", rule.output, self.table.num_rows());
        Ok(())
    }

    pub fn flag_ultra_processed(&mut self, ingredients: &str, set: &[String]) -> Result<()> {
        self.apply_flag(&FlagRule::ultra_processed(ingredients, set))
    }

    pub fn flag_high_sugar(
        &mut self,
        ingredients: &str,
        sugar: &str,
        aisle: Option<&str>,
        set: &[String],
    ) -> Result<()> {
        self.apply_flag(&FlagRule::high_sugar(ingredients, sugar, aisle, set))
    }

    pub fn flag_high_saturated_fat(
        &mut self,
        ingredients: &str,
        sat_fat: &str,
        aisle: Option<&str>,
        set: &[String],
    ) -> Result<()> {
        self.apply_flag(&FlagRule::high_saturated_fat(ingredients, sat_fat, aisle, set))
    }

    pub fn flag_high_calories(&mut self, calories: &str, aisle: Option<&str>) -> Result<()> {
        self.apply_flag(&FlagRule::high_calories(calories, aisle))
    }

    pub fn flag_high_sodium(
        &mut self,
        ingredients: &str,
        sodium: &str,
        aisle: Option<&str>,
        set: &[String],
    ) -> Result<()> {
        self.apply_flag(&FlagRule::high_sodium(ingredients, sodium, aisle, set))
    }

    pub fn flag_nns(&mut self, ingredients: &str, set: &[String]) -> Result<()> {
        self.apply_flag(&FlagRule::nns(ingredients, set))
    }

    // -----------------------------------------------------------------------
    // Product titles
    // -----------------------------------------------------------------------

    /// Write `pack_unit`, `unit_size` and `pack_size` parsed from `column`.
    pub fn apply_parse_product_name(&mut self, column: &str) -> Result<()> {
        let titles = &self.table.column(column)?.cells;
        let mut pack_unit = Vec::with_capacity(titles.len());
        let mut unit_size = Vec::with_capacity(titles.len());
        let mut pack_size = Vec::with_capacity(titles.len());
        for title in titles {
            if title.is_missing() {
                pack_unit.push(Cell::Missing);
                unit_size.push(Cell::Missing);
                pack_size.push(Cell::Missing);
                continue;
            }
            let info = product::parse_product_name(&title.to_string());
            pack_unit.push(Cell::Text(info.pack_unit));
            unit_size.push(info.unit_size.into());
            pack_size.push(Cell::Number(f64::from(info.pack_size)));
        }
        self.table.upsert_column("pack_unit", pack_unit)?;
        self.table.upsert_column("unit_size", unit_size)?;
        self.table.upsert_column("pack_size", pack_size)
    }

    /// Write `weight_grams` and `weight_oz` parsed from `column`.
    pub fn extract_and_convert_weight(&mut self, column: &str) -> Result<()> {
        let titles = &self.table.column(column)?.cells;
        let (grams, ounces): (Vec<Cell>, Vec<Cell>) = titles
            .iter()
            .map(|t| {
                let (g, oz) = product::extract_weight(&t.to_string());
                (Cell::from(g), Cell::from(oz))
            })
            .unzip();
        self.table.upsert_column("weight_grams", grams)?;
        self.table.upsert_column("weight_oz", ounces)
    }

    /// Fill missing cells of `serving_column` from the size in the title.
    pub fn fill_serving_size(&mut self, product_column: &str, serving_column: &str) -> Result<()> {
        let titles = self.table.column(product_column)?.cells.clone();
        let servings = self.table.column_mut(serving_column)?;
        let mut filled = 0;
        for (serving, title) in servings.cells.iter_mut().zip(&titles) {
            if serving.is_missing() {
                if let Some(found) = title.as_text().and_then(product::extract_serving) {
                    *serving = Cell::Text(found);
                    filled += 1;
                }
            }
        }
        debug!("fill_serving_size: filled {filled} cells of '{serving_column}'");
        Ok(())
    }

    /// Write `serving_size` from the first measurement found in `column`.
    pub fn find_serving_info(&mut self, column: &str) -> Result<()> {
        let found: Vec<Cell> = self
            .table
            .column(column)?
            .cells
            .iter()
            .map(|c| product::find_serving_info(&c.to_string()).into())
            .collect();
        self.table.upsert_column("serving_size", found)
    }

    // -----------------------------------------------------------------------
    // Export
    // -----------------------------------------------------------------------

    /// Write the table to `path`. Failures are logged and reported as `false`.
    pub fn save(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match save_table(&self.table, path) {
            Ok(()) => {
                info!("Data successfully saved to {}", path.display());
                true
            }
            Err(err) => {
                error!("Error saving file: {err}");
                false
            }
        }
    }
}

fn fill_missing(cells: &mut [Cell], value: f64) {
    for cell in cells.iter_mut().filter(|c| c.is_missing()) {
        *cell = Cell::Number(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;

    fn normalizer(columns: Vec<Column>) -> Normalizer {
        Normalizer::from_table(Table::new(columns).unwrap())
    }

    fn numbers() -> Normalizer {
        normalizer(vec![Column::new(
            "x",
            vec![Cell::Number(1.0), Cell::Number(2.0), Cell::Missing, Cell::Number(4.0)],
        )])
    }

    fn cells(n: &Normalizer, column: &str) -> Vec<Cell> {
        n.table().column(column).unwrap().cells.clone()
    }

    #[test]
    fn test_handle_missing_mean() {
        let mut n = numbers();
        n.handle_missing("x", MissingStrategy::Mean).unwrap();
        let filled = cells(&n, "x")[2].as_number().unwrap();
        assert!((filled - 7.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_handle_missing_zero() {
        let mut n = numbers();
        n.handle_missing("x", MissingStrategy::Zero).unwrap();
        assert_eq!(
            cells(&n, "x"),
            vec![Cell::Number(1.0), Cell::Number(2.0), Cell::Number(0.0), Cell::Number(4.0)]
        );
    }

    #[test]
    fn test_handle_missing_drop() {
        let mut n = numbers();
        n.handle_missing("x", MissingStrategy::Drop).unwrap();
        assert_eq!(cells(&n, "x"), vec![Cell::Number(1.0), Cell::Number(2.0), Cell::Number(4.0)]);
    }

    #[test]
    fn test_mean_on_text_is_type_error() {
        let mut n = normalizer(vec![Column::new("name", vec!["Cola".into(), Cell::Missing])]);
        let err = n.handle_missing("name", MissingStrategy::Mean).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        assert_eq!(cells(&n, "name")[1], Cell::Missing);
    }

    #[test]
    fn test_text_ops_reject_numeric_columns() {
        let mut n = numbers();
        assert!(matches!(n.strip_spaces("x"), Err(Error::TypeMismatch { .. })));
        assert!(matches!(n.remove_text("x", "g"), Err(Error::TypeMismatch { .. })));
        assert!(matches!(n.clean_bracketed_values("x"), Err(Error::TypeMismatch { .. })));
        assert!(matches!(n.extract_bracketed_value("x"), Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_text_ops_leave_numbers_in_mixed_columns() {
        let mut n = normalizer(vec![Column::new("size", vec![" 1 cup (240 ml) ".into(), Cell::Number(3.0)])]);
        n.strip_spaces("size").unwrap();
        n.extract_bracketed_value("size").unwrap();
        assert_eq!(cells(&n, "size"), vec![Cell::from("240 ml"), Cell::Number(3.0)]);
    }

    #[test]
    fn test_convert_units_to_numbers() {
        let mut n = normalizer(vec![Column::new(
            "servingsize",
            vec![" 2 fl oz ".into(), "500 mg".into(), "N/A".into(), "50 g".into()],
        )]);
        n.convert_units("servingsize").unwrap();
        let out = cells(&n, "servingsize");
        assert!((out[0].as_number().unwrap() - 59.147).abs() < 1e-9);
        assert!((out[1].as_number().unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(out[2], Cell::from("N/A"));
        assert_eq!(out[3], Cell::from("50 g"));
    }

    #[test]
    fn test_named_conversions() {
        let mut n = normalizer(vec![Column::new("v", vec!["1 L".into(), "500 mg".into()])]);
        n.convert_l_to_ml("v").unwrap();
        n.convert_mg_to_g("v").unwrap();
        assert_eq!(cells(&n, "v"), vec![Cell::from("1000 ml"), Cell::from("0.5 g")]);
    }

    #[test]
    fn test_coerce_numeric_and_round() {
        let mut n = normalizer(vec![Column::new("v", vec!["59.147 ml".into(), "N/A".into()])]);
        n.coerce_numeric("v").unwrap();
        n.round("v", 1).unwrap();
        assert_eq!(cells(&n, "v"), vec![Cell::Number(59.1), Cell::Missing]);
    }

    #[test]
    fn test_standardize_column() {
        let mut n = normalizer(vec![
            Column::new("servingsize", vec!["50 g".into(), "0 g".into()]),
            Column::new("sodium", vec![Cell::Number(25.0), Cell::Number(25.0)]),
        ]);
        n.standardize_column("sodium").unwrap();
        assert_eq!(cells(&n, "sodium per 100"), vec![Cell::Number(50.0), Cell::Missing]);
        assert_eq!(cells(&n, "sodium"), vec![Cell::Number(25.0), Cell::Number(25.0)]);
        assert_eq!(n.table().column_names(), vec!["servingsize", "sodium", "sodium per 100"]);
    }

    #[test]
    fn test_standardize_keeps_sign_of_numeric_serving() {
        let mut n = normalizer(vec![
            Column::new("servingsize", vec![Cell::Number(-50.0), Cell::Number(50.0)]),
            Column::new("sodium", vec![Cell::Number(25.0), Cell::Number(25.0)]),
        ]);
        n.standardize_column("sodium").unwrap();
        assert_eq!(cells(&n, "sodium per 100"), vec![Cell::Number(-50.0), Cell::Number(50.0)]);
    }

    #[test]
    fn test_standardize_requires_serving_size() {
        let mut n = normalizer(vec![Column::new("sodium", vec![Cell::Number(1.0)])]);
        let err = n.standardize_column("sodium").unwrap_err();
        assert!(matches!(err, Error::MissingCompanion { ref required, .. } if required == "servingsize"));
    }

    #[test]
    fn test_standardize_nutrient_columns_zeroes_empty_rows() {
        let mut n = normalizer(vec![
            Column::new("fat", vec![Cell::Number(0.0), Cell::Number(3.0)]),
            Column::new("sugar", vec![Cell::Missing, Cell::Number(1.0)]),
            Column::new("fat per 100", vec![Cell::Missing, Cell::Number(6.0)]),
        ]);
        n.standardize_nutrient_columns(&["fat", "sugar"]).unwrap();
        assert_eq!(cells(&n, "fat per 100"), vec![Cell::Number(0.0), Cell::Number(6.0)]);
    }

    #[test]
    fn test_price_per_serving() {
        let mut n = normalizer(vec![
            Column::new("price", vec![Cell::Number(6.0), Cell::Number(2.0)]),
            Column::new("servingspercontainer", vec!["about 3".into(), "0".into()]),
        ]);
        n.price_per_serving().unwrap();
        assert_eq!(cells(&n, "price_per_serving"), vec![Cell::Number(2.0), Cell::Missing]);
    }

    #[test]
    fn test_price_per_serving_numeric_servings() {
        let mut n = normalizer(vec![
            Column::new("price", vec![Cell::Number(6.0)]),
            Column::new("servingspercontainer", vec![Cell::Number(-3.0)]),
        ]);
        n.price_per_serving().unwrap();
        assert_eq!(cells(&n, "price_per_serving"), vec![Cell::Number(-2.0)]);
    }

    #[test]
    fn test_row_count_unchanged_by_column_ops() {
        let mut n = normalizer(vec![
            Column::new("servingsize", vec!["1 cup".into(), Cell::Missing, "2 tbsp".into()]),
            Column::new("ingredients", vec!["salt".into(), Cell::Missing, "sugar, water".into()]),
            Column::new("sodium", vec![Cell::Number(0.5), Cell::Missing, Cell::Number(0.1)]),
        ]);
        n.convert_cups_to_ml("servingsize").unwrap();
        n.convert_tbsp_to_g("servingsize").unwrap();
        n.strip_spaces("ingredients").unwrap();
        n.standardize_column("sodium").unwrap();
        n.flag_high_sodium("ingredients", "sodium", None, &["salt".to_string()]).unwrap();
        n.flag_nns("ingredients", &[]).unwrap();
        assert_eq!(n.num_rows(), 3);
    }

    #[test]
    fn test_sub_sample_rows() {
        let mut n = normalizer(vec![
            Column::new("dept", vec!["a".into(), "b".into(), "a".into(), "a".into()]),
            Column::new("price", vec![Cell::Number(1.0), Cell::Number(2.0), Cell::Missing, Cell::Number(4.0)]),
        ]);
        n.sub_sample_rows("dept", 1).unwrap();
        assert_eq!(cells(&n, "price"), vec![Cell::Number(1.0), Cell::Number(2.0)]);
    }

    #[test]
    fn test_extract_blank_rows() {
        let mut n = numbers();
        n.extract_blank_rows("x").unwrap();
        assert_eq!(cells(&n, "x"), vec![Cell::Missing]);
    }

    #[test]
    fn test_missing_ratio() {
        let n = normalizer(vec![Column::new(
            "energykcal",
            vec![Cell::Number(1.0), "not found".into(), Cell::Missing, " ".into()],
        )]);
        assert_eq!(n.missing_ratio("energykcal").unwrap(), 0.75);
    }

    #[test]
    fn test_mark_list_column() {
        let mut n = normalizer(vec![Column::new("ingredients", vec!["Water, Sugar,".into(), Cell::Missing])]);
        n.mark_list_column("ingredients").unwrap();
        assert_eq!(cells(&n, "ingredients")[0], Cell::List(vec!["Water".into(), "Sugar".into()]));
        assert_eq!(n.table().column("ingredients").unwrap().kind(), ColumnKind::List);
        assert!(n.strip_spaces("ingredients").is_err());
    }

    #[test]
    fn test_flags_agree_on_text_and_list_ingredients() {
        let ingredients = vec!["Noodles, MSG".into(), "oats".into(), Cell::Missing];
        let mut text = normalizer(vec![Column::new("ingredients", ingredients)]);
        let mut list = Normalizer::from_table(text.snapshot());
        list.mark_list_column("ingredients").unwrap();

        let set = ["msg".to_string()];
        text.flag_ultra_processed("ingredients", &set).unwrap();
        list.flag_ultra_processed("ingredients", &set).unwrap();
        let expected = vec![Cell::Number(1.0), Cell::Number(0.0), Cell::Number(0.0)];
        assert_eq!(cells(&text, "ultra_processed_flag"), expected);
        assert_eq!(cells(&list, "ultra_processed_flag"), expected);
    }

    #[test]
    fn test_apply_parse_product_name() {
        let mut n = normalizer(vec![Column::new(
            "product_name",
            vec!["Soda 12 fl oz Cans, 12 Pack".into(), "Plain Oats".into(), Cell::Missing],
        )]);
        n.apply_parse_product_name("product_name").unwrap();
        assert_eq!(cells(&n, "pack_unit"), vec![Cell::from("cans"), Cell::from("Single"), Cell::Missing]);
        assert_eq!(cells(&n, "unit_size"), vec![Cell::from("12 fl oz"), Cell::Missing, Cell::Missing]);
        assert_eq!(cells(&n, "pack_size"), vec![Cell::Number(12.0), Cell::Number(1.0), Cell::Missing]);
    }

    #[test]
    fn test_fill_serving_size_only_fills_missing() {
        let mut n = normalizer(vec![
            Column::new("product_name", vec!["Juice 8 fl oz".into(), "Juice 8 fl oz".into()]),
            Column::new("servingsize", vec![Cell::Missing, "240 ml".into()]),
        ]);
        n.fill_serving_size("product_name", "servingsize").unwrap();
        assert_eq!(cells(&n, "servingsize"), vec![Cell::from("8 fl oz"), Cell::from("240 ml")]);
    }

    #[test]
    fn test_new_column_length_checked() {
        let mut n = numbers();
        assert!(matches!(
            n.new_column("y", vec![Cell::Missing]),
            Err(Error::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_snapshot_restore() {
        let mut n = numbers();
        let snap = n.snapshot();
        n.handle_missing("x", MissingStrategy::Drop).unwrap();
        n.restore(snap);
        assert_eq!(n.num_rows(), 4);
    }

    #[test]
    fn test_save_reports_failure() {
        let n = numbers();
        assert!(!n.save("/no/such/dir/out.csv"));
    }
}
