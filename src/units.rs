//! Measurement extraction and unit conversion for free-text size columns.
//!
//! Every pattern is case-insensitive and anchored to the end of the cell:
//! the value must finish with `<magnitude> <unit>` (an optional trailing
//! period is tolerated), and the magnitude must start the cell or follow
//! whitespace or `(`. Fractions such as `1/2 cup` are left untouched, as is
//! anything else that does not match.

use std::sync::LazyLock;

use regex::Regex;

use crate::data::model::Cell;

/// Conversions to canonical units (grams for mass, millilitres for volume).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conversion {
    FlOzToMl,
    OzToG,
    CupToMl,
    TbspToG,
    TspToG,
    LToMl,
    MgToG,
    /// Odd gram spellings ("g mix", "grams", "g without shells") to plain `g`.
    GramVariants,
}

impl Conversion {
    pub const ALL: [Conversion; 8] = [
        Conversion::FlOzToMl,
        Conversion::OzToG,
        Conversion::CupToMl,
        Conversion::TbspToG,
        Conversion::TspToG,
        Conversion::LToMl,
        Conversion::MgToG,
        Conversion::GramVariants,
    ];

    pub fn factor(self) -> f64 {
        match self {
            Conversion::FlOzToMl => 29.5735,
            Conversion::OzToG => 28.3495,
            Conversion::CupToMl => 240.0,
            Conversion::TbspToG => 21.25,
            Conversion::TspToG => 5.69,
            Conversion::LToMl => 1000.0,
            Conversion::MgToG => 0.001,
            Conversion::GramVariants => 1.0,
        }
    }

    pub fn target_unit(self) -> &'static str {
        match self {
            Conversion::FlOzToMl | Conversion::CupToMl | Conversion::LToMl => "ml",
            _ => "g",
        }
    }

    fn tokens(self) -> &'static str {
        match self {
            Conversion::FlOzToMl => r"fl\.?\s*oz|floz|fluid\s+ounces?",
            Conversion::OzToG => r"oz|ounces?",
            Conversion::CupToMl => r"cups?|cup\(s\)",
            Conversion::TbspToG => r"tbsp|tbs|tablespoons?",
            Conversion::TspToG => r"tsp|teaspoons?",
            Conversion::LToMl => r"l|liters?|litres?",
            Conversion::MgToG => r"mg",
            Conversion::GramVariants => r"g\s+mix|grams?|g\s+without\s+shells",
        }
    }

    /// Fixed decimal places in the output, or `None` for shortest form.
    fn precision(self) -> Option<usize> {
        match self {
            Conversion::FlOzToMl | Conversion::OzToG => Some(2),
            _ => None,
        }
    }

    fn pattern(self) -> &'static Regex {
        static PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
            Conversion::ALL
                .iter()
                .map(|c| {
                    Regex::new(&format!(
                        r"(?i)(?:^|[\s(])({MAGNITUDE})\s*(?:{})\.?\s*$",
                        c.tokens()
                    ))
                        .expect("valid regex")
                })
                .collect()
        });
        let idx = Conversion::ALL
            .iter()
            .position(|c| *c == self)
            .unwrap_or_default();
        &PATTERNS[idx]
    }

    /// Convert one measurement string, e.g. `"2 fl oz"` → `"59.15 ml"`.
    /// `None` when the value does not end in this conversion's unit.
    pub fn apply(self, value: &str) -> Option<String> {
        let caps = self.pattern().captures(value)?;
        let magnitude: f64 = caps.get(1)?.as_str().parse().ok()?;
        let converted = magnitude * self.factor();
        let shown = match self.precision() {
            Some(p) => format!("{converted:.p$}"),
            None => format_magnitude(converted),
        };
        Some(format!("{shown} {}", self.target_unit()))
    }

    /// Cell-level conversion: unmatched or non-text cells come back as-is.
    pub fn apply_cell(self, cell: &Cell) -> Cell {
        match cell {
            Cell::Text(s) => self.apply(s).map_or_else(|| cell.clone(), Cell::Text),
            other => other.clone(),
        }
    }
}

/// Integer or decimal magnitude; `.5` and `12` both qualify.
const MAGNITUDE: &str = r"\d*\.?\d+";

static FIRST_MAGNITUDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(MAGNITUDE).expect("valid regex"));

/// Whole-cell `<magnitude> <unit>` for the numeric suffix table.
static SUFFIX_MEASUREMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^\s*({MAGNITUDE})\s*(fl\s*oz|cups?|mg|ml)\s*$")).expect("valid regex")
});

static PACKAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d*\.?\d*)?\s*([\w\s-]+)").expect("valid regex"));

/// Round to four decimals and drop trailing zeros (`1000`, `0.5`).
pub fn format_magnitude(v: f64) -> String {
    let rounded = (v * 10_000.0).round() / 10_000.0;
    format!("{rounded}")
}

/// First numeric magnitude embedded anywhere in `text`.
pub fn first_magnitude(text: &str) -> Option<f64> {
    FIRST_MAGNITUDE
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Coerce a cell to a number: text yields its first magnitude or `Missing`.
pub fn coerce_cell(cell: &Cell) -> Cell {
    match cell {
        Cell::Number(_) | Cell::Missing => cell.clone(),
        Cell::Text(s) => first_magnitude(s).map_or(Cell::Missing, Cell::number),
        Cell::List(items) => first_magnitude(&items.join(", ")).map_or(Cell::Missing, Cell::number),
    }
}

/// Suffix table used by [`convert_suffix_units`], in canonical units.
const SUFFIX_FACTORS: &[(&str, f64)] = &[
    ("fl oz", 29.5735),
    ("cups", 240.0),
    ("cup", 240.0),
    ("mg", 0.001),
    ("ml", 1.0),
];

/// Convert a whole-cell measurement such as `"12 fl oz"` to a bare number in
/// ml or g. Returns `None` for anything else, including `"16 oz bottle"`.
pub fn convert_suffix_units(value: &str) -> Option<f64> {
    let caps = SUFFIX_MEASUREMENT.captures(value)?;
    let magnitude: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str().to_lowercase();
    let unit: String = unit.split_whitespace().collect::<Vec<_>>().join(" ");
    let unit = if unit == "floz" { "fl oz".to_string() } else { unit };
    SUFFIX_FACTORS
        .iter()
        .find(|(suffix, _)| *suffix == unit)
        .map(|(_, factor)| magnitude * factor)
}

/// Approximate sizes for package-style servings ("1 can", "2 slices").
/// Ordered: the first key contained in the unit wins.
const PACKAGE_SIZES: &[(&str, f64, &str)] = &[
    ("can", 355.0, "ml"),
    ("bottle", 500.0, "ml"),
    ("box", 250.0, "g"),
    ("container", 300.0, "g"),
    ("bagel", 100.0, "g"),
    ("pan fried slice", 40.0, "g"),
    ("slice", 30.0, "g"),
    ("biscuit", 58.0, "g"),
    ("breadstick", 30.0, "g"),
    ("apple", 150.0, "g"),
    ("k-cup", 10.0, "g"),
    ("stick", 65.0, "g"),
    ("pod", 10.0, "g"),
    ("packet", 3.3, "g"),
    ("tea bag", 8.0, "fl oz"),
    ("teabag", 8.0, "fl oz"),
];

/// Replace a package-style serving with an approximate measured size.
/// The quantity defaults to 1 and the result is truncated to an integer.
pub fn convert_package_size(value: &str) -> Option<String> {
    let lower = value.trim().to_lowercase();
    let caps = PACKAGE.captures(&lower)?;
    let quantity = caps
        .get(1)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(1.0);
    let unit = caps.get(2)?.as_str().trim();
    PACKAGE_SIZES
        .iter()
        .find(|(key, _, _)| unit.contains(key))
        .map(|(_, base, base_unit)| format!("{} {base_unit}", (quantity * base).trunc() as i64))
}
