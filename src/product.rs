//! Best-effort parsing of unstructured product titles.
//!
//! Each field is recovered by an ordered list of `(pattern, extractor)`
//! pairs; the first pattern that matches wins. The lists are heuristics
//! tuned on retail beverage titles and are not authoritative.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::units::Conversion;

type Extractor<T> = fn(&Captures<'_>) -> Option<T>;

struct Pattern<T> {
    re: Regex,
    extract: Extractor<T>,
}

impl<T> Pattern<T> {
    fn new(pattern: &str, extract: Extractor<T>) -> Self {
        Self {
            re: Regex::new(pattern).expect("valid regex"),
            extract,
        }
    }
}

fn first_match<T>(patterns: &[Pattern<T>], text: &str) -> Option<T> {
    patterns
        .iter()
        .find_map(|p| p.re.captures(text).and_then(|caps| (p.extract)(&caps)))
}

fn whole(caps: &Captures<'_>) -> Option<String> {
    caps.get(0).map(|m| m.as_str().trim().to_string())
}

fn count(caps: &Captures<'_>) -> Option<u32> {
    caps.get(1).and_then(|m| m.as_str().parse().ok())
}

static PACK_UNIT: LazyLock<Vec<Pattern<String>>> = LazyLock::new(|| {
    [r"\bbottles\b", r"\bcans\b", r"\bbottle\b", r"\bcan\b", r"\bglass\b"]
        .into_iter()
        .map(|p| Pattern::new(&format!("(?i){p}"), whole))
        .collect()
});

static PACK_SIZE: LazyLock<Vec<Pattern<u32>>> = LazyLock::new(|| {
    [
        r"pack of\s*(\d+)",
        r"(\d+)\s*-?\s*pack\b",
        r"(\d+)\s*count\b",
        r"(\d+)\s*ct\b",
        r"case of\s*(\d+)",
        r"(\d+)\s*drinks\b",
        r"(\d+)\s*pk\b",
    ]
    .into_iter()
    .map(|p| Pattern::new(&format!("(?i){p}"), count))
    .collect()
});

static UNIT_SIZE: LazyLock<Vec<Pattern<String>>> = LazyLock::new(|| {
    vec![Pattern::new(
        r"(?i)\d+(?:\.\d+)?\s*(?:fl\.?\s*oz|fluid ounces?|oz|liters?|litres?|ml|l)\b",
        whole,
    )]
});

static WEIGHT_GRAMS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d*\.?\d+)\s*(?:grams|g)\b").expect("valid regex"));

static WEIGHT_OUNCES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d*\.?\d+)\s*(?:ounces|oz)\b").expect("valid regex"));

static SERVING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\d*\.?\d+)\s*(fl\.?\s*oz|fluid ounces?|oz|ml|quart|liter|kg|g|tablet|scoop|cup|bag|bottle)\b",
    )
    .expect("valid regex")
});

static SERVING_INFO: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)\d+(?:\.\d+)?\s*(?:fl oz|grams|g)\b").expect("valid regex"),
        Regex::new(r"(?i)\d+(?:\.\d+)?\s*ml\b").expect("valid regex"),
    ]
});

/// Packaging details recovered from a title.
#[derive(Debug, Clone, PartialEq)]
pub struct PackInfo {
    /// Container word ("bottles", "can", ...) or `"Single"`.
    pub pack_unit: String,
    /// Size of one unit such as `"12 fl oz"`.
    pub unit_size: Option<String>,
    /// Units per pack, 1 when nothing says otherwise.
    pub pack_size: u32,
}

pub fn parse_product_name(title: &str) -> PackInfo {
    let text = title.to_lowercase();
    let pack_unit = match first_match(&PACK_UNIT, &text) {
        Some(unit) if !text.contains("single") => unit,
        _ => "Single".to_string(),
    };
    PackInfo {
        pack_unit,
        unit_size: first_match(&UNIT_SIZE, &text),
        pack_size: first_match(&PACK_SIZE, &text).unwrap_or(1),
    }
}

/// Weight stated in a title as `(grams, ounces)`. Ounces take precedence and
/// are converted, so `grams` is always filled when either is present.
pub fn extract_weight(title: &str) -> (Option<f64>, Option<f64>) {
    let magnitude = |re: &Regex| {
        re.captures(title)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
    };
    let ounces = magnitude(&WEIGHT_OUNCES);
    let grams = match ounces {
        Some(oz) => Some(oz * Conversion::OzToG.factor()),
        None => magnitude(&WEIGHT_GRAMS),
    };
    (grams, ounces)
}

/// Serving size mentioned in a title, with the unit normalized
/// (`fluid ounce` → `fl oz`, `liter` → `l`, `kg` → `g`).
pub fn extract_serving(title: &str) -> Option<String> {
    let caps = SERVING.captures(title)?;
    let amount: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str().to_lowercase();
    let (amount, unit) = match unit.as_str() {
        "kg" => (amount * 1000.0, "g".to_string()),
        "liter" => (amount, "l".to_string()),
        u if u.starts_with("fluid") || u.starts_with("fl") => (amount, "fl oz".to_string()),
        _ => (amount, unit),
    };
    Some(format!("{} {unit}", crate::units::format_magnitude(amount)))
}

/// First `fl oz` / `g` / `grams` measurement, falling back to `ml`.
pub fn find_serving_info(text: &str) -> Option<String> {
    SERVING_INFO
        .iter()
        .find_map(|re| re.find(text))
        .map(|m| m.as_str().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multipack() {
        let info = parse_product_name("Coca-Cola Soda, 12 fl oz Cans, 12 Pack");
        assert_eq!(info.pack_unit, "cans");
        assert_eq!(info.unit_size.as_deref(), Some("12 fl oz"));
        assert_eq!(info.pack_size, 12);
    }

    #[test]
    fn test_parse_pack_of() {
        let info = parse_product_name("Sparkling Water 16.9 oz Bottle (Pack of 6)");
        assert_eq!(info.pack_unit, "bottle");
        assert_eq!(info.unit_size.as_deref(), Some("16.9 oz"));
        assert_eq!(info.pack_size, 6);
    }

    #[test]
    fn test_parse_defaults() {
        let info = parse_product_name("Organic Rolled Oats");
        assert_eq!(info.pack_unit, "Single");
        assert_eq!(info.unit_size, None);
        assert_eq!(info.pack_size, 1);
    }

    #[test]
    fn test_single_overrides_unit() {
        let info = parse_product_name("Cold Brew Single Bottle 1 L");
        assert_eq!(info.pack_unit, "Single");
        assert_eq!(info.unit_size.as_deref(), Some("1 l"));
    }

    #[test]
    fn test_can_is_a_whole_word() {
        let info = parse_product_name("Candy Bar 24 ct");
        assert_eq!(info.pack_unit, "Single");
        assert_eq!(info.pack_size, 24);
    }

    #[test]
    fn test_extract_weight() {
        assert_eq!(extract_weight("Crackers 200 g"), (Some(200.0), None));
        let (grams, oz) = extract_weight("Coffee Ground 11 oz");
        assert_eq!(oz, Some(11.0));
        assert!((grams.unwrap() - 311.8445).abs() < 1e-9);
        assert_eq!(extract_weight("Gum"), (None, None));
    }

    #[test]
    fn test_extract_serving() {
        assert_eq!(extract_serving("Juice 8 Fluid Ounce").as_deref(), Some("8 fl oz"));
        assert_eq!(extract_serving("Rice 2 kg bag").as_deref(), Some("2000 g"));
        assert_eq!(extract_serving("Water 1.5 liter").as_deref(), Some("1.5 l"));
        assert_eq!(extract_serving("Mystery"), None);
    }

    #[test]
    fn test_find_serving_info() {
        assert_eq!(find_serving_info("Serving 30 g (2 pieces)").as_deref(), Some("30 g"));
        assert_eq!(find_serving_info("1 bottle 500 ml").as_deref(), Some("500 ml"));
        assert_eq!(find_serving_info("n/a"), None);
    }
}
