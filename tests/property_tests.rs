use proptest::prelude::*;

use nutriclean::{Cell, Column, Conversion, Normalizer, Table};

fn text_table(values: &[Option<String>]) -> Normalizer {
    let cells = values.iter().cloned().map(Cell::from).collect();
    Normalizer::from_table(Table::new(vec![Column::new("v", cells)]).unwrap())
}

proptest! {
    #[test]
    fn strip_spaces_is_idempotent(values in prop::collection::vec("[ a-z0-9]{0,12}x[ a-z]{0,4}", 1..20)) {
        let values: Vec<Option<String>> = values.into_iter().map(Some).collect();
        let mut once = text_table(&values);
        once.strip_spaces("v").unwrap();
        let mut twice = Normalizer::from_table(once.snapshot());
        twice.strip_spaces("v").unwrap();
        prop_assert_eq!(once.table(), twice.table());
    }

    #[test]
    fn unmatched_text_passes_through(value in "[A-Za-z/ ]{1,16}") {
        for conversion in Conversion::ALL {
            let cell = Cell::Text(value.clone());
            prop_assert_eq!(conversion.apply_cell(&cell), cell);
        }
    }

    #[test]
    fn column_ops_keep_row_count(
        sizes in prop::collection::vec(prop::option::of("[0-9]{1,3} ?(g|ml|fl oz|cup|tbsp|mg)"), 1..30),
    ) {
        let rows = sizes.len();
        let mut n = text_table(&sizes);
        n.convert_fl_oz_to_ml("v").unwrap();
        n.convert_tbsp_to_g("v").unwrap();
        n.normalize_gram_variants("v").unwrap();
        n.convert_units("v").unwrap();
        n.coerce_numeric("v").unwrap();
        n.flag_high_calories("v", None).unwrap();
        prop_assert_eq!(n.num_rows(), rows);
        prop_assert_eq!(n.num_columns(), 2);
    }
}
