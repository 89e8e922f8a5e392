use std::collections::BTreeMap;

use super::model::{Cell, Table};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Row masks: which rows survive a row-scoped operation
// ---------------------------------------------------------------------------

/// Row mask, one entry per row; `true` keeps the row.
pub type RowMask = Vec<bool>;

/// Rows where `column` has a value.
pub fn present_in(table: &Table, column: &str) -> Result<RowMask> {
    let col = table.column(column)?;
    Ok(col.cells.iter().map(|c| !c.is_missing()).collect())
}

/// Rows where `column` is missing.
pub fn missing_in(table: &Table, column: &str) -> Result<RowMask> {
    let col = table.column(column)?;
    Ok(col.cells.iter().map(Cell::is_missing).collect())
}

/// Rows with no missing cell in any column.
pub fn complete_rows(table: &Table) -> RowMask {
    (0..table.num_rows())
        .map(|row| table.columns().iter().all(|col| !col.cells[row].is_missing()))
        .collect()
}

/// Indices of the first `n` rows of every distinct value of `column`.
///
/// Groups come out ordered by value, rows keep their order within a group.
/// Rows missing `column` belong to no group.
pub fn first_n_per_group(table: &Table, column: &str, n: usize) -> Result<Vec<usize>> {
    let col = table.column(column)?;
    let mut groups: BTreeMap<&Cell, Vec<usize>> = BTreeMap::new();
    for (row, cell) in col.cells.iter().enumerate() {
        if cell.is_missing() {
            continue;
        }
        let group = groups.entry(cell).or_default();
        if group.len() < n {
            group.push(row);
        }
    }
    Ok(groups.into_values().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;

    fn table() -> Table {
        Table::new(vec![
            Column::new(
                "department",
                vec!["Snacks".into(), "Beverages".into(), "Snacks".into(), "Snacks".into(), Cell::Missing],
            ),
            Column::new(
                "price",
                vec![Cell::Number(1.0), Cell::Number(2.0), Cell::Missing, Cell::Number(4.0), Cell::Number(5.0)],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_present_and_missing_masks() {
        let t = table();
        assert_eq!(present_in(&t, "price").unwrap(), vec![true, true, false, true, true]);
        assert_eq!(missing_in(&t, "department").unwrap(), vec![false, false, false, false, true]);
        assert!(present_in(&t, "nope").is_err());
    }

    #[test]
    fn test_complete_rows() {
        assert_eq!(complete_rows(&table()), vec![true, true, false, true, false]);
    }

    #[test]
    fn test_first_n_per_group_orders_groups_by_value() {
        let idx = first_n_per_group(&table(), "department", 2).unwrap();
        assert_eq!(idx, vec![1, 0, 2]);
    }
}
