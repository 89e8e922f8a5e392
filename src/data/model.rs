use std::collections::BTreeSet;
use std::fmt;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Cell – a single value in a column
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring what a spreadsheet column can hold.
/// Ingredient lists are held as `List` internally and joined with `", "`
/// only when written out.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    List(Vec<String>),
    Missing,
}

// -- Manual Eq/Ord so we can put Cell in BTreeSet / BTreeMap --

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Cell::*;
        fn discriminant(v: &Cell) -> u8 {
            match v {
                Missing => 0,
                Number(_) => 1,
                Text(_) => 2,
                List(_) => 3,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Number(a), Number(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (List(a), List(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Number(v) => write!(f, "{v}"),
            Cell::List(items) => write!(f, "{}", items.join(", ")),
            Cell::Missing => Ok(()),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::number(v)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map_or(Cell::Missing, Into::into)
    }
}

impl Cell {
    /// Numeric cell; NaN and infinities become `Missing`.
    pub fn number(v: f64) -> Self {
        if v.is_finite() {
            Cell::Number(v)
        } else {
            Cell::Missing
        }
    }

    /// 0/1 flag cell.
    pub fn flag(on: bool) -> Self {
        Cell::Number(if on { 1.0 } else { 0.0 })
    }

    /// Interpret raw text from a file the way a spreadsheet reader would.
    ///
    /// Empty → `Missing`, plain finite numbers → `Number`. Zero-padded digit
    /// strings (UPCs) and words like `NaN` or `Infinity` stay text.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Cell::Missing;
        }
        let zero_padded = raw.len() > 1 && raw.starts_with('0') && !raw.starts_with("0.");
        if !zero_padded {
            if let Some(v) = raw.parse::<f64>().ok().filter(|v| v.is_finite()) {
                return Cell::Number(v);
            }
        }
        Cell::Text(raw.to_string())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Strict numeric view: only `Number` cells.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Lenient numeric view: numbers, or text that parses whole as a number.
    pub fn coerce_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// Lowercased, trimmed ingredient names for text or list cells.
    pub fn ingredients(&self) -> Option<Vec<String>> {
        match self {
            Cell::Text(s) => Some(split_ingredients(s)),
            Cell::List(items) => Some(items.iter().map(|i| i.trim().to_lowercase()).collect()),
            _ => None,
        }
    }
}

/// Split a comma-joined ingredient string into lowercase trimmed names.
pub fn split_ingredients(s: &str) -> Vec<String> {
    s.split(',').map(|i| i.trim().to_lowercase()).collect()
}

// ---------------------------------------------------------------------------
// Column
// ---------------------------------------------------------------------------

/// Kind of a column, derived from the cells it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Only numbers and missing cells (an all-missing column is numeric).
    Numeric,
    /// At least one text cell.
    Text,
    /// At least one ingredient list.
    List,
}

impl ColumnKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Text => "text",
            ColumnKind::List => "list",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named column of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn kind(&self) -> ColumnKind {
        let mut kind = ColumnKind::Numeric;
        for cell in &self.cells {
            match cell {
                Cell::List(_) => return ColumnKind::List,
                Cell::Text(_) => kind = ColumnKind::Text,
                Cell::Number(_) | Cell::Missing => {}
            }
        }
        kind
    }

    /// Fail unless the column has the given kind.
    pub fn require_kind(&self, expected: ColumnKind) -> Result<()> {
        let found = self.kind();
        if found == expected {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                column: self.name.clone(),
                expected: expected.as_str(),
                found: found.as_str(),
            })
        }
    }

    /// Apply `f` to every text cell; other cells are left as they are.
    pub fn map_text(&mut self, mut f: impl FnMut(&str) -> Cell) {
        for cell in &mut self.cells {
            if let Cell::Text(s) = cell {
                *cell = f(s);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Table – the complete loaded dataset
// ---------------------------------------------------------------------------

/// Ordered columns of equal length. One row per product.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Build a table, rejecting ragged or duplicated columns.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        let rows = columns.first().map_or(0, Column::len);
        for col in &columns {
            if !seen.insert(col.name.as_str()) {
                return Err(Error::DuplicateColumn {
                    name: col.name.clone(),
                });
            }
            if col.len() != rows {
                return Err(Error::LengthMismatch {
                    column: col.name.clone(),
                    expected: rows,
                    actual: col.len(),
                });
            }
        }
        Ok(Self { columns })
    }

    /// Build a table from a header and row-major records.
    /// Short records are padded with `Missing`.
    pub fn from_rows(header: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        let mut columns: Vec<Column> = header
            .into_iter()
            .map(|name| Column::new(name, Vec::with_capacity(rows.len())))
            .collect();
        for row in rows {
            let mut row = row.into_iter();
            for col in &mut columns {
                col.cells.push(row.next().unwrap_or(Cell::Missing));
            }
        }
        Self::new(columns)
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::column_not_found(name))
    }

    pub fn column_mut(&mut self, name: &str) -> Result<&mut Column> {
        self.columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::column_not_found(name))
    }

    /// Replace the named column in place, or append it at the end.
    pub fn upsert_column(&mut self, name: &str, cells: Vec<Cell>) -> Result<()> {
        let rows = self.num_rows();
        if !self.columns.is_empty() && cells.len() != rows {
            return Err(Error::LengthMismatch {
                column: name.to_string(),
                expected: rows,
                actual: cells.len(),
            });
        }
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(col) => col.cells = cells,
            None => self.columns.push(Column::new(name, cells)),
        }
        Ok(())
    }

    /// Remove the named columns. Every name must exist.
    pub fn drop_columns(&mut self, names: &[&str]) -> Result<()> {
        if let Some(missing) = names.iter().find(|n| !self.has_column(n)) {
            return Err(Error::column_not_found(*missing));
        }
        self.columns.retain(|c| !names.contains(&c.name.as_str()));
        Ok(())
    }

    /// Keep rows whose mask entry is `true`.
    pub fn retain_rows(&mut self, mask: &[bool]) {
        for col in &mut self.columns {
            let mut keep = mask.iter();
            col.cells.retain(|_| keep.next().copied().unwrap_or(false));
        }
    }

    /// New table holding the given rows, in the given order.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|col| {
                let cells = indices
                    .iter()
                    .filter_map(|&i| col.cells.get(i).cloned())
                    .collect();
                Column::new(col.name.clone(), cells)
            })
            .collect();
        Table { columns }
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> Table {
        let indices: Vec<usize> = (0..n.min(self.num_rows())).collect();
        self.take_rows(&indices)
    }

    pub fn sort_columns_alphabetically(&mut self) {
        self.columns.sort_by(|a, b| a.name.cmp(&b.name));
    }

    /// Number of distinct non-missing values in a column.
    pub fn unique_count(&self, name: &str) -> Result<usize> {
        let col = self.column(name)?;
        let unique: BTreeSet<&Cell> = col.cells.iter().filter(|c| !c.is_missing()).collect();
        Ok(unique.len())
    }
}
