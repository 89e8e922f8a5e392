use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, AsArray, LargeListArray, ListArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use calamine::{open_workbook_auto, Data, Reader};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Cell, Column, Table};
use crate::error::LoadError;

/// Sheet read when the caller does not name one.
pub const DEFAULT_SHEET: &str = "Sheet1";

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.xlsx` / `.xlsm` / `.xlsb` / `.xls` / `.ods` – worksheet `sheet`,
///   first row is the header
/// * `.csv`     – header row plus records
/// * `.json`    – `[{ "column": value, ... }, ...]`, as written by
///   `df.to_json(orient='records')`
/// * `.parquet` – any flat schema; list columns become ingredient lists
///
/// `sheet` only applies to workbooks.
pub fn load_file(path: &Path, sheet: &str) -> std::result::Result<Table, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let loaded = match ext.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => return load_workbook(path, sheet),
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => return Err(LoadError::UnsupportedFormat(other.to_string())),
    };
    let table = loaded.map_err(|err| malformed(path, err))?;
    log::info!(
        "loaded {} rows x {} columns from {}",
        table.num_rows(),
        table.num_columns(),
        path.display()
    );
    Ok(table)
}

fn malformed(path: &Path, err: anyhow::Error) -> LoadError {
    LoadError::Malformed {
        path: path.to_path_buf(),
        message: format!("{err:#}"),
    }
}

// ---------------------------------------------------------------------------
// Workbook loader
// ---------------------------------------------------------------------------

fn load_workbook(path: &Path, sheet: &str) -> std::result::Result<Table, LoadError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|err| malformed(path, anyhow::anyhow!("{err}").context("opening workbook")))?;

    let available = workbook.sheet_names();
    if !available.iter().any(|name| name == sheet) {
        return Err(LoadError::SheetNotFound {
            path: path.to_path_buf(),
            sheet: sheet.to_string(),
            available,
        });
    }

    let range = workbook
        .worksheet_range(sheet)
        .map_err(|err| malformed(path, anyhow::anyhow!("{err}").context("reading worksheet")))?;

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .map(|row| row.iter().enumerate().map(|(i, c)| header_name(&c.to_string(), i)).collect())
        .unwrap_or_default();
    let records: Vec<Vec<Cell>> = rows.map(|row| row.iter().map(workbook_cell).collect()).collect();

    let table = Table::from_rows(header, records)
        .map_err(|err| malformed(path, anyhow::Error::new(err)))?;
    log::info!(
        "loaded {} rows x {} columns from {} [{sheet}]",
        table.num_rows(),
        table.num_columns(),
        path.display()
    );
    Ok(table)
}

/// Blank headers get the `Unnamed: N` placeholder spreadsheet tools use.
fn header_name(raw: &str, idx: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        format!("Unnamed: {idx}")
    } else {
        trimmed.to_string()
    }
}

fn workbook_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Missing,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::number(*f),
        Data::String(s) if s.trim().is_empty() => Cell::Missing,
        Data::String(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one product per record.
/// Short records are padded with `Missing`; records longer than the header
/// are rejected.
fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;
    let header: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .enumerate()
        .map(|(i, h)| header_name(h, i))
        .collect();

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() > header.len() {
            bail!(
                "CSV row {row_no} has {} fields but the header has {}",
                record.len(),
                header.len()
            );
        }
        records.push(record.iter().map(Cell::parse).collect());
    }

    Ok(Table::from_rows(header, records)?)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON. Column order follows first appearance of each key.
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut header: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !header.contains(key) {
                header.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            header
                .iter()
                .map(|key| obj.get(key).map_or(Cell::Missing, json_to_cell))
                .collect()
        })
        .collect();

    Ok(Table::from_rows(header, rows)?)
}

fn json_to_cell(val: &JsonValue) -> Cell {
    match val {
        JsonValue::String(s) if s.trim().is_empty() => Cell::Missing,
        JsonValue::String(s) => Cell::Text(s.clone()),
        JsonValue::Number(n) => n.as_f64().map_or(Cell::Text(n.to_string()), Cell::number),
        JsonValue::Bool(b) => Cell::Text(b.to_string()),
        JsonValue::Null => Cell::Missing,
        JsonValue::Array(items) => Cell::List(
            items
                .iter()
                .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
                .collect(),
        ),
        other => Cell::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file written by Pandas, Polars or [`super::export`].
///
/// Numeric columns become numbers, list columns become ingredient lists and
/// everything else is read through its string form.
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let schema = builder.schema().clone();
    let reader = builder.build().context("building parquet reader")?;

    let mut columns: Vec<Column> = schema
        .fields()
        .iter()
        .map(|f| Column::new(f.name().clone(), Vec::new()))
        .collect();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for (idx, column) in columns.iter_mut().enumerate() {
            let cells = arrow_cells(batch.column(idx))
                .with_context(|| format!("column '{}'", column.name))?;
            column.cells.extend(cells);
        }
    }

    Ok(Table::new(columns)?)
}

// -- Parquet / Arrow helpers --

fn arrow_cells(col: &Arc<dyn Array>) -> Result<Vec<Cell>> {
    match col.data_type() {
        dt if dt.is_numeric() => {
            let floats = cast(col, &DataType::Float64).context("casting to Float64")?;
            let floats = floats.as_primitive::<arrow::datatypes::Float64Type>();
            Ok(floats.iter().map(|v| v.map_or(Cell::Missing, Cell::number)).collect())
        }
        DataType::List(_) => {
            let list = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            (0..list.len())
                .map(|row| list_cell(list.is_null(row), || list.value(row)))
                .collect()
        }
        DataType::LargeList(_) => {
            let list = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            (0..list.len())
                .map(|row| list_cell(list.is_null(row), || list.value(row)))
                .collect()
        }
        DataType::Struct(_) | DataType::Map(_, _) | DataType::Union(_, _) => {
            bail!("nested type {:?} is not a table column", col.data_type())
        }
        _ => {
            let strings = cast(col, &DataType::Utf8).context("casting to Utf8")?;
            let strings = strings.as_string::<i32>();
            Ok(strings
                .iter()
                .map(|v| v.map_or(Cell::Missing, Cell::from))
                .collect())
        }
    }
}

fn list_cell(is_null: bool, values: impl FnOnce() -> Arc<dyn Array>) -> Result<Cell> {
    if is_null {
        return Ok(Cell::Missing);
    }
    let items = cast(&values(), &DataType::Utf8).context("casting list items to Utf8")?;
    let items = items.as_string::<i32>();
    Ok(Cell::List(
        items.iter().flatten().map(str::to_string).collect(),
    ))
}
