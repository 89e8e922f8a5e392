use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, ListBuilder, StringArray, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use rust_xlsxwriter::Workbook;
use serde_json::{Map, Value as JsonValue};

use super::loader::DEFAULT_SHEET;
use super::model::{Cell, Column, ColumnKind, Table};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Write a table to a file.  Dispatch by extension (`xlsx`, `csv`, `json`,
/// `parquet`). Column and row order are written exactly as held in memory.
pub fn save_table(table: &Table, path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "xlsx" => save_xlsx(table, path),
        "csv" => save_csv(table, path),
        "json" => save_json(table, path),
        "parquet" | "pq" => save_parquet(table, path),
        other => Err(Error::export(path, format!("unsupported file extension: .{other}"))),
    }
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

fn save_xlsx(table: &Table, path: &Path) -> Result<()> {
    let fail = |err: rust_xlsxwriter::XlsxError| Error::export(path, err);
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(DEFAULT_SHEET).map_err(fail)?;

    for (c, col) in table.columns().iter().enumerate() {
        let c = u16::try_from(c).map_err(|_| Error::export(path, "too many columns for xlsx"))?;
        sheet.write_string(0, c, &col.name).map_err(fail)?;
        for (r, cell) in col.cells.iter().enumerate() {
            let r = u32::try_from(r + 1).map_err(|_| Error::export(path, "too many rows for xlsx"))?;
            match cell {
                Cell::Number(v) => sheet.write_number(r, c, *v).map(|_| ()),
                Cell::Text(_) | Cell::List(_) => sheet.write_string(r, c, cell.to_string()).map(|_| ()),
                Cell::Missing => Ok(()),
            }
            .map_err(fail)?;
        }
    }

    workbook.save(path).map_err(fail)
}

fn save_csv(table: &Table, path: &Path) -> Result<()> {
    let fail = |err: csv::Error| Error::export(path, err);
    let mut writer = csv::Writer::from_path(path).map_err(fail)?;
    writer.write_record(table.column_names()).map_err(fail)?;
    for row in 0..table.num_rows() {
        let record: Vec<String> = table
            .columns()
            .iter()
            .map(|col| col.cells[row].to_string())
            .collect();
        writer.write_record(&record).map_err(fail)?;
    }
    writer.flush().map_err(|err| Error::export(path, err))
}

/// Records-oriented JSON; lists are written comma-joined, missing as `null`.
fn save_json(table: &Table, path: &Path) -> Result<()> {
    let records: Vec<JsonValue> = (0..table.num_rows())
        .map(|row| {
            let obj: Map<String, JsonValue> = table
                .columns()
                .iter()
                .map(|col| (col.name.clone(), cell_to_json(&col.cells[row])))
                .collect();
            JsonValue::Object(obj)
        })
        .collect();
    let text = serde_json::to_string_pretty(&records).map_err(|err| Error::export(path, err))?;
    std::fs::write(path, text).map_err(|err| Error::export(path, err))
}

fn cell_to_json(cell: &Cell) -> JsonValue {
    match cell {
        Cell::Number(v) => serde_json::Number::from_f64(*v).map_or(JsonValue::Null, JsonValue::Number),
        Cell::Text(_) | Cell::List(_) => JsonValue::String(cell.to_string()),
        Cell::Missing => JsonValue::Null,
    }
}

fn save_parquet(table: &Table, path: &Path) -> Result<()> {
    let batch = to_record_batch(table)?;
    let file = std::fs::File::create(path).map_err(|err| Error::export(path, err))?;
    let fail = |err: parquet::errors::ParquetError| Error::export(path, err);
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).map_err(fail)?;
    writer.write(&batch).map_err(fail)?;
    writer.close().map_err(fail)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Arrow conversion
// ---------------------------------------------------------------------------

/// Convert a table to one Arrow batch: numeric columns as `Float64`, list
/// columns as `List<Utf8>`, everything else as `Utf8`.
pub fn to_record_batch(table: &Table) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(table.num_columns());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.num_columns());

    for col in table.columns() {
        let (data_type, array) = column_array(col);
        fields.push(Field::new(col.name.clone(), data_type, true));
        arrays.push(array);
    }

    let schema = Arc::new(Schema::new(fields));
    RecordBatch::try_new(schema, arrays).map_err(|err| Error::export("<record batch>", err))
}

fn column_array(col: &Column) -> (DataType, ArrayRef) {
    match col.kind() {
        ColumnKind::Numeric => {
            let values: Float64Array = col.cells.iter().map(Cell::as_number).collect();
            (DataType::Float64, Arc::new(values))
        }
        ColumnKind::Text => {
            let values: StringArray = col
                .cells
                .iter()
                .map(|c| (!c.is_missing()).then(|| c.to_string()))
                .collect();
            (DataType::Utf8, Arc::new(values))
        }
        ColumnKind::List => {
            let mut builder = ListBuilder::new(StringBuilder::new());
            for cell in &col.cells {
                match cell {
                    Cell::List(items) => {
                        for item in items {
                            builder.values().append_value(item);
                        }
                        builder.append(true);
                    }
                    Cell::Missing => builder.append(false),
                    other => {
                        builder.values().append_value(other.to_string());
                        builder.append(true);
                    }
                }
            }
            let array = builder.finish();
            (array.data_type().clone(), Arc::new(array))
        }
    }
}
