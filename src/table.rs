use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime};
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;
use serde_json::Value;

use crate::error::{LoadError, SourceKind};

/// A dynamically typed value read from one of the pipeline artifacts.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Microseconds since the unix epoch.
    Timestamp(i64),
    List(Vec<Cell>),
    Record(Vec<(String, Cell)>),
    /// Display text of a value kind we do not model (decimals, dates, raw bytes).
    Other(String),
}

static NULL: Cell = Cell::Null;

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn from_field(field: &Field) -> Cell {
        match field {
            Field::Null => Cell::Null,
            Field::Bool(v) => Cell::Bool(*v),
            Field::Byte(v) => Cell::Int(i64::from(*v)),
            Field::Short(v) => Cell::Int(i64::from(*v)),
            Field::Int(v) => Cell::Int(i64::from(*v)),
            Field::Long(v) => Cell::Int(*v),
            Field::UByte(v) => Cell::Int(i64::from(*v)),
            Field::UShort(v) => Cell::Int(i64::from(*v)),
            Field::UInt(v) => Cell::Int(i64::from(*v)),
            Field::ULong(v) => match i64::try_from(*v) {
                Ok(v) => Cell::Int(v),
                Err(_) => Cell::Float(*v as f64),
            },
            Field::Float(v) => Cell::Float(f64::from(*v)),
            Field::Double(v) => Cell::Float(*v),
            Field::Str(v) => Cell::Text(v.clone()),
            Field::TimestampMillis(v) => Cell::Timestamp(v.saturating_mul(1000)),
            Field::TimestampMicros(v) => Cell::Timestamp(*v),
            Field::Group(row) => Cell::Record(
                row.get_column_iter()
                    .map(|(name, value)| (name.clone(), Cell::from_field(value)))
                    .collect(),
            ),
            Field::ListInternal(list) => {
                Cell::List(list.elements().iter().map(Cell::from_field).collect())
            }
            Field::MapInternal(map) => Cell::Record(
                map.entries()
                    .iter()
                    .map(|(key, value)| (key.to_string(), Cell::from_field(value)))
                    .collect(),
            ),
            other => Cell::Other(other.to_string()),
        }
    }

    pub fn from_json(value: Value) -> Cell {
        match value {
            Value::Null => Cell::Null,
            Value::Bool(v) => Cell::Bool(v),
            Value::Number(n) => match n.as_i64() {
                Some(v) => Cell::Int(v),
                None => n.as_f64().map(Cell::Float).unwrap_or(Cell::Null),
            },
            Value::String(s) => Cell::Text(s),
            Value::Array(items) => Cell::List(items.into_iter().map(Cell::from_json).collect()),
            Value::Object(map) => Cell::Record(
                map.into_iter()
                    .map(|(key, value)| (key, Cell::from_json(value)))
                    .collect(),
            ),
        }
    }

    // CSV exports carry every value as text; the typed accessors parse on demand.
    fn from_csv(raw: &str) -> Cell {
        if raw.is_empty() {
            Cell::Null
        } else {
            Cell::Text(raw.to_string())
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(v) => Some(*v),
            Cell::Float(v) => float_to_i64(*v),
            Cell::Bool(v) => Some(i64::from(*v)),
            Cell::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(float_to_i64))
            }
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) => Some(*v),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Finite numeric value; NaN and infinities count as missing.
    pub fn as_finite(&self) -> Option<f64> {
        self.as_f64().filter(|v| v.is_finite())
    }

    /// Non-empty textual form of a scalar.
    pub fn as_text(&self) -> Option<String> {
        let text = match self {
            Cell::Text(s) | Cell::Other(s) => s.trim().to_string(),
            Cell::Int(v) => v.to_string(),
            Cell::Float(v) if v.is_finite() => v.to_string(),
            Cell::Bool(v) => v.to_string(),
            _ => return None,
        };
        if text.is_empty() { None } else { Some(text) }
    }

    /// Pass-through form of a column nobody parses: CSV text that reads as a
    /// number becomes that number, so `NaN` and `inf` behave as in parquet.
    pub fn infer_scalar(&self) -> Cell {
        match self {
            Cell::Text(s) => {
                let t = s.trim();
                if let Ok(v) = t.parse::<i64>() {
                    Cell::Int(v)
                } else if let Ok(v) = t.parse::<f64>() {
                    Cell::Float(v)
                } else {
                    self.clone()
                }
            }
            other => other.clone(),
        }
    }

    pub fn as_timestamp(&self) -> Option<i64> {
        match self {
            Cell::Timestamp(v) | Cell::Int(v) => Some(*v),
            Cell::Text(s) => parse_timestamp_text(s.trim()),
            _ => None,
        }
    }

    /// List items; a text cell holding a JSON array is decoded.
    pub fn as_list(&self) -> Option<Vec<Cell>> {
        match self {
            Cell::List(items) => Some(items.clone()),
            Cell::Text(s) if s.trim_start().starts_with('[') => {
                match serde_json::from_str::<Value>(s) {
                    Ok(value @ Value::Array(_)) => match Cell::from_json(value) {
                        Cell::List(items) => Some(items),
                        _ => None,
                    },
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Named member of a record cell.
    pub fn field(&self, name: &str) -> &Cell {
        match self {
            Cell::Record(fields) => fields
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value)
                .unwrap_or(&NULL),
            _ => &NULL,
        }
    }
}

fn float_to_i64(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 9.2e18 {
        Some(v as i64)
    } else {
        None
    }
}

fn parse_timestamp_text(s: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_micros());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc().timestamp_micros());
        }
    }
    s.parse::<i64>().ok()
}

/// Column-addressable rows loaded from a parquet or CSV artifact.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let index = columns
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
        Self {
            columns,
            index,
            rows,
        }
    }

    pub fn read(kind: SourceKind, path: &Path) -> Result<Self, LoadError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("parquet") => read_parquet(kind, path),
            Some("csv") => read_csv(kind, path),
            _ => Err(LoadError::UnsupportedFormat {
                kind,
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn require_columns(
        &self,
        kind: SourceKind,
        path: &Path,
        names: &[&str],
    ) -> Result<(), LoadError> {
        let missing: Vec<String> = names
            .iter()
            .filter(|name| !self.has_column(name))
            .map(|name| name.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(LoadError::MissingColumns {
                kind,
                path: path.to_path_buf(),
                columns: missing,
            })
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> {
        self.rows.iter().map(move |cells| RowRef {
            table: self,
            cells,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    table: &'a Table,
    cells: &'a [Cell],
}

impl<'a> RowRef<'a> {
    /// Cell in the named column, `Null` when the column or cell is absent.
    pub fn get(&self, column: &str) -> &'a Cell {
        self.table
            .index
            .get(column)
            .and_then(|idx| self.cells.get(*idx))
            .unwrap_or(&NULL)
    }
}

fn read_parquet(kind: SourceKind, path: &Path) -> Result<Table, LoadError> {
    let file = File::open(path).map_err(|err| LoadError::unreadable(kind, path, err))?;
    let reader =
        SerializedFileReader::new(file).map_err(|err| LoadError::unreadable(kind, path, err))?;
    let file_meta = reader.metadata().file_metadata();
    let columns: Vec<String> = file_meta
        .schema()
        .get_fields()
        .iter()
        .map(|field| field.name().to_string())
        .collect();
    let expected_rows = usize::try_from(file_meta.num_rows()).unwrap_or(0);

    let iter = reader
        .get_row_iter(None)
        .map_err(|err| LoadError::unreadable(kind, path, err))?;
    let mut rows = Vec::with_capacity(expected_rows);
    for (idx, row) in iter.enumerate() {
        let row = row.map_err(|err| LoadError::malformed(kind, path, format!("row {idx}: {err}")))?;
        rows.push(
            row.get_column_iter()
                .map(|(_, field)| Cell::from_field(field))
                .collect(),
        );
    }
    Ok(Table::new(columns, rows))
}

fn read_csv(kind: SourceKind, path: &Path) -> Result<Table, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|err| LoadError::unreadable(kind, path, err))?;
    let columns: Vec<String> = reader
        .headers()
        .map_err(|err| LoadError::malformed(kind, path, format!("header: {err}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record =
            record.map_err(|err| LoadError::malformed(kind, path, format!("row {idx}: {err}")))?;
        rows.push(record.iter().map(Cell::from_csv).collect());
    }
    Ok(Table::new(columns, rows))
}
