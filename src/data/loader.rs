use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{BaseTable, CellValue, Listing};
use crate::error::DataLoadError;

/// Columns every source must provide.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "neighbourhood_group",
    "latitude",
    "longitude",
    "price",
    "availability_365",
];

const ID_COLUMN: &str = "id";

static NULL_CELL: CellValue = CellValue::Null;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load the listings table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one listing per line (the usual export)
/// * `.json`    – `[{ "neighbourhood_group": "...", "price": 120, ... }, ...]`
/// * `.parquet` – flat columns with the same names
///
/// Rows with `price <= 0` (or no price at all) are dropped, not reported.
pub fn load_file(path: &Path) -> Result<BaseTable, DataLoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let raw = match ext.as_str() {
        "csv" => read_csv(path)?,
        "json" => read_json(path)?,
        "parquet" | "pq" => read_parquet(path)?,
        other => {
            return Err(DataLoadError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: other.to_string(),
            });
        }
    };

    let table = build_table(path, raw)?;
    log::info!(
        "Loaded {} listings from {} ({} dropped for non-positive price)",
        table.len(),
        path.display(),
        table.dropped()
    );
    Ok(table)
}

/// Load-once memoization of base tables, keyed by path.
///
/// Owned by the host and passed around explicitly; a path that loaded
/// successfully is never read again. Failed loads are not cached.
#[derive(Debug, Default)]
pub struct DatasetCache {
    tables: HashMap<PathBuf, Arc<BaseTable>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spellings of the same file (`data/x.csv`, `./data/x.csv`) share one
    /// entry: the key is the absolute path with `.` components removed.
    pub fn load(&mut self, path: &Path) -> Result<Arc<BaseTable>, DataLoadError> {
        let key = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        if let Some(table) = self.tables.get(&key) {
            log::debug!("Reusing cached table for {}", path.display());
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(load_file(path)?);
        self.tables.insert(key, Arc::clone(&table));
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Format-independent row conversion
// ---------------------------------------------------------------------------

/// Header names plus rows of cells aligned with them.
struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

/// Positions of the interpreted columns within a [`RawTable`].
struct ColumnLayout {
    id: Option<usize>,
    group: usize,
    latitude: usize,
    longitude: usize,
    price: usize,
    availability: usize,
    extra: Vec<(usize, String)>,
}

impl ColumnLayout {
    fn resolve(headers: &[String]) -> Result<Self, Vec<String>> {
        let position = |name: &str| headers.iter().position(|h| h == name);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .into_iter()
            .filter(|c| position(*c).is_none())
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(missing);
        }

        let extra = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| h.as_str() != ID_COLUMN && !REQUIRED_COLUMNS.contains(&h.as_str()))
            .map(|(i, h)| (i, h.clone()))
            .collect();

        // Every required column was found above.
        let required = |name: &str| position(name).unwrap_or_default();
        Ok(ColumnLayout {
            id: position(ID_COLUMN),
            group: required("neighbourhood_group"),
            latitude: required("latitude"),
            longitude: required("longitude"),
            price: required("price"),
            availability: required("availability_365"),
            extra,
        })
    }
}

fn build_table(path: &Path, raw: RawTable) -> Result<BaseTable, DataLoadError> {
    let layout = ColumnLayout::resolve(&raw.headers).map_err(|columns| {
        DataLoadError::MissingColumns {
            path: path.to_path_buf(),
            columns,
        }
    })?;

    let listings = raw
        .rows
        .iter()
        .enumerate()
        .map(|(row_no, row)| listing_from_row(&layout, row, row_no))
        .collect::<Result<Vec<_>>>()
        .map_err(|e| DataLoadError::Malformed {
            path: path.to_path_buf(),
            reason: format!("{e:#}"),
        })?;

    let extra_columns = layout.extra.iter().map(|(_, name)| name.clone()).collect();
    Ok(BaseTable::new(path, listings, extra_columns))
}

fn listing_from_row(layout: &ColumnLayout, row: &[CellValue], row_no: usize) -> Result<Listing> {
    let cell = |idx: usize| row.get(idx).unwrap_or(&NULL_CELL);

    let id = layout
        .id
        .and_then(|idx| cell(idx).as_text())
        .unwrap_or_else(|| row_no.to_string());

    let neighbourhood_group = cell(layout.group)
        .as_text()
        .with_context(|| format!("Row {row_no}: 'neighbourhood_group' is empty"))?;

    // `id` and `neighbourhood_group` are read verbatim; only the remaining
    // columns go through type inference.
    let typed = |idx: usize| cell(idx).inferred();

    let latitude = finite(&typed(layout.latitude), row_no, "latitude")?;
    let longitude = finite(&typed(layout.longitude), row_no, "longitude")?;

    // A missing price never passes the positivity filter, so it is read as 0
    // and dropped along with the other non-positive rows.
    let price = match typed(layout.price) {
        CellValue::Null => 0,
        other => other
            .as_i64()
            .with_context(|| format!("Row {row_no}: price '{other}' is not an integer"))?,
    };

    let availability_365 = typed(layout.availability)
        .as_i64()
        .with_context(|| format!("Row {row_no}: 'availability_365' is not an integer"))?;
    if !(0..=365).contains(&availability_365) {
        bail!("Row {row_no}: availability_365 {availability_365} is outside 0..=365");
    }

    let extra = layout
        .extra
        .iter()
        .map(|(idx, name)| (name.clone(), typed(*idx)))
        .collect();

    Ok(Listing {
        id,
        neighbourhood_group,
        latitude,
        longitude,
        price,
        availability_365,
        extra,
    })
}

fn finite(value: &CellValue, row: usize, col: &str) -> Result<f64> {
    match value.as_f64() {
        Some(v) if v.is_finite() => Ok(v),
        _ => bail!("Row {row}: '{col}' value '{value}' is not a finite number"),
    }
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

fn read_csv(path: &Path) -> Result<RawTable, DataLoadError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| DataLoadError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DataLoadError::Malformed {
            path: path.to_path_buf(),
            reason: format!("reading CSV headers: {e}"),
        })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let rows = csv_rows(&mut reader).map_err(|e| DataLoadError::Malformed {
        path: path.to_path_buf(),
        reason: format!("{e:#}"),
    })?;

    Ok(RawTable { headers, rows })
}

fn csv_rows<R: std::io::Read>(reader: &mut csv::Reader<R>) -> Result<Vec<Vec<CellValue>>> {
    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(record.iter().map(|v| CellValue::raw(v.trim())).collect());
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// JSON reader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`). Headers are the
/// union of all record keys; a key absent from a record reads as null.
fn read_json(path: &Path) -> Result<RawTable, DataLoadError> {
    let text = std::fs::read_to_string(path).map_err(|e| DataLoadError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    json_rows(&text).map_err(|e| DataLoadError::Malformed {
        path: path.to_path_buf(),
        reason: format!("{e:#}"),
    })
}

fn json_rows(text: &str) -> Result<RawTable> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut headers: Vec<String> = Vec::new();
    let mut objects = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
        objects.push(obj);
    }

    let rows = objects
        .iter()
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map(json_to_cell).unwrap_or(CellValue::Null))
                .collect()
        })
        .collect();

    Ok(RawTable { headers, rows })
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Flat Parquet file as written by `df.to_parquet()` or Polars.
fn read_parquet(path: &Path) -> Result<RawTable, DataLoadError> {
    let file = std::fs::File::open(path).map_err(|e| DataLoadError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    parquet_rows(file).map_err(|e| DataLoadError::Malformed {
        path: path.to_path_buf(),
        reason: format!("{e:#}"),
    })
}

fn parquet_rows(file: std::fs::File) -> Result<RawTable> {
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .map(|col| arrow_cell(col, row))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("Row {}", rows.len()))?;
            rows.push(cells);
        }
    }

    Ok(RawTable { headers, rows })
}

/// Extract a single cell from an Arrow column at a given row.
fn arrow_cell(col: &ArrayRef, row: usize) -> Result<CellValue> {
    if col.is_null(row) {
        return Ok(CellValue::Null);
    }
    let cell = match col.data_type() {
        DataType::Utf8 => CellValue::String(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => CellValue::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => CellValue::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => CellValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => CellValue::Float(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => CellValue::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => CellValue::Bool(col.as_boolean().value(row)),
        _ => CellValue::String(array_value_to_string(col, row)?),
    };
    Ok(cell)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout_for(headers: &[&str]) -> ColumnLayout {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        match ColumnLayout::resolve(&headers) {
            Ok(layout) => layout,
            Err(missing) => panic!("unexpected missing columns {missing:?}"),
        }
    }

    fn cells(values: &[&str]) -> Vec<CellValue> {
        values.iter().map(|v| CellValue::raw(v)).collect()
    }

    const HEADERS: [&str; 7] = [
        "id",
        "name",
        "neighbourhood_group",
        "latitude",
        "longitude",
        "price",
        "availability_365",
    ];

    #[test]
    fn resolve_lists_every_missing_column() {
        let headers = vec!["id".to_string(), "price".to_string()];
        let missing = ColumnLayout::resolve(&headers).err().unwrap();
        assert_eq!(
            missing,
            ["neighbourhood_group", "latitude", "longitude", "availability_365"]
        );
    }

    #[test]
    fn extra_columns_are_kept_in_source_order() {
        let layout = layout_for(&["room_type", "id", "neighbourhood_group", "latitude", "longitude", "price", "availability_365", "host_name"]);
        let names: Vec<&str> = layout.extra.iter().map(|(_, n)| n.as_str()).collect();
        assert_eq!(names, ["room_type", "host_name"]);
    }

    #[test]
    fn converts_a_well_formed_row() {
        let layout = layout_for(&HEADERS);
        let row = cells(&["2539", "Clean & quiet apt", "Brooklyn", "40.64749", "-73.97237", "149", "365"]);
        let listing = listing_from_row(&layout, &row, 0).unwrap();

        assert_eq!(listing.id, "2539");
        assert_eq!(listing.neighbourhood_group, "Brooklyn");
        assert_eq!(listing.price, 149);
        assert_eq!(listing.availability_365, 365);
        assert_eq!(
            listing.extra.get("name"),
            Some(&CellValue::String("Clean & quiet apt".into()))
        );
    }

    #[test]
    fn missing_id_column_falls_back_to_row_number() {
        let layout = layout_for(&["neighbourhood_group", "latitude", "longitude", "price", "availability_365"]);
        let row = cells(&["Queens", "40.7", "-73.8", "80", "12"]);
        assert_eq!(listing_from_row(&layout, &row, 7).unwrap().id, "7");
    }

    #[test]
    fn id_and_region_text_is_not_reformatted() {
        let layout = layout_for(&HEADERS);
        let first = cells(&["007", "x", "Infinity", "40.8", "-73.9", "100", "10"]);
        let second = cells(&["7", "x", "1.50", "40.8", "-73.9", "100", "10"]);

        let a = listing_from_row(&layout, &first, 0).unwrap();
        let b = listing_from_row(&layout, &second, 1).unwrap();
        assert_eq!((a.id.as_str(), a.neighbourhood_group.as_str()), ("007", "Infinity"));
        assert_eq!((b.id.as_str(), b.neighbourhood_group.as_str()), ("7", "1.50"));
    }

    #[test]
    fn extra_columns_are_typed() {
        let layout = layout_for(&HEADERS);
        let row = cells(&["1", "42", "Bronx", "40.8", "-73.9", "100", "10"]);
        let listing = listing_from_row(&layout, &row, 0).unwrap();
        assert_eq!(listing.extra.get("name"), Some(&CellValue::Integer(42)));
    }

    #[test]
    fn empty_price_reads_as_zero() {
        let layout = layout_for(&HEADERS);
        let row = cells(&["1", "x", "Bronx", "40.8", "-73.9", "", "10"]);
        assert_eq!(listing_from_row(&layout, &row, 0).unwrap().price, 0);
    }

    #[test]
    fn rejects_fractional_price() {
        let layout = layout_for(&HEADERS);
        let row = cells(&["1", "x", "Bronx", "40.8", "-73.9", "99.5", "10"]);
        let err = listing_from_row(&layout, &row, 3).unwrap_err();
        assert!(format!("{err:#}").contains("Row 3"));
    }

    #[test]
    fn rejects_non_finite_coordinates() {
        let layout = layout_for(&HEADERS);
        let row = cells(&["1", "x", "Bronx", "NaN", "-73.9", "100", "10"]);
        assert!(listing_from_row(&layout, &row, 0).is_err());
    }

    #[test]
    fn rejects_availability_outside_a_year() {
        let layout = layout_for(&HEADERS);
        let row = cells(&["1", "x", "Bronx", "40.8", "-73.9", "100", "366"]);
        assert!(listing_from_row(&layout, &row, 0).is_err());
    }

    #[test]
    fn json_headers_are_union_of_keys() {
        let raw = json_rows(
            r#"[{"neighbourhood_group": "Bronx", "price": 50},
                {"price": 70.0, "room_type": "Private room"}]"#,
        )
        .unwrap();

        assert_eq!(raw.headers, ["neighbourhood_group", "price", "room_type"]);
        assert_eq!(raw.rows[1][0], CellValue::Null);
        assert_eq!(raw.rows[1][1], CellValue::Float(70.0));
    }

    #[test]
    fn json_rejects_non_array_root() {
        assert!(json_rows(r#"{"price": 1}"#).is_err());
    }
}
