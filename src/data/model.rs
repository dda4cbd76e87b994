use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::EmptyDatasetError;

/// Region value that disables the region predicate.
pub const ALL_REGIONS: &str = "All";

// ---------------------------------------------------------------------------
// CellValue – a pass-through cell from a non-core column
// ---------------------------------------------------------------------------

/// A dynamically-typed cell for columns the pipeline does not interpret
/// (host name, room type, review counts, ...). Kept so the presentation
/// layer can show them next to each listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => Ok(()),
        }
    }
}

impl CellValue {
    /// Parse a raw text cell, trying integer, float and bool before text.
    pub fn infer(s: &str) -> Self {
        if s.is_empty() {
            return CellValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::Float(f);
        }
        if s == "true" || s == "false" {
            return CellValue::Bool(s == "true");
        }
        CellValue::String(s.to_string())
    }

    /// Keep a text cell exactly as written; only an empty cell becomes null.
    pub fn raw(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Null
        } else {
            CellValue::String(s.to_string())
        }
    }

    /// Typed form of the cell: text is run through [`CellValue::infer`],
    /// already-typed cells are returned as they are.
    pub fn inferred(&self) -> CellValue {
        match self {
            CellValue::String(s) => CellValue::infer(s),
            other => other.clone(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Integer view of the cell. Floats are accepted only when integral,
    /// which is how Parquet/JSON writers often store whole prices.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Integer(i) => Some(*i),
            CellValue::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    /// Text view of the cell; numbers are rendered, null is absent.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            other => Some(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Listing – one row of the base table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    /// Opaque identifier; the source row number when the file has no `id` column.
    pub id: String,
    pub neighbourhood_group: String,
    pub latitude: f64,
    pub longitude: f64,
    pub price: i64,
    pub availability_365: i64,
    /// Columns not used by the pipeline, keyed by header name.
    #[serde(skip)]
    pub extra: BTreeMap<String, CellValue>,
}

// ---------------------------------------------------------------------------
// BaseTable – the loaded, price-validated dataset
// ---------------------------------------------------------------------------

/// Immutable set of listings with `price > 0`, in source order.
///
/// Constructed once by the loader and then only handed out by reference
/// (or behind an `Arc`); there is no way to mutate it after construction.
#[derive(Debug, Clone)]
pub struct BaseTable {
    source: PathBuf,
    listings: Vec<Listing>,
    regions: BTreeSet<String>,
    extra_columns: Vec<String>,
    dropped: usize,
}

impl BaseTable {
    /// Build a table from already-validated rows.
    ///
    /// Rows with a non-positive price are discarded here, so every
    /// constructor path upholds the positivity invariant.
    pub fn new(source: impl Into<PathBuf>, rows: Vec<Listing>, extra_columns: Vec<String>) -> Self {
        let total = rows.len();
        let listings: Vec<Listing> = rows.into_iter().filter(|l| l.price > 0).collect();
        let regions = listings
            .iter()
            .map(|l| l.neighbourhood_group.clone())
            .collect();

        BaseTable {
            source: source.into(),
            dropped: total - listings.len(),
            listings,
            regions,
            extra_columns,
        }
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Number of source rows removed by the positive-price filter.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Names of the pass-through columns, in source order.
    pub fn extra_columns(&self) -> &[String] {
        &self.extra_columns
    }

    /// Distinct region values, sorted ascending.
    pub fn regions(&self) -> &BTreeSet<String> {
        &self.regions
    }

    /// Selector options: `"All"` followed by every region, sorted.
    pub fn region_options(&self) -> Vec<String> {
        std::iter::once(ALL_REGIONS.to_string())
            .chain(self.regions.iter().cloned())
            .collect()
    }

    pub fn has_region(&self, region: &str) -> bool {
        self.regions.contains(region)
    }

    /// Signal the degraded state of a table with no valid listings.
    pub fn ensure_populated(&self) -> Result<(), EmptyDatasetError> {
        if self.listings.is_empty() {
            return Err(EmptyDatasetError {
                path: self.source.clone(),
                dropped: self.dropped,
            });
        }
        Ok(())
    }
}
