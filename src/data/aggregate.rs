use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;

use super::filter::FilteredView;

/// Bin count used by the price histogram unless configured otherwise.
pub const DEFAULT_BIN_COUNT: usize = 40;

/// Shown in place of a statistic that is undefined for an empty view.
pub const NO_DATA: &str = "—";

// ---------------------------------------------------------------------------
// Summary metrics
// ---------------------------------------------------------------------------

/// Headline numbers for the current view. Statistics are `None` when the
/// view is empty; that is a defined "no data" state, not a failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub listing_count: usize,
    pub median_price: Option<f64>,
    pub mean_availability: Option<f64>,
}

impl SummaryMetrics {
    /// Mean availability truncated to whole days.
    pub fn mean_availability_days(&self) -> Option<i64> {
        self.mean_availability.map(|v| v.trunc() as i64)
    }

    /// `"48,884"`
    pub fn listing_count_label(&self) -> String {
        thousands(self.listing_count)
    }

    /// `"$106"`, truncated to whole currency units.
    pub fn median_price_label(&self) -> String {
        self.median_price
            .map_or_else(|| NO_DATA.to_string(), |p| format!("${}", p.trunc() as i64))
    }

    /// `"112 days"`
    pub fn availability_label(&self) -> String {
        self.mean_availability_days()
            .map_or_else(|| NO_DATA.to_string(), |d| format!("{d} days"))
    }
}

pub fn metrics(view: &FilteredView) -> SummaryMetrics {
    let mut prices: Vec<i64> = view.prices().collect();
    let availability: Vec<i64> = view.iter().map(|l| l.availability_365).collect();

    SummaryMetrics {
        listing_count: view.len(),
        median_price: median(&mut prices),
        mean_availability: mean(&availability),
    }
}

// ---------------------------------------------------------------------------
// Price histogram
// ---------------------------------------------------------------------------

/// One equal-width price bin. Every bin is `[lower, upper)` except the last,
/// which also includes `upper`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Split the observed price range of `view` into `bin_count` equal-width
/// bins, ascending by lower bound.
///
/// An empty view yields no bins. When every price is the same the range is
/// degenerate and a single `[price, price]` bin holds the whole view.
/// A `bin_count` of zero is treated as one.
pub fn histogram(view: &FilteredView, bin_count: usize) -> Vec<HistogramBin> {
    let Some((min, max)) = price_range(view) else {
        return Vec::new();
    };
    if min == max {
        return vec![HistogramBin {
            lower: min as f64,
            upper: max as f64,
            count: view.len(),
        }];
    }

    let n = bin_count.max(1);
    let (lo, hi) = (min as f64, max as f64);
    let width = (hi - lo) / n as f64;
    let edge = |i: usize| if i == n { hi } else { lo + width * i as f64 };

    let mut bins: Vec<HistogramBin> = (0..n)
        .map(|i| HistogramBin {
            lower: edge(i),
            upper: edge(i + 1),
            count: 0,
        })
        .collect();

    for price in view.prices() {
        let p = price as f64;
        let mut idx = (((p - lo) / width).floor() as usize).min(n - 1);
        // Rounding can land a value on the wrong side of a reported edge.
        if idx > 0 && p < bins[idx].lower {
            idx -= 1;
        } else if idx + 1 < n && p >= bins[idx + 1].lower {
            idx += 1;
        }
        bins[idx].count += 1;
    }
    bins
}

fn price_range(view: &FilteredView) -> Option<(i64, i64)> {
    view.prices().fold(None, |acc, p| match acc {
        None => Some((p, p)),
        Some((lo, hi)) => Some((lo.min(p), hi.max(p))),
    })
}

// ---------------------------------------------------------------------------
// Per-region summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub group: String,
    pub count: usize,
    pub median_price: f64,
    pub mean_price: f64,
}

/// Partition the view by region, reduce each partition, then order by
/// median price descending. Equal medians are ordered by region name.
pub fn group_summary(view: &FilteredView) -> Vec<GroupSummary> {
    let mut partitions: BTreeMap<&str, Vec<i64>> = BTreeMap::new();
    for listing in view.iter() {
        partitions
            .entry(listing.neighbourhood_group.as_str())
            .or_default()
            .push(listing.price);
    }

    let mut rows: Vec<GroupSummary> = partitions
        .into_iter()
        .filter_map(|(group, mut prices)| {
            Some(GroupSummary {
                group: group.to_string(),
                count: prices.len(),
                mean_price: mean(&prices)?,
                median_price: median(&mut prices)?,
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        b.median_price
            .total_cmp(&a.median_price)
            .then_with(|| a.group.cmp(&b.group))
    });
    rows
}

/// Write the group table as CSV with a header row.
pub fn write_group_summary_csv<W: Write>(groups: &[GroupSummary], writer: W) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in groups {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Median with the midpoint rule for even counts. Sorts `values` in place.
fn median(values: &mut [i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] as f64 + values[mid] as f64) / 2.0)
    } else {
        Some(values[mid] as f64)
    }
}

fn mean(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().map(|&v| v as f64).sum();
    Some(sum / values.len() as f64)
}

/// `1234567` → `"1,234,567"`
fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
