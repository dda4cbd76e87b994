use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::model::{ALL_REGIONS, BaseTable, Listing};
use crate::error::InvalidFilterError;

// ---------------------------------------------------------------------------
// Filter predicate: region selector plus inclusive price window
// ---------------------------------------------------------------------------

/// The value produced by the filter controls on every interaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterSpec {
    /// `"All"` or one of the base table's regions.
    pub region: String,
    pub price_min: i64,
    pub price_max: i64,
}

impl FilterSpec {
    pub fn new(region: impl Into<String>, price_min: i64, price_max: i64) -> Self {
        Self {
            region: region.into(),
            price_min,
            price_max,
        }
    }

    /// Every region, prices in `[0, price_max]`.
    pub fn all_regions(price_max: i64) -> Self {
        Self::new(ALL_REGIONS, 0, price_max)
    }

    /// Check the spec against the table it will be applied to.
    pub fn validate(&self, base: &BaseTable) -> Result<(), InvalidFilterError> {
        if self.price_min > self.price_max {
            return Err(InvalidFilterError::InvertedRange {
                min: self.price_min,
                max: self.price_max,
            });
        }
        if self.region != ALL_REGIONS && !base.has_region(&self.region) {
            return Err(InvalidFilterError::UnknownRegion {
                region: self.region.clone(),
            });
        }
        Ok(())
    }

    /// A listing passes when both the region and the price predicate hold.
    pub fn matches(&self, listing: &Listing) -> bool {
        (self.region == ALL_REGIONS || listing.neighbourhood_group == self.region)
            && (self.price_min..=self.price_max).contains(&listing.price)
    }
}

/// Initial filter: all regions, prices from 0 up to the given quantile of
/// the base table's prices (truncated), which keeps extreme outliers out of
/// the first view.
pub fn default_filter(base: &BaseTable, quantile: f64) -> FilterSpec {
    let prices: Vec<i64> = base.listings().iter().map(|l| l.price).collect();
    let cap = price_quantile(&prices, quantile).map_or(0, |q| q.trunc() as i64);
    FilterSpec::all_regions(cap)
}

/// Quantile with linear interpolation between the two closest ranks.
/// `None` for an empty slice; `q` is clamped to `[0, 1]`.
pub fn price_quantile(prices: &[i64], q: f64) -> Option<f64> {
    if prices.is_empty() {
        return None;
    }
    let mut sorted = prices.to_vec();
    sorted.sort_unstable();

    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let (a, b) = (sorted[lo] as f64, sorted[hi] as f64);
    let t = rank - lo as f64;
    // Interpolate from the nearer end to keep the result exact at the ranks.
    if t < 0.5 {
        Some(a + (b - a) * t)
    } else {
        Some(b - (b - a) * (1.0 - t))
    }
}

// ---------------------------------------------------------------------------
// FilteredView – ordered subset of the base table
// ---------------------------------------------------------------------------

/// Listings of a base table that satisfy a [`FilterSpec`], in base order.
///
/// Holds row indices into the shared table rather than copies of the rows.
#[derive(Debug, Clone)]
pub struct FilteredView {
    base: Arc<BaseTable>,
    indices: Vec<usize>,
}

impl FilteredView {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Positions of the matching rows within the base table.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn iter(&self) -> impl Iterator<Item = &Listing> + '_ {
        let rows = self.base.listings();
        self.indices.iter().map(move |&i| &rows[i])
    }

    pub fn prices(&self) -> impl Iterator<Item = i64> + '_ {
        self.iter().map(|l| l.price)
    }

    /// `(latitude, longitude, price, region)` for point plotting.
    pub fn map_points(&self) -> impl Iterator<Item = (f64, f64, i64, &str)> + '_ {
        self.iter().map(|l| {
            (
                l.latitude,
                l.longitude,
                l.price,
                l.neighbourhood_group.as_str(),
            )
        })
    }
}

impl PartialEq for FilteredView {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.base, &other.base) && self.indices == other.indices
    }
}

/// Apply `spec` to `base`, producing a new view.
///
/// The spec is validated first; an inverted range or an unknown region is
/// rejected rather than repaired. An empty result is a normal outcome.
pub fn apply(base: &Arc<BaseTable>, spec: &FilterSpec) -> Result<FilteredView, InvalidFilterError> {
    spec.validate(base)?;

    let indices = base
        .listings()
        .iter()
        .enumerate()
        .filter(|(_, listing)| spec.matches(listing))
        .map(|(i, _)| i)
        .collect();

    Ok(FilteredView {
        base: Arc::clone(base),
        indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::listing;

    fn scenario_table() -> Arc<BaseTable> {
        Arc::new(BaseTable::new(
            "mem",
            vec![
                listing("1", "Manhattan", 100, 10),
                listing("2", "Manhattan", 200, 20),
                listing("3", "Brooklyn", 50, 30),
            ],
            Vec::new(),
        ))
    }

    fn ids(view: &FilteredView) -> Vec<&str> {
        view.iter().map(|l| l.id.as_str()).collect()
    }

    #[test]
    fn all_regions_keeps_base_order() {
        let base = scenario_table();
        let view = apply(&base, &FilterSpec::new("All", 0, 1000)).unwrap();
        assert_eq!(ids(&view), ["1", "2", "3"]);
    }

    #[test]
    fn region_is_exact_match() {
        let base = scenario_table();
        let view = apply(&base, &FilterSpec::new("Brooklyn", 0, 1000)).unwrap();
        assert_eq!(ids(&view), ["3"]);
    }

    #[test]
    fn price_bounds_are_inclusive() {
        let base = scenario_table();
        let view = apply(&base, &FilterSpec::new("All", 100, 200)).unwrap();
        assert_eq!(ids(&view), ["1", "2"]);
    }

    #[test]
    fn empty_result_is_not_an_error() {
        let base = scenario_table();
        let view = apply(&base, &FilterSpec::new("All", 500, 1000)).unwrap();
        assert!(view.is_empty());
    }

    #[test]
    fn inverted_range_is_rejected_not_swapped() {
        let base = scenario_table();
        let err = apply(&base, &FilterSpec::new("All", 200, 100)).unwrap_err();
        assert_eq!(err, InvalidFilterError::InvertedRange { min: 200, max: 100 });
    }

    #[test]
    fn unknown_region_is_rejected() {
        let base = scenario_table();
        let err = apply(&base, &FilterSpec::new("manhattan", 0, 1000)).unwrap_err();
        assert_eq!(
            err,
            InvalidFilterError::UnknownRegion {
                region: "manhattan".into()
            }
        );
    }

    #[test]
    fn quantile_interpolates_between_ranks() {
        assert_eq!(price_quantile(&[], 0.95), None);
        assert_eq!(price_quantile(&[7], 0.95), Some(7.0));
        // rank = 0.95 * 4 = 3.8 → 40 + 0.8 * (50 - 40)
        let q = price_quantile(&[50, 10, 30, 20, 40], 0.95).unwrap();
        assert!((q - 48.0).abs() < 1e-9);
    }

    #[test]
    fn default_filter_truncates_the_cap() {
        let base = scenario_table();
        // sorted [50, 100, 200], rank 0.25 * 2 = 0.5 → 75
        assert_eq!(default_filter(&base, 0.25), FilterSpec::all_regions(75));
        // rank 0.6 is nearer 100, so 100 - 0.4 * 50 = 80 exactly
        assert_eq!(default_filter(&base, 0.3), FilterSpec::all_regions(80));

        let empty = BaseTable::new("mem", Vec::new(), Vec::new());
        assert_eq!(default_filter(&empty, 0.95), FilterSpec::all_regions(0));
    }

    #[test]
    fn map_points_follow_view_order() {
        let base = scenario_table();
        let view = apply(&base, &FilterSpec::new("Manhattan", 0, 1000)).unwrap();
        let prices: Vec<i64> = view.map_points().map(|(_, _, price, _)| price).collect();
        assert_eq!(prices, [100, 200]);
    }
}
