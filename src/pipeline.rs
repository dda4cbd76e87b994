use std::sync::Arc;

use crate::data::aggregate::{self, GroupSummary, HistogramBin, SummaryMetrics};
use crate::data::filter::{self, FilterSpec, FilteredView};
use crate::data::model::BaseTable;
use crate::error::InvalidFilterError;

/// Everything the presentation layer shows for one filter selection.
///
/// Always produced whole; no field is ever updated on its own.
#[derive(Debug, Clone)]
pub struct Projections {
    pub spec: FilterSpec,
    pub view: FilteredView,
    pub metrics: SummaryMetrics,
    pub histogram: Vec<HistogramBin>,
    pub groups: Vec<GroupSummary>,
}

/// Filter `base` with `spec` and derive all projections from the result.
pub fn run(
    base: &Arc<BaseTable>,
    spec: &FilterSpec,
    bin_count: usize,
) -> Result<Projections, InvalidFilterError> {
    let view = filter::apply(base, spec)?;

    Ok(Projections {
        spec: spec.clone(),
        metrics: aggregate::metrics(&view),
        histogram: aggregate::histogram(&view, bin_count),
        groups: aggregate::group_summary(&view),
        view,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aggregate::DEFAULT_BIN_COUNT;
    use crate::data::model::tests::listing;

    #[test]
    fn run_derives_every_projection_from_one_view() {
        let base = Arc::new(BaseTable::new(
            "mem",
            vec![
                listing("1", "Manhattan", 100, 100),
                listing("2", "Manhattan", 200, 300),
                listing("3", "Brooklyn", 50, 200),
            ],
            Vec::new(),
        ));

        let out = run(&base, &FilterSpec::new("All", 60, 1000), DEFAULT_BIN_COUNT).unwrap();

        assert_eq!(out.view.len(), 2);
        assert_eq!(out.metrics.listing_count, 2);
        assert_eq!(out.metrics.mean_availability, Some(200.0));
        assert_eq!(out.histogram.iter().map(|b| b.count).sum::<usize>(), 2);
        assert_eq!(out.groups.len(), 1);
        assert_eq!(out.spec, FilterSpec::new("All", 60, 1000));
    }

    #[test]
    fn run_rejects_invalid_spec() {
        let base = Arc::new(BaseTable::new("mem", Vec::new(), Vec::new()));
        assert!(run(&base, &FilterSpec::new("All", 1, 0), DEFAULT_BIN_COUNT).is_err());
    }
}
