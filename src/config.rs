use std::path::PathBuf;

use crate::data::aggregate::DEFAULT_BIN_COUNT;

/// Dataset read when no path is given on the command line.
pub const DEFAULT_DATA_PATH: &str = "data/AB_NYC_2019.csv";

/// Quantile of the base prices used as the initial upper price bound.
pub const DEFAULT_PRICE_CAP_QUANTILE: f64 = 0.95;

/// Startup settings for the explorer.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplorerConfig {
    pub data_path: PathBuf,
    pub histogram_bins: usize,
    pub price_cap_quantile: f64,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            histogram_bins: DEFAULT_BIN_COUNT,
            price_cap_quantile: DEFAULT_PRICE_CAP_QUANTILE,
        }
    }
}
