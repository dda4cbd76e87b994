use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;
use listings_explorer::config::{DEFAULT_DATA_PATH, DEFAULT_PRICE_CAP_QUANTILE, ExplorerConfig};
use listings_explorer::data::aggregate::DEFAULT_BIN_COUNT;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Listings file (.csv, .json or .parquet)
    #[arg(default_value = DEFAULT_DATA_PATH)]
    pub data_path: PathBuf,

    /// Number of equal-width bins in the price histogram
    #[arg(long, default_value_t = DEFAULT_BIN_COUNT)]
    pub bins: usize,

    /// Quantile of prices used as the initial upper price bound
    #[arg(long, default_value_t = DEFAULT_PRICE_CAP_QUANTILE)]
    pub price_quantile: f64,
}

impl Args {
    pub fn into_config(self) -> Result<ExplorerConfig> {
        if self.bins == 0 {
            bail!("--bins must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.price_quantile) {
            bail!("--price-quantile must be within 0..=1, got {}", self.price_quantile);
        }

        Ok(ExplorerConfig {
            data_path: self.data_path,
            histogram_bins: self.bins,
            price_cap_quantile: self.price_quantile,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_config_defaults() {
        let config = Args::parse_from(["listings-explorer"]).into_config().unwrap();
        assert_eq!(config, ExplorerConfig::default());
    }

    #[test]
    fn rejects_out_of_range_quantile() {
        let args = Args::parse_from(["listings-explorer", "--price-quantile", "1.5"]);
        assert!(args.into_config().is_err());
    }

    #[test]
    fn rejects_zero_bins() {
        let args = Args::parse_from(["listings-explorer", "x.csv", "--bins", "0"]);
        assert!(args.into_config().is_err());
    }
}
