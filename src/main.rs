mod app;
mod cli;
mod color;
mod ui;

use anyhow::Context;
use app::ExplorerApp;
use clap::Parser;
use eframe::egui;
use listings_explorer::data::loader::DatasetCache;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = cli::Args::parse().into_config()?;

    // A dataset that cannot be loaded aborts startup; nothing is shown.
    let mut cache = DatasetCache::new();
    let base = cache
        .load(&config.data_path)
        .context("loading listings")
        .inspect_err(|e| log::error!("{e:#}"))?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Listings Explorer",
        options,
        Box::new(move |_cc| Ok(Box::new(ExplorerApp::new(config, cache, base)))),
    )
    .map_err(|e| anyhow::anyhow!("running the UI: {e}"))
}
