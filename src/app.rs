use std::path::Path;
use std::sync::Arc;

use eframe::egui;
use listings_explorer::config::ExplorerConfig;
use listings_explorer::data::filter::{FilterSpec, default_filter};
use listings_explorer::data::loader::DatasetCache;
use listings_explorer::data::model::BaseTable;
use listings_explorer::state::ExplorerState;

use crate::color::ColorMap;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// Session – one loaded dataset and its control values
// ---------------------------------------------------------------------------

/// Control-layer state for a loaded dataset, independent of rendering.
pub struct Session {
    pub state: ExplorerState,
    /// Values currently shown by the filter widgets.
    pub controls: FilterSpec,
    /// Upper end of the price sliders.
    pub price_cap: i64,
    pub colors: ColorMap,
    /// Why the last control change was rejected, if it was.
    pub filter_error: Option<String>,
}

impl Session {
    fn new(base: Arc<BaseTable>, config: &ExplorerConfig) -> Self {
        let controls = default_filter(&base, config.price_cap_quantile);
        let colors = ColorMap::new(base.regions());
        Session {
            price_cap: controls.price_max,
            state: ExplorerState::new(base, config.histogram_bins),
            controls,
            colors,
            filter_error: None,
        }
    }

    /// Keep `price_min <= price_max` after one slider moved: the bound that
    /// was not touched follows the one that was.
    pub fn settle_range(&mut self, min_changed: bool) {
        if self.controls.price_min > self.controls.price_max {
            if min_changed {
                self.controls.price_max = self.controls.price_min;
            } else {
                self.controls.price_min = self.controls.price_max;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct ExplorerApp {
    pub config: ExplorerConfig,
    pub cache: DatasetCache,
    pub session: Session,
    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl ExplorerApp {
    pub fn new(config: ExplorerConfig, cache: DatasetCache, base: Arc<BaseTable>) -> Self {
        let mut app = Self {
            status_message: degraded_status(&base),
            session: Session::new(base, &config),
            config,
            cache,
        };
        app.apply_controls();
        app
    }

    /// Switch to another dataset. A failed load keeps the current one.
    pub fn open(&mut self, path: &Path) {
        match self.cache.load(path) {
            Ok(base) => {
                self.status_message = degraded_status(&base);
                self.session = Session::new(base, &self.config);
                self.apply_controls();
            }
            Err(e) => {
                log::error!("Failed to load file: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Recompute the projections for the current control values.
    pub fn apply_controls(&mut self) {
        let spec = self.session.controls.clone();
        self.session.filter_error = self.session.state.refresh(spec).err().map(|e| e.to_string());
    }
}

/// An empty table still runs; every projection is simply empty.
fn degraded_status(base: &BaseTable) -> Option<String> {
    base.ensure_populated().err().map(|e| {
        log::warn!("{e}");
        format!("No data: {e}")
    })
}

impl eframe::App for ExplorerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, self);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, self);
            });

        // ---- Central panel: metrics, map, histogram, table ----
        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(current) = self.session.state.current() else {
                ui.centered_and_justified(|ui| {
                    ui.heading("No projections yet");
                });
                return;
            };
            panels::metrics_row(ui, &current.metrics);
            ui.separator();
            plot::map_and_histogram(ui, &current, &self.session.colors);
            ui.separator();
            panels::group_table(ui, &current.groups);
        });
    }
}
