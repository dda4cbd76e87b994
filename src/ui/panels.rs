use anyhow::Context;
use eframe::egui::{self, Color32, RichText, ScrollArea, Slider, Ui};
use egui_extras::{Column, TableBuilder};
use listings_explorer::data::aggregate::{GroupSummary, SummaryMetrics, write_group_summary_csv};
use listings_explorer::data::model::ALL_REGIONS;

use crate::app::ExplorerApp;

pub const NO_MATCHES: &str = "No listings match the current filters.";

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the filter controls and recompute when any of them changed.
pub fn side_panel(ui: &mut Ui, app: &mut ExplorerApp) {
    ui.heading("Filters");
    ui.separator();

    let session = &mut app.session;
    let options = session.state.base().region_options();
    let mut changed = false;

    // ---- Region selector ----
    ui.strong("Neighbourhood group");
    egui::ComboBox::from_id_salt("region")
        .selected_text(session.controls.region.as_str())
        .show_ui(ui, |ui: &mut Ui| {
            for region in &options {
                let mut text = RichText::new(region);
                if region != ALL_REGIONS {
                    text = text.color(session.colors.color_for(region));
                }
                if ui
                    .selectable_label(session.controls.region == *region, text)
                    .clicked()
                {
                    session.controls.region = region.clone();
                    changed = true;
                }
            }
        });
    ui.add_space(8.0);

    // ---- Price window ----
    ui.strong("Price range ($)");
    let cap = session.price_cap;
    let min_changed = ui
        .add(Slider::new(&mut session.controls.price_min, 0..=cap).text("min"))
        .changed();
    let max_changed = ui
        .add(Slider::new(&mut session.controls.price_max, 0..=cap).text("max"))
        .changed();
    if min_changed || max_changed {
        session.settle_range(min_changed);
        changed = true;
    }

    if let Some(err) = &session.filter_error {
        ui.add_space(8.0);
        ui.label(RichText::new(err).color(Color32::RED));
    }

    if changed {
        app.apply_controls();
    }
}

// ---------------------------------------------------------------------------
// Metrics row
// ---------------------------------------------------------------------------

pub fn metrics_row(ui: &mut Ui, metrics: &SummaryMetrics) {
    ui.columns(3, |cols| {
        metric(&mut cols[0], "Listings", metrics.listing_count_label());
        metric(&mut cols[1], "Median price", metrics.median_price_label());
        metric(&mut cols[2], "Avg availability", metrics.availability_label());
    });
}

fn metric(ui: &mut Ui, label: &str, value: String) {
    ui.label(RichText::new(label).weak());
    ui.label(RichText::new(value).size(26.0).strong());
}

// ---------------------------------------------------------------------------
// Neighbourhood overview table
// ---------------------------------------------------------------------------

pub fn group_table(ui: &mut Ui, groups: &[GroupSummary]) {
    ui.heading("Neighbourhood overview");
    if groups.is_empty() {
        ui.label(NO_MATCHES);
        return;
    }

    ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .column(Column::auto().at_least(160.0))
            .columns(Column::auto().at_least(100.0), 3)
            .header(20.0, |mut header| {
                for title in ["Neighbourhood group", "Listings", "Median price", "Mean price"] {
                    header.col(|ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|mut body| {
                for g in groups {
                    body.row(18.0, |mut row| {
                        row.col(|ui| {
                            ui.label(&g.group);
                        });
                        row.col(|ui| {
                            ui.label(g.count.to_string());
                        });
                        row.col(|ui| {
                            ui.label(format!("{:.1}", g.median_price));
                        });
                        row.col(|ui| {
                            ui.label(format!("{:.2}", g.mean_price));
                        });
                    });
                }
            });
    });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, app: &mut ExplorerApp) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(app);
                ui.close_menu();
            }
            if ui.button("Export summary…").clicked() {
                export_summary_dialog(app);
                ui.close_menu();
            }
        });

        ui.separator();

        let visible = app.session.state.current().map_or(0, |p| p.view.len());
        ui.label(format!(
            "{} listings loaded, {} visible",
            app.session.state.base().len(),
            visible
        ));

        if let Some(msg) = &app.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(app: &mut ExplorerApp) {
    let file = rfd::FileDialog::new()
        .set_title("Open listings")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        app.open(&path);
    }
}

pub fn export_summary_dialog(app: &mut ExplorerApp) {
    let Some(current) = app.session.state.current() else {
        return;
    };
    let Some(path) = rfd::FileDialog::new()
        .set_title("Export neighbourhood overview")
        .set_file_name("neighbourhood_overview.csv")
        .add_filter("CSV", &["csv"])
        .save_file()
    else {
        return;
    };

    let result = std::fs::File::create(&path)
        .context("creating export file")
        .and_then(|file| write_group_summary_csv(&current.groups, file).context("writing CSV"));

    match result {
        Ok(()) => log::info!("Exported {} groups to {}", current.groups.len(), path.display()),
        Err(e) => {
            log::error!("Export failed: {e:#}");
            app.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
