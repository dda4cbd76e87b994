use std::collections::BTreeMap;

use eframe::egui::{Color32, Ui, vec2};
use egui_extras::{Size, StripBuilder};
use egui_plot::{Bar, BarChart, Legend, Plot, Points};
use listings_explorer::data::aggregate::HistogramBin;
use listings_explorer::data::filter::FilteredView;
use listings_explorer::pipeline::Projections;

use crate::color::ColorMap;
use crate::ui::panels::NO_MATCHES;

const CHART_HEIGHT: f32 = 360.0;

// ---------------------------------------------------------------------------
// Map (2/3) + price distribution (1/3)
// ---------------------------------------------------------------------------

pub fn map_and_histogram(ui: &mut Ui, projections: &Projections, colors: &ColorMap) {
    if projections.view.is_empty() {
        ui.label(NO_MATCHES);
        return;
    }

    ui.allocate_ui(vec2(ui.available_width(), CHART_HEIGHT), |ui: &mut Ui| {
        StripBuilder::new(ui)
            .size(Size::relative(2.0 / 3.0))
            .size(Size::remainder())
            .horizontal(|mut strip| {
                strip.cell(|ui| {
                    ui.strong("Listings map");
                    listings_map(ui, &projections.view, colors);
                });
                strip.cell(|ui| {
                    ui.strong("Price distribution");
                    price_histogram(ui, &projections.histogram);
                });
            });
    });
}

/// Scatter of listing coordinates, one series per region.
fn listings_map(ui: &mut Ui, view: &FilteredView, colors: &ColorMap) {
    let mut by_region: BTreeMap<&str, Vec<[f64; 2]>> = BTreeMap::new();
    for (lat, lon, _price, region) in view.map_points() {
        by_region.entry(region).or_default().push([lon, lat]);
    }

    Plot::new("listings_map")
        .legend(Legend::default())
        .x_axis_label("Longitude")
        .y_axis_label("Latitude")
        .data_aspect(1.0)
        .allow_boxed_zoom(true)
        .show(ui, |plot_ui| {
            for (region, points) in by_region {
                plot_ui.points(
                    Points::new(points)
                        .name(region)
                        .color(colors.color_for(region))
                        .radius(1.5),
                );
            }
        });
}

fn price_histogram(ui: &mut Ui, bins: &[HistogramBin]) {
    let bars: Vec<Bar> = bins
        .iter()
        .map(|b| {
            let center = (b.lower + b.upper) / 2.0;
            // A single-valued view has one zero-width bin.
            let width = (b.upper - b.lower).max(1.0);
            Bar::new(center, b.count as f64).width(width)
        })
        .collect();

    Plot::new("price_histogram")
        .x_axis_label("Price ($)")
        .y_axis_label("Listings")
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name("Listings").color(Color32::LIGHT_BLUE));
        });
}
