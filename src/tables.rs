use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{
    core::{
        price::{PriceSeries, PriceStatistics},
        reconciler::Correction,
        schedule::DeviceSchedule,
        status::{ObservedState, Status},
    },
    quantity::price::KilowattHourPrice,
};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

pub fn build_prices_table(series: &PriceSeries, statistics: &PriceStatistics) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Date", "Start", "Price"]);
    for sample in series.samples() {
        table.add_row(vec![
            Cell::new(sample.timestamp.format("%b %d")).add_attribute(Attribute::Dim),
            Cell::new(sample.timestamp.format("%H:%M")),
            Cell::new(sample.price).set_alignment(CellAlignment::Right).fg(
                if sample.price < KilowattHourPrice::ZERO {
                    Color::Cyan
                } else if sample.price >= statistics.median {
                    Color::Red
                } else {
                    Color::Green
                },
            ),
        ]);
    }
    table
}

pub fn build_statistics_table(statistics: &PriceStatistics) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Min", "Max", "Mean", "Median"]);
    table.add_row(vec![
        Cell::new(statistics.min).fg(Color::Green),
        Cell::new(statistics.max).fg(Color::Red),
        Cell::new(statistics.mean),
        Cell::new(statistics.median).add_attribute(Attribute::Bold),
    ]);
    table
}

pub fn build_windows_table(device_name: &str, schedule: &DeviceSchedule) -> Table {
    let average_header = format!("Average (< {})", schedule.threshold);
    let mut table = new_table();
    table.set_header(vec![device_name, "Start", "End", "Duration", average_header.as_str()]);
    for window in &schedule.windows {
        table.add_row(vec![
            Cell::new(window.start.format("%b %d")).add_attribute(Attribute::Dim),
            Cell::new(window.start.format("%H:%M")),
            Cell::new(window.end.format("%H:%M")).add_attribute(Attribute::Dim),
            Cell::new(format!("{} min", window.duration_minutes)).set_alignment(CellAlignment::Right),
            Cell::new(window.average_price).set_alignment(CellAlignment::Right).fg(Color::Green),
        ]);
    }
    table
}

pub fn build_status_table(status: &Status) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        "Device", "Override", "Policy", "Threshold", "Windows", "Desired", "Observed", "Action",
    ]);
    for (name, device) in &status.devices {
        table.add_row(vec![
            Cell::new(name).add_attribute(Attribute::Bold),
            Cell::new(device.override_),
            Cell::new(device.policy),
            Cell::new(device.threshold.map_or_else(|| "n/a".to_owned(), |threshold| threshold.to_string()))
                .set_alignment(CellAlignment::Right),
            Cell::new(device.windows.len()).set_alignment(CellAlignment::Right),
            Cell::new(if device.desired { "on" } else { "off" }),
            match device.observed {
                ObservedState::On => Cell::new("on").fg(Color::Green),
                ObservedState::Off => Cell::new("off").add_attribute(Attribute::Dim),
                ObservedState::Unreachable => Cell::new("unreachable").fg(Color::Red),
            },
            match device.correction {
                Correction::NotNeeded => Cell::new("").add_attribute(Attribute::Dim),
                Correction::Applied => Cell::new("switched").fg(Color::DarkYellow),
                Correction::Failed => Cell::new("failed").fg(Color::Red),
                Correction::Skipped => Cell::new("skipped").fg(Color::Red),
            },
        ]);
    }
    table
}
