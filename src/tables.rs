use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{
    core::{attempt::Attempts, readings::Readings, series::Series},
    quantity::energy::KilowattHours,
};

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table
}

pub fn build_series_table(series: &Series) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Date", "Hour", "Zone", "Tariff", "Energy"]);
    for point in series.points() {
        table.add_row(vec![
            Cell::new(point.date.format("%b %d")).add_attribute(Attribute::Dim),
            Cell::new(point.hour),
            Cell::new(&point.zone_name),
            Cell::new(&point.tariff).add_attribute(Attribute::Dim),
            Cell::new(point.value).set_alignment(CellAlignment::Right).fg(
                if point.value > KilowattHours::ZERO { Color::Reset } else { Color::DarkGrey },
            ),
        ]);
    }
    for (zone, sum) in series.zones() {
        let zone_name = series.zone_names().get(zone).map_or(zone, String::as_str);
        table.add_row(vec![
            Cell::new("Zone").add_attribute(Attribute::Dim),
            Cell::new(""),
            Cell::new(zone_name),
            Cell::new(""),
            Cell::new(sum).set_alignment(CellAlignment::Right).add_attribute(Attribute::Bold),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total").add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(""),
        Cell::new(series.tariff().unwrap_or_default()),
        Cell::new(series.sum()).set_alignment(CellAlignment::Right).add_attribute(Attribute::Bold),
    ]);
    table
}

pub fn build_readings_table(readings: &Readings) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Date", "Zone", "Reading"]);
    for reading in &readings.0 {
        table.add_row(vec![
            Cell::new(reading.date),
            Cell::new(reading.zone.as_deref().unwrap_or_default()),
            Cell::new(reading.value).set_alignment(CellAlignment::Right),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total").add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(readings.total())
            .set_alignment(CellAlignment::Right)
            .add_attribute(Attribute::Bold),
    ]);
    table
}

pub fn build_attempts_table(attempts: &Attempts) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Endpoint", "Strategy", "Direction", "Day", "Status", "Bytes"]);
    for attempt in attempts.iter() {
        let status = attempt.status.map_or_else(|| "-".to_string(), |status| status.to_string());
        table.add_row(vec![
            Cell::new(&attempt.endpoint),
            Cell::new(format!("{:?}", attempt.strategy)).add_attribute(Attribute::Dim),
            Cell::new(attempt.direction.map(|direction| direction.as_str()).unwrap_or_default()),
            Cell::new(attempt.day.map(|day| day.to_string()).unwrap_or_default()),
            Cell::new(status).fg(if attempt.is_ok() { Color::Green } else { Color::Red }),
            Cell::new(attempt.bytes).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}
