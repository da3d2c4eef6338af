use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use itertools::Itertools;
use ordered_float::OrderedFloat;

use crate::{
    core::{YearSummary, dispatch::DispatchDecision, dispatch::HourlyStep},
    finance::Appraisal,
    quantity::{cost::Dollars, power::Megawatts, price::MegawattHourPrice},
};

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table
}

fn dollars_cell(value: Dollars) -> Cell {
    Cell::new(value.round_to_cents()).set_alignment(CellAlignment::Right).fg(
        if value < Dollars::ZERO { Color::Red } else { Color::Reset },
    )
}

#[must_use]
pub fn build_years_table(summaries: &[YearSummary], solar_capacity: Megawatts) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        "Year",
        "Solar revenue",
        "Battery revenue",
        "Total",
        "Capture price",
        "Capacity factor",
        "Cycles",
        "Active days",
        "Per active day",
        "Average SoC",
        "Capacity",
        "Efficiency",
    ]);
    for summary in summaries {
        table.add_row(vec![
            Cell::new(summary.year).fg(if summary.is_replaced { Color::Magenta } else { Color::Reset }),
            dollars_cell(summary.solar_revenue),
            dollars_cell(summary.battery_revenue),
            dollars_cell(summary.total_revenue()).add_attribute(Attribute::Bold),
            summary.capture_price().map_or_else(
                || Cell::new("n/a").add_attribute(Attribute::Dim),
                |price| Cell::new(price).set_alignment(CellAlignment::Right),
            ),
            summary.capacity_factor(solar_capacity).map_or_else(
                || Cell::new("n/a").add_attribute(Attribute::Dim),
                |factor| {
                    Cell::new(format!("{:.1}%", factor * 100.0)).set_alignment(CellAlignment::Right)
                },
            ),
            Cell::new(format!("{:.1}", summary.full_cycles)).set_alignment(CellAlignment::Right),
            Cell::new(summary.n_active_days).set_alignment(CellAlignment::Right),
            dollars_cell(summary.average_active_day_revenue),
            Cell::new(summary.average_state_of_charge).set_alignment(CellAlignment::Right),
            Cell::new(summary.end_capacity).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}%", summary.end_efficiency * 100.0))
                .set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

#[must_use]
pub fn build_steps_table(steps: &[HourlyStep]) -> Table {
    let median_price = steps
        .iter()
        .map(|step| OrderedFloat(step.price.0))
        .sorted()
        .nth(steps.len() / 2)
        .map_or(MegawattHourPrice::ZERO, |price| MegawattHourPrice::from(price.0));

    let mut table = new_table();
    table.set_header(vec![
        "Time",
        "Price",
        "Solar",
        "Action",
        "Self-supply",
        "Grid",
        "After",
        "Solar revenue",
        "Battery revenue",
    ]);
    for step in steps {
        let (action, color) = match step.decision {
            DispatchDecision::Charge(amount) => (format!("+{amount}"), Color::Green),
            DispatchDecision::Discharge(amount) => (format!("-{amount}"), Color::Red),
            DispatchDecision::Idle => ("idle".to_string(), Color::Reset),
        };
        table.add_row(vec![
            Cell::new(step.timestamp.format("%Y-%m-%d %H:%M")).add_attribute(Attribute::Dim),
            Cell::new(step.price).set_alignment(CellAlignment::Right).fg(
                if step.price >= median_price { Color::Red } else { Color::Green },
            ),
            Cell::new(step.generation).set_alignment(CellAlignment::Right),
            Cell::new(action).fg(color),
            Cell::new(step.self_supply).set_alignment(CellAlignment::Right),
            Cell::new(step.battery_grid_energy).set_alignment(CellAlignment::Right),
            Cell::new(step.state_of_charge_after).set_alignment(CellAlignment::Right),
            dollars_cell(step.solar_revenue),
            dollars_cell(step.battery_revenue),
        ]);
    }
    table
}

#[must_use]
pub fn build_appraisals_table(appraisals: &[Appraisal]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Scenario", "ITC", "Investment", "NPV", "IRR", "Payback"]);
    for appraisal in appraisals {
        table.add_row(vec![
            Cell::new(&appraisal.scenario).add_attribute(Attribute::Bold),
            Cell::new(format!("{:.0}%", appraisal.itc * 100.0)).set_alignment(CellAlignment::Right),
            dollars_cell(appraisal.initial_investment),
            dollars_cell(appraisal.npv),
            appraisal.irr.map_or_else(
                || Cell::new("n/a").add_attribute(Attribute::Dim),
                |irr| Cell::new(format!("{:.2}%", irr * 100.0)).set_alignment(CellAlignment::Right),
            ),
            appraisal.payback_year.map_or_else(
                || Cell::new("never").fg(Color::Red),
                |year| Cell::new(year).set_alignment(CellAlignment::Right),
            ),
        ]);
    }
    table
}

/// Yearly cash flows side by side, one column per scenario.
#[must_use]
pub fn build_cash_flows_table(appraisals: &[Appraisal]) -> Table {
    let mut table = new_table();
    table.set_header(
        std::iter::once("Year")
            .chain(appraisals.iter().map(|appraisal| appraisal.scenario.as_str()))
            .collect_vec(),
    );
    let n_years = appraisals.iter().map(|appraisal| appraisal.cash_flows.len()).max().unwrap_or(0);
    for year in 0..n_years {
        let mut row = vec![Cell::new(year)];
        row.extend(appraisals.iter().map(|appraisal| {
            appraisal
                .cash_flows
                .get(year)
                .map_or_else(|| Cell::new(""), |cash_flow| dollars_cell(*cash_flow))
        }));
        table.add_row(row);
    }
    table
}
