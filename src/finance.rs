use serde::{Deserialize, Serialize};

use crate::{
    core::{self, YearSummary},
    prelude::*,
    quantity::{cost::Dollars, energy::MegawattHours, power::Megawatts},
};

/// Lower bound of the IRR search, `−100 %` would divide by zero.
const MIN_IRR: f64 = -0.99;
const MAX_IRR: f64 = 10.0;
const IRR_TOLERANCE: f64 = 1e-10;

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FinanceParameters {
    pub solar_capex_per_mw: Dollars,
    pub bess_capex_per_mwh: Dollars,

    /// Fixed yearly O&M per MW of the solar plant.
    pub o_and_m_per_mw: Dollars,

    pub discount_rate: f64,

    /// Yearly revenue escalation, prices themselves stay flat across the years.
    pub revenue_escalation: f64,

    /// Yearly O&M inflation.
    pub inflation_rate: f64,

    /// Share of the initial battery capex spent on the replacement.
    pub replacement_cost_fraction: f64,

    pub scenarios: Vec<Scenario>,
}

impl Default for FinanceParameters {
    fn default() -> Self {
        Self {
            solar_capex_per_mw: Dollars::from(1_200_000.0),
            bess_capex_per_mwh: Dollars::from(350_000.0),
            o_and_m_per_mw: Dollars::from(25_000.0),
            discount_rate: 0.07,
            revenue_escalation: 0.02,
            inflation_rate: 0.025,
            replacement_cost_fraction: 0.4,
            scenarios: vec![
                Scenario { name: "Merchant".to_string(), itc: 0.0 },
                Scenario { name: "ITC".to_string(), itc: 0.3 },
                Scenario { name: "ITC + adder".to_string(), itc: 0.4 },
            ],
        }
    }
}

/// Investment tax credit scenario.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub name: String,

    /// Upfront reduction of the capital cost.
    pub itc: f64,
}

/// Project sizing used for the capital and operating costs.
#[derive(Copy, Clone, Debug)]
pub struct Plant {
    pub solar_capacity: Megawatts,
    pub battery_capacity: MegawattHours,
}

#[must_use]
#[derive(Clone, Debug, Serialize)]
pub struct Appraisal {
    pub scenario: String,
    pub itc: f64,
    pub initial_investment: Dollars,
    pub npv: Dollars,
    pub irr: Option<f64>,

    /// First project year with the non-negative cumulative cash.
    pub payback_year: Option<usize>,

    /// Year 0 is the initial investment.
    pub cash_flows: Vec<Dollars>,
}

impl FinanceParameters {
    pub fn validate(&self) -> Result<(), core::Error> {
        for (name, value) in [
            ("solar_capex_per_mw", self.solar_capex_per_mw.0),
            ("bess_capex_per_mwh", self.bess_capex_per_mwh.0),
            ("o_and_m_per_mw", self.o_and_m_per_mw.0),
        ] {
            core::Error::ensure_within(name, value, 0.0, f64::MAX, "a non-negative amount")?;
        }
        core::Error::ensure_within(
            "discount_rate",
            self.discount_rate,
            0.0,
            1.0,
            "a fraction within 0..=1",
        )?;
        for (name, value) in
            [("revenue_escalation", self.revenue_escalation), ("inflation_rate", self.inflation_rate)]
        {
            core::Error::ensure_within(name, value, -0.5, 0.5, "a fraction within -0.5..=0.5")?;
        }
        core::Error::ensure_within(
            "replacement_cost_fraction",
            self.replacement_cost_fraction,
            0.0,
            1.0,
            "a fraction within 0..=1",
        )?;
        for scenario in &self.scenarios {
            if !(0.0..1.0).contains(&scenario.itc) {
                return Err(core::Error::InvalidParameter {
                    name: "itc",
                    value: scenario.itc,
                    expected: "a fraction within 0..1",
                });
            }
        }
        Ok(())
    }

    pub fn solar_capex(&self, plant: Plant) -> Dollars {
        self.solar_capex_per_mw * plant.solar_capacity.0
    }

    pub fn bess_capex(&self, plant: Plant) -> Dollars {
        self.bess_capex_per_mwh * plant.battery_capacity.0
    }

    /// Yearly cash flows, starting with the year-0 investment.
    pub fn cash_flows(&self, plant: Plant, itc: f64, summaries: &[YearSummary]) -> Vec<Dollars> {
        let bess_capex = self.bess_capex(plant);
        let initial_investment = (self.solar_capex(plant) + bess_capex) * (1.0 - itc);
        let o_and_m = self.o_and_m_per_mw * plant.solar_capacity.0;

        let mut cash_flows = Vec::with_capacity(summaries.len() + 1);
        cash_flows.push(-initial_investment);
        for summary in summaries {
            let elapsed = f64::from(summary.year - 1);
            let mut net = summary.total_revenue() * (1.0 + self.revenue_escalation).powf(elapsed)
                - o_and_m * (1.0 + self.inflation_rate).powf(elapsed);
            if summary.is_replaced {
                net -= bess_capex * self.replacement_cost_fraction;
            }
            cash_flows.push(net);
        }
        cash_flows
    }

    /// Appraise every scenario independently over the same simulated years.
    #[instrument(skip_all, fields(n_scenarios = self.scenarios.len()))]
    pub fn appraise(&self, plant: Plant, summaries: &[YearSummary]) -> Vec<Appraisal> {
        self.scenarios
            .iter()
            .map(|scenario| {
                let cash_flows = self.cash_flows(plant, scenario.itc, summaries);
                let appraisal = Appraisal {
                    scenario: scenario.name.clone(),
                    itc: scenario.itc,
                    initial_investment: -cash_flows[0],
                    npv: npv(self.discount_rate, &cash_flows),
                    irr: irr(&cash_flows),
                    payback_year: payback_year(&cash_flows),
                    cash_flows,
                };
                debug!(
                    scenario = %appraisal.scenario,
                    npv = %appraisal.npv,
                    irr = ?appraisal.irr,
                    payback_year = ?appraisal.payback_year,
                    "appraised",
                );
                appraisal
            })
            .collect()
    }
}

/// Net present value, the first cash flow is not discounted.
pub fn npv(rate: f64, cash_flows: &[Dollars]) -> Dollars {
    cash_flows
        .iter()
        .zip(0..)
        .map(|(cash_flow, year)| *cash_flow / (1.0 + rate).powi(year))
        .sum()
}

/// Internal rate of return by bisection.
///
/// # Returns
///
/// [`None`] when the NPV does not change the sign within the search range.
pub fn irr(cash_flows: &[Dollars]) -> Option<f64> {
    let (mut low, mut high) = (MIN_IRR, MAX_IRR);
    let mut npv_low = npv(low, cash_flows).0;
    let npv_high = npv(high, cash_flows).0;
    if !npv_low.is_finite() || !npv_high.is_finite() || npv_low * npv_high > 0.0 {
        return None;
    }
    if npv_low == 0.0 {
        return (npv_high != 0.0).then_some(low);
    }
    while high - low > IRR_TOLERANCE {
        let middle = f64::midpoint(low, high);
        let npv_middle = npv(middle, cash_flows).0;
        if npv_middle == 0.0 {
            return Some(middle);
        }
        if npv_low * npv_middle < 0.0 {
            high = middle;
        } else {
            low = middle;
            npv_low = npv_middle;
        }
    }
    Some(f64::midpoint(low, high))
}

/// Index of the first year when the cumulative cash flow gets non-negative.
pub fn payback_year(cash_flows: &[Dollars]) -> Option<usize> {
    cash_flows
        .iter()
        .scan(Dollars::ZERO, |cumulative, cash_flow| {
            *cumulative += *cash_flow;
            Some(*cumulative)
        })
        .position(Dollars::is_non_negative)
}
