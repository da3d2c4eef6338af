use std::cmp::Reverse;

use itertools::Itertools;
use ordered_float::OrderedFloat;

use crate::quantity::price::MegawattHourPrice;

/// Role of an hour within the daily plan.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Role {
    #[default]
    Idle,
    Charge,
    Discharge,
}

/// Perfect-foresight plan for a single day block.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DayPlan(pub Vec<Role>);

impl DayPlan {
    /// Pick the `n_hours` cheapest hours for charging and, out of the rest, the `n_hours` most
    /// expensive ones for discharging. Ties go to the earliest hour.
    pub fn select(prices: &[MegawattHourPrice], n_hours: usize) -> Self {
        let n_hours = n_hours.min(prices.len() / 2);
        let mut roles = vec![Role::Idle; prices.len()];

        let charge_hours = (0..prices.len())
            .sorted_by_key(|&hour| (OrderedFloat(prices[hour].0), hour))
            .take(n_hours)
            .collect_vec();
        for &hour in &charge_hours {
            roles[hour] = Role::Charge;
        }

        let discharge_hours = (0..prices.len())
            .filter(|hour| !charge_hours.contains(hour))
            .sorted_by_key(|&hour| (Reverse(OrderedFloat(prices[hour].0)), hour))
            .take(n_hours);
        for hour in discharge_hours {
            roles[hour] = Role::Discharge;
        }

        Self(roles)
    }
}
