use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::quantity::{cost::Dollars, energy::MegawattHours, price::MegawattHourPrice};

/// Hourly battery action. Amounts are the state-of-charge change.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "action", content = "amount", rename_all = "snake_case")]
pub enum DispatchDecision {
    Charge(MegawattHours),
    Discharge(MegawattHours),
    Idle,
}

impl DispatchDecision {
    /// Energy moved in or out of the storage.
    pub fn throughput(self) -> MegawattHours {
        match self {
            Self::Charge(amount) | Self::Discharge(amount) => amount,
            Self::Idle => MegawattHours::ZERO,
        }
    }
}

/// Single-hour entry of the dispatch trace.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct HourlyStep {
    pub timestamp: DateTime<Utc>,
    pub price: MegawattHourPrice,
    pub generation: MegawattHours,
    pub decision: DispatchDecision,

    /// Solar energy diverted into the battery instead of the grid.
    pub self_supply: MegawattHours,

    /// Net grid exchange of the battery, positive is import.
    pub battery_grid_energy: MegawattHours,

    pub state_of_charge_after: MegawattHours,

    /// Direct export of the solar generation left after self-supply.
    pub solar_revenue: Dollars,

    /// Discharge revenue minus the grid charging cost.
    pub battery_revenue: Dollars,
}
