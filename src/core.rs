pub mod battery;
pub mod degradation;
pub mod dispatch;
mod error;
pub mod generation;
pub mod series;
pub mod simulation;

pub use self::{
    battery::BatteryState,
    degradation::DegradationTracker,
    dispatch::Dispatcher,
    error::Error,
    series::{Point, Series},
    simulation::{Simulation, YearSummary},
};
