use crate::{
    core::{
        Error,
        series::{Point, Series, check_length},
    },
    quantity::energy::MegawattHours,
};

/// Highest accepted PV degradation rate per year.
pub const MAX_DEGRADATION_RATE: f64 = 0.05;

/// Apply the compounded PV degradation after the specified number of operating years.
///
/// Timestamps are kept, so the result stays aligned with the price series.
pub fn adjust(
    base_profile: &[Point<MegawattHours>],
    years: u32,
    degradation_rate: f64,
) -> Result<Series<MegawattHours>, Error> {
    check_length(base_profile.len())?;
    check_degradation_rate(degradation_rate)?;
    let factor = (1.0 - degradation_rate).powf(f64::from(years));
    Ok(base_profile.iter().map(|(timestamp, output)| (*timestamp, *output * factor)).collect())
}

pub fn check_degradation_rate(degradation_rate: f64) -> Result<(), Error> {
    Error::ensure_within(
        "solar_degradation_rate",
        degradation_rate,
        0.0,
        MAX_DEGRADATION_RATE,
        "a fraction within 0..=0.05",
    )
}
