use chrono::{DateTime, TimeDelta, Utc};

use crate::core::Error;

pub const HOURS_PER_YEAR: usize = 8760;
pub const HOURS_PER_LEAP_YEAR: usize = 8784;

pub type Point<V> = (DateTime<Utc>, V);
pub type Series<V> = Vec<Point<V>>;

/// Ensure the series covers exactly one (possibly leap) year of hours.
pub fn check_length(len: usize) -> Result<(), Error> {
    if len == HOURS_PER_YEAR || len == HOURS_PER_LEAP_YEAR {
        Ok(())
    } else {
        Err(Error::InvalidProfileLength(len))
    }
}

/// Ensure the series has a valid length and its timestamps advance by exactly one hour.
pub fn check_hourly<V>(series: &[Point<V>]) -> Result<(), Error> {
    check_length(series.len())?;
    for (index, window) in series.windows(2).enumerate() {
        let expected = window[0].0 + TimeDelta::hours(1);
        if window[1].0 != expected {
            return Err(Error::MisalignedSeries { index: index + 1, expected, actual: window[1].0 });
        }
    }
    Ok(())
}

/// Ensure both series are hourly and share exactly the same timestamps.
///
/// Series of different valid lengths are misaligned at the end of the shorter one,
/// the error then carries the (exclusive) end instants of both.
pub fn check_aligned<L, R>(lhs: &[Point<L>], rhs: &[Point<R>]) -> Result<(), Error> {
    check_hourly(lhs)?;
    check_hourly(rhs)?;
    // Both are gap-free with a valid length, so matching starts and ends imply full alignment:
    let (Some((lhs_start, _)), Some((rhs_start, _))) = (lhs.first(), rhs.first()) else {
        return Ok(());
    };
    if lhs_start != rhs_start {
        return Err(Error::MisalignedSeries { index: 0, expected: *lhs_start, actual: *rhs_start });
    }
    if lhs.len() != rhs.len() {
        return Err(Error::MisalignedSeries {
            index: lhs.len().min(rhs.len()),
            expected: end_of(lhs).unwrap_or(*lhs_start),
            actual: end_of(rhs).unwrap_or(*rhs_start),
        });
    }
    Ok(())
}

/// Instant right after the last point.
fn end_of<V>(series: &[Point<V>]) -> Option<DateTime<Utc>> {
    series.last().map(|(timestamp, _)| *timestamp + TimeDelta::hours(1))
}
