use std::{fmt::Debug, fs::File, io::Read, path::Path};

use chrono::{DateTime, FixedOffset, Utc};
use csv::ReaderBuilder;
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    core::{Point, Series},
    prelude::*,
    quantity::{energy::MegawattHours, price::MegawattHourPrice},
};

/// Single `timestamp,value` row.
#[derive(Deserialize)]
struct Row<V> {
    timestamp: DateTime<FixedOffset>,
    value: V,
}

/// Read the hourly series, normalizing the timestamps to UTC.
///
/// No cleaning happens here: length and alignment are checked by the simulation.
pub fn read_series<V: DeserializeOwned, R: Read>(reader: R) -> Result<Series<V>> {
    let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    reader
        .deserialize::<Row<V>>()
        .enumerate()
        .map(|(index, row)| -> Result<Point<V>> {
            let row = row.with_context(|| format!("invalid row #{index}"))?;
            Ok((row.timestamp.with_timezone(&Utc), row.value))
        })
        .collect()
}

#[instrument(skip_all, fields(path = ?path))]
pub fn read_prices<P: AsRef<Path> + Debug>(path: P) -> Result<Series<MegawattHourPrice>> {
    let series = read_series(open(&path)?).with_context(|| format!("failed to read {path:?}"))?;
    check_prices(&series)?;
    info!(n_points = series.len(), "loaded prices");
    Ok(series)
}

#[instrument(skip_all, fields(path = ?path))]
pub fn read_generation<P: AsRef<Path> + Debug>(path: P) -> Result<Series<MegawattHours>> {
    let series = read_series(open(&path)?).with_context(|| format!("failed to read {path:?}"))?;
    check_generation(&series)?;
    info!(n_points = series.len(), "loaded generation");
    Ok(series)
}

fn open<P: AsRef<Path> + Debug>(path: P) -> Result<File> {
    File::open(&path).with_context(|| format!("failed to open {path:?}"))
}

fn check_prices(series: &Series<MegawattHourPrice>) -> Result {
    if let Some((timestamp, value)) = series.iter().find(|(_, value)| !value.0.is_finite()) {
        bail!("non-finite price {value} at {timestamp}");
    }
    Ok(())
}

fn check_generation(series: &Series<MegawattHours>) -> Result {
    if let Some((timestamp, value)) = series.iter().find(|(_, value)| !value.0.is_finite()) {
        bail!("non-finite generation {value} at {timestamp}");
    }
    if let Some((timestamp, value)) = series.iter().find(|(_, value)| !value.is_non_negative()) {
        bail!("negative generation {value} at {timestamp}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_read_series() {
        let text = "timestamp,value\n2023-01-01T00:00:00-05:00, 21.5\n2023-01-01T01:00:00-05:00,-3\n";
        let series: Series<MegawattHourPrice> = read_series(text.as_bytes()).unwrap();
        assert_eq!(
            series,
            [
                (Utc.with_ymd_and_hms(2023, 1, 1, 5, 0, 0).unwrap(), MegawattHourPrice::from(21.5)),
                (Utc.with_ymd_and_hms(2023, 1, 1, 6, 0, 0).unwrap(), MegawattHourPrice::from(-3.0)),
            ]
        );
    }

    #[test]
    fn test_invalid_row() {
        let text = "timestamp,value\nyesterday,1.0\n";
        assert!(read_series::<MegawattHours, _>(text.as_bytes()).is_err());
    }

    #[test]
    fn test_negative_generation() {
        let text = "timestamp,value\n2023-01-01T00:00:00Z,-0.1\n";
        let series = read_series(text.as_bytes()).unwrap();
        assert!(check_generation(&series).is_err());
    }

    #[test]
    fn test_non_finite_price() {
        let text = "timestamp,value\n2023-01-01T00:00:00Z,30\n2023-01-01T01:00:00Z,NaN\n";
        let series = read_series(text.as_bytes()).unwrap();
        let error = check_prices(&series).unwrap_err();
        assert!(error.to_string().starts_with("non-finite price"));
    }

    #[test]
    fn test_infinite_generation() {
        let text = "timestamp,value\n2023-01-01T00:00:00Z,inf\n";
        let series = read_series(text.as_bytes()).unwrap();
        let error = check_generation(&series).unwrap_err();
        assert!(error.to_string().starts_with("non-finite generation"));
    }
}
