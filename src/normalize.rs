use crate::yahoo::PricePoint;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeError {
    EmptySeries,
    ZeroBaseline,
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizeError::EmptySeries => write!(f, "series is empty, no baseline to rescale by"),
            NormalizeError::ZeroBaseline => write!(f, "first value is zero, cannot rescale"),
        }
    }
}

/// Rescale a date-ascending price series so its first value is exactly 100.
///
/// The baseline is the chronologically first element of the series as given;
/// if the provider's window omits the true first trading day, the baseline
/// shifts with it and no correction is attempted. An empty series or a zero
/// baseline is an error rather than a silently wrong curve.
pub fn normalize_to_100(series: &[PricePoint]) -> Result<Vec<PricePoint>, NormalizeError> {
    let baseline = series.first().ok_or(NormalizeError::EmptySeries)?.price;
    if baseline == 0.0 {
        return Err(NormalizeError::ZeroBaseline);
    }

    Ok(series
        .iter()
        .map(|point| PricePoint {
            date: point.date,
            price: point.price / baseline * 100.0,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(prices: &[f64]) -> Vec<PricePoint> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &price)| PricePoint {
                date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap() + chrono::Days::new(i as u64),
                price,
            })
            .collect()
    }

    #[test]
    fn test_first_value_is_exactly_100() {
        let normalized = normalize_to_100(&series(&[187.15, 190.04, 181.91])).unwrap();
        assert_eq!(normalized[0].price, 100.0);
    }

    #[test]
    fn test_values_scale_against_baseline() {
        let input = series(&[50.0, 55.0, 40.0, 50.0]);
        let normalized = normalize_to_100(&input).unwrap();
        assert_eq!(normalized.len(), input.len());
        for (orig, norm) in input.iter().zip(&normalized) {
            assert_eq!(norm.date, orig.date);
            assert_eq!(norm.price, orig.price / 50.0 * 100.0);
        }
        assert_eq!(normalized[1].price, 110.0);
        assert_eq!(normalized[2].price, 80.0);
    }

    #[test]
    fn test_empty_series_is_an_error() {
        assert_eq!(normalize_to_100(&[]), Err(NormalizeError::EmptySeries));
    }

    #[test]
    fn test_zero_baseline_is_an_error() {
        assert_eq!(
            normalize_to_100(&series(&[0.0, 10.0])),
            Err(NormalizeError::ZeroBaseline)
        );
    }
}
