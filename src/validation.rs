//! Forecast accuracy metrics.

use crate::domain::ForecastMetrics;
use crate::error::AppError;

/// Compute MAPE (as a fraction) and RMSE between paired series.
///
/// The MAPE denominator is floored at `f64::EPSILON`, so a zero actual yields a
/// very large (but finite) error rather than a division by zero.
pub fn validate_forecast(actual: &[f64], predicted: &[f64]) -> Result<ForecastMetrics, AppError> {
    if actual.is_empty() {
        return Err(AppError::new(3, "Cannot validate an empty forecast."));
    }
    if actual.len() != predicted.len() {
        return Err(AppError::new(
            4,
            format!(
                "Actual and predicted lengths differ ({} vs {}).",
                actual.len(),
                predicted.len()
            ),
        ));
    }
    if actual.iter().chain(predicted).any(|v| !v.is_finite()) {
        return Err(AppError::new(4, "Non-finite value in forecast validation."));
    }

    let n = actual.len() as f64;
    let mut ape = 0.0;
    let mut se = 0.0;
    for (a, p) in actual.iter().zip(predicted) {
        let err = a - p;
        ape += err.abs() / a.abs().max(f64::EPSILON);
        se += err * err;
    }

    Ok(ForecastMetrics {
        mape: ape / n,
        rmse: (se / n).sqrt(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_mape_and_rmse() {
        let m = validate_forecast(&[100.0, 200.0], &[110.0, 180.0]).unwrap();
        assert!((m.mape - 0.1).abs() < 1e-12);
        assert!((m.rmse - (250.0f64).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn perfect_forecast_is_zero() {
        let m = validate_forecast(&[5.0, 6.0, 7.0], &[5.0, 6.0, 7.0]).unwrap();
        assert_eq!(m.mape, 0.0);
        assert_eq!(m.rmse, 0.0);
    }

    #[test]
    fn zero_actual_does_not_divide_by_zero() {
        let m = validate_forecast(&[0.0], &[1.0]).unwrap();
        assert!(m.mape.is_finite());
        assert!(m.mape > 1e15);
    }

    #[test]
    fn rejects_bad_inputs() {
        assert_eq!(validate_forecast(&[], &[]).unwrap_err().exit_code(), 3);
        assert_eq!(validate_forecast(&[1.0], &[1.0, 2.0]).unwrap_err().exit_code(), 4);
        assert_eq!(
            validate_forecast(&[f64::NAN], &[1.0]).unwrap_err().exit_code(),
            4
        );
    }
}
