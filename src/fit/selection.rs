//! Membership model selection (trend vs trend + yearly harmonics) using BIC with guardrails.
//!
//! Each eligible regression kind is fitted and scored with:
//! - SSE / RMSE
//! - BIC = n * ln(SSE/n) + k * ln(n)
//!
//! Selection rules:
//! 1. Seasonal kinds need at least a full year of history and `n >= k + 2`
//! 2. The trend kind needs `n >= 2`
//! 3. Choose the model with minimum BIC
//! 4. If a simpler model is within ΔBIC <= 2 of the best, pick the simpler model

use tracing::debug;

use crate::domain::{FitQuality, FitResult, MembershipModel, MembershipPoint, ModelKind};
use crate::error::AppError;
use crate::fit::fitter::{ModelFit, fit_flat, fit_model};

/// Minimum number of extra observations beyond parameter count (seasonal kinds).
const MIN_N_BUFFER: usize = 2;

/// Months of history required before yearly harmonics are considered.
pub const MIN_SEASONAL_MONTHS: usize = 12;

/// Months of history required for any regression fit.
pub const MIN_TREND_MONTHS: usize = 2;

/// Output of fitting + selection.
#[derive(Debug, Clone)]
pub struct FitSelection {
    pub best: FitResult,
    /// Fits for all attempted models (after guardrails).
    pub fits: Vec<FitResult>,
    /// Any models that were skipped and why (for diagnostics).
    pub skipped: Vec<(ModelKind, String)>,
}

/// Fit every eligible regression kind and select the best.
///
/// `history` must be sorted by month with one point per month.
pub fn fit_and_select(history: &[MembershipPoint]) -> Result<FitSelection, AppError> {
    let n = history.len();
    let mut fits = Vec::new();
    let mut skipped = Vec::new();

    for kind in ModelKind::REGRESSION {
        if let Some(reason) = guardrail(kind, n) {
            skipped.push((kind, reason));
            continue;
        }
        let fit = fit_model(kind, history)?;
        fits.push(to_fit_result(fit, history));
    }

    if fits.is_empty() {
        return Err(AppError::new(
            3,
            format!("Insufficient membership history to fit any model (n={n})."),
        ));
    }

    let best = select_by_bic(&fits);
    debug!(
        model = %best.model.display_name,
        bic = best.quality.bic,
        candidates = fits.len(),
        "selected membership model"
    );

    Ok(FitSelection {
        best,
        fits,
        skipped,
    })
}

/// Selection result for a history too short to fit any regression.
pub fn flat_selection(history: &[MembershipPoint]) -> FitSelection {
    let best = to_fit_result(fit_flat(history), history);
    let skipped = ModelKind::REGRESSION
        .iter()
        .filter_map(|&kind| guardrail(kind, history.len()).map(|r| (kind, r)))
        .collect();
    FitSelection {
        fits: vec![best.clone()],
        best,
        skipped,
    }
}

fn guardrail(kind: ModelKind, n: usize) -> Option<String> {
    if kind.is_seasonal() {
        if n < MIN_SEASONAL_MONTHS {
            return Some(format!(
                "Needs a full year of history: n={n} < {MIN_SEASONAL_MONTHS}"
            ));
        }
        let k = kind.param_count();
        if n < k + MIN_N_BUFFER {
            return Some(format!(
                "Underdetermined: n={n} < k+{MIN_N_BUFFER}={}",
                k + MIN_N_BUFFER
            ));
        }
    } else if n < MIN_TREND_MONTHS {
        return Some(format!("Underdetermined: n={n} < {MIN_TREND_MONTHS}"));
    }
    None
}

fn to_fit_result(fit: ModelFit, history: &[MembershipPoint]) -> FitResult {
    let n = history.len();
    let k = fit.kind.param_count();
    let bic = if n == 0 { 0.0 } else { bic(n, fit.sse, k) };
    let origin = history
        .first()
        .map(|h| h.period_start)
        .unwrap_or_default();

    FitResult {
        model: MembershipModel {
            kind: fit.kind,
            display_name: fit.kind.display_name().to_string(),
            origin,
            coefficients: fit.coefficients,
        },
        quality: FitQuality {
            sse: fit.sse,
            rmse: fit.rmse,
            bic,
            n,
        },
    }
}

fn bic(n: usize, sse: f64, k: usize) -> f64 {
    let n_f = n as f64;
    let sse_per = (sse / n_f).max(1e-12);
    n_f * sse_per.ln() + (k as f64) * n_f.ln()
}

fn select_by_bic(fits: &[FitResult]) -> FitResult {
    let mut best = &fits[0];
    for f in &fits[1..] {
        if f.quality.bic < best.quality.bic {
            best = f;
        }
    }

    let best_bic = best.quality.bic;

    // Iterate in order of increasing complexity and pick the first fit that is
    // within 2 BIC points of the best.
    for kind in ModelKind::REGRESSION {
        if let Some(f) = fits.iter().find(|f| f.model.kind == kind) {
            if f.quality.bic <= best_bic + 2.0 {
                return f.clone();
            }
        }
    }

    best.clone()
}
