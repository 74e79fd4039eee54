//! Best-class selection within a crop's label subset

use serde::Serialize;

use crate::utils::error::{InferenceError, Result};

/// Chosen class and its confidence percentage
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Selection {
    /// Global class index into the catalog
    pub index: usize,
    /// Probability × 100, rounded to 2 decimals
    pub confidence: f64,
}

/// Pick the highest-scoring class among `subset`
///
/// `subset` must be in ascending index order; ties go to the earliest entry,
/// i.e. the smallest global index. NaN scores never beat a number, and a
/// subset without any finite score is an error.
pub fn select(probabilities: &[f32], subset: &[usize]) -> Result<Selection> {
    let mut best: Option<(usize, f32)> = None;

    for &index in subset {
        let score = *probabilities.get(index).ok_or_else(|| {
            InferenceError::Inference(format!(
                "class index {} is outside the probability vector (len {})",
                index,
                probabilities.len()
            ))
        })?;

        best = match best {
            None => Some((index, score)),
            Some((_, current)) if score > current || (current.is_nan() && !score.is_nan()) => {
                Some((index, score))
            }
            keep => keep,
        };
    }

    let (index, score) = best.ok_or_else(|| {
        InferenceError::Inference("cannot select from an empty class subset".to_string())
    })?;

    if !score.is_finite() {
        return Err(InferenceError::Inference(format!(
            "no finite score among {} candidate classes",
            subset.len()
        )));
    }

    Ok(Selection {
        index,
        confidence: confidence_percent(score),
    })
}

/// Convert a probability to a percentage rounded to 2 decimals
///
/// The multiplication happens in `f32`, the precision the model produces.
pub fn confidence_percent(probability: f32) -> f64 {
    round_to_cents(f64::from(probability * 100.0))
}

/// Round to 2 decimal places: the exact binary value is rounded to the
/// nearest decimal, exact ties go to the even digit.
///
/// 70.005 is stored as 70.00499999..., so it rounds down to 70.0.
pub fn round_to_cents(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    // std's fixed-precision formatting is correctly rounded (ties-to-even)
    format!("{:.2}", value).parse().unwrap_or(value)
}
