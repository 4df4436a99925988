use serde::Serialize;
use tracing::debug;

use super::domain::{ScoreInput, ScorePattern};
use crate::config::CalculatorConfig;

/// Internal-grade multiplier applied by the simple pattern.
pub const DEFAULT_NAISHIN_MULTIPLIER: f64 = 3.0;
/// Weighted internal-grade maximum: 5 subjects x 5 + 4 subjects x 5 x 2.
pub const NAISHIN_MAX_RAW: u32 = 65;
/// Points available to the ratio pattern before additional scores.
pub const RATIO_FINAL_SCALE: f64 = 1000.0;
/// Unweighted exam maximum across five subjects.
pub const TEST_RAW_MAX: f64 = 500.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoreError {
    #[error("every exam subject weight is zero; the weighted exam maximum is undefined")]
    DegenerateTestWeights,
    #[error("school ratio {test}:{naishin} must be non-negative with a positive sum")]
    DegenerateRatio { test: f64, naishin: f64 },
    #[error("score computation produced a non-finite {0}")]
    NonFinite(&'static str),
}

/// Every intermediate of a score computation, for display next to the final score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub naishin_raw_no_weight: u32,
    pub naishin_raw: u32,
    pub naishin_max_raw: u32,
    pub naishin_scaled: f64,
    pub test_raw_total: i32,
    pub test_weighted_total: f64,
    pub extra_total: f64,
    pub naishin_final: f64,
    pub test_final: f64,
    pub final_score: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ScoreEngine {
    naishin_multiplier: f64,
}

impl Default for ScoreEngine {
    fn default() -> Self {
        Self::new(&CalculatorConfig::default())
    }
}

impl ScoreEngine {
    pub fn new(config: &CalculatorConfig) -> Self {
        Self {
            naishin_multiplier: config.naishin_multiplier,
        }
    }

    pub fn naishin_multiplier(&self) -> f64 {
        self.naishin_multiplier
    }

    pub fn compute(
        &self,
        input: &ScoreInput,
        pattern: ScorePattern,
    ) -> Result<ScoreBreakdown, ScoreError> {
        let result = compute_score(input, pattern, self.naishin_multiplier);
        if let Err(err) = &result {
            debug!(error = %err, ?pattern, "score computation rejected");
        }
        result
    }
}

/// Composite admission score of `input` under `pattern`.
pub fn compute_score(
    input: &ScoreInput,
    pattern: ScorePattern,
    naishin_multiplier: f64,
) -> Result<ScoreBreakdown, ScoreError> {
    let grades = &input.grades;
    let academic: u32 = grades.academic().iter().map(|g| u32::from(*g)).sum();
    let practical: u32 = grades.practical().iter().map(|g| u32::from(*g)).sum();

    let naishin_raw_no_weight = academic + practical;
    let naishin_raw = academic + practical * 2;
    let naishin_scaled = f64::from(naishin_raw) * naishin_multiplier;

    let test_raw_total = input.exams.total();
    let test_weighted_total = if input.use_weights {
        input
            .exams
            .values()
            .iter()
            .zip(input.weights.values())
            .map(|(score, weight)| f64::from(*score) * weight)
            .sum()
    } else {
        f64::from(test_raw_total)
    };

    let extra_total = extra_total(input);

    let (naishin_final, test_final) = match pattern {
        ScorePattern::Simple => (naishin_scaled, test_weighted_total),
        ScorePattern::Ratio { test, naishin } => {
            let ratio_sum = test + naishin;
            if !(test >= 0.0 && naishin >= 0.0 && ratio_sum > 0.0 && ratio_sum.is_finite()) {
                return Err(ScoreError::DegenerateRatio { test, naishin });
            }
            let naishin_component = RATIO_FINAL_SCALE * naishin / ratio_sum;
            let test_component = RATIO_FINAL_SCALE * test / ratio_sum;

            let test_weighted_max = if input.use_weights {
                100.0 * input.weights.sum()
            } else {
                TEST_RAW_MAX
            };
            if test_weighted_max <= 0.0 {
                return Err(ScoreError::DegenerateTestWeights);
            }

            (
                f64::from(naishin_raw) / f64::from(NAISHIN_MAX_RAW) * naishin_component,
                test_weighted_total / test_weighted_max * test_component,
            )
        }
    };

    let final_score = naishin_final + test_final + extra_total;
    for (name, value) in [
        ("internal grade score", naishin_final),
        ("exam score", test_final),
        ("final score", final_score),
    ] {
        if !value.is_finite() {
            return Err(ScoreError::NonFinite(name));
        }
    }

    Ok(ScoreBreakdown {
        naishin_raw_no_weight,
        naishin_raw,
        naishin_max_raw: NAISHIN_MAX_RAW,
        naishin_scaled,
        test_raw_total,
        test_weighted_total,
        extra_total,
        naishin_final,
        test_final,
        final_score,
    })
}

fn extra_total(input: &ScoreInput) -> f64 {
    let flags = &input.flags;
    let scores = &input.additional;
    [
        (flags.interview, scores.interview),
        (flags.essay, scores.essay),
        (flags.practical, scores.practical),
        (flags.bonus, scores.bonus),
        (flags.speaking, scores.speaking.points()),
    ]
    .into_iter()
    .filter(|(enabled, _)| *enabled)
    .map(|(_, points)| points)
    .sum()
}
