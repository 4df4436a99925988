use serde::Serialize;

use super::domain::{School, ScoreInput, SelectedSchool};
use super::engine::{ScoreBreakdown, ScoreEngine};

/// Score margin separating the outer bands from the inner ones.
pub const BAND_MARGIN: f64 = 30.0;

/// Binary comparison against a reference score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassStatus {
    Unknown,
    Pass,
    Fail,
}

impl PassStatus {
    pub fn classify(final_score: f64, threshold: Option<f64>) -> Self {
        match threshold {
            None => Self::Unknown,
            Some(threshold) if final_score >= threshold => Self::Pass,
            Some(_) => Self::Fail,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }
}

/// Four-tier comparison against a reference score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassBand {
    Unknown,
    Safe,
    Possible,
    Risky,
    Difficult,
}

impl PassBand {
    pub fn classify(final_score: f64, threshold: Option<f64>) -> Self {
        let Some(threshold) = threshold else {
            return Self::Unknown;
        };
        let diff = final_score - threshold;
        if diff >= BAND_MARGIN {
            Self::Safe
        } else if diff >= 0.0 {
            Self::Possible
        } else if diff >= -BAND_MARGIN {
            Self::Risky
        } else {
            Self::Difficult
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Safe => "safe",
            Self::Possible => "possible",
            Self::Risky => "risky",
            Self::Difficult => "difficult",
        }
    }
}

/// Both granularities for one reference score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThresholdVerdict {
    pub status: PassStatus,
    pub band: PassBand,
}

impl ThresholdVerdict {
    pub fn judge(final_score: Option<f64>, threshold: Option<f64>) -> Self {
        match final_score {
            Some(score) => Self {
                status: PassStatus::classify(score, threshold),
                band: PassBand::classify(score, threshold),
            },
            None => Self {
                status: PassStatus::Unknown,
                band: PassBand::Unknown,
            },
        }
    }
}

/// One selected school with its score under the school's own pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchoolResult {
    #[serde(flatten)]
    pub school: School,
    pub display_order: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ScoreBreakdown>,
    pub final_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub verdict_80: ThresholdVerdict,
    pub verdict_60: ThresholdVerdict,
}

/// Scores `input` for every school. A degenerate school configuration only voids that
/// school's result.
pub fn school_results(
    engine: &ScoreEngine,
    input: &ScoreInput,
    schools: &[SelectedSchool],
) -> Vec<SchoolResult> {
    schools
        .iter()
        .map(|selected| {
            let school = &selected.school;
            let (breakdown, error) = match engine.compute(input, school.pattern()) {
                Ok(breakdown) => (Some(breakdown), None),
                Err(err) => (None, Some(err.to_string())),
            };
            let final_score = breakdown.map(|b| b.final_score);

            SchoolResult {
                school: school.clone(),
                display_order: selected.display_order,
                breakdown,
                final_score,
                error,
                verdict_80: ThresholdVerdict::judge(final_score, school.pass_rate_80),
                verdict_60: ThresholdVerdict::judge(final_score, school.pass_rate_60),
            }
        })
        .collect()
}
