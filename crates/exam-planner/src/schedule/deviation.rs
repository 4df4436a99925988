use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::domain::ExamRecord;

/// How a school's deviation compares with the student's baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviationBand {
    /// Within three points either way.
    Match,
    /// Three to six points above.
    Reach,
    /// More than six points above.
    Stretch,
    /// Three to six points below.
    Safety,
    /// More than six points below.
    Below,
    Unrated,
}

impl DeviationBand {
    pub fn classify(deviation: Option<i32>, baseline: i32) -> Self {
        let Some(deviation) = deviation else {
            return Self::Unrated;
        };

        match deviation.saturating_sub(baseline) {
            -3..=3 => Self::Match,
            4..=6 => Self::Reach,
            diff if diff > 6 => Self::Stretch,
            -6..=-4 => Self::Safety,
            _ => Self::Below,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Match => "適正",
            Self::Reach => "挑戦",
            Self::Stretch => "高挑戦",
            Self::Safety => "安全",
            Self::Below => "余裕",
            Self::Unrated => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    NameAsc,
    NameDesc,
    DeviationAsc,
    #[default]
    DeviationDesc,
}

fn compare_deviation(a: Option<i32>, b: Option<i32>) -> Ordering {
    // Option orders None first, matching an absent deviation treated as -∞.
    a.cmp(&b)
}

/// Candidates for one date in display order; the sort is stable.
pub fn sort_candidates(records: &[ExamRecord], order: SortOrder) -> Vec<ExamRecord> {
    let mut sorted = records.to_vec();
    match order {
        SortOrder::NameAsc => sorted.sort_by(|a, b| a.school_name.cmp(&b.school_name)),
        SortOrder::NameDesc => sorted.sort_by(|a, b| b.school_name.cmp(&a.school_name)),
        SortOrder::DeviationAsc => {
            sorted.sort_by(|a, b| compare_deviation(a.deviation, b.deviation))
        }
        SortOrder::DeviationDesc => {
            sorted.sort_by(|a, b| compare_deviation(b.deviation, a.deviation))
        }
    }
    sorted
}
