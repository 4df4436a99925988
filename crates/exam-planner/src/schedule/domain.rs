use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// School name carried by the synthetic "will not apply on this date" record.
pub const DECLINE_LABEL: &str = "志願しない";

/// Older sessions persisted declines under this label.
pub const LEGACY_DECLINE_LABEL: &str = "지원하지 않음";

pub const DEFAULT_USER_NAME: &str = "シア";
pub const DEFAULT_USER_DEVIATION: i32 = 60;
pub const MIN_USER_DEVIATION: i32 = 40;
pub const MAX_USER_DEVIATION: i32 = 90;

/// One school's single exam offering on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamRecord {
    #[serde(default)]
    pub school_name: String,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub deviation: Option<i32>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub exam_name: String,
    #[serde(default)]
    pub apply_start: String,
    #[serde(default)]
    pub apply_end: String,
    pub exam_date: String,
    #[serde(default)]
    pub result_date: String,
    #[serde(default)]
    pub annual: String,
    #[serde(default)]
    pub refund: String,
}

impl ExamRecord {
    /// Sentinel standing for "no application on `exam_date`".
    pub fn decline(exam_date: impl Into<String>) -> Self {
        Self {
            school_name: DECLINE_LABEL.to_string(),
            area: String::new(),
            deviation: None,
            category: String::new(),
            exam_name: String::new(),
            apply_start: String::new(),
            apply_end: String::new(),
            exam_date: exam_date.into(),
            result_date: String::new(),
            annual: String::new(),
            refund: String::new(),
        }
    }

    pub fn is_decline(&self) -> bool {
        let name = self.school_name.trim();
        name == DECLINE_LABEL || name == LEGACY_DECLINE_LABEL
    }

    /// Raw month/day string of a milestone.
    pub fn milestone(&self, field: CompletionField) -> &str {
        match field {
            CompletionField::ApplyStart => &self.apply_start,
            CompletionField::ApplyEnd => &self.apply_end,
            CompletionField::ExamDate => &self.exam_date,
            CompletionField::ResultDate => &self.result_date,
        }
    }
}

/// A year-less calendar position parsed from strings such as `"2/10"` or `"02月10日"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

fn month_day_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d{1,2}).*?(\d{1,2})").expect("static pattern compiles"))
}

impl MonthDay {
    /// Extracts the first two digit runs as (month, day); `None` when the string is malformed.
    pub fn parse(raw: &str) -> Option<Self> {
        let captures = month_day_pattern().captures(raw.trim())?;
        let month = captures.get(1)?.as_str().parse::<u32>().ok()?;
        let day = captures.get(2)?.as_str().parse::<u32>().ok()?;

        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return None;
        }

        Some(Self { month, day })
    }

    /// Position within an admission cycle running December through November.
    pub(crate) fn cycle_rank(self) -> (u32, u32) {
        let month = if self.month == 12 { 0 } else { self.month };
        (month, self.day)
    }

    pub(crate) fn cmp_cycle(self, other: Self) -> Ordering {
        self.cycle_rank().cmp(&other.cycle_rank())
    }
}

impl fmt::Display for MonthDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}月{}日", self.month, self.day)
    }
}

/// The four deadlines tracked for every committed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompletionField {
    ApplyStart,
    ApplyEnd,
    ExamDate,
    ResultDate,
}

impl CompletionField {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::ApplyStart,
            Self::ApplyEnd,
            Self::ExamDate,
            Self::ResultDate,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ApplyStart => "出願開始",
            Self::ApplyEnd => "出願締切",
            Self::ExamDate => "試験日",
            Self::ResultDate => "合格発表",
        }
    }
}

/// Acknowledgement flags for a single committed record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionStatus {
    #[serde(default)]
    pub apply_start_done: bool,
    #[serde(default)]
    pub apply_end_done: bool,
    #[serde(default)]
    pub exam_date_done: bool,
    #[serde(default)]
    pub result_date_done: bool,
}

impl CompletionStatus {
    pub fn get(&self, field: CompletionField) -> bool {
        match field {
            CompletionField::ApplyStart => self.apply_start_done,
            CompletionField::ApplyEnd => self.apply_end_done,
            CompletionField::ExamDate => self.exam_date_done,
            CompletionField::ResultDate => self.result_date_done,
        }
    }

    pub fn toggle(&mut self, field: CompletionField) {
        let slot = match field {
            CompletionField::ApplyStart => &mut self.apply_start_done,
            CompletionField::ApplyEnd => &mut self.apply_end_done,
            CompletionField::ExamDate => &mut self.exam_date_done,
            CompletionField::ResultDate => &mut self.result_date_done,
        };
        *slot = !*slot;
    }

    pub fn all_done(&self) -> bool {
        CompletionField::ordered()
            .into_iter()
            .all(|field| self.get(field))
    }
}

/// examDate → committed record (real or decline sentinel).
pub type SelectionMap = BTreeMap<String, ExamRecord>;

/// Completion key → acknowledgement flags.
pub type CompletionMap = BTreeMap<String, CompletionStatus>;

/// Student name and baseline deviation captured on the start screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub deviation: i32,
}

impl UserProfile {
    /// Blank names fall back to the default; deviation is clamped to the selectable range.
    pub fn new(name: &str, deviation: i32) -> Self {
        let name = name.trim();
        Self {
            name: if name.is_empty() {
                DEFAULT_USER_NAME.to_string()
            } else {
                name.to_string()
            },
            deviation: deviation.clamp(MIN_USER_DEVIATION, MAX_USER_DEVIATION),
        }
    }
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: DEFAULT_USER_NAME.to_string(),
            deviation: DEFAULT_USER_DEVIATION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_day_accepts_slash_and_kanji_forms() {
        assert_eq!(
            MonthDay::parse("2/10"),
            Some(MonthDay { month: 2, day: 10 })
        );
        assert_eq!(
            MonthDay::parse("02月01日"),
            Some(MonthDay { month: 2, day: 1 })
        );
        assert_eq!(MonthDay::parse("未定"), None);
        assert_eq!(MonthDay::parse("13/40"), None);
    }

    #[test]
    fn legacy_decline_label_is_recognised() {
        let mut record = ExamRecord::decline("2/10");
        assert!(record.is_decline());
        record.school_name = LEGACY_DECLINE_LABEL.to_string();
        assert!(record.is_decline());
        record.school_name = "開成".to_string();
        assert!(!record.is_decline());
    }

    #[test]
    fn toggle_flips_only_the_requested_field() {
        let mut status = CompletionStatus::default();
        status.toggle(CompletionField::ExamDate);
        assert!(status.exam_date_done);
        assert!(!status.apply_start_done && !status.apply_end_done && !status.result_date_done);
        status.toggle(CompletionField::ExamDate);
        assert_eq!(status, CompletionStatus::default());
    }

    #[test]
    fn profile_defaults_blank_name_and_clamps_deviation() {
        let profile = UserProfile::new("   ", 120);
        assert_eq!(profile.name, DEFAULT_USER_NAME);
        assert_eq!(profile.deviation, MAX_USER_DEVIATION);
    }
}
