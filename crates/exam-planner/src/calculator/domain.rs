use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const GRADE_MIN: u8 = 1;
pub const GRADE_MAX: u8 = 5;
pub const EXAM_SCORE_MAX: i32 = 100;
pub const WEIGHT_MAX: f64 = 3.0;
pub const ADDITIONAL_SCORE_MAX: f64 = 100.0;
pub const BONUS_MAX: f64 = 5.0;

/// Default ratio offered for new ratio-pattern schools (test : internal grades).
pub const DEFAULT_RATIO_TEST: f64 = 7.0;
pub const DEFAULT_RATIO_NAISHIN: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchoolId(pub u64);

impl fmt::Display for SchoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn clamp_grade(value: u8) -> u8 {
    value.clamp(GRADE_MIN, GRADE_MAX)
}

fn clamp_exam(value: i32) -> i32 {
    value.clamp(0, EXAM_SCORE_MAX)
}

fn clamp_unit(value: f64, max: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, max)
    } else {
        0.0
    }
}

/// Nine reported subjects on a 1-5 scale. The last four count double in the weighted sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalGrades {
    pub japanese: u8,
    pub math: u8,
    pub english: u8,
    pub social: u8,
    pub science: u8,
    pub tech_home: u8,
    pub pe: u8,
    pub music: u8,
    pub art: u8,
}

impl InternalGrades {
    pub const fn uniform(grade: u8) -> Self {
        Self {
            japanese: grade,
            math: grade,
            english: grade,
            social: grade,
            science: grade,
            tech_home: grade,
            pe: grade,
            music: grade,
            art: grade,
        }
    }

    pub fn academic(&self) -> [u8; 5] {
        [
            self.japanese,
            self.math,
            self.english,
            self.social,
            self.science,
        ]
    }

    pub fn practical(&self) -> [u8; 4] {
        [self.tech_home, self.pe, self.music, self.art]
    }

    pub fn clamped(self) -> Self {
        Self {
            japanese: clamp_grade(self.japanese),
            math: clamp_grade(self.math),
            english: clamp_grade(self.english),
            social: clamp_grade(self.social),
            science: clamp_grade(self.science),
            tech_home: clamp_grade(self.tech_home),
            pe: clamp_grade(self.pe),
            music: clamp_grade(self.music),
            art: clamp_grade(self.art),
        }
    }
}

impl Default for InternalGrades {
    fn default() -> Self {
        Self::uniform(3)
    }
}

/// Five exam subjects, 0-100 each when entered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamScores {
    pub japanese: i32,
    pub math: i32,
    pub english: i32,
    pub social: i32,
    pub science: i32,
}

impl ExamScores {
    pub const fn from_values(values: [i32; 5]) -> Self {
        let [japanese, math, english, social, science] = values;
        Self {
            japanese,
            math,
            english,
            social,
            science,
        }
    }

    pub const fn values(&self) -> [i32; 5] {
        [
            self.japanese,
            self.math,
            self.english,
            self.social,
            self.science,
        ]
    }

    pub fn total(&self) -> i32 {
        self.values().iter().sum()
    }

    pub fn clamped(self) -> Self {
        Self::from_values(self.values().map(clamp_exam))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubjectWeights {
    pub japanese: f64,
    pub math: f64,
    pub english: f64,
    pub social: f64,
    pub science: f64,
}

impl SubjectWeights {
    pub const fn values(&self) -> [f64; 5] {
        [
            self.japanese,
            self.math,
            self.english,
            self.social,
            self.science,
        ]
    }

    pub fn sum(&self) -> f64 {
        self.values().iter().sum()
    }

    pub fn clamped(self) -> Self {
        let [japanese, math, english, social, science] =
            self.values().map(|weight| clamp_unit(weight, WEIGHT_MAX));
        Self {
            japanese,
            math,
            english,
            social,
            science,
        }
    }
}

impl Default for SubjectWeights {
    fn default() -> Self {
        Self {
            japanese: 1.0,
            math: 1.0,
            english: 1.0,
            social: 1.0,
            science: 1.0,
        }
    }
}

/// Letter grade of the speaking test, converted to points by a fixed table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeakingGrade {
    #[default]
    A,
    B,
    C,
    D,
    E,
    F,
}

impl SpeakingGrade {
    pub const fn points(self) -> f64 {
        match self {
            Self::A => 20.0,
            Self::B => 16.0,
            Self::C => 12.0,
            Self::D => 8.0,
            Self::E => 4.0,
            Self::F => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AdditionalScores {
    pub interview: f64,
    pub essay: f64,
    pub practical: f64,
    pub bonus: f64,
    pub speaking: SpeakingGrade,
}

impl AdditionalScores {
    pub fn clamped(self) -> Self {
        Self {
            interview: clamp_unit(self.interview, ADDITIONAL_SCORE_MAX),
            essay: clamp_unit(self.essay, ADDITIONAL_SCORE_MAX),
            practical: clamp_unit(self.practical, ADDITIONAL_SCORE_MAX),
            bonus: clamp_unit(self.bonus, BONUS_MAX),
            speaking: self.speaking,
        }
    }
}

/// Which additional categories count toward the total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalFlags {
    pub interview: bool,
    pub essay: bool,
    pub practical: bool,
    pub bonus: bool,
    pub speaking: bool,
}

/// Everything a student enters before scores are computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreInput {
    pub grades: InternalGrades,
    pub exams: ExamScores,
    pub use_weights: bool,
    pub weights: SubjectWeights,
    pub additional: AdditionalScores,
    pub flags: AdditionalFlags,
}

impl ScoreInput {
    pub fn clamped(self) -> Self {
        Self {
            grades: self.grades.clamped(),
            exams: self.exams.clamped(),
            weights: self.weights.clamped(),
            additional: self.additional.clamped(),
            ..self
        }
    }

    pub fn with_exams(self, exams: ExamScores) -> Self {
        Self { exams, ..self }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    #[default]
    Simple,
    Ratio,
}

impl PatternType {
    pub const fn label(self) -> &'static str {
        match self {
            PatternType::Simple => "simple",
            PatternType::Ratio => "ratio",
        }
    }
}

/// How a school combines internal grades and exam scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScorePattern {
    Simple,
    Ratio { test: f64, naishin: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
    pub id: SchoolId,
    pub name: String,
    pub pattern_type: PatternType,
    pub ratio_test: f64,
    pub ratio_naishin: f64,
    pub pass_rate_80: Option<f64>,
    pub pass_rate_60: Option<f64>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl School {
    pub fn pattern(&self) -> ScorePattern {
        match self.pattern_type {
            PatternType::Simple => ScorePattern::Simple,
            PatternType::Ratio => ScorePattern::Ratio {
                test: self.ratio_test,
                naishin: self.ratio_naishin,
            },
        }
    }
}

fn default_ratio_test() -> f64 {
    DEFAULT_RATIO_TEST
}

fn default_ratio_naishin() -> f64 {
    DEFAULT_RATIO_NAISHIN
}

/// Payload for registering a school.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolDraft {
    pub name: String,
    #[serde(default)]
    pub pattern_type: PatternType,
    #[serde(default = "default_ratio_test")]
    pub ratio_test: f64,
    #[serde(default = "default_ratio_naishin")]
    pub ratio_naishin: f64,
    #[serde(default)]
    pub pass_rate_80: Option<f64>,
    #[serde(default)]
    pub pass_rate_60: Option<f64>,
}

impl SchoolDraft {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern_type: PatternType::Simple,
            ratio_test: DEFAULT_RATIO_TEST,
            ratio_naishin: DEFAULT_RATIO_NAISHIN,
            pass_rate_80: None,
            pass_rate_60: None,
        }
    }

    pub fn ratio(name: impl Into<String>, test: f64, naishin: f64) -> Self {
        Self {
            pattern_type: PatternType::Ratio,
            ratio_test: test,
            ratio_naishin: naishin,
            ..Self::simple(name)
        }
    }

    pub fn with_pass_rates(mut self, rate_80: Option<f64>, rate_60: Option<f64>) -> Self {
        self.pass_rate_80 = rate_80;
        self.pass_rate_60 = rate_60;
        self
    }
}

/// Partial update. For pass rates, an explicit `null` clears the value while an
/// absent field leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SchoolUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub pattern_type: Option<PatternType>,
    #[serde(default)]
    pub ratio_test: Option<f64>,
    #[serde(default)]
    pub ratio_naishin: Option<f64>,
    #[serde(default, deserialize_with = "present")]
    pub pass_rate_80: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub pass_rate_60: Option<Option<f64>>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(Some)
}

impl SchoolUpdate {
    pub(crate) fn apply(self, school: &mut School) {
        if let Some(name) = self.name {
            school.name = name;
        }
        if let Some(pattern_type) = self.pattern_type {
            school.pattern_type = pattern_type;
        }
        if let Some(ratio_test) = self.ratio_test {
            school.ratio_test = ratio_test;
        }
        if let Some(ratio_naishin) = self.ratio_naishin {
            school.ratio_naishin = ratio_naishin;
        }
        if let Some(rate) = self.pass_rate_80 {
            school.pass_rate_80 = rate;
        }
        if let Some(rate) = self.pass_rate_60 {
            school.pass_rate_60 = rate;
        }
    }
}

/// A user's pick of a school with its position in their list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionEntry {
    pub school_id: SchoolId,
    pub display_order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedSchool {
    #[serde(flatten)]
    pub school: School,
    pub display_order: u32,
}

/// Flat per-user record of every calculator input, stored between visits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorSnapshot {
    pub user_id: Option<UserId>,

    pub grade_japanese: u8,
    pub grade_math: u8,
    pub grade_english: u8,
    pub grade_social: u8,
    pub grade_science: u8,
    pub grade_tech_home: u8,
    pub grade_pe: u8,
    pub grade_music: u8,
    pub grade_art: u8,

    pub exam_japanese: i32,
    pub exam_math: i32,
    pub exam_english: i32,
    pub exam_social: i32,
    pub exam_science: i32,

    pub use_weights: bool,
    pub weight_japanese: f64,
    pub weight_math: f64,
    pub weight_english: f64,
    pub weight_social: f64,
    pub weight_science: f64,

    pub use_interview: bool,
    pub use_essay: bool,
    pub use_practical: bool,
    pub use_bonus: bool,
    pub use_speaking: bool,

    pub additional_interview: f64,
    pub additional_essay: f64,
    pub additional_practical: f64,
    pub additional_bonus: f64,
    pub additional_speaking: f64,
    pub speaking_grade: SpeakingGrade,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for CalculatorSnapshot {
    fn default() -> Self {
        Self::from_input(&ScoreInput::default())
    }
}

impl CalculatorSnapshot {
    pub fn from_input(input: &ScoreInput) -> Self {
        let ScoreInput {
            grades,
            exams,
            use_weights,
            weights,
            additional,
            flags,
        } = *input;

        Self {
            user_id: None,
            grade_japanese: grades.japanese,
            grade_math: grades.math,
            grade_english: grades.english,
            grade_social: grades.social,
            grade_science: grades.science,
            grade_tech_home: grades.tech_home,
            grade_pe: grades.pe,
            grade_music: grades.music,
            grade_art: grades.art,
            exam_japanese: exams.japanese,
            exam_math: exams.math,
            exam_english: exams.english,
            exam_social: exams.social,
            exam_science: exams.science,
            use_weights,
            weight_japanese: weights.japanese,
            weight_math: weights.math,
            weight_english: weights.english,
            weight_social: weights.social,
            weight_science: weights.science,
            use_interview: flags.interview,
            use_essay: flags.essay,
            use_practical: flags.practical,
            use_bonus: flags.bonus,
            use_speaking: flags.speaking,
            additional_interview: additional.interview,
            additional_essay: additional.essay,
            additional_practical: additional.practical,
            additional_bonus: additional.bonus,
            additional_speaking: additional.speaking.points(),
            speaking_grade: additional.speaking,
            created_at: None,
            updated_at: None,
        }
    }

    /// Structured, clamped inputs. Speaking points always follow `speaking_grade`.
    pub fn to_input(&self) -> ScoreInput {
        ScoreInput {
            grades: InternalGrades {
                japanese: self.grade_japanese,
                math: self.grade_math,
                english: self.grade_english,
                social: self.grade_social,
                science: self.grade_science,
                tech_home: self.grade_tech_home,
                pe: self.grade_pe,
                music: self.grade_music,
                art: self.grade_art,
            },
            exams: ExamScores {
                japanese: self.exam_japanese,
                math: self.exam_math,
                english: self.exam_english,
                social: self.exam_social,
                science: self.exam_science,
            },
            use_weights: self.use_weights,
            weights: SubjectWeights {
                japanese: self.weight_japanese,
                math: self.weight_math,
                english: self.weight_english,
                social: self.weight_social,
                science: self.weight_science,
            },
            additional: AdditionalScores {
                interview: self.additional_interview,
                essay: self.additional_essay,
                practical: self.additional_practical,
                bonus: self.additional_bonus,
                speaking: self.speaking_grade,
            },
            flags: AdditionalFlags {
                interview: self.use_interview,
                essay: self.use_essay,
                practical: self.use_practical,
                bonus: self.use_bonus,
                speaking: self.use_speaking,
            },
        }
        .clamped()
    }
}
