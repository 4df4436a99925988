//! Composite admission scoring and the school list it is evaluated against.
//!
//! [`compute_score`] is a pure function of the entered grades and the school's
//! aggregation pattern; [`CalculatorService`] adds school management, per-user
//! selections and saved inputs behind a [`SchoolRepository`].

mod adjust;
pub mod classify;
pub mod domain;
pub mod engine;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use adjust::rescale_exam_scores;
pub use classify::{school_results, PassBand, PassStatus, SchoolResult, ThresholdVerdict};
pub use domain::{
    AdditionalFlags, AdditionalScores, CalculatorSnapshot, ExamScores, InternalGrades,
    PatternType, School, SchoolDraft, SchoolId, SchoolUpdate, ScoreInput, ScorePattern,
    SelectedSchool, SelectionEntry, SpeakingGrade, SubjectWeights, UserId,
};
pub use engine::{
    compute_score, ScoreBreakdown, ScoreEngine, ScoreError, DEFAULT_NAISHIN_MULTIPLIER,
    NAISHIN_MAX_RAW,
};
pub use repository::{RepositoryError, SchoolRepository};
pub use router::{calculator_router, USER_HEADER};
pub use service::{
    CalculatorService, CalculatorServiceError, Evaluation, EvaluationRequest, ValidationError,
};
