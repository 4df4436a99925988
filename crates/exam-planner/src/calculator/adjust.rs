//! What-if re-normalisation of exam scores against a chosen raw total.

use super::domain::ExamScores;
use super::engine::TEST_RAW_MAX;

/// Redistributes `target_total` across the five subjects in proportion to `scores`.
///
/// The first four subjects are rounded individually; the fifth takes whatever remains so
/// the result always sums to the (clamped) target. When every original score is zero the
/// target is split evenly under the same rule.
pub fn rescale_exam_scores(scores: &ExamScores, target_total: i32) -> ExamScores {
    let target = target_total.clamp(0, TEST_RAW_MAX as i32);
    let original = scores.values();
    let original_total: i32 = original.iter().sum();

    let share = |score: i32| -> i32 {
        if original_total > 0 {
            (f64::from(score) * f64::from(target) / f64::from(original_total)).round() as i32
        } else {
            (f64::from(target) / 5.0).round() as i32
        }
    };

    let mut adjusted = [0; 5];
    for (slot, score) in adjusted.iter_mut().zip(original).take(4) {
        *slot = share(score);
    }
    adjusted[4] = target - adjusted[..4].iter().sum::<i32>();

    ExamScores::from_values(adjusted)
}
