use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::answer::Answer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionResult {
    pub score: i32,
    pub total_questions: usize,
    pub percentage: Decimal,
    pub passed: bool,
}

pub struct GradingService;

impl GradingService {
    /// Raw correct-answer count. Declared question marks are not weighed in.
    pub fn score(answers: &[Answer]) -> i32 {
        answers.iter().filter(|a| a.is_correct).count() as i32
    }

    pub fn summarize(score: i32, total_questions: usize, pass_mark: Decimal) -> SessionResult {
        let percentage = if total_questions > 0 {
            (Decimal::from(score) * Decimal::ONE_HUNDRED / Decimal::from(total_questions as u64))
                .round_dp(2)
        } else {
            Decimal::ZERO
        };

        SessionResult {
            score,
            total_questions,
            percentage,
            passed: percentage >= pass_mark,
        }
    }
}
