use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::answer::Answer;
use crate::models::question::QuestionView;
use crate::models::test_session::{SessionStatus, TestSession};
use crate::services::answer_service::{Progress, SubmissionOutcome};
use crate::services::grading_service::SessionResult;
use crate::services::lifecycle_service::SessionProgress;
use crate::services::sequencer_service::QuestionAtPosition;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionRequest {
    pub test_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    pub question_id: i64,
    #[validate(length(min = 1, message = "Selected option cannot be empty"))]
    pub selected_option: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub student_id: Uuid,
    pub test_id: Uuid,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub score: Option<i32>,
}

impl From<TestSession> for SessionResponse {
    fn from(s: TestSession) -> Self {
        Self {
            status: s.status(),
            id: s.id,
            student_id: s.student_id,
            test_id: s.test_id,
            started_at: s.started_at,
            ended_at: s.ended_at,
            score: s.score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub question: QuestionView,
    pub index: usize,
    pub total: usize,
    pub answered: bool,
}

impl From<QuestionAtPosition> for QuestionResponse {
    fn from(q: QuestionAtPosition) -> Self {
        Self {
            question: q.question,
            index: q.index,
            total: q.total,
            answered: q.answered,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub answered: usize,
    pub total: usize,
}

impl From<Progress> for ProgressResponse {
    fn from(p: Progress) -> Self {
        Self {
            answered: p.answered,
            total: p.total,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub finished: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_question: Option<QuestionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_number: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    pub progress: ProgressResponse,
}

impl From<SubmissionOutcome> for SubmissionResponse {
    fn from(outcome: SubmissionOutcome) -> Self {
        match outcome {
            SubmissionOutcome::Next {
                question,
                number,
                progress,
            } => Self {
                finished: false,
                next_question: Some(question),
                next_number: Some(number),
                score: None,
                progress: progress.into(),
            },
            SubmissionOutcome::Finished { score, progress } => Self {
                finished: true,
                next_question: None,
                next_number: None,
                score: Some(score),
                progress: progress.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveAnswerResponse {
    pub saved: bool,
    pub question_id: i64,
    pub answered_at: DateTime<Utc>,
}

impl From<Answer> for SaveAnswerResponse {
    fn from(a: Answer) -> Self {
        Self {
            saved: true,
            question_id: a.question_id,
            answered_at: a.answered_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub session: SessionResponse,
    pub questions_answered: usize,
    pub total_questions: usize,
    pub time_remaining_seconds: Option<i64>,
}

impl From<SessionProgress> for StatusResponse {
    fn from(p: SessionProgress) -> Self {
        Self {
            session: p.session.into(),
            questions_answered: p.answered,
            total_questions: p.total,
            time_remaining_seconds: p.remaining_seconds,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultResponse {
    pub score: i32,
    pub total_questions: usize,
    pub percentage: f64,
    pub passed: bool,
}

impl From<SessionResult> for ResultResponse {
    fn from(r: SessionResult) -> Self {
        Self {
            score: r.score,
            total_questions: r.total_questions,
            percentage: r.percentage.to_f64().unwrap_or(0.0),
            passed: r.passed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestStatusResponse {
    pub test_id: Uuid,
    pub status: SessionStatus,
}
