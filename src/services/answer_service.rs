use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::answer::{Answer, NewAnswer};
use crate::models::question::{Question, QuestionView};
use crate::services::engine::EngineContext;
use crate::services::lifecycle_service::LifecycleService;
use crate::services::sequencer_service::SequencerService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub answered: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// First unanswered question in session order, with its 1-based number.
    Next {
        question: QuestionView,
        number: usize,
        progress: Progress,
    },
    Finished {
        score: i32,
        progress: Progress,
    },
}

struct Recorded {
    questions: Vec<Question>,
    answer: Answer,
}

#[derive(Clone)]
pub struct AnswerService {
    ctx: EngineContext,
    lifecycle: LifecycleService,
    sequencer: SequencerService,
}

impl AnswerService {
    pub fn new(ctx: EngineContext, lifecycle: LifecycleService, sequencer: SequencerService) -> Self {
        Self {
            ctx,
            lifecycle,
            sequencer,
        }
    }

    pub async fn submit_and_advance(
        &self,
        session_id: Uuid,
        question_id: i64,
        selected_option: &str,
    ) -> Result<SubmissionOutcome> {
        let recorded = self.record(session_id, question_id, selected_option).await?;

        let answered: HashSet<i64> = self
            .ctx
            .store
            .list_answers(session_id)
            .await?
            .into_iter()
            .map(|a| a.question_id)
            .collect();
        let progress = Progress {
            answered: recorded
                .questions
                .iter()
                .filter(|q| answered.contains(&q.id))
                .count(),
            total: recorded.questions.len(),
        };

        let session = match recorded
            .questions
            .iter()
            .position(|q| !answered.contains(&q.id))
        {
            Some(pos) => {
                // A finish may have committed after our upsert.
                let session = self.ctx.load_session(session_id).await?;
                if session.is_open() {
                    return Ok(SubmissionOutcome::Next {
                        question: QuestionView::from(&recorded.questions[pos]),
                        number: pos + 1,
                        progress,
                    });
                }
                tracing::info!(%session_id, "Session completed concurrently with submission");
                session
            }
            None => self.lifecycle.complete(session_id).await?,
        };

        let score = session.score.ok_or_else(|| {
            Error::Internal(format!("Completed session {} has no score", session.id))
        })?;
        Ok(SubmissionOutcome::Finished { score, progress })
    }

    /// Same validation and upsert as `submit_and_advance`, without navigation.
    pub async fn submit_only(
        &self,
        session_id: Uuid,
        question_id: i64,
        selected_option: &str,
    ) -> Result<Answer> {
        self.record(session_id, question_id, selected_option)
            .await
            .map(|r| r.answer)
    }

    async fn record(
        &self,
        session_id: Uuid,
        question_id: i64,
        selected_option: &str,
    ) -> Result<Recorded> {
        let session = self.ctx.load_session(session_id).await?;
        if !session.is_open() {
            return Err(Error::InvalidState(
                "Session is already completed".to_string(),
            ));
        }

        let test = self.ctx.load_test(session.test_id).await?;
        let session = self.lifecycle.close_if_overdue(&test, session).await?;
        if !session.is_open() {
            return Err(Error::InvalidState("Time limit exceeded".to_string()));
        }

        let questions = self.sequencer.ordered_questions(&test, &session).await?;
        let question = questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "Question {} is not part of this test",
                    question_id
                ))
            })?;

        let is_correct = question.is_correct(selected_option);
        let answer = self
            .ctx
            .store
            .upsert_answer(NewAnswer {
                session_id,
                question_id,
                selected_option: selected_option.to_string(),
                is_correct,
                answered_at: self.ctx.clock.now(),
            })
            .await?;

        tracing::info!(%session_id, question_id, "Answer recorded");
        Ok(Recorded { questions, answer })
    }
}
