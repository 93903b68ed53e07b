use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::question::{Question, QuestionView};
use crate::models::test::Test;
use crate::models::test_session::TestSession;
use crate::services::engine::EngineContext;
use crate::utils::shuffle::seeded_shuffle;

#[derive(Debug, Clone, Serialize)]
pub struct QuestionAtPosition {
    pub question: QuestionView,
    pub index: usize,
    pub total: usize,
    pub answered: bool,
}

#[derive(Clone)]
pub struct SequencerService {
    ctx: EngineContext,
}

impl SequencerService {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// The question at 1-based `question_number` in the session's order, redacted.
    pub async fn fetch_by_number(
        &self,
        session_id: Uuid,
        question_number: i64,
    ) -> Result<QuestionAtPosition> {
        let session = self.ctx.load_session(session_id).await?;
        let test = self.ctx.load_test(session.test_id).await?;
        let questions = self.ordered_questions(&test, &session).await?;

        let total = questions.len();
        if total == 0 {
            return Err(Error::InvalidState(
                "Test has no questions available".to_string(),
            ));
        }
        let index = usize::try_from(question_number)
            .ok()
            .filter(|n| (1..=total).contains(n))
            .ok_or_else(|| {
                Error::Validation(format!(
                    "Question number must be between 1 and {}, got {}",
                    total, question_number
                ))
            })?;

        let question = &questions[index - 1];
        let answered = self
            .ctx
            .store
            .find_answer(session.id, question.id)
            .await?
            .is_some();

        Ok(QuestionAtPosition {
            question: QuestionView::from(question),
            index,
            total,
            answered,
        })
    }

    /// Creation order, or its seeded shuffle when the session carries a seed.
    pub async fn ordered_questions(
        &self,
        test: &Test,
        session: &TestSession,
    ) -> Result<Vec<Question>> {
        let mut questions = self.ctx.catalog.list_questions(test.bank_id).await?;
        questions.sort_by_key(|q| (q.created_at, q.id));
        if let Some(seed) = session.order_seed {
            seeded_shuffle(&mut questions, seed);
        }
        Ok(questions)
    }
}
