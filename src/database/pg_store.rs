use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::answer::{Answer, NewAnswer};
use crate::models::test_session::{NewSession, TestSession};
use crate::services::session_store::{SessionStore, StoreError};

const SESSION_COLUMNS: &str = "id, student_id, test_id, started_at, ended_at, score, order_seed";
const ANSWER_COLUMNS: &str = "id, session_id, question_id, selected_option, is_correct, answered_at";

// A concurrent finish can close the winning session between our insert and re-read.
const CREATE_RETRIES: usize = 3;

#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn get_session(&self, session_id: Uuid) -> Result<Option<TestSession>, StoreError> {
        let session = sqlx::query_as::<_, TestSession>(&format!(
            "SELECT {} FROM test_sessions WHERE id = $1",
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn find_open_session(
        &self,
        student_id: Uuid,
        test_id: Uuid,
    ) -> Result<Option<TestSession>, StoreError> {
        let session = sqlx::query_as::<_, TestSession>(&format!(
            "SELECT {} FROM test_sessions
             WHERE student_id = $1 AND test_id = $2 AND ended_at IS NULL",
            SESSION_COLUMNS
        ))
        .bind(student_id)
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn latest_session(
        &self,
        student_id: Uuid,
        test_id: Uuid,
    ) -> Result<Option<TestSession>, StoreError> {
        let session = sqlx::query_as::<_, TestSession>(&format!(
            "SELECT {} FROM test_sessions
             WHERE student_id = $1 AND test_id = $2
             ORDER BY started_at DESC
             LIMIT 1",
            SESSION_COLUMNS
        ))
        .bind(student_id)
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn count_completed_sessions(
        &self,
        student_id: Uuid,
        test_id: Uuid,
    ) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM test_sessions
               WHERE student_id = $1 AND test_id = $2 AND ended_at IS NOT NULL"#,
        )
        .bind(student_id)
        .bind(test_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn create_or_get_open_session(&self, new: NewSession) -> Result<TestSession, StoreError> {
        for _ in 0..CREATE_RETRIES {
            let inserted = sqlx::query_as::<_, TestSession>(&format!(
                "INSERT INTO test_sessions (id, student_id, test_id, started_at, order_seed)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (student_id, test_id) WHERE ended_at IS NULL DO NOTHING
                 RETURNING {}",
                SESSION_COLUMNS
            ))
            .bind(Uuid::new_v4())
            .bind(new.student_id)
            .bind(new.test_id)
            .bind(new.started_at)
            .bind(new.order_seed)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(session) = inserted {
                return Ok(session);
            }
            if let Some(existing) = self.find_open_session(new.student_id, new.test_id).await? {
                return Ok(existing);
            }
        }
        Err(StoreError::Backend(
            "could not settle the open session for student/test pair".to_string(),
        ))
    }

    async fn upsert_answer(&self, answer: NewAnswer) -> Result<Answer, StoreError> {
        let mut tx = self.pool.begin().await?;

        let ended_at: Option<Option<DateTime<Utc>>> =
            sqlx::query_scalar("SELECT ended_at FROM test_sessions WHERE id = $1 FOR UPDATE")
                .bind(answer.session_id)
                .fetch_optional(&mut *tx)
                .await?;
        match ended_at {
            None => return Err(StoreError::NotFound),
            Some(Some(_)) => return Err(StoreError::SessionClosed),
            Some(None) => {}
        }

        let stored = sqlx::query_as::<_, Answer>(&format!(
            "INSERT INTO answers (session_id, question_id, selected_option, is_correct, answered_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (session_id, question_id) DO UPDATE
             SET selected_option = EXCLUDED.selected_option,
                 is_correct = EXCLUDED.is_correct,
                 answered_at = EXCLUDED.answered_at
             RETURNING {}",
            ANSWER_COLUMNS
        ))
        .bind(answer.session_id)
        .bind(answer.question_id)
        .bind(&answer.selected_option)
        .bind(answer.is_correct)
        .bind(answer.answered_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(stored)
    }

    async fn find_answer(
        &self,
        session_id: Uuid,
        question_id: i64,
    ) -> Result<Option<Answer>, StoreError> {
        let answer = sqlx::query_as::<_, Answer>(&format!(
            "SELECT {} FROM answers WHERE session_id = $1 AND question_id = $2",
            ANSWER_COLUMNS
        ))
        .bind(session_id)
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(answer)
    }

    async fn list_answers(&self, session_id: Uuid) -> Result<Vec<Answer>, StoreError> {
        let answers = sqlx::query_as::<_, Answer>(&format!(
            "SELECT {} FROM answers WHERE session_id = $1 ORDER BY question_id",
            ANSWER_COLUMNS
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(answers)
    }

    async fn complete_session(
        &self,
        session_id: Uuid,
        ended_at: DateTime<Utc>,
    ) -> Result<TestSession, StoreError> {
        let mut tx = self.pool.begin().await?;

        let session = sqlx::query_as::<_, TestSession>(&format!(
            "SELECT {} FROM test_sessions WHERE id = $1 FOR UPDATE",
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound)?;

        if !session.is_open() {
            tx.commit().await?;
            return Ok(session);
        }

        // Runs after the row lock, so every answer committed before us is counted.
        let score: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM answers WHERE session_id = $1 AND is_correct",
        )
        .bind(session_id)
        .fetch_one(&mut *tx)
        .await?;
        let score = i32::try_from(score)
            .map_err(|_| StoreError::Backend(format!("score overflow: {}", score)))?;

        let completed = sqlx::query_as::<_, TestSession>(&format!(
            "UPDATE test_sessions SET ended_at = $2, score = $3 WHERE id = $1 RETURNING {}",
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .bind(ended_at)
        .bind(score)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(completed)
    }
}
