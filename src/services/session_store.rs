use async_trait::async_trait;
use uuid::Uuid;

use crate::models::answer::{Answer, NewAnswer};
use crate::models::test_session::{NewSession, TestSession};

/// Errors surfaced by storage adapters.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("session closed")]
    SessionClosed,

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Durable home of sessions and answers.
///
/// Implementations must make `create_or_get_open_session`, `upsert_answer` and
/// `complete_session` atomic with respect to each other.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_session(&self, session_id: Uuid) -> Result<Option<TestSession>, StoreError>;

    async fn find_open_session(
        &self,
        student_id: Uuid,
        test_id: Uuid,
    ) -> Result<Option<TestSession>, StoreError>;

    /// Most recently started session for the pair, open or not.
    async fn latest_session(
        &self,
        student_id: Uuid,
        test_id: Uuid,
    ) -> Result<Option<TestSession>, StoreError>;

    async fn count_completed_sessions(
        &self,
        student_id: Uuid,
        test_id: Uuid,
    ) -> Result<i64, StoreError>;

    /// Insert a new open session unless one already exists for the pair, in which
    /// case the existing one is returned. Never leaves two open sessions behind.
    async fn create_or_get_open_session(&self, new: NewSession) -> Result<TestSession, StoreError>;

    /// Insert or overwrite the answer for `(session_id, question_id)`.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if the session is missing, `StoreError::SessionClosed`
    /// if it has already ended.
    async fn upsert_answer(&self, answer: NewAnswer) -> Result<Answer, StoreError>;

    async fn find_answer(
        &self,
        session_id: Uuid,
        question_id: i64,
    ) -> Result<Option<Answer>, StoreError>;

    async fn list_answers(&self, session_id: Uuid) -> Result<Vec<Answer>, StoreError>;

    /// Close the session, fixing its score to the number of correct answers.
    /// An already closed session is returned untouched.
    async fn complete_session(
        &self,
        session_id: Uuid,
        ended_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<TestSession, StoreError>;
}
