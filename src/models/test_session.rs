use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TestSession {
    pub id: Uuid,
    pub student_id: Uuid,
    pub test_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub score: Option<i32>,
    pub order_seed: Option<i64>,
}

impl TestSession {
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    pub fn status(&self) -> SessionStatus {
        if self.is_open() {
            SessionStatus::InProgress
        } else {
            SessionStatus::Completed
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub student_id: Uuid,
    pub test_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub order_seed: Option<i64>,
}
