use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Answer {
    pub id: i64,
    pub session_id: Uuid,
    pub question_id: i64,
    pub selected_option: String,
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAnswer {
    pub session_id: Uuid,
    pub question_id: i64,
    pub selected_option: String,
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}
