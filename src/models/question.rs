use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: i64,
    pub bank_id: Uuid,
    pub text: String,
    pub options: Json<QuestionOptions>,
    pub answer: String,
    pub marks: i32,
    pub created_at: DateTime<Utc>,
}

impl Question {
    pub fn is_correct(&self, selected_option: &str) -> bool {
        selected_option == self.answer
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionOptions {
    Ordered(Vec<String>),
    Keyed(BTreeMap<String, String>),
}

/// Client-facing question. Carries no correct-answer field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: i64,
    pub text: String,
    pub options: QuestionOptions,
    pub marks: i32,
}

impl From<&Question> for QuestionView {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            text: q.text.clone(),
            options: q.options.0.clone(),
            marks: q.marks,
        }
    }
}
