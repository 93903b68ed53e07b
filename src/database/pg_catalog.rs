use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::question::Question;
use crate::models::test::Test;
use crate::services::catalog::{EnrollmentCheck, TestCatalog};
use crate::services::session_store::StoreError;

#[derive(Clone)]
pub struct PgTestCatalog {
    pool: PgPool,
}

impl PgTestCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TestCatalog for PgTestCatalog {
    async fn get_test(&self, test_id: Uuid) -> Result<Option<Test>, StoreError> {
        let test = sqlx::query_as::<_, Test>(
            r#"SELECT id, course_id, bank_id, title, start_time, end_time, is_active,
                      pass_mark, attempts_allowed, duration_minutes, created_at
               FROM tests WHERE id = $1"#,
        )
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(test)
    }

    async fn list_questions(&self, bank_id: Uuid) -> Result<Vec<Question>, StoreError> {
        let questions = sqlx::query_as::<_, Question>(
            r#"SELECT id, bank_id, text, options, answer, marks, created_at
               FROM questions
               WHERE bank_id = $1
               ORDER BY created_at, id"#,
        )
        .bind(bank_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }
}

/// Enrollment through the test's course, directly or via a class attached to it.
#[derive(Clone)]
pub struct PgEnrollmentCheck {
    pool: PgPool,
}

impl PgEnrollmentCheck {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EnrollmentCheck for PgEnrollmentCheck {
    async fn is_enrolled(&self, student_id: Uuid, test_id: Uuid) -> Result<bool, StoreError> {
        let enrolled: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM tests t
                JOIN course_enrollments ce ON ce.course_id = t.course_id
                WHERE t.id = $2 AND ce.student_id = $1
            ) OR EXISTS (
                SELECT 1 FROM tests t
                JOIN class_courses cc ON cc.course_id = t.course_id
                JOIN class_members cm ON cm.class_id = cc.class_id
                WHERE t.id = $2 AND cm.student_id = $1
            )
            "#,
        )
        .bind(student_id)
        .bind(test_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(enrolled)
    }
}
