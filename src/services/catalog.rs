use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::question::Question;
use crate::models::test::Test;
use crate::services::session_store::StoreError;
use crate::utils::cache::TtlCache;

/// Read access to tests and their question banks.
#[async_trait]
pub trait TestCatalog: Send + Sync {
    async fn get_test(&self, test_id: Uuid) -> Result<Option<Test>, StoreError>;

    /// Questions of a bank in creation order.
    async fn list_questions(&self, bank_id: Uuid) -> Result<Vec<Question>, StoreError>;
}

/// Answers "may this student attempt this test".
#[async_trait]
pub trait EnrollmentCheck: Send + Sync {
    async fn is_enrolled(&self, student_id: Uuid, test_id: Uuid) -> Result<bool, StoreError>;
}

pub struct CachedCatalog {
    inner: Arc<dyn TestCatalog>,
    tests: TtlCache<Uuid, Test>,
    banks: TtlCache<Uuid, Arc<Vec<Question>>>,
}

impl CachedCatalog {
    pub fn new(
        inner: Arc<dyn TestCatalog>,
        tests: TtlCache<Uuid, Test>,
        banks: TtlCache<Uuid, Arc<Vec<Question>>>,
    ) -> Self {
        Self {
            inner,
            tests,
            banks,
        }
    }
}

#[async_trait]
impl TestCatalog for CachedCatalog {
    async fn get_test(&self, test_id: Uuid) -> Result<Option<Test>, StoreError> {
        if let Some(test) = self.tests.get(&test_id) {
            return Ok(Some(test));
        }
        let found = self.inner.get_test(test_id).await?;
        if let Some(test) = &found {
            self.tests.insert(test_id, test.clone());
        }
        Ok(found)
    }

    async fn list_questions(&self, bank_id: Uuid) -> Result<Vec<Question>, StoreError> {
        if let Some(questions) = self.banks.get(&bank_id) {
            return Ok(questions.as_ref().clone());
        }
        let questions = self.inner.list_questions(bank_id).await?;
        self.banks.insert(bank_id, Arc::new(questions.clone()));
        Ok(questions)
    }
}
