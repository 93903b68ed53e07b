use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::test::Test;
use crate::models::test_session::TestSession;
use crate::services::answer_service::AnswerService;
use crate::services::catalog::{EnrollmentCheck, TestCatalog};
use crate::services::lifecycle_service::LifecycleService;
use crate::services::sequencer_service::SequencerService;
use crate::services::session_store::SessionStore;
use crate::utils::time::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuestionOrder {
    /// Creation order, identical for every session of a test.
    #[default]
    Fixed,
    /// Seeded shuffle of creation order, seed stored on the session.
    PerSession,
}

impl FromStr for QuestionOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(QuestionOrder::Fixed),
            "per_session" | "per-session" | "shuffled" => Ok(QuestionOrder::PerSession),
            other => Err(format!("unknown question order '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurationPolicy {
    /// `duration_minutes` is informational only.
    #[default]
    Advisory,
    /// Overdue sessions are completed on their next access.
    Enforced,
}

impl FromStr for DurationPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "advisory" => Ok(DurationPolicy::Advisory),
            "enforced" => Ok(DurationPolicy::Enforced),
            other => Err(format!("unknown duration policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnginePolicy {
    pub question_order: QuestionOrder,
    pub duration: DurationPolicy,
}

/// Collaborators shared by every engine service.
#[derive(Clone)]
pub struct EngineContext {
    pub store: Arc<dyn SessionStore>,
    pub catalog: Arc<dyn TestCatalog>,
    pub enrollment: Arc<dyn EnrollmentCheck>,
    pub clock: Arc<dyn Clock>,
    pub policy: EnginePolicy,
}

impl EngineContext {
    pub async fn load_session(&self, session_id: Uuid) -> Result<TestSession> {
        self.store
            .get_session(session_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Session {} not found", session_id)))
    }

    pub async fn load_test(&self, test_id: Uuid) -> Result<Test> {
        self.catalog
            .get_test(test_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Test {} not found", test_id)))
    }
}

#[derive(Clone)]
pub struct SessionEngine {
    pub lifecycle: LifecycleService,
    pub sequencer: SequencerService,
    pub answers: AnswerService,
}

impl SessionEngine {
    pub fn new(ctx: EngineContext) -> Self {
        let sequencer = SequencerService::new(ctx.clone());
        let lifecycle = LifecycleService::new(ctx.clone(), sequencer.clone());
        let answers = AnswerService::new(ctx, lifecycle.clone(), sequencer.clone());
        Self {
            lifecycle,
            sequencer,
            answers,
        }
    }
}
