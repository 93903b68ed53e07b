use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::test::Test;
use crate::models::test_session::{NewSession, SessionStatus, TestSession};
use crate::services::engine::{DurationPolicy, EngineContext, QuestionOrder};
use crate::services::grading_service::{GradingService, SessionResult};
use crate::services::sequencer_service::SequencerService;
use crate::utils::shuffle::new_seed;

#[derive(Debug, Clone, Serialize)]
pub struct SessionProgress {
    pub session: TestSession,
    pub status: SessionStatus,
    pub answered: usize,
    pub total: usize,
    pub remaining_seconds: Option<i64>,
}

/// Sole owner of the NOT_STARTED -> IN_PROGRESS -> COMPLETED transitions.
#[derive(Clone)]
pub struct LifecycleService {
    ctx: EngineContext,
    sequencer: SequencerService,
}

impl LifecycleService {
    pub fn new(ctx: EngineContext, sequencer: SequencerService) -> Self {
        Self { ctx, sequencer }
    }

    pub async fn start(&self, student_id: Uuid, test_id: Uuid) -> Result<TestSession> {
        let test = self.ctx.load_test(test_id).await?;
        if !test.is_active {
            tracing::warn!(%test_id, %student_id, "Start rejected: test inactive");
            return Err(Error::InvalidState("Test is not active".to_string()));
        }

        let now = self.ctx.clock.now();
        if !test.window_contains(now) {
            tracing::warn!(%test_id, %student_id, "Start rejected: outside activity window");
            return Err(Error::InvalidState(
                "Test is not open at this time".to_string(),
            ));
        }

        if !self.ctx.enrollment.is_enrolled(student_id, test_id).await? {
            tracing::warn!(%test_id, %student_id, "Start rejected: not enrolled");
            return Err(Error::Forbidden(
                "Student is not enrolled for this test".to_string(),
            ));
        }

        if let Some(open) = self.ctx.store.find_open_session(student_id, test_id).await? {
            if !self.is_overdue(&test, &open, now) {
                return Ok(open);
            }
            self.complete(open.id).await?;
        }

        if let Some(limit) = test.attempt_limit() {
            let used = self
                .ctx
                .store
                .count_completed_sessions(student_id, test_id)
                .await?;
            if used >= limit {
                tracing::warn!(%test_id, %student_id, used, limit, "Start rejected: attempt limit");
                return Err(Error::InvalidState(format!(
                    "Attempt limit of {} reached",
                    limit
                )));
            }
        }

        let order_seed = match self.ctx.policy.question_order {
            QuestionOrder::Fixed => None,
            QuestionOrder::PerSession => Some(new_seed()),
        };

        let session = self
            .ctx
            .store
            .create_or_get_open_session(NewSession {
                student_id,
                test_id,
                started_at: now,
                order_seed,
            })
            .await?;

        tracing::info!(session_id = %session.id, %student_id, %test_id, "Session started");
        Ok(session)
    }

    pub async fn finish(&self, session_id: Uuid, requesting_student_id: Uuid) -> Result<TestSession> {
        let session = self.owned_session(session_id, requesting_student_id).await?;
        if !session.is_open() {
            return Ok(session);
        }
        self.complete(session.id).await
    }

    /// Completion shared by explicit finish and answer exhaustion. Idempotent.
    pub(crate) async fn complete(&self, session_id: Uuid) -> Result<TestSession> {
        let now = self.ctx.clock.now();
        let session = self.ctx.store.complete_session(session_id, now).await?;
        tracing::info!(
            session_id = %session.id,
            score = ?session.score,
            "Session completed"
        );
        Ok(session)
    }

    pub async fn owned_session(&self, session_id: Uuid, student_id: Uuid) -> Result<TestSession> {
        let session = self.ctx.load_session(session_id).await?;
        if session.student_id != student_id {
            tracing::warn!(%session_id, %student_id, "Session access by non-owner");
            return Err(Error::Forbidden(
                "Session belongs to another student".to_string(),
            ));
        }
        Ok(session)
    }

    pub(crate) fn is_overdue(&self, test: &Test, session: &TestSession, now: DateTime<Utc>) -> bool {
        match self.ctx.policy.duration {
            DurationPolicy::Advisory => false,
            DurationPolicy::Enforced => {
                session.is_open()
                    && test
                        .deadline_for(session.started_at)
                        .map_or(false, |deadline| now > deadline)
            }
        }
    }

    /// Completes the session first when the duration policy says its time is up.
    pub(crate) async fn close_if_overdue(
        &self,
        test: &Test,
        session: TestSession,
    ) -> Result<TestSession> {
        if self.is_overdue(test, &session, self.ctx.clock.now()) {
            tracing::info!(session_id = %session.id, "Closing overdue session");
            return self.complete(session.id).await;
        }
        Ok(session)
    }

    pub async fn status(&self, session_id: Uuid, student_id: Uuid) -> Result<SessionProgress> {
        let session = self.owned_session(session_id, student_id).await?;
        let test = self.ctx.load_test(session.test_id).await?;
        let session = self.close_if_overdue(&test, session).await?;

        let questions = self.sequencer.ordered_questions(&test, &session).await?;
        let question_ids: HashSet<i64> = questions.iter().map(|q| q.id).collect();
        let answered = self
            .ctx
            .store
            .list_answers(session.id)
            .await?
            .iter()
            .filter(|a| question_ids.contains(&a.question_id))
            .count();

        let now = self.ctx.clock.now();
        let remaining_seconds = if session.is_open() {
            test.deadline_for(session.started_at)
                .map(|deadline| (deadline - now).num_seconds().max(0))
        } else {
            None
        };

        Ok(SessionProgress {
            status: session.status(),
            session,
            answered,
            total: questions.len(),
            remaining_seconds,
        })
    }

    pub async fn test_status(&self, student_id: Uuid, test_id: Uuid) -> Result<SessionStatus> {
        self.ctx.load_test(test_id).await?;
        let latest = self.ctx.store.latest_session(student_id, test_id).await?;
        Ok(latest.map_or(SessionStatus::NotStarted, |s| s.status()))
    }

    pub async fn result(&self, session_id: Uuid, student_id: Uuid) -> Result<SessionResult> {
        let session = self.owned_session(session_id, student_id).await?;
        let score = match (session.ended_at, session.score) {
            (Some(_), Some(score)) => score,
            (Some(_), None) => {
                return Err(Error::Internal(format!(
                    "Completed session {} has no score",
                    session.id
                )))
            }
            (None, _) => {
                return Err(Error::InvalidState(
                    "Session is still in progress".to_string(),
                ))
            }
        };

        let test = self.ctx.load_test(session.test_id).await?;
        let total = self.sequencer.ordered_questions(&test, &session).await?.len();
        Ok(GradingService::summarize(score, total, test.pass_mark))
    }
}
