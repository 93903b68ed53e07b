mod common;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use common::Fixture;
use exam_session_engine::database::memory::InMemorySessionStore;
use exam_session_engine::error::Error;
use exam_session_engine::models::answer::{Answer, NewAnswer};
use exam_session_engine::models::test_session::{NewSession, TestSession};
use exam_session_engine::services::answer_service::{Progress, SubmissionOutcome};
use exam_session_engine::services::engine::{EngineContext, EnginePolicy, SessionEngine};
use exam_session_engine::services::session_store::{SessionStore, StoreError};

/// Completes the session right after every answer write, as if a finish
/// request committed between the upsert and the next-question scan.
struct FinishAfterUpsert {
    inner: InMemorySessionStore,
}

#[async_trait]
impl SessionStore for FinishAfterUpsert {
    async fn get_session(&self, session_id: Uuid) -> Result<Option<TestSession>, StoreError> {
        self.inner.get_session(session_id).await
    }

    async fn find_open_session(
        &self,
        student_id: Uuid,
        test_id: Uuid,
    ) -> Result<Option<TestSession>, StoreError> {
        self.inner.find_open_session(student_id, test_id).await
    }

    async fn latest_session(
        &self,
        student_id: Uuid,
        test_id: Uuid,
    ) -> Result<Option<TestSession>, StoreError> {
        self.inner.latest_session(student_id, test_id).await
    }

    async fn count_completed_sessions(
        &self,
        student_id: Uuid,
        test_id: Uuid,
    ) -> Result<i64, StoreError> {
        self.inner.count_completed_sessions(student_id, test_id).await
    }

    async fn create_or_get_open_session(&self, new: NewSession) -> Result<TestSession, StoreError> {
        self.inner.create_or_get_open_session(new).await
    }

    async fn upsert_answer(&self, answer: NewAnswer) -> Result<Answer, StoreError> {
        let stored = self.inner.upsert_answer(answer).await?;
        self.inner
            .complete_session(stored.session_id, stored.answered_at)
            .await?;
        Ok(stored)
    }

    async fn find_answer(
        &self,
        session_id: Uuid,
        question_id: i64,
    ) -> Result<Option<Answer>, StoreError> {
        self.inner.find_answer(session_id, question_id).await
    }

    async fn list_answers(&self, session_id: Uuid) -> Result<Vec<Answer>, StoreError> {
        self.inner.list_answers(session_id).await
    }

    async fn complete_session(
        &self,
        session_id: Uuid,
        ended_at: DateTime<Utc>,
    ) -> Result<TestSession, StoreError> {
        self.inner.complete_session(session_id, ended_at).await
    }
}

#[tokio::test]
async fn submission_reports_completion_that_landed_after_the_write() {
    let fx = Fixture::new();
    let store = InMemorySessionStore::new();
    let engine = SessionEngine::new(EngineContext {
        store: Arc::new(FinishAfterUpsert {
            inner: store.clone(),
        }),
        catalog: Arc::new(fx.catalog.clone()),
        enrollment: Arc::new(fx.catalog.clone()),
        clock: Arc::new(fx.clock.clone()),
        policy: EnginePolicy::default(),
    });

    let session = engine.lifecycle.start(fx.student, fx.test.id).await.unwrap();
    let outcome = engine
        .answers
        .submit_and_advance(session.id, fx.questions[0].id, "4")
        .await
        .unwrap();

    assert_eq!(
        outcome,
        SubmissionOutcome::Finished {
            score: 1,
            progress: Progress {
                answered: 1,
                total: 2
            }
        }
    );
    let stored = store.get_session(session.id).await.unwrap().unwrap();
    assert_eq!(stored.score, Some(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_for_one_question_keep_one_row() {
    let fx = Fixture::new();
    let session = fx.engine.lifecycle.start(fx.student, fx.test.id).await.unwrap();
    let question_id = fx.questions[0].id;

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let answers = fx.engine.answers.clone();
            let option = if i % 2 == 0 { "4" } else { "5" }.to_string();
            tokio::spawn(async move { answers.submit_only(session.id, question_id, &option).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(fx.store.answer_count(session.id), 1);
    let stored = fx
        .store
        .find_answer(session.id, question_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.is_correct, stored.selected_option == "4");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn finish_racing_last_answer_scores_once() {
    for _ in 0..25 {
        let fx = Fixture::new();
        let session = fx.engine.lifecycle.start(fx.student, fx.test.id).await.unwrap();
        fx.engine
            .answers
            .submit_only(session.id, fx.questions[0].id, "4")
            .await
            .unwrap();

        let lifecycle = fx.engine.lifecycle.clone();
        let student = fx.student;
        let finisher = tokio::spawn(async move { lifecycle.finish(session.id, student).await });
        let answers = fx.engine.answers.clone();
        let last = fx.questions[1].id;
        let submitter =
            tokio::spawn(async move { answers.submit_and_advance(session.id, last, "3").await });

        let finished = finisher.await.unwrap().unwrap();
        let submitted = submitter.await.unwrap();

        let stored = fx.store.get_session(session.id).await.unwrap().unwrap();
        assert!(stored.score.is_some());
        assert_eq!(finished.score, stored.score);
        assert_eq!(finished.ended_at, stored.ended_at);
        match submitted {
            Ok(SubmissionOutcome::Finished { score, .. }) => assert_eq!(Some(score), stored.score),
            Ok(other) => panic!("session is closed but submission returned {:?}", other),
            Err(Error::InvalidState(_)) => assert_eq!(stored.score, Some(1)),
            Err(other) => panic!("unexpected error {:?}", other),
        }

        let again = fx.engine.lifecycle.finish(session.id, fx.student).await.unwrap();
        assert_eq!(again, stored);
    }
}
