use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::models::answer::{Answer, NewAnswer};
use crate::models::question::{Question, QuestionOptions};
use crate::models::test::Test;
use crate::models::test_session::{NewSession, TestSession};
use crate::services::catalog::{EnrollmentCheck, TestCatalog};
use crate::services::grading_service::GradingService;
use crate::services::session_store::{SessionStore, StoreError};

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    m.lock().map_err(|e| StoreError::Backend(e.to_string()))
}

#[derive(Default)]
struct SessionArena {
    sessions: HashMap<Uuid, TestSession>,
    started: Vec<Uuid>,
    answers: HashMap<(Uuid, i64), Answer>,
    next_answer_id: i64,
}

impl SessionArena {
    fn open_for(&self, student_id: Uuid, test_id: Uuid) -> Option<&TestSession> {
        self.sessions
            .values()
            .find(|s| s.student_id == student_id && s.test_id == test_id && s.is_open())
    }
}

/// Mutex-guarded arena. Every trait method runs under one lock, which gives
/// the atomicity the Postgres store gets from row locks and unique indexes.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    arena: Arc<Mutex<SessionArena>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_session_count(&self, student_id: Uuid, test_id: Uuid) -> usize {
        self.arena
            .lock()
            .map(|a| {
                a.sessions
                    .values()
                    .filter(|s| s.student_id == student_id && s.test_id == test_id && s.is_open())
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn answer_count(&self, session_id: Uuid) -> usize {
        self.arena
            .lock()
            .map(|a| a.answers.keys().filter(|(sid, _)| *sid == session_id).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_session(&self, session_id: Uuid) -> Result<Option<TestSession>, StoreError> {
        Ok(lock(&self.arena)?.sessions.get(&session_id).cloned())
    }

    async fn find_open_session(
        &self,
        student_id: Uuid,
        test_id: Uuid,
    ) -> Result<Option<TestSession>, StoreError> {
        Ok(lock(&self.arena)?.open_for(student_id, test_id).cloned())
    }

    async fn latest_session(
        &self,
        student_id: Uuid,
        test_id: Uuid,
    ) -> Result<Option<TestSession>, StoreError> {
        let arena = lock(&self.arena)?;
        Ok(arena
            .started
            .iter()
            .rev()
            .filter_map(|id| arena.sessions.get(id))
            .find(|s| s.student_id == student_id && s.test_id == test_id)
            .cloned())
    }

    async fn count_completed_sessions(
        &self,
        student_id: Uuid,
        test_id: Uuid,
    ) -> Result<i64, StoreError> {
        let arena = lock(&self.arena)?;
        Ok(arena
            .sessions
            .values()
            .filter(|s| s.student_id == student_id && s.test_id == test_id && !s.is_open())
            .count() as i64)
    }

    async fn create_or_get_open_session(&self, new: NewSession) -> Result<TestSession, StoreError> {
        let mut arena = lock(&self.arena)?;
        if let Some(existing) = arena.open_for(new.student_id, new.test_id) {
            return Ok(existing.clone());
        }
        let session = TestSession {
            id: Uuid::new_v4(),
            student_id: new.student_id,
            test_id: new.test_id,
            started_at: new.started_at,
            ended_at: None,
            score: None,
            order_seed: new.order_seed,
        };
        arena.started.push(session.id);
        arena.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn upsert_answer(&self, answer: NewAnswer) -> Result<Answer, StoreError> {
        let mut arena = lock(&self.arena)?;
        match arena.sessions.get(&answer.session_id) {
            None => return Err(StoreError::NotFound),
            Some(s) if !s.is_open() => return Err(StoreError::SessionClosed),
            Some(_) => {}
        }

        let key = (answer.session_id, answer.question_id);
        let existing_id = arena.answers.get(&key).map(|a| a.id);
        let id = match existing_id {
            Some(id) => id,
            None => {
                arena.next_answer_id += 1;
                arena.next_answer_id
            }
        };
        let stored = Answer {
            id,
            session_id: answer.session_id,
            question_id: answer.question_id,
            selected_option: answer.selected_option,
            is_correct: answer.is_correct,
            answered_at: answer.answered_at,
        };
        arena.answers.insert(key, stored.clone());
        Ok(stored)
    }

    async fn find_answer(
        &self,
        session_id: Uuid,
        question_id: i64,
    ) -> Result<Option<Answer>, StoreError> {
        Ok(lock(&self.arena)?
            .answers
            .get(&(session_id, question_id))
            .cloned())
    }

    async fn list_answers(&self, session_id: Uuid) -> Result<Vec<Answer>, StoreError> {
        let arena = lock(&self.arena)?;
        let mut answers: Vec<Answer> = arena
            .answers
            .values()
            .filter(|a| a.session_id == session_id)
            .cloned()
            .collect();
        answers.sort_by_key(|a| a.question_id);
        Ok(answers)
    }

    async fn complete_session(
        &self,
        session_id: Uuid,
        ended_at: DateTime<Utc>,
    ) -> Result<TestSession, StoreError> {
        let mut arena = lock(&self.arena)?;
        let current = arena
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or(StoreError::NotFound)?;
        if !current.is_open() {
            return Ok(current);
        }

        let answers: Vec<Answer> = arena
            .answers
            .values()
            .filter(|a| a.session_id == session_id)
            .cloned()
            .collect();
        let completed = TestSession {
            ended_at: Some(ended_at),
            score: Some(GradingService::score(&answers)),
            ..current
        };
        arena.sessions.insert(session_id, completed.clone());
        Ok(completed)
    }
}

#[derive(Default)]
struct CatalogData {
    tests: HashMap<Uuid, Test>,
    questions: Vec<Question>,
    next_question_id: i64,
    enrollments: HashSet<(Uuid, Uuid)>,
}

/// Tests, banks and course enrollments held in memory.
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    data: Arc<Mutex<CatalogData>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_test(&self, test: Test) {
        if let Ok(mut data) = self.data.lock() {
            data.tests.insert(test.id, test);
        }
    }

    pub fn set_active(&self, test_id: Uuid, is_active: bool) {
        if let Ok(mut data) = self.data.lock() {
            if let Some(test) = data.tests.get_mut(&test_id) {
                test.is_active = is_active;
            }
        }
    }

    pub fn add_question(
        &self,
        bank_id: Uuid,
        text: &str,
        options: QuestionOptions,
        answer: &str,
        created_at: DateTime<Utc>,
    ) -> Question {
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.next_question_id += 1;
        let question = Question {
            id: data.next_question_id,
            bank_id,
            text: text.to_string(),
            options: Json(options),
            answer: answer.to_string(),
            marks: 1,
            created_at,
        };
        data.questions.push(question.clone());
        question
    }

    pub fn enroll(&self, student_id: Uuid, course_id: Uuid) {
        if let Ok(mut data) = self.data.lock() {
            data.enrollments.insert((student_id, course_id));
        }
    }
}

#[async_trait]
impl TestCatalog for InMemoryCatalog {
    async fn get_test(&self, test_id: Uuid) -> Result<Option<Test>, StoreError> {
        Ok(lock(&self.data)?.tests.get(&test_id).cloned())
    }

    async fn list_questions(&self, bank_id: Uuid) -> Result<Vec<Question>, StoreError> {
        let data = lock(&self.data)?;
        let mut questions: Vec<Question> = data
            .questions
            .iter()
            .filter(|q| q.bank_id == bank_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| (q.created_at, q.id));
        Ok(questions)
    }
}

#[async_trait]
impl EnrollmentCheck for InMemoryCatalog {
    async fn is_enrolled(&self, student_id: Uuid, test_id: Uuid) -> Result<bool, StoreError> {
        let data = lock(&self.data)?;
        Ok(data
            .tests
            .get(&test_id)
            .map_or(false, |t| data.enrollments.contains(&(student_id, t.course_id))))
    }
}
