#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use exam_session_engine::database::memory::{InMemoryCatalog, InMemorySessionStore};
use exam_session_engine::models::question::{Question, QuestionOptions};
use exam_session_engine::models::test::Test;
use exam_session_engine::services::engine::{EngineContext, EnginePolicy, SessionEngine};
use exam_session_engine::utils::time::{Clock, ManualClock};

pub fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .expect("timestamp")
        .with_timezone(&Utc)
}

pub fn options(values: &[&str]) -> QuestionOptions {
    QuestionOptions::Ordered(values.iter().map(|v| v.to_string()).collect())
}

/// One enrolled student, one active test with "2+2?" (4) and "1+2?" (3).
pub struct Fixture {
    pub store: InMemorySessionStore,
    pub catalog: InMemoryCatalog,
    pub clock: ManualClock,
    pub engine: SessionEngine,
    pub test: Test,
    pub questions: Vec<Question>,
    pub student: Uuid,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_policy(EnginePolicy::default())
    }

    pub fn with_policy(policy: EnginePolicy) -> Self {
        Self::build(policy, |_| {})
    }

    pub fn build(policy: EnginePolicy, customize: impl FnOnce(&mut Test)) -> Self {
        let now = at("2026-03-01T09:00:00Z");
        let clock = ManualClock::new(now);
        let store = InMemorySessionStore::new();
        let catalog = InMemoryCatalog::new();

        let mut test = Test {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            bank_id: Uuid::new_v4(),
            title: "Arithmetic quiz".to_string(),
            start_time: None,
            end_time: None,
            is_active: true,
            pass_mark: Decimal::from(50),
            attempts_allowed: None,
            duration_minutes: 30,
            created_at: now - Duration::days(1),
        };
        customize(&mut test);
        catalog.add_test(test.clone());

        let questions = vec![
            catalog.add_question(
                test.bank_id,
                "2+2?",
                options(&["3", "4", "5"]),
                "4",
                now - Duration::hours(2),
            ),
            catalog.add_question(
                test.bank_id,
                "1+2?",
                options(&["2", "3"]),
                "3",
                now - Duration::hours(1),
            ),
        ];

        let student = Uuid::new_v4();
        catalog.enroll(student, test.course_id);

        let engine = SessionEngine::new(EngineContext {
            store: Arc::new(store.clone()),
            catalog: Arc::new(catalog.clone()),
            enrollment: Arc::new(catalog.clone()),
            clock: Arc::new(clock.clone()),
            policy,
        });

        Self {
            store,
            catalog,
            clock,
            engine,
            test,
            questions,
            student,
        }
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn enrolled_student(&self) -> Uuid {
        let student = Uuid::new_v4();
        self.catalog.enroll(student, self.test.course_id);
        student
    }
}
