pub mod answer_service;
pub mod catalog;
pub mod engine;
pub mod grading_service;
pub mod lifecycle_service;
pub mod sequencer_service;
pub mod session_store;
