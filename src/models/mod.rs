pub mod answer;
pub mod question;
pub mod role;
pub mod test_session;
