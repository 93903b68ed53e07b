pub mod cache;
pub mod shuffle;
pub mod time;
