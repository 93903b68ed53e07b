use crate::error::{Error, Result};
use crate::services::engine::{DurationPolicy, EnginePolicy, QuestionOrder};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub session_rps: u32,
    pub catalog_cache_ttl_secs: i64,
    pub question_order: QuestionOrder,
    pub duration_policy: DurationPolicy,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            database_max_connections: get_env_parse_or("DATABASE_MAX_CONNECTIONS", 20)?,
            jwt_secret: get_env("JWT_SECRET")?,
            session_rps: get_env_parse_or("SESSION_RPS", 20)?,
            catalog_cache_ttl_secs: get_env_parse_or("CATALOG_CACHE_TTL_SECS", 30)?,
            question_order: get_env_parse_or("QUESTION_ORDER", QuestionOrder::Fixed)?,
            duration_policy: get_env_parse_or("DURATION_POLICY", DurationPolicy::Advisory)?,
            log_format: get_env_parse_or("LOG_FORMAT", LogFormat::Pretty)?,
        })
    }

    pub fn engine_policy(&self) -> EnginePolicy {
        EnginePolicy {
            question_order: self.question_order,
            duration: self.duration_policy,
        }
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}
