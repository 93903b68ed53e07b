pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use chrono::Duration;
use sqlx::PgPool;

use crate::config::Config;
use crate::database::{
    pg_catalog::{PgEnrollmentCheck, PgTestCatalog},
    pg_store::PgSessionStore,
};
use crate::middleware::{auth::JwtVerifier, rate_limit::RateLimiter};
use crate::services::{
    catalog::CachedCatalog,
    engine::{EngineContext, SessionEngine},
};
use crate::utils::{
    cache::TtlCache,
    time::{Clock, SystemClock},
};

#[derive(Clone)]
pub struct AppState {
    pub engine: SessionEngine,
    pub verifier: JwtVerifier,
    pub limiter: RateLimiter,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let ttl = Duration::seconds(config.catalog_cache_ttl_secs);

        let catalog = CachedCatalog::new(
            Arc::new(PgTestCatalog::new(pool.clone())),
            TtlCache::new(ttl, clock.clone()),
            TtlCache::new(ttl, clock.clone()),
        );
        let ctx = EngineContext {
            store: Arc::new(PgSessionStore::new(pool.clone())),
            catalog: Arc::new(catalog),
            enrollment: Arc::new(PgEnrollmentCheck::new(pool)),
            clock: clock.clone(),
            policy: config.engine_policy(),
        };

        Self::from_parts(
            SessionEngine::new(ctx),
            &config.jwt_secret,
            config.session_rps,
            clock,
        )
    }

    pub fn from_parts(
        engine: SessionEngine,
        jwt_secret: &str,
        session_rps: u32,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine,
            verifier: JwtVerifier::new(jwt_secret),
            limiter: RateLimiter::new(session_rps, clock),
        }
    }
}
