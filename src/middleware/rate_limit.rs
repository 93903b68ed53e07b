use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::role::Principal;
use crate::utils::time::Clock;

const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug)]
struct WindowState {
    start: DateTime<Utc>,
    count: u32,
}

/// Fixed one-second window per principal. Requests without a principal share one window.
#[derive(Clone)]
pub struct RateLimiter {
    rps: u32,
    clock: Arc<dyn Clock>,
    windows: Arc<Mutex<HashMap<Uuid, WindowState>>>,
}

impl RateLimiter {
    pub fn new(rps: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            rps: rps.max(1),
            clock,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn allow(&self, key: Uuid) -> bool {
        let now = self.clock.now();
        let window = Duration::seconds(1);
        let mut guard = self.windows.lock().unwrap_or_else(|e| e.into_inner());

        if guard.len() > PRUNE_THRESHOLD {
            guard.retain(|_, w| now - w.start < window);
        }

        let state = guard.entry(key).or_insert(WindowState {
            start: now,
            count: 0,
        });
        if now - state.start >= window {
            state.start = now;
            state.count = 0;
        }
        if state.count < self.rps {
            state.count += 1;
            true
        } else {
            false
        }
    }
}

pub async fn rps_middleware(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let key = req
        .extensions()
        .get::<Principal>()
        .map_or(Uuid::nil(), |p| p.user_id);
    if !limiter.allow(key) {
        tracing::warn!(principal = %key, "Rate limit exceeded");
        return (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded").into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time::ManualClock;

    #[test]
    fn limits_each_principal_independently() {
        let clock = ManualClock::new(Utc::now());
        let limiter = RateLimiter::new(2, Arc::new(clock.clone()));
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        assert!(limiter.allow(alice));
        assert!(limiter.allow(alice));
        assert!(!limiter.allow(alice));
        assert!(limiter.allow(bob));

        clock.advance(Duration::seconds(1));
        assert!(limiter.allow(alice));
    }
}
