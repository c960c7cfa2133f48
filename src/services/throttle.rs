//! In-memory failed-login throttle keyed by username.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::config::LoginThrottleConfig;

#[derive(Debug, Clone, Copy)]
struct AttemptWindow {
    started: Instant,
    failures: u32,
    locked_until: Option<Instant>,
}

pub struct LoginThrottle {
    config: LoginThrottleConfig,
    attempts: Mutex<HashMap<String, AttemptWindow>>,
}

impl LoginThrottle {
    #[must_use]
    pub fn new(config: LoginThrottleConfig) -> Self {
        Self {
            config,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    // Usernames are case-sensitive, so the key is the exact name.
    fn key(username: &str) -> String {
        username.to_string()
    }

    /// Returns the remaining lockout if this username may not attempt a login now.
    pub async fn check(&self, username: &str) -> Option<Duration> {
        self.check_at(username, Instant::now()).await
    }

    pub async fn record_failure(&self, username: &str) {
        self.record_failure_at(username, Instant::now()).await;
    }

    pub async fn record_success(&self, username: &str) {
        if !self.config.enabled {
            return;
        }
        self.attempts.lock().await.remove(&Self::key(username));
    }

    async fn check_at(&self, username: &str, now: Instant) -> Option<Duration> {
        if !self.config.enabled {
            return None;
        }

        let mut attempts = self.attempts.lock().await;
        let key = Self::key(username);
        let window = attempts.get(&key).copied()?;

        match window.locked_until {
            Some(until) if until > now => Some(until - now),
            Some(_) => {
                attempts.remove(&key);
                None
            }
            None => None,
        }
    }

    async fn record_failure_at(&self, username: &str, now: Instant) {
        if !self.config.enabled {
            return;
        }

        let window_len = Duration::from_secs(self.config.window_seconds);
        let lockout = Duration::from_secs(self.config.lockout_seconds);

        let mut attempts = self.attempts.lock().await;

        // Drop windows and lockouts that can no longer affect a login.
        attempts.retain(|_, w| match w.locked_until {
            Some(until) => until > now,
            None => now.duration_since(w.started) <= window_len,
        });

        let entry = attempts
            .entry(Self::key(username))
            .or_insert(AttemptWindow {
                started: now,
                failures: 0,
                locked_until: None,
            });

        if now.duration_since(entry.started) > window_len {
            *entry = AttemptWindow {
                started: now,
                failures: 0,
                locked_until: None,
            };
        }

        entry.failures += 1;

        if entry.failures >= self.config.max_attempts {
            entry.locked_until = Some(now + lockout);
            tracing::warn!(
                username = %username,
                failures = entry.failures,
                "Login locked out after repeated failures"
            );
        }
    }
}
