//! Per-user sliding-window rate limiting.
//!
//! Each user gets a [`RateWindow`] holding the instants of their admissions
//! within the trailing 60 seconds. The owner identity bypasses the limiter
//! and is never recorded.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::RateLimitConfig;

/// Length of the sliding window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Admission history for a single user.
#[derive(Debug, Clone)]
pub struct RateWindow {
    max_per_window: usize,
    admitted: VecDeque<Instant>,
}

impl RateWindow {
    pub fn new(max_per_window: u32) -> Self {
        Self {
            max_per_window: max_per_window as usize,
            admitted: VecDeque::new(),
        }
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.admitted.front() {
            if now.saturating_duration_since(oldest) > WINDOW {
                self.admitted.pop_front();
            } else {
                break;
            }
        }
    }

    /// Record an admission at `now` if the window has room.
    pub fn admit_at(&mut self, now: Instant) -> bool {
        self.prune(now);
        if self.admitted.len() >= self.max_per_window {
            return false;
        }
        self.admitted.push_back(now);
        true
    }

    /// Time until the oldest retained admission leaves the window.
    pub fn until_next_at(&self, now: Instant) -> Duration {
        match self.admitted.front() {
            Some(&oldest) => WINDOW.saturating_sub(now.saturating_duration_since(oldest)),
            None => Duration::ZERO,
        }
    }

    /// Admissions currently retained.
    pub fn len(&self) -> usize {
        self.admitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.admitted.is_empty()
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Counted against the user's window.
    Admitted,
    /// Owner identity; nothing recorded.
    Exempt,
    /// Window full.
    Denied { retry_after: Duration },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Admission::Denied { .. })
    }
}

/// Sliding-window limiter keyed by lower-cased user identity.
#[derive(Debug)]
pub struct RateLimiter {
    max_per_window: u32,
    exempt: Option<String>,
    windows: Mutex<HashMap<String, RateWindow>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let owner = config.owner_email.trim();
        Self {
            max_per_window: config.max_requests_per_minute,
            exempt: (!owner.is_empty()).then(|| owner.to_lowercase()),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Whether `user` is the configured owner (case-insensitive).
    pub fn is_exempt(&self, user: &str) -> bool {
        self.exempt
            .as_deref()
            .is_some_and(|owner| owner == user.to_lowercase())
    }

    /// Decide whether `user` may submit another request now.
    pub async fn check(&self, user: &str) -> Admission {
        if self.is_exempt(user) {
            return Admission::Exempt;
        }

        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let window = windows
            .entry(user.to_lowercase())
            .or_insert_with(|| RateWindow::new(self.max_per_window));

        if window.admit_at(now) {
            Admission::Admitted
        } else {
            Admission::Denied {
                retry_after: window.until_next_at(now),
            }
        }
    }

    /// Boolean form of [`RateLimiter::check`].
    pub async fn admit(&self, user: &str) -> bool {
        self.check(user).await.is_allowed()
    }

    /// Seconds until `user` regains a slot; zero if nothing is recorded.
    pub async fn seconds_until_next(&self, user: &str) -> f64 {
        if self.is_exempt(user) {
            return 0.0;
        }
        let windows = self.windows.lock().await;
        windows
            .get(&user.to_lowercase())
            .map(|w| w.until_next_at(Instant::now()).as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Number of distinct users with a window.
    pub async fn tracked_users(&self) -> usize {
        self.windows.lock().await.len()
    }
}
