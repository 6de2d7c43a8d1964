// file: src/remote/fetcher.rs
// description: retrying HTTP reads with exponential backoff and rate-limit waits
// reference: GitHub REST rate limiting (X-RateLimit-Remaining / X-RateLimit-Reset)

use crate::error::{HarvestError, Result, is_retryable_status};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_ATTEMPTS: u32 = 5;

const MAX_BACKOFF_SECS: f64 = 60.0;
const MIN_RATE_LIMIT_WAIT_SECS: i64 = 1;
const MAX_RATE_LIMIT_WAIT_SECS: i64 = 120;

/// Rate-limit headers as reported by the remote, if present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimit {
    pub remaining: Option<u64>,
    /// Epoch seconds at which the quota resets.
    pub reset: Option<i64>,
}

impl RateLimit {
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub rate_limit: RateLimit,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            rate_limit: RateLimit::default(),
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            rate_limit: RateLimit::default(),
            body: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A single GET against the remote. Implementations must not retry.
pub trait Transport {
    fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<HttpResponse>;
}

/// Time source and sleeper, injectable so retry loops can be tested without waiting.
pub trait Clock {
    fn now_epoch_secs(&self) -> i64;
    fn sleep(&self, duration: Duration);
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<HttpResponse> {
        (**self).get(url, params)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_epoch_secs(&self) -> i64 {
        (**self).now_epoch_secs()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Delay before retrying after the failure at zero-based `attempt`:
/// `min(60s, 2^attempt + 0.1 * attempt)`.
pub fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.min(63) as i32;
    let secs = 2f64.powi(exponent) + f64::from(attempt) * 0.1;
    Duration::from_secs_f64(secs.min(MAX_BACKOFF_SECS))
}

/// Time to wait for an exhausted quota to reset, clamped to [1s, 120s].
pub fn rate_limit_wait(reset: Option<i64>, now: i64) -> Duration {
    let wait = reset.unwrap_or(0).saturating_sub(now);
    let clamped = wait.clamp(MIN_RATE_LIMIT_WAIT_SECS, MAX_RATE_LIMIT_WAIT_SECS);
    Duration::from_secs(clamped as u64)
}

pub struct ResilientFetcher<T, C = SystemClock> {
    transport: T,
    clock: C,
    attempts: u32,
}

impl<T: Transport> ResilientFetcher<T, SystemClock> {
    pub fn new(transport: T, attempts: u32) -> Self {
        Self::with_clock(transport, SystemClock, attempts)
    }
}

impl<T: Transport, C: Clock> ResilientFetcher<T, C> {
    pub fn with_clock(transport: T, clock: C, attempts: u32) -> Self {
        Self {
            transport,
            clock,
            attempts: attempts.max(1),
        }
    }

    /// GET `url`, retrying transient failures and waiting out exhausted quotas.
    ///
    /// Rate-limit waits do not count against `attempts`; each retryable
    /// failure does. The last retryable error is returned once attempts run out.
    pub fn get_bytes(&self, url: &str, params: &[(&str, &str)]) -> Result<Vec<u8>> {
        let mut failures = 0u32;

        loop {
            debug!("GET {} (failures so far: {})", url, failures);

            let error = match self.transport.get(url, params) {
                Ok(response) if response.is_success() => return Ok(response.body),
                Ok(response) if is_retryable_status(response.status) => HarvestError::Http {
                    status: response.status,
                    url: url.to_string(),
                },
                Ok(response) if response.status == 403 && response.rate_limit.is_exhausted() => {
                    let wait = rate_limit_wait(
                        response.rate_limit.reset,
                        self.clock.now_epoch_secs(),
                    );
                    warn!(
                        "Rate limit exhausted for {}, waiting {}s for reset",
                        url,
                        wait.as_secs()
                    );
                    self.clock.sleep(wait);
                    continue;
                }
                Ok(response) => {
                    return Err(HarvestError::Http {
                        status: response.status,
                        url: url.to_string(),
                    });
                }
                Err(e) if e.is_retryable() => e,
                Err(e) => return Err(e),
            };

            failures += 1;
            if failures >= self.attempts {
                return Err(error);
            }

            let delay = backoff_delay(failures - 1);
            warn!(
                "{} (attempt {}/{}), retrying in {:.1}s",
                error,
                failures,
                self.attempts,
                delay.as_secs_f64()
            );
            self.clock.sleep(delay);
        }
    }

    pub fn get_json<D: DeserializeOwned>(&self, url: &str, params: &[(&str, &str)]) -> Result<D> {
        let body = self.get_bytes(url, params)?;
        serde_json::from_slice(&body).map_err(|e| HarvestError::Decode {
            context: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    struct ScriptedTransport {
        responses: RefCell<VecDeque<Result<HttpResponse>>>,
        calls: Cell<usize>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<HttpResponse>>) -> Self {
            Self {
                responses: RefCell::new(responses.into()),
                calls: Cell::new(0),
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn get(&self, _url: &str, _params: &[(&str, &str)]) -> Result<HttpResponse> {
            self.calls.set(self.calls.get() + 1);
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::status(599)))
        }
    }

    struct FakeClock {
        now: i64,
        sleeps: RefCell<Vec<Duration>>,
    }

    impl FakeClock {
        fn at(now: i64) -> Self {
            Self {
                now,
                sleeps: RefCell::new(Vec::new()),
            }
        }
    }

    impl Clock for FakeClock {
        fn now_epoch_secs(&self) -> i64 {
            self.now
        }

        fn sleep(&self, duration: Duration) {
            self.sleeps.borrow_mut().push(duration);
        }
    }

    fn rate_limited(reset: i64) -> HttpResponse {
        HttpResponse {
            status: 403,
            rate_limit: RateLimit {
                remaining: Some(0),
                reset: Some(reset),
            },
            body: Vec::new(),
        }
    }

    #[test]
    fn test_backoff_delay_values() {
        let close = |a: Duration, b: f64| (a.as_secs_f64() - b).abs() < 1e-6;
        assert!(close(backoff_delay(0), 1.0));
        assert!(close(backoff_delay(1), 2.1));
        assert!(close(backoff_delay(3), 8.3));
        assert!(close(backoff_delay(5), 32.5));
        assert_eq!(backoff_delay(6), Duration::from_secs(60));
        assert_eq!(backoff_delay(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_backoff_delay_monotonic_up_to_cap() {
        let delays: Vec<Duration> = (0..20).map(backoff_delay).collect();
        for pair in delays.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
        assert!(delays.iter().all(|d| *d <= Duration::from_secs(60)));
    }

    #[test]
    fn test_rate_limit_wait_clamped() {
        assert_eq!(rate_limit_wait(Some(1_030), 1_000), Duration::from_secs(30));
        assert_eq!(rate_limit_wait(Some(5_000), 1_000), Duration::from_secs(120));
        assert_eq!(rate_limit_wait(Some(900), 1_000), Duration::from_secs(1));
        assert_eq!(rate_limit_wait(None, 1_000), Duration::from_secs(1));
    }

    #[test]
    fn test_success_first_try() {
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse::ok(b"{}".to_vec()))]);
        let clock = FakeClock::at(0);
        let fetcher = ResilientFetcher::with_clock(&transport, &clock, 5);

        assert_eq!(fetcher.get_bytes("https://x", &[]).unwrap(), b"{}".to_vec());
        assert_eq!(transport.calls.get(), 1);
        assert!(clock.sleeps.borrow().is_empty());
    }

    #[test]
    fn test_retries_server_errors_with_backoff() {
        let transport = ScriptedTransport::new(vec![
            Ok(HttpResponse::status(502)),
            Ok(HttpResponse::status(429)),
            Ok(HttpResponse::status(408)),
            Ok(HttpResponse::ok(b"done".to_vec())),
        ]);
        let clock = FakeClock::at(0);
        let fetcher = ResilientFetcher::with_clock(&transport, &clock, 5);

        assert_eq!(fetcher.get_bytes("https://x", &[]).unwrap(), b"done".to_vec());
        assert_eq!(
            *clock.sleeps.borrow(),
            vec![backoff_delay(0), backoff_delay(1), backoff_delay(2)]
        );
    }

    #[test]
    fn test_exhausted_attempts_surface_last_error() {
        let transport = ScriptedTransport::new(vec![
            Ok(HttpResponse::status(500)),
            Ok(HttpResponse::status(500)),
            Ok(HttpResponse::status(503)),
        ]);
        let clock = FakeClock::at(0);
        let fetcher = ResilientFetcher::with_clock(&transport, &clock, 3);

        match fetcher.get_bytes("https://x", &[]) {
            Err(HarvestError::Http { status, .. }) => assert_eq!(status, 503),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(transport.calls.get(), 3);
        assert_eq!(clock.sleeps.borrow().len(), 2);
    }

    #[test]
    fn test_non_retryable_fails_immediately() {
        let transport = ScriptedTransport::new(vec![
            Ok(HttpResponse::status(404)),
            Ok(HttpResponse::ok(b"never".to_vec())),
        ]);
        let clock = FakeClock::at(0);
        let fetcher = ResilientFetcher::with_clock(&transport, &clock, 5);

        match fetcher.get_bytes("https://x", &[]) {
            Err(HarvestError::Http { status, .. }) => assert_eq!(status, 404),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(transport.calls.get(), 1);
        assert!(clock.sleeps.borrow().is_empty());
    }

    #[test]
    fn test_forbidden_without_exhausted_quota_is_fatal() {
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse {
            status: 403,
            rate_limit: RateLimit {
                remaining: Some(12),
                reset: Some(100),
            },
            body: Vec::new(),
        })]);
        let clock = FakeClock::at(0);
        let fetcher = ResilientFetcher::with_clock(&transport, &clock, 5);

        assert!(fetcher.get_bytes("https://x", &[]).is_err());
        assert_eq!(transport.calls.get(), 1);
    }

    #[test]
    fn test_rate_limit_wait_does_not_consume_attempts() {
        let transport = ScriptedTransport::new(vec![
            Ok(rate_limited(1_045)),
            Ok(HttpResponse::status(500)),
            Ok(rate_limited(1_000)),
            Ok(HttpResponse::ok(b"ok".to_vec())),
        ]);
        let clock = FakeClock::at(1_000);
        let fetcher = ResilientFetcher::with_clock(&transport, &clock, 2);

        assert_eq!(fetcher.get_bytes("https://x", &[]).unwrap(), b"ok".to_vec());
        assert_eq!(
            *clock.sleeps.borrow(),
            vec![
                Duration::from_secs(45),
                backoff_delay(0),
                Duration::from_secs(1)
            ]
        );
    }

    #[test]
    fn test_transient_transport_error_retried() {
        let transport = ScriptedTransport::new(vec![
            Err(HarvestError::Transport {
                url: "https://x".to_string(),
                message: "timed out".to_string(),
                transient: true,
            }),
            Ok(HttpResponse::ok(b"[1]".to_vec())),
        ]);
        let clock = FakeClock::at(0);
        let fetcher = ResilientFetcher::with_clock(&transport, &clock, 5);

        let value: Vec<u32> = fetcher.get_json("https://x", &[]).unwrap();
        assert_eq!(value, vec![1]);
        assert_eq!(clock.sleeps.borrow().len(), 1);
    }

    #[test]
    fn test_get_json_rejects_non_json() {
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse::ok(b"<html>".to_vec()))]);
        let clock = FakeClock::at(0);
        let fetcher = ResilientFetcher::with_clock(&transport, &clock, 5);

        let result: Result<serde_json::Value> = fetcher.get_json("https://x", &[]);
        assert!(matches!(result, Err(HarvestError::Decode { .. })));
    }
}
