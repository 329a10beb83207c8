//! Model invocation with bounded exponential backoff on rate limiting.
//!
//! Only HTTP 429 is retried. Every other failure, including network errors
//! that carry no status, is terminal and returned without delay.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::error::VisionAnalysisError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

const TOO_MANY_REQUESTS: u16 = 429;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Vision API error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Request(err) => err.status().map(|s| s.as_u16()),
            TransportError::Api { status, .. } => Some(*status),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(TOO_MANY_REQUESTS)
    }
}

/// Everything the provider needs for one analysis call.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub model: String,
    pub instructions: String,
    pub prompt: String,
    /// Base64 desktop capture (no data-URL prefix).
    pub desktop_image: String,
    /// Base64 mobile capture (no data-URL prefix).
    pub mobile_image: String,
    pub max_output_tokens: u32,
}

/// Sends a [`VisionRequest`] to a hosted model and returns the raw JSON reply.
#[async_trait]
pub trait VisionTransport: Send + Sync {
    async fn send(&self, api_key: &str, request: &VisionRequest) -> Result<Value, TransportError>;
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt `attempt` (1-indexed): `base * 2^(attempt-1)`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Call `transport` until it succeeds, fails terminally, or the attempt budget runs out.
pub async fn invoke_with_retry<T, S>(
    transport: &T,
    sleeper: &S,
    policy: &RetryPolicy,
    api_key: &str,
    request: &VisionRequest,
) -> Result<Value, VisionAnalysisError>
where
    T: VisionTransport + ?Sized,
    S: Sleeper + ?Sized,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        log::debug!("vision request attempt {attempt}/{max_attempts} (model {})", request.model);
        match transport.send(api_key, request).await {
            Ok(reply) => return Ok(reply),
            Err(err) if err.is_rate_limited() && attempt < max_attempts => {
                let delay = policy.delay_after(attempt);
                log::warn!(
                    "vision model rate limited on attempt {attempt}/{max_attempts}; retrying in {}ms",
                    delay.as_millis()
                );
                sleeper.sleep(delay).await;
                attempt += 1;
            }
            Err(source) => {
                return Err(VisionAnalysisError::Transport {
                    attempts: attempt,
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<Value, TransportError>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<Result<Value, TransportError>>, calls: Arc<AtomicUsize>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls,
            }
        }
    }

    #[async_trait]
    impl VisionTransport for ScriptedTransport {
        async fn send(&self, _: &str, _: &VisionRequest) -> Result<Value, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({"output_text": "{}"})))
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, delay: Duration) {
            self.delays.lock().unwrap().push(delay);
        }
    }

    fn rate_limited() -> Result<Value, TransportError> {
        Err(TransportError::Api {
            status: 429,
            message: "Rate limit reached".into(),
        })
    }

    fn request() -> VisionRequest {
        VisionRequest {
            model: "gpt-4o".into(),
            instructions: "be brief".into(),
            prompt: "analyze".into(),
            desktop_image: "aGVsbG8=".into(),
            mobile_image: "aGVsbG8=".into(),
            max_output_tokens: 100,
        }
    }

    #[test]
    fn backoff_doubles_from_base_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(4000));
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        let policy = RetryPolicy::default();
        assert!(policy.delay_after(64) >= policy.delay_after(10));
    }

    #[tokio::test]
    async fn two_rate_limits_then_success_takes_three_attempts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = ScriptedTransport::new(
            vec![rate_limited(), rate_limited(), Ok(json!({"output_text": "ok"}))],
            calls.clone(),
        );
        let sleeper = RecordingSleeper::default();

        let reply = invoke_with_retry(
            &transport,
            &sleeper,
            &RetryPolicy::default(),
            "key",
            &request(),
        )
        .await
        .expect("third attempt succeeds");

        assert_eq!(reply["output_text"], "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            *sleeper.delays.lock().unwrap(),
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );
    }

    #[tokio::test]
    async fn three_rate_limits_exhaust_the_budget() {
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = ScriptedTransport::new(
            vec![rate_limited(), rate_limited(), rate_limited(), Ok(json!({}))],
            calls.clone(),
        );
        let sleeper = RecordingSleeper::default();

        let err = invoke_with_retry(
            &transport,
            &sleeper,
            &RetryPolicy::default(),
            "key",
            &request(),
        )
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(sleeper.delays.lock().unwrap().len(), 2);
        match err {
            VisionAnalysisError::Transport { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(source.is_rate_limited());
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_rate_limit_failure_is_terminal_without_delay() {
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = ScriptedTransport::new(
            vec![Err(TransportError::Api {
                status: 401,
                message: "Incorrect API key".into(),
            })],
            calls.clone(),
        );
        let sleeper = RecordingSleeper::default();

        let err = invoke_with_retry(
            &transport,
            &sleeper,
            &RetryPolicy::default(),
            "key",
            &request(),
        )
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.delays.lock().unwrap().is_empty());
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn request_error_without_status_is_terminal() {
        let request_err = reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err();
        let calls = Arc::new(AtomicUsize::new(0));
        let transport =
            ScriptedTransport::new(vec![Err(TransportError::Request(request_err))], calls.clone());
        let sleeper = RecordingSleeper::default();

        let err = invoke_with_retry(
            &transport,
            &sleeper,
            &RetryPolicy::default(),
            "key",
            &request(),
        )
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.delays.lock().unwrap().is_empty());
        assert_eq!(err.status(), None);
        assert!(matches!(
            err,
            VisionAnalysisError::Transport {
                attempts: 1,
                source: TransportError::Request(_)
            }
        ));
    }

    #[tokio::test]
    async fn single_attempt_policy_never_sleeps() {
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = ScriptedTransport::new(vec![rate_limited()], calls.clone());
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy {
            max_attempts: 1,
            base_delay: Duration::from_millis(5),
        };

        let result = invoke_with_retry(&transport, &sleeper, &policy, "key", &request()).await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }
}
