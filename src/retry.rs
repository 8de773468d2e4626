use crate::api::error::api_error;
use crate::config::TidalConfig;
use anyhow::Result;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// How often and how patiently a remote lookup is retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub min_sleep: Duration,
    pub max_sleep: Duration,
}

impl RetryPolicy {
    pub fn from_config(cfg: &TidalConfig) -> Self {
        let [min, max] = cfg.sleep_interval;
        Self {
            attempts: cfg.attempts.max(1),
            min_sleep: Duration::from_secs(min),
            max_sleep: Duration::from_secs(max.max(min)),
        }
    }

    /// Single attempt, no sleeping.
    pub fn once() -> Self {
        Self {
            attempts: 1,
            min_sleep: Duration::ZERO,
            max_sleep: Duration::ZERO,
        }
    }

    fn pause(&self) -> Duration {
        if self.max_sleep <= self.min_sleep {
            return self.min_sleep;
        }
        rand::thread_rng().gen_range(self.min_sleep..=self.max_sleep)
    }

    /// Run `op` until it succeeds or the attempts are used up, returning the
    /// last error in the latter case. Only errors that can clear on their
    /// own (transport, 5xx, 429) are retried; everything else is returned
    /// at once. A 429 waits at least as long as the server asked.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let e = match op().await {
                Ok(v) => return Ok(v),
                Err(e) => e,
            };
            let api = api_error(&e);
            let retryable = api.map(|a| a.is_retryable()).unwrap_or(false);
            if !retryable || attempt >= self.attempts {
                return Err(e);
            }
            let mut pause = self.pause();
            if let Some(min) = api.and_then(|a| a.min_backoff()) {
                pause = pause.max(min);
            }
            debug!(
                "{}: attempt {}/{} failed: {}; retrying in {:?}",
                label, attempt, self.attempts, e, pause
            );
            tokio::time::sleep(pause).await;
        }
    }
}
