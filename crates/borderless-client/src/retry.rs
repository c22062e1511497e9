//! Transport retry policy.
//!
//! Retries are driven by `reqwest-retry`, with two changes from its defaults:
//!
//! - the delay between attempts is fixed (no growth, no jitter)
//! - only transport faults are retried; any response that arrived is handed
//!   back untouched, whatever its status, so classification happens exactly
//!   once per logical call
//!
//! `reqwest` resolves a response as soon as its headers arrive, so a body
//! that is cut short would otherwise fail after the retry loop has already
//! returned. [`BufferedBody`] sits inside the loop and reads the whole body
//! as part of each attempt.

use async_trait::async_trait;
use borderless_common::RetryConfig;
use http::Extensions;
use reqwest_middleware::{Middleware, Next};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::{Jitter, Retryable, RetryableStrategy};

/// Treats every transport fault as transient and never retries a response.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportFaultStrategy;

impl RetryableStrategy for TransportFaultStrategy {
    fn handle(
        &self,
        res: &Result<reqwest::Response, reqwest_middleware::Error>,
    ) -> Option<Retryable> {
        match res {
            Ok(_) => None,
            Err(error) => {
                log::debug!("Transport fault, attempt will be retried if budget remains: {error}");
                Some(Retryable::Transient)
            }
        }
    }
}

/// Builds a fixed-delay backoff policy from `retry`.
///
/// The lower and upper bounds are both `retry.delay`, so every wait is the
/// same length.
#[must_use]
pub fn fixed_delay_policy(retry: &RetryConfig) -> ExponentialBackoff {
    ExponentialBackoff::builder()
        .retry_bounds(retry.delay, retry.delay)
        .jitter(Jitter::None)
        .build_with_max_retries(retry.max_retries())
}

/// Reads the response body to the end before handing the response back.
///
/// Installed after the retry middleware, so an interrupted body or a timeout
/// while downloading surfaces as a transport fault of the current attempt.
/// The rebuilt response keeps status, version and headers; its `url()` is
/// not preserved.
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferedBody;

#[async_trait]
impl Middleware for BufferedBody {
    async fn handle(
        &self,
        req: reqwest::Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<reqwest::Response> {
        let response = next.run(req, extensions).await?;
        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        let mut buffered = http::Response::new(body);
        *buffered.status_mut() = status;
        *buffered.version_mut() = version;
        *buffered.headers_mut() = headers;
        Ok(reqwest::Response::from(buffered))
    }
}
