use borderless_client::{Dispatcher, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Aggregation interval for historical rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateGroup {
    /// One rate per day.
    Day,
    /// One rate per hour.
    Hour,
    /// One rate per minute.
    Minute,
}

impl RateGroup {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Hour => "hour",
            Self::Minute => "minute",
        }
    }
}

/// Exchange rates.
#[derive(Debug, Clone, Copy)]
pub struct RateService<'a> {
    dispatcher: &'a Dispatcher,
}

impl<'a> RateService<'a> {
    /// Creates the service over `dispatcher`.
    #[must_use]
    pub const fn new(dispatcher: &'a Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Fetches the rate between two currencies, now or at `time`.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn current(
        &self,
        source: &str,
        target: &str,
        time: Option<DateTime<Utc>>,
    ) -> Result<Value> {
        let time = time.map(format_time);
        let mut query = vec![("source", source), ("target", target)];
        if let Some(time) = &time {
            query.push(("time", time.as_str()));
        }
        self.dispatcher.get("v1/rates", &query).await
    }

    /// Fetches rates between `from` and `to`, optionally grouped.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn historical(
        &self,
        source: &str,
        target: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        group: Option<RateGroup>,
    ) -> Result<Value> {
        let (from, to) = (format_time(from), format_time(to));
        let mut query = vec![
            ("source", source),
            ("target", target),
            ("from", from.as_str()),
            ("to", to.as_str()),
        ];
        if let Some(group) = group {
            query.push(("group", group.as_str()));
        }
        self.dispatcher.get("v1/rates", &query).await
    }
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}
