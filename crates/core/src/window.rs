//! Resolution levels and bucket alignment.
//!
//! Buckets are epoch-millisecond integers aligned to a multiple of the
//! window length. Windows are tumbling and half-open: `[start, start + window)`.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const ONE_MINUTE_MS: i64 = 60 * 1000;
pub const ONE_HOUR_MS: i64 = 60 * ONE_MINUTE_MS;
pub const ONE_DAY_MS: i64 = 24 * ONE_HOUR_MS;

/// Aggregate table resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Minute,
    Hour,
    Day,
}

impl Resolution {
    pub const ALL: [Resolution; 3] = [Resolution::Minute, Resolution::Hour, Resolution::Day];

    /// Window length in milliseconds.
    pub const fn window_ms(&self) -> i64 {
        match self {
            Self::Minute => ONE_MINUTE_MS,
            Self::Hour => ONE_HOUR_MS,
            Self::Day => ONE_DAY_MS,
        }
    }

    /// The resolution this level is rolled up from. Minute rows come from raw events.
    pub const fn finer(&self) -> Option<Resolution> {
        match self {
            Self::Minute => None,
            Self::Hour => Some(Self::Minute),
            Self::Day => Some(Self::Hour),
        }
    }

    /// The resolution that rolls this level up, if any.
    pub const fn coarser(&self) -> Option<Resolution> {
        match self {
            Self::Minute => Some(Self::Hour),
            Self::Hour => Some(Self::Day),
            Self::Day => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
        }
    }

    /// Start of the bucket containing `timestamp_ms`.
    pub fn bucket_of(&self, timestamp_ms: i64) -> i64 {
        align_down(timestamp_ms, self.window_ms())
    }

    /// The most recently closed window as of `now_ms`.
    ///
    /// Never the window that contains `now_ms`.
    pub fn closed_window(&self, now_ms: i64) -> BucketRange {
        let end = self.bucket_of(now_ms);
        BucketRange::new(end - self.window_ms(), end)
    }

    /// The window whose bucket start is `bucket`.
    pub fn window_at(&self, bucket: i64) -> BucketRange {
        let start = self.bucket_of(bucket);
        BucketRange::new(start, start + self.window_ms())
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Floor division alignment that stays correct for negative timestamps.
pub fn align_down(timestamp_ms: i64, window_ms: i64) -> i64 {
    timestamp_ms.div_euclid(window_ms) * window_ms
}

/// Half-open millisecond range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BucketRange {
    pub start: i64,
    pub end: i64,
}

impl BucketRange {
    pub const fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Range covering `[from, to]` with an inclusive upper bound.
    pub fn inclusive(from: i64, to: i64) -> Self {
        Self::new(from, to.saturating_add(1))
    }

    pub fn contains(&self, value: i64) -> bool {
        value >= self.start && value < self.end
    }

    pub fn len_ms(&self) -> i64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

impl fmt::Display for BucketRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
