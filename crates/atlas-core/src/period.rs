//! # Period Module
//!
//! Resolves analytics period selectors into concrete UTC time windows.
//!
//! ## Window Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  "7days" ───┐                                                       │
//! │  "30days" ──┼──► Period ──► Window [start 00:00:00.000,             │
//! │  "12months"─┘                       end   23:59:59.999]             │
//! │                                                                     │
//! │  explicit bounds ──► normalized to the same day boundaries          │
//! │  (explicit bounds always win over a named period)                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All functions take `today` explicitly so window math stays pure and
//! deterministic under test; callers pass `Utc::now().date_naive()`.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Period
// =============================================================================

/// A named trailing period for analytics queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    SevenDays,
    ThirtyDays,
    TwelveMonths,
}

impl Period {
    /// Number of calendar days the period spans (months approximated as a
    /// 365-day trailing window).
    pub const fn days(&self) -> i64 {
        match self {
            Period::SevenDays => 7,
            Period::ThirtyDays => 30,
            Period::TwelveMonths => 365,
        }
    }

    /// Parses a period selector. Unknown or missing values fall back to
    /// thirty days rather than failing, so a bad query string still renders
    /// a dashboard.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("7days") => Period::SevenDays,
            Some("12months") => Period::TwelveMonths,
            _ => Period::ThirtyDays,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Period::SevenDays => "7days",
            Period::ThirtyDays => "30days",
            Period::TwelveMonths => "12months",
        }
    }
}

// =============================================================================
// Window
// =============================================================================

/// A concrete inclusive UTC time window for analytics filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    /// Window for a named period ending today: the last `N` calendar days
    /// including today, so `start = today - (N - 1)` at start of day.
    pub fn named(period: Period, today: NaiveDate) -> Self {
        let start_date = today - Duration::days(period.days() - 1);
        Window {
            start: day_start(start_date),
            end: day_end(today),
        }
    }

    /// Window from explicit date bounds, normalized to full days.
    pub fn bounded(start: NaiveDate, end: NaiveDate) -> Self {
        Window {
            start: day_start(start),
            end: day_end(end),
        }
    }

    /// Resolves a query's period selection: explicit bounds win, otherwise
    /// the (possibly defaulted) named period applies.
    pub fn resolve(
        period: Option<&str>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Self {
        match (start, end) {
            (Some(start), Some(end)) => Window::bounded(start, end),
            _ => Window::named(Period::parse(period), today),
        }
    }

    /// Window covering `days` trailing days plus today. Values below one are
    /// coerced to one.
    pub fn trailing_days(days: i64, today: NaiveDate) -> Self {
        let days = days.max(1);
        Window {
            start: day_start(today - Duration::days(days)),
            end: day_end(today),
        }
    }

    /// Window covering exactly one calendar day.
    pub fn single_day(date: NaiveDate) -> Self {
        Window {
            start: day_start(date),
            end: day_end(date),
        }
    }

    /// Number of whole calendar days the window spans.
    pub fn span_days(&self) -> i64 {
        (self.end.date_naive() - self.start.date_naive()).num_days() + 1
    }
}

// =============================================================================
// Day Boundary Helpers
// =============================================================================

/// First instant of a calendar day (00:00:00.000 UTC).
pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN))
        .and_utc()
}

/// Last represented instant of a calendar day (23:59:59.999 UTC).
pub fn day_end(date: NaiveDate) -> DateTime<Utc> {
    match date.and_hms_milli_opt(23, 59, 59, 999) {
        Some(dt) => dt.and_utc(),
        // 23:59:59.999 exists for every calendar day; fall back defensively.
        None => day_start(date) + Duration::days(1) - Duration::milliseconds(1),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
