// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time handling.
//!
//! The vendor API and the stored rows both speak `YYYY-MM-DD` dates and
//! RFC3339 timestamps; these helpers keep the two formats in one place.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a `YYYY-MM-DD` day into its UTC midnight.
pub fn parse_utc_day(date: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN).and_utc())
}
