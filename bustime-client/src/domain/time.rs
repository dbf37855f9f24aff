//! Feed timestamp handling.
//!
//! The API transmits civil times with no zone information; everything is
//! in the operator's local zone (US/Eastern). All parsed timestamps are
//! localized to that fixed zone so arithmetic against "now" is correct
//! year-round.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use crate::api::error::ConversionError;

/// The operator's civil timezone.
pub const FEED_TIMEZONE: Tz = chrono_tz::US::Eastern;

/// Wire format of every timestamp in the feed.
pub const FEED_TIMESTAMP_FORMAT: &str = "%Y%m%d %H:%M:%S";

/// Parse a `YYYYMMDD HH:MM:SS` feed timestamp into the fixed zone.
///
/// During the DST fall-back hour a civil time names two instants; the
/// earlier one is chosen. A time skipped by spring-forward is rejected.
pub fn parse_feed_timestamp(
    field: &'static str,
    value: &str,
) -> Result<DateTime<Tz>, ConversionError> {
    let naive = NaiveDateTime::parse_from_str(value, FEED_TIMESTAMP_FORMAT).map_err(|_| {
        ConversionError::InvalidTimestamp {
            field,
            value: value.to_string(),
        }
    })?;

    match FEED_TIMEZONE.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(earlier, _) => Ok(earlier),
        LocalResult::None => Err(ConversionError::InvalidTimestamp {
            field,
            value: value.to_string(),
        }),
    }
}
