//! Task message envelope helpers.
//!
//! Retry state travels on the message itself in the `x-retry-count`
//! header, so it survives broker restarts and is visible in management
//! UIs. Producers use integer AMQP types inconsistently, so extraction
//! tolerates every integer variant. A header that is present but not an
//! integer is reported as corrupt: the policy dead-letters such messages
//! instead of restarting them at count zero, which would loop forever.

use lapin::types::{AMQPValue, FieldTable};
use lapin::BasicProperties;

/// Header carrying the per-message retry counter.
pub const RETRY_COUNT_HEADER: &str = "x-retry-count";

/// Delivery mode 2 marks a message persistent.
const DELIVERY_MODE_PERSISTENT: u8 = 2;

/// The retry header was present but not an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorruptRetryHeader;

/// Extract the retry count from message headers.
///
/// Absent headers (or an absent counter) mean a first delivery: count 0.
/// Negative values and non-integer types are corrupt.
pub fn retry_count(headers: Option<&FieldTable>) -> Result<u32, CorruptRetryHeader> {
    let Some(table) = headers else {
        return Ok(0);
    };

    let Some(value) = table
        .inner()
        .iter()
        .find(|(key, _)| key.as_str() == RETRY_COUNT_HEADER)
        .map(|(_, value)| value)
    else {
        return Ok(0);
    };

    let count: i64 = match value {
        AMQPValue::LongLongInt(v) => *v,
        AMQPValue::LongInt(v) => i64::from(*v),
        AMQPValue::ShortInt(v) => i64::from(*v),
        AMQPValue::ShortShortInt(v) => i64::from(*v),
        AMQPValue::LongUInt(v) => i64::from(*v),
        AMQPValue::ShortUInt(v) => i64::from(*v),
        AMQPValue::ShortShortUInt(v) => i64::from(*v),
        _ => return Err(CorruptRetryHeader),
    };

    u32::try_from(count).map_err(|_| CorruptRetryHeader)
}

/// Build the headers for a retry envelope.
///
/// Pure function: the original table is left untouched; every header
/// except the retry counter is carried over, and the counter is written
/// as a 64-bit integer.
pub fn retry_headers(original: Option<&FieldTable>, next_count: u32) -> FieldTable {
    let mut table = FieldTable::default();

    if let Some(existing) = original {
        for (key, value) in existing.inner().iter() {
            if key.as_str() != RETRY_COUNT_HEADER {
                table.insert(key.clone(), value.clone());
            }
        }
    }

    table.insert(
        RETRY_COUNT_HEADER.into(),
        AMQPValue::LongLongInt(i64::from(next_count)),
    );
    table
}

/// Properties for every message the platform publishes: persistent JSON.
pub fn json_properties() -> BasicProperties {
    BasicProperties::default()
        .with_delivery_mode(DELIVERY_MODE_PERSISTENT)
        .with_content_type("application/json".into())
}

/// Properties for a retry envelope: persistent JSON plus the carried-over
/// headers with the incremented counter.
pub fn retry_properties(original: Option<&FieldTable>, next_count: u32) -> BasicProperties {
    json_properties().with_headers(retry_headers(original, next_count))
}
