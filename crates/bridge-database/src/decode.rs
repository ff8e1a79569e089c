//! Apple-epoch timestamps and attributedBody text recovery.

use chrono::{DateTime, Utc};

/// Seconds between 1970-01-01 and 2001-01-01 (the Apple epoch).
pub const APPLE_EPOCH_OFFSET: i64 = 978_307_200;

/// Converts a Messages `date` column value, nanoseconds since the Apple
/// epoch, to wall-clock time.
pub fn apple_time(ns: i64) -> DateTime<Utc> {
    let unix_ns = ns.saturating_add(APPLE_EPOCH_OFFSET.saturating_mul(1_000_000_000));
    DateTime::from_timestamp_nanos(unix_ns)
}

/// Attempts to recover plain text from an `attributedBody` typedstream blob.
///
/// The blob is an archived NSAttributedString; the plain-text span sits
/// between a `0x01 0x2B` start sentinel and a `0x86 0x84` end sentinel.
/// Invalid UTF-8 is replaced rather than rejected, and leading control
/// bytes that prefix typedstream payloads are trimmed. Returns the empty
/// string when nothing is recoverable.
pub fn parse_stream_typed(body: &[u8]) -> String {
    if body.is_empty() {
        return String::new();
    }
    const START: [u8; 2] = [0x01, 0x2b];
    const END: [u8; 2] = [0x86, 0x84];

    let mut slice = body;
    if let Some(idx) = find_pair(slice, START) {
        if idx + 2 < slice.len() {
            slice = &slice[idx + 2..];
        }
    }
    if let Some(idx) = find_pair(slice, END) {
        slice = &slice[..idx];
    }

    let text = String::from_utf8_lossy(slice);
    text.trim_start_matches(|c: char| (c as u32) < 32).to_string()
}

fn find_pair(haystack: &[u8], needle: [u8; 2]) -> Option<usize> {
    haystack.windows(2).position(|window| window == needle)
}
