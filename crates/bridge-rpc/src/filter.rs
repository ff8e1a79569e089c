//! Participant and time-window filtering for history and watch streams.

use std::collections::HashSet;

use bridge_database::MessageRecord;
use chrono::{DateTime, Utc};

use crate::error::HandlerError;

/// Accept/reject predicate built from request parameters.
///
/// Construction validates the timestamp bounds (invalid RFC 3339 is an
/// invalid-params error); once built, the predicate is total. An empty
/// participant set means no sender constraint, and either time bound may be
/// absent.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    participants: HashSet<String>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl MessageFilter {
    pub fn new(
        participants: Option<Vec<String>>,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Self, HandlerError> {
        Ok(Self {
            participants: participants.unwrap_or_default().into_iter().collect(),
            start: parse_bound("start", start)?,
            end: parse_bound("end", end)?,
        })
    }

    /// Sender must be in the participant set (when non-empty) and the
    /// creation time must fall inside the inclusive window.
    pub fn matches(&self, message: &MessageRecord) -> bool {
        if !self.participants.is_empty() && !self.participants.contains(&message.sender) {
            return false;
        }
        if let Some(start) = self.start {
            if message.created_at < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if message.created_at > end {
                return false;
            }
        }
        true
    }
}

fn parse_bound(field: &str, value: Option<&str>) -> Result<Option<DateTime<Utc>>, HandlerError> {
    match value {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|parsed| Some(parsed.with_timezone(&Utc)))
            .map_err(|err| {
                HandlerError::InvalidParams(format!("invalid {field} timestamp {raw:?}: {err}"))
            }),
    }
}
