//! Bookkeeping recorded when entering a tracked state.

use super::state::StateId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who entered a tracked state, and when.
///
/// Hosts receive one record per committed transition whose destination is
/// tracked, either directly or through an enclosing tracked group.
///
/// # Example
///
/// ```rust
/// use stateful::core::{StateId, TrackingRecord};
/// use chrono::Utc;
///
/// let record = TrackingRecord {
///     at: Utc::now(),
///     by: Some("reviewer-7".to_string()),
///     value: Some(StateId::from("needs_testing")),
/// };
/// assert!(record.value.is_some());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackingRecord {
    /// When the state was entered
    pub at: DateTime<Utc>,
    /// The acting user, when the host knows one
    pub by: Option<String>,
    /// The leaf entered, set only when the tracked node is a group
    pub value: Option<StateId>,
}

impl TrackingRecord {
    pub fn now(by: Option<String>, value: Option<StateId>) -> Self {
        Self {
            at: Utc::now(),
            by,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_stamps_current_time() {
        let before = Utc::now();
        let record = TrackingRecord::now(None, None);
        assert!(record.at >= before);
        assert!(record.by.is_none());
    }

    #[test]
    fn record_serializes_correctly() {
        let record = TrackingRecord::now(Some("ada".into()), Some(StateId::from("beta")));
        let json = serde_json::to_string(&record).unwrap();
        let back: TrackingRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
