//! Replay protection: the request body carries its creation time, which must
//! lie within a small window around now.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RequestEnvelope {
    request: RequestBody,
}

#[derive(Debug, Deserialize)]
struct RequestBody {
    timestamp: DateTime<Utc>,
}

/// `request.timestamp` of a skill request body, if present and well-formed
pub fn extract_request_timestamp(body: &[u8]) -> Option<DateTime<Utc>> {
    serde_json::from_slice::<RequestEnvelope>(body)
        .map(|envelope| envelope.request.timestamp)
        .ok()
}

/// `true` when `timestamp` is no further than `tolerance` from `now`, in either direction
pub fn is_timestamp_within_tolerance(
    timestamp: DateTime<Utc>,
    now: DateTime<Utc>,
    tolerance: Duration,
) -> bool {
    let drift = if now >= timestamp { now - timestamp } else { timestamp - now };
    drift <= tolerance
}

/// Extract and check in one step; a missing timestamp fails the check
pub fn is_request_fresh(body: &[u8], now: DateTime<Utc>, tolerance: Duration) -> bool {
    extract_request_timestamp(body)
        .is_some_and(|timestamp| is_timestamp_within_tolerance(timestamp, now, tolerance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_extracts_timestamp() {
        let body = br#"{"version":"1.0","request":{"type":"IntentRequest","requestId":"r1","timestamp":"2030-01-01T11:59:00Z"}}"#;
        assert_eq!(
            extract_request_timestamp(body),
            Some(Utc.with_ymd_and_hms(2030, 1, 1, 11, 59, 0).unwrap())
        );
    }

    #[test]
    fn test_missing_or_malformed_timestamp() {
        assert!(extract_request_timestamp(br#"{"request":{}}"#).is_none());
        assert!(extract_request_timestamp(br#"{"request":{"timestamp":"yesterday"}}"#).is_none());
        assert!(extract_request_timestamp(b"not json").is_none());
        assert!(!is_request_fresh(b"{}", now(), Duration::seconds(150)));
    }

    #[test]
    fn test_tolerance_window_is_symmetric_and_inclusive() {
        let tolerance = Duration::seconds(150);
        assert!(is_timestamp_within_tolerance(now() - Duration::seconds(150), now(), tolerance));
        assert!(is_timestamp_within_tolerance(now() + Duration::seconds(150), now(), tolerance));
        assert!(!is_timestamp_within_tolerance(now() - Duration::seconds(151), now(), tolerance));
        assert!(!is_timestamp_within_tolerance(now() + Duration::seconds(151), now(), tolerance));
    }

    #[test]
    fn test_is_request_fresh() {
        let body = br#"{"request":{"timestamp":"2030-01-01T11:58:00Z"}}"#;
        assert!(is_request_fresh(body, now(), Duration::seconds(150)));
        assert!(!is_request_fresh(body, now(), Duration::seconds(60)));
    }
}
