use crate::error::FetchError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// One `[timestamp, value]` sample from a market chart series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    /// Unix timestamp in milliseconds
    pub timestamp_ms: i64,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(timestamp_ms: i64, value: f64) -> Self {
        Self { timestamp_ms, value }
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp_ms)
    }
}

/// Parses an upstream series (`[[ts, value], ...]`) keeping upstream order.
///
/// Pairs whose value is `null` are gaps in the upstream data and are skipped;
/// anything else that is not a numeric pair is a malformed response.
pub fn parse_series(series: &Value) -> Result<Vec<TimeSeriesPoint>, FetchError> {
    let pairs = series.as_array().ok_or(FetchError::MalformedResponse)?;

    let mut points = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let pair = pair.as_array().ok_or(FetchError::MalformedResponse)?;
        if pair.len() < 2 {
            return Err(FetchError::MalformedResponse);
        }

        let timestamp_ms = pair[0]
            .as_i64()
            .or_else(|| pair[0].as_f64().map(|ts| ts as i64))
            .ok_or(FetchError::MalformedResponse)?;

        if pair[1].is_null() {
            continue;
        }
        let value = pair[1].as_f64().ok_or(FetchError::MalformedResponse)?;

        points.push(TimeSeriesPoint::new(timestamp_ms, value));
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_upstream_order() {
        let series = json!([[1700086400000i64, 43000.0], [1700000000000i64, 42000.0]]);
        let points = parse_series(&series).unwrap();
        assert_eq!(
            points,
            vec![
                TimeSeriesPoint::new(1700086400000, 43000.0),
                TimeSeriesPoint::new(1700000000000, 42000.0),
            ]
        );
    }

    #[test]
    fn accepts_integer_values_and_float_timestamps() {
        let series = json!([[1704067200000.0, 25000000000i64]]);
        let points = parse_series(&series).unwrap();
        assert_eq!(points[0].timestamp_ms, 1704067200000);
        assert_eq!(points[0].value, 25_000_000_000.0);
    }

    #[test]
    fn skips_null_values() {
        let series = json!([[1, 2.0], [2, null], [3, 4.0]]);
        assert_eq!(parse_series(&series).unwrap().len(), 2);
    }

    #[test]
    fn rejects_malformed_pairs() {
        assert_eq!(parse_series(&json!({"a": 1})), Err(FetchError::MalformedResponse));
        assert_eq!(parse_series(&json!([[1]])), Err(FetchError::MalformedResponse));
        assert_eq!(parse_series(&json!([["x", 1.0]])), Err(FetchError::MalformedResponse));
        assert_eq!(parse_series(&json!([[1, "1.0"]])), Err(FetchError::MalformedResponse));
    }

    #[test]
    fn empty_series_parses_to_empty() {
        assert!(parse_series(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn converts_to_calendar_date() {
        let point = TimeSeriesPoint::new(1700000000000, 1.0);
        assert_eq!(
            point.datetime().unwrap().format("%Y-%m-%d").to_string(),
            "2023-11-14"
        );
    }
}
