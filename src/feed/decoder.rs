//! Position report decoder
//!
//! Validates one raw feed envelope and normalizes it into a
//! [`PositionRecord`]. The vessel identifier and coordinates are required;
//! speed, course, and name pass through as unset when absent. Rejected
//! messages are the caller's problem to log — decoding has no side effects.

use crate::types::PositionRecord;
use chrono::Utc;
use serde::Deserialize;

/// The only message type this pipeline consumes.
pub const POSITION_REPORT_TYPE: &str = "PositionReport";

/// Decode failures. The connector logs these and keeps receiving.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unexpected message type: {0}")]
    UnexpectedType(String),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Raw feed envelope as received on the wire.
#[derive(Debug, Deserialize)]
pub struct FeedEnvelope {
    #[serde(rename = "MessageType")]
    pub message_type: String,
    #[serde(rename = "MetaData", default)]
    pub metadata: Option<FeedMetadata>,
    #[serde(rename = "Message", default)]
    pub message: Option<FeedBody>,
}

#[derive(Debug, Deserialize)]
pub struct FeedMetadata {
    #[serde(rename = "ShipName", default)]
    pub ship_name: Option<String>,
    #[serde(rename = "MMSI", default)]
    pub mmsi: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct FeedBody {
    #[serde(rename = "PositionReport", default)]
    pub position_report: Option<RawPositionReport>,
}

/// Position report payload. Everything optional at the wire level;
/// [`decode`] enforces what is actually required.
#[derive(Debug, Deserialize)]
pub struct RawPositionReport {
    #[serde(rename = "UserID", default)]
    pub user_id: Option<u64>,
    #[serde(rename = "Latitude", default)]
    pub latitude: Option<f64>,
    #[serde(rename = "Longitude", default)]
    pub longitude: Option<f64>,
    #[serde(rename = "Sog", default)]
    pub sog: Option<f64>,
    #[serde(rename = "Cog", default)]
    pub cog: Option<f64>,
}

/// Validate and normalize one envelope into a [`PositionRecord`].
pub fn decode(envelope: &FeedEnvelope) -> Result<PositionRecord, DecodeError> {
    if envelope.message_type != POSITION_REPORT_TYPE {
        return Err(DecodeError::UnexpectedType(envelope.message_type.clone()));
    }

    let report = envelope
        .message
        .as_ref()
        .and_then(|m| m.position_report.as_ref())
        .ok_or(DecodeError::MissingField("Message.PositionReport"))?;

    let mmsi = report.user_id.ok_or(DecodeError::MissingField("UserID"))?;
    let latitude = report
        .latitude
        .ok_or(DecodeError::MissingField("Latitude"))?;
    let longitude = report
        .longitude
        .ok_or(DecodeError::MissingField("Longitude"))?;

    // AIS ship names are fixed-width and padded with spaces or '@'.
    let vessel_name = envelope
        .metadata
        .as_ref()
        .and_then(|m| m.ship_name.as_deref())
        .map(|name| name.trim_end_matches(['@', ' ']).to_string())
        .filter(|name| !name.is_empty());

    Ok(PositionRecord {
        mmsi,
        vessel_name,
        latitude,
        longitude,
        speed_over_ground: report.sog,
        course_over_ground: report.cog,
        observed_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(json: &str) -> FeedEnvelope {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn decodes_full_position_report() {
        let env = envelope(
            r#"{
                "MessageType": "PositionReport",
                "MetaData": {"ShipName": "NORDIC STAR   ", "MMSI": 368207620},
                "Message": {"PositionReport": {
                    "UserID": 368207620,
                    "Latitude": 29.74,
                    "Longitude": -95.26,
                    "Sog": 2.4,
                    "Cog": 181.0
                }}
            }"#,
        );
        let record = decode(&env).unwrap();
        assert_eq!(record.mmsi, 368207620);
        assert_eq!(record.vessel_name.as_deref(), Some("NORDIC STAR"));
        assert_eq!(record.speed_over_ground, Some(2.4));
        assert_eq!(record.course_over_ground, Some(181.0));
    }

    #[test]
    fn missing_vessel_identifier_is_rejected() {
        let env = envelope(
            r#"{
                "MessageType": "PositionReport",
                "Message": {"PositionReport": {"Latitude": 1.0, "Longitude": 2.0}}
            }"#,
        );
        assert!(matches!(
            decode(&env),
            Err(DecodeError::MissingField("UserID"))
        ));
    }

    #[test]
    fn speed_and_course_may_be_absent() {
        let env = envelope(
            r#"{
                "MessageType": "PositionReport",
                "Message": {"PositionReport": {"UserID": 5, "Latitude": 1.0, "Longitude": 2.0}}
            }"#,
        );
        let record = decode(&env).unwrap();
        assert_eq!(record.speed_over_ground, None);
        assert_eq!(record.course_over_ground, None);
        assert_eq!(record.vessel_name, None);
    }

    #[test]
    fn other_message_types_are_rejected() {
        let env = envelope(r#"{"MessageType": "ShipStaticData"}"#);
        assert!(matches!(decode(&env), Err(DecodeError::UnexpectedType(_))));
    }
}
