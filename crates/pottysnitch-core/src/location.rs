//! Submitted point-of-interest records.
//!
//! A submission is kept as the JSON object the client sent, untouched. Typed views of the
//! well-known fields are accessors that return `None` when a field is absent or has an
//! unexpected JSON type. Only [`validate`] treats a type mismatch as an error.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// One user-submitted point of interest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationSubmission(Map<String, Value>);

impl LocationSubmission {
    /// Creates a submission with a name, formatted address and coordinate.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        formatted_address: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self::default()
            .with_property("name", name.into())
            .with_property("formatted", formatted_address.into())
            .with_property("lat", latitude)
            .with_property("lon", longitude)
    }

    /// Sets one key of the `properties` object, creating the object if needed.
    #[must_use]
    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        let properties = self
            .0
            .entry("properties")
            .or_insert_with(|| Value::Object(Map::new()));
        if !properties.is_object() {
            *properties = Value::Object(Map::new());
        }
        if let Value::Object(map) = properties {
            map.insert(key.to_string(), value.into());
        }
        self
    }

    /// Attaches moderation metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: &SubmissionMetadata) -> Self {
        self.0.insert("metadata".to_string(), metadata.to_value());
        self
    }

    /// Decodes a submission from a request body.
    ///
    /// Any JSON object is accepted as-is.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSubmission`] if the body is not JSON or is not an object.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| Error::invalid_submission(format!("body is not valid JSON: {e}")))?;

        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(Error::invalid_submission("body must be a JSON object")),
        }
    }

    /// Returns the raw JSON object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the submission, returning the raw JSON object.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Returns the `properties` object, if it is one.
    #[must_use]
    pub fn properties(&self) -> Option<&Map<String, Value>> {
        self.0.get("properties")?.as_object()
    }

    /// Returns the `metadata` object, if it is one.
    #[must_use]
    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.0.get("metadata")?.as_object()
    }

    /// Returns a string-valued property.
    #[must_use]
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties()?.get(key)?.as_str()
    }

    /// Returns a numeric property.
    #[must_use]
    pub fn property_f64(&self, key: &str) -> Option<f64> {
        self.properties()?.get(key)?.as_f64()
    }

    /// Display name of the place.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.property_str("name")
    }

    /// Human-readable full address.
    #[must_use]
    pub fn formatted_address(&self) -> Option<&str> {
        self.property_str("formatted")
    }

    /// Free-text classification of the place.
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.property_str("category")
    }

    /// Access code for the door.
    #[must_use]
    pub fn door_code(&self) -> Option<&str> {
        self.property_str("doorCode")
    }

    /// Returns the coordinate when `lat` and `lon` are both JSON numbers.
    #[must_use]
    pub fn coordinate(&self) -> Option<Coordinate> {
        Some(Coordinate {
            latitude: self.property_f64("lat")?,
            longitude: self.property_f64("lon")?,
        })
    }

    /// Client-supplied submission time, as sent.
    #[must_use]
    pub fn submitted_at(&self) -> Option<&str> {
        self.metadata()?.get("submitted_at")?.as_str()
    }

    /// Parses `metadata.submitted_at` as an RFC 3339 timestamp.
    #[must_use]
    pub fn submitted_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.submitted_at()?)
    }

    /// Returns the moderation status. A missing or unrecognised status counts as pending.
    #[must_use]
    pub fn status(&self) -> SubmissionStatus {
        self.metadata()
            .and_then(|m| m.get("status")?.as_str())
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

impl From<Map<String, Value>> for LocationSubmission {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Moderation metadata, used when building submissions.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionMetadata {
    /// Submission time.
    pub submitted_at: Option<String>,
    /// Moderation status.
    pub status: SubmissionStatus,
}

impl SubmissionMetadata {
    /// Creates pending metadata stamped with the given time.
    #[must_use]
    pub fn pending_at(submitted_at: DateTime<Utc>) -> Self {
        Self {
            submitted_at: Some(submitted_at.to_rfc3339()),
            status: SubmissionStatus::Pending,
        }
    }

    /// Parses `submitted_at` as an RFC 3339 timestamp.
    #[must_use]
    pub fn submitted_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.submitted_at.as_deref()?)
    }

    fn to_value(&self) -> Value {
        let mut map = Map::new();
        if let Some(at) = &self.submitted_at {
            map.insert("submitted_at".to_string(), Value::String(at.clone()));
        }
        map.insert("status".to_string(), Value::String(self.status.to_string()));
        Value::Object(map)
    }
}

/// Moderation status of a submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    /// Awaiting review.
    #[default]
    Pending,
    /// Accepted by a reviewer.
    Approved,
    /// Rejected by a reviewer.
    Rejected,
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SubmissionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(Error::invalid_submission(format!("unknown status: {other}"))),
        }
    }
}

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Latitude, valid in `[-90, 90]`.
    pub latitude: f64,
    /// Longitude, valid in `[-180, 180]`.
    pub longitude: f64,
}

impl Coordinate {
    /// Returns `true` if both components are finite and within range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// Checks a submission against the strict schema.
///
/// Requires a `properties` object with a non-blank string `name` and `formatted`, numeric
/// `lat`/`lon` in range, and, when `metadata.status` is present, a known status.
///
/// # Errors
///
/// Returns [`Error::InvalidSubmission`] describing the first violation found.
pub fn validate(submission: &LocationSubmission) -> Result<()> {
    if submission.properties().is_none() {
        return Err(Error::invalid_submission("missing properties"));
    }

    if submission.name().map_or(true, |s| s.trim().is_empty()) {
        return Err(Error::invalid_submission("missing name"));
    }

    if submission
        .formatted_address()
        .map_or(true, |s| s.trim().is_empty())
    {
        return Err(Error::invalid_submission("missing formatted address"));
    }

    let coordinate = submission
        .coordinate()
        .ok_or_else(|| Error::invalid_submission("missing or non-numeric coordinate"))?;

    if !coordinate.is_valid() {
        return Err(Error::invalid_submission(format!(
            "coordinate out of range: {coordinate}"
        )));
    }

    if let Some(status) = submission.metadata().and_then(|m| m.get("status")) {
        let status = status
            .as_str()
            .ok_or_else(|| Error::invalid_submission("status must be a string"))?;
        status.parse::<SubmissionStatus>()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: &Value) -> LocationSubmission {
        LocationSubmission::from_json_slice(value.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn test_decodes_front_end_payload() {
        let submission = decode(&json!({
            "properties": {
                "name": "Cafe X",
                "formatted": "1 Main St",
                "lat": 40.0,
                "lon": -73.0,
                "doorCode": "1234",
                "category": "cafe"
            },
            "metadata": {"submitted_at": "2024-05-01T12:00:00Z", "status": "approved"}
        }));

        assert_eq!(submission.name(), Some("Cafe X"));
        assert_eq!(submission.formatted_address(), Some("1 Main St"));
        assert_eq!(submission.door_code(), Some("1234"));
        assert_eq!(submission.category(), Some("cafe"));
        assert_eq!(
            submission.coordinate(),
            Some(Coordinate {
                latitude: 40.0,
                longitude: -73.0
            })
        );
        assert_eq!(submission.status(), SubmissionStatus::Approved);
        assert!(submission.submitted_at_utc().is_some());
    }

    #[test]
    fn test_bodies_are_kept_verbatim() {
        let bodies = [
            json!({"properties": {"name": "Cafe X", "lat": 40, "lon": -73}}),
            json!({"metadata": {"submitted_at": "x"}}),
            json!({"properties": null}),
            json!({"properties": {"name": "Library", "wheelchair": true}, "source": "kiosk"}),
            json!({}),
        ];

        for body in bodies {
            let submission = decode(&body);
            assert_eq!(serde_json::to_value(&submission).unwrap(), body);
        }

        let integer = decode(&json!({"properties": {"lat": 40}}));
        assert_eq!(
            serde_json::to_string(&integer).unwrap(),
            r#"{"properties":{"lat":40}}"#
        );
    }

    #[test]
    fn test_off_type_fields_are_accepted() {
        let submission = decode(&json!({
            "properties": {"name": null, "lat": "40.0", "lon": "-73.0", "doorCode": 1234},
            "metadata": {"status": "Pending"}
        }));

        assert_eq!(submission.name(), None);
        assert_eq!(submission.door_code(), None);
        assert_eq!(submission.coordinate(), None);
        assert_eq!(submission.status(), SubmissionStatus::Pending);
    }

    #[test]
    fn test_rejects_non_object_bodies() {
        for body in ["not json", "[1, 2]", "null", "\"text\""] {
            let err = LocationSubmission::from_json_slice(body.as_bytes()).unwrap_err();
            assert!(err.is_client_error(), "{body:?} should be a client error");
        }
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(
            "Approved".parse::<SubmissionStatus>().unwrap(),
            SubmissionStatus::Approved
        );
        assert!("archived".parse::<SubmissionStatus>().is_err());

        let unknown = decode(&json!({"metadata": {"status": "archived"}}));
        assert_eq!(unknown.status(), SubmissionStatus::Pending);
    }

    #[test]
    fn test_builders() {
        let submission = LocationSubmission::new("Cafe X", "1 Main St", 40.0, -73.0)
            .with_property("category", "cafe")
            .with_metadata(&SubmissionMetadata {
                submitted_at: Some("yesterday".to_string()),
                status: SubmissionStatus::Rejected,
            });

        assert_eq!(
            serde_json::to_value(&submission).unwrap(),
            json!({
                "properties": {"name": "Cafe X", "formatted": "1 Main St", "lat": 40.0, "lon": -73.0, "category": "cafe"},
                "metadata": {"submitted_at": "yesterday", "status": "rejected"}
            })
        );
        assert!(submission.submitted_at_utc().is_none());
        assert_eq!(submission.status(), SubmissionStatus::Rejected);
    }

    #[test]
    fn test_validate_accepts_complete_submission() {
        let submission = LocationSubmission::new("Cafe X", "1 Main St", 40.0, -73.0)
            .with_metadata(&SubmissionMetadata::pending_at(Utc::now()));
        assert!(validate(&submission).is_ok());
    }

    #[test]
    fn test_validate_rejects_incomplete_or_out_of_range() {
        assert!(validate(&LocationSubmission::default()).is_err());
        assert!(validate(&LocationSubmission::new("  ", "1 Main St", 0.0, 0.0)).is_err());
        assert!(validate(&LocationSubmission::new("Cafe", "", 0.0, 0.0)).is_err());
        assert!(validate(&LocationSubmission::new("Cafe", "1 Main St", 91.0, 0.0)).is_err());
        assert!(validate(&LocationSubmission::new("Cafe", "1 Main St", 0.0, -180.5)).is_err());

        let string_lat = LocationSubmission::new("Cafe", "1 Main St", 10.0, 10.0)
            .with_property("lat", "10.0");
        assert!(validate(&string_lat).is_err());

        let bad_status = decode(&json!({
            "properties": {"name": "Cafe", "formatted": "1 Main St", "lat": 1.0, "lon": 1.0},
            "metadata": {"status": "archived"}
        }));
        assert!(validate(&bad_status).is_err());
    }

    #[test]
    fn test_coordinate_bounds_are_inclusive() {
        let corner = Coordinate {
            latitude: -90.0,
            longitude: 180.0,
        };
        assert!(corner.is_valid());
    }
}
