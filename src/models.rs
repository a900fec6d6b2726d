//! Records stored in the `posts` and `gauges` collections

use chrono::{SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A record kept in sync from a collection
pub trait Entity: DeserializeOwned + Clone + Send + Sync + 'static {
    /// Store-assigned identifier
    fn id(&self) -> &str;
}

/// A blog post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub text: String,
    /// `data:` URL of the attached image, empty when there is none
    #[serde(default)]
    pub image: String,
    pub created_at: String,
}

impl Post {
    /// Whether an image is attached
    pub fn has_image(&self) -> bool {
        !self.image.is_empty()
    }
}

impl Entity for Post {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Fields written when a post is created
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewPost {
    pub title: String,
    pub text: String,
    pub image: String,
    pub created_at: String,
}

/// How a gauge is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GaugeType {
    Radial,
    #[default]
    Semicircle,
}

impl GaugeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GaugeType::Radial => "radial",
            GaugeType::Semicircle => "semicircle",
        }
    }
}

impl fmt::Display for GaugeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GaugeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "radial" => Ok(GaugeType::Radial),
            "semicircle" => Ok(GaugeType::Semicircle),
            other => Err(Error::validation(format!("unknown gauge type: {}", other))),
        }
    }
}

/// Display column a gauge belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Left,
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Side::Left),
            "right" => Ok(Side::Right),
            other => Err(Error::validation(format!("unknown side: {}", other))),
        }
    }
}

/// A dashboard gauge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gauge {
    pub id: String,
    pub title: String,
    /// Reading in `[0, 100]`
    pub value: f64,
    #[serde(rename = "type")]
    pub gauge_type: GaugeType,
    /// Arc colors, low to high, at most three
    #[serde(default)]
    pub colors: Vec<String>,
    pub side: Side,
    pub created_at: String,
}

impl Entity for Gauge {
    fn id(&self) -> &str {
        &self.id
    }
}

/// The mutable part of a gauge, written on create and on every update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct GaugeFields {
    pub title: String,
    pub value: f64,
    #[serde(rename = "type")]
    pub gauge_type: GaugeType,
    pub colors: Vec<String>,
    pub side: Side,
}

/// Fields written when a gauge is created
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewGauge {
    #[serde(flatten)]
    pub fields: GaugeFields,
    pub created_at: String,
}

/// Current time as an ISO-8601 UTC timestamp with millisecond precision
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn post_without_image_field_maps_to_empty_image() {
        let post: Post = serde_json::from_value(json!({
            "id": "p1",
            "title": "Hi",
            "text": "World",
            "createdAt": "2024-01-01T00:00:00.000Z"
        }))
        .unwrap();
        assert!(!post.has_image());
        assert_eq!(post.created_at, "2024-01-01T00:00:00.000Z");
    }

    #[test]
    fn gauge_uses_type_and_lowercase_enums_on_the_wire() {
        let gauge: Gauge = serde_json::from_value(json!({
            "id": "g1",
            "title": "CPU",
            "value": 75,
            "type": "radial",
            "colors": ["#0f0"],
            "side": "left",
            "createdAt": "2024-01-01T00:00:00.000Z"
        }))
        .unwrap();
        assert_eq!(gauge.gauge_type, GaugeType::Radial);
        assert_eq!(gauge.side, Side::Left);
        assert_eq!(gauge.value, 75.0);
    }

    #[test]
    fn new_gauge_flattens_fields_next_to_created_at() {
        let record = NewGauge {
            fields: GaugeFields {
                title: "Disk".to_string(),
                value: 10.0,
                gauge_type: GaugeType::Semicircle,
                colors: vec![],
                side: Side::Right,
            },
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
        };
        let value = serde_json::to_value(record).unwrap();
        assert_eq!(value["type"], "semicircle");
        assert_eq!(value["side"], "right");
        assert_eq!(value["createdAt"], "2024-01-01T00:00:00.000Z");
        assert!(value.get("id").is_none());
    }

    #[test]
    fn timestamps_are_utc_millis() {
        let stamp = now_timestamp();
        assert!(stamp.ends_with('Z'));
        assert_eq!(stamp.len(), "2024-01-01T00:00:00.000Z".len());
    }

    #[test]
    fn parses_enum_names() {
        assert_eq!("radial".parse::<GaugeType>().unwrap(), GaugeType::Radial);
        assert_eq!("right".parse::<Side>().unwrap(), Side::Right);
        assert!("middle".parse::<Side>().is_err());
    }
}
