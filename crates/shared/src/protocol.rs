use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{BoundaryStylePatch, LatLng, Marker},
    error::DecodeError,
};

/// Actions the map assistant server is known to push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    UpdateSituation,
    FocusArea,
    ClearBoundary,
    EmergencyAlert,
}

impl Action {
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw {
            "UPDATE_SITUATION" => Some(Self::UpdateSituation),
            "FOCUS_AREA" => Some(Self::FocusArea),
            "CLEAR_BOUNDARY" => Some(Self::ClearBoundary),
            "EMERGENCY_ALERT" => Some(Self::EmergencyAlert),
            _ => None,
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            Self::UpdateSituation => "UPDATE_SITUATION",
            Self::FocusArea => "FOCUS_AREA",
            Self::ClearBoundary => "CLEAR_BOUNDARY",
            Self::EmergencyAlert => "EMERGENCY_ALERT",
        }
    }
}

/// Server -> client push, kept loosely typed until an action is known.
///
/// Every field is optional and `null` is read as absent, so any JSON object
/// fits the envelope. Typed views over `data` and `boundaryStyle` are
/// produced on demand by the accessors below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary_style: Option<Value>,
}

/// Typed view over the envelope's `data` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SituationData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<LatLng>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markers: Option<Vec<Marker>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<bool>,
}

impl InstructionEnvelope {
    /// Parses raw socket text. Well-formed JSON that is not an object yields
    /// an empty envelope; only malformed text is an error.
    pub fn parse(raw: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn action(&self) -> Option<Action> {
        self.action
            .as_ref()
            .and_then(Value::as_str)
            .and_then(Action::from_wire)
    }

    pub fn action_name(&self) -> Option<&str> {
        self.action.as_ref().and_then(Value::as_str)
    }

    /// Text of `message` when it carries something to show. Numbers and
    /// `true` are rendered as text; `""`, `0`, `false`, `null`, arrays and
    /// objects count as absent.
    pub fn message_text(&self) -> Option<String> {
        match self.message.as_ref()? {
            Value::String(text) if !text.is_empty() => Some(text.clone()),
            Value::Number(number) if number.as_f64() != Some(0.0) => Some(number.to_string()),
            Value::Bool(true) => Some("true".to_string()),
            _ => None,
        }
    }

    /// `boundary` when it is a geometry object; scalars and arrays are ignored.
    pub fn boundary_geometry(&self) -> Option<&Value> {
        self.boundary.as_ref().filter(|boundary| boundary.is_object())
    }

    pub fn situation_data(&self, action: Action) -> Result<SituationData, DecodeError> {
        match &self.data {
            None => Ok(SituationData::default()),
            Some(data) => serde_json::from_value(data.clone()).map_err(|source| {
                DecodeError::InvalidField {
                    action,
                    field: "data",
                    source,
                }
            }),
        }
    }

    pub fn boundary_style(&self, action: Action) -> Result<Option<BoundaryStylePatch>, DecodeError> {
        self.boundary_style
            .as_ref()
            .map(|style| {
                serde_json::from_value(style.clone()).map_err(|source| DecodeError::InvalidField {
                    action,
                    field: "boundaryStyle",
                    source,
                })
            })
            .transpose()
    }
}

/// Client -> server chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub message: String,
}

impl OutboundMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_center_pair_and_defaults_marker_text() {
        let envelope = InstructionEnvelope::parse(
            r#"{"action":"FOCUS_AREA","data":{"center":[6.25,-75.56],"zoom":11,"markers":[{"id":"m1","lat":6.2,"lng":-75.5}]}}"#,
        )
        .expect("parse");
        assert_eq!(envelope.action(), Some(Action::FocusArea));

        let data = envelope.situation_data(Action::FocusArea).expect("data");
        assert_eq!(data.center, Some(LatLng::new(6.25, -75.56)));
        assert_eq!(data.zoom, Some(11.0));
        let markers = data.markers.expect("markers");
        assert_eq!(markers[0].label, "");
        assert_eq!(markers[0].description, "");
    }

    #[test]
    fn non_object_json_is_an_empty_envelope() {
        let envelope = InstructionEnvelope::parse("[1, 2, 3]").expect("parse");
        assert_eq!(envelope, InstructionEnvelope::default());
        assert_eq!(envelope.action(), None);
    }

    #[test]
    fn null_fields_read_as_absent() {
        let envelope =
            InstructionEnvelope::parse(r#"{"action":null,"boundary":null,"message":null}"#)
                .expect("parse");
        assert!(envelope.boundary.is_none());
        assert!(envelope.message_text().is_none());
        assert!(envelope.action_name().is_none());
    }

    #[test]
    fn message_text_follows_truthiness() {
        let message_of = |raw: &str| {
            InstructionEnvelope::parse(raw)
                .expect("parse")
                .message_text()
        };
        assert_eq!(message_of(r#"{"message":"hola"}"#).as_deref(), Some("hola"));
        assert_eq!(message_of(r#"{"message":12}"#).as_deref(), Some("12"));
        assert_eq!(message_of(r#"{"message":true}"#).as_deref(), Some("true"));
        assert_eq!(message_of(r#"{"message":""}"#), None);
        assert_eq!(message_of(r#"{"message":0}"#), None);
        assert_eq!(message_of(r#"{"message":false}"#), None);
        assert_eq!(message_of(r#"{"message":{"text":"hola"}}"#), None);
    }

    #[test]
    fn only_objects_count_as_boundary_geometry() {
        for raw in [
            r#"{"boundary":false}"#,
            r#"{"boundary":0}"#,
            r#"{"boundary":""}"#,
            r#"{"boundary":[1,2]}"#,
        ] {
            let envelope = InstructionEnvelope::parse(raw).expect("parse");
            assert!(envelope.boundary_geometry().is_none(), "{raw}");
        }
        let envelope =
            InstructionEnvelope::parse(r#"{"boundary":{"type":"Feature"}}"#).expect("parse");
        assert!(envelope.boundary_geometry().is_some());
    }

    #[test]
    fn rejects_malformed_text() {
        assert!(matches!(
            InstructionEnvelope::parse("hola"),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn outbound_message_wire_shape() {
        let json = serde_json::to_string(&OutboundMessage::new("¿qué pasa en Cali?")).expect("json");
        assert_eq!(json, r#"{"message":"¿qué pasa en Cali?"}"#);
    }
}
