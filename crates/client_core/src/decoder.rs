//! Raw socket text -> typed [`Instruction`].

use std::sync::Arc;

use serde_json::Value;
use shared::{
    domain::{BoundaryStylePatch, LatLng, Marker},
    error::DecodeError,
    protocol::{Action, InstructionEnvelope},
};
use tracing::debug;

/// A decoded server push. Built fresh per inbound message and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    UpdateSituation {
        markers: Vec<Marker>,
        focus: bool,
        center: Option<LatLng>,
        zoom: Option<f64>,
        message: Option<String>,
    },
    FocusArea {
        center: LatLng,
        zoom: f64,
        markers: Option<Vec<Marker>>,
        boundary: Option<Arc<Value>>,
        boundary_style: Option<BoundaryStylePatch>,
        message: Option<String>,
    },
    ClearBoundary {
        message: Option<String>,
    },
    EmergencyAlert {
        message: String,
    },
    /// Well-formed payload with a missing or unrecognised action.
    Unknown {
        message: Option<String>,
    },
    /// Payload that could not be read as an instruction at all; shown as
    /// assistant text.
    PlainText(String),
}

impl Instruction {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpdateSituation { .. } => Action::UpdateSituation.as_wire(),
            Self::FocusArea { .. } => Action::FocusArea.as_wire(),
            Self::ClearBoundary { .. } => Action::ClearBoundary.as_wire(),
            Self::EmergencyAlert { .. } => Action::EmergencyAlert.as_wire(),
            Self::Unknown { .. } => "UNKNOWN",
            Self::PlainText(_) => "PLAIN_TEXT",
        }
    }
}

/// Never fails: anything that is not a readable instruction degrades to
/// [`Instruction::PlainText`] carrying the raw text unchanged.
pub fn decode(raw: &str) -> Instruction {
    match try_decode(raw) {
        Ok(instruction) => instruction,
        Err(err) => {
            debug!(len = raw.len(), "decoder: falling back to plain text: {err}");
            Instruction::PlainText(raw.to_string())
        }
    }
}

pub fn try_decode(raw: &str) -> Result<Instruction, DecodeError> {
    let envelope = InstructionEnvelope::parse(raw)?;
    let message = envelope.message_text();

    let Some(action) = envelope.action() else {
        if let Some(name) = envelope.action_name() {
            debug!(action = name, "decoder: unrecognised action");
        }
        return Ok(Instruction::Unknown { message });
    };

    match action {
        Action::UpdateSituation => {
            let data = envelope.situation_data(action)?;
            let markers = data.markers.ok_or(DecodeError::MissingField {
                action,
                field: "data.markers",
            })?;
            Ok(Instruction::UpdateSituation {
                markers,
                focus: data.focus.unwrap_or(false),
                center: data.center,
                zoom: data.zoom,
                message,
            })
        }
        Action::FocusArea => {
            let data = envelope.situation_data(action)?;
            let center = data.center.ok_or(DecodeError::MissingField {
                action,
                field: "data.center",
            })?;
            let zoom = data.zoom.ok_or(DecodeError::MissingField {
                action,
                field: "data.zoom",
            })?;
            Ok(Instruction::FocusArea {
                center,
                zoom,
                markers: data.markers,
                boundary: envelope.boundary_geometry().cloned().map(Arc::new),
                boundary_style: envelope.boundary_style(action)?,
                message,
            })
        }
        Action::ClearBoundary => Ok(Instruction::ClearBoundary { message }),
        Action::EmergencyAlert => Ok(Instruction::EmergencyAlert {
            message: envelope.message_text().unwrap_or_default(),
        }),
    }
}

#[cfg(test)]
#[path = "tests/decoder_tests.rs"]
mod tests;
