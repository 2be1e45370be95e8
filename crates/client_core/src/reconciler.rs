//! Pure `(ViewState, Instruction) -> (ViewState, note)` transformation.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use shared::domain::{BoundaryStyle, LatLng, Marker, TranscriptOrigin};

use crate::{decoder::Instruction, transcript::TranscriptNote};

pub const DEFAULT_CENTER: LatLng = LatLng::new(4.5709, -74.2973);
pub const DEFAULT_ZOOM: f64 = 6.0;
pub const ALERT_PREFIX: &str = "ALERTA: ";

/// Geofence overlay plus the redraw epoch it was installed at. Two
/// boundaries with identical geometry still compare unequal when they were
/// installed by different instructions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Boundary {
    pub geometry: Arc<Value>,
    pub epoch: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub center: LatLng,
    pub zoom: f64,
    pub markers: Vec<Marker>,
    pub boundary: Option<Boundary>,
    pub boundary_style: BoundaryStyle,
    pub redraw_epoch: u64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            markers: Vec::new(),
            boundary: None,
            boundary_style: BoundaryStyle::default(),
            redraw_epoch: 0,
        }
    }
}

impl ViewState {
    fn install_boundary(&mut self, geometry: Arc<Value>) {
        self.redraw_epoch += 1;
        self.boundary = Some(Boundary {
            geometry,
            epoch: self.redraw_epoch,
        });
    }
}

pub fn reconcile(state: &ViewState, instruction: &Instruction) -> (ViewState, Option<TranscriptNote>) {
    let mut next = state.clone();

    let note = match instruction {
        Instruction::UpdateSituation {
            markers,
            focus,
            center,
            zoom,
            message,
        } => {
            next.markers = markers.clone();
            if *focus {
                if let Some(center) = center {
                    next.center = *center;
                }
                if let Some(zoom) = zoom {
                    next.zoom = *zoom;
                }
            }
            Some(TranscriptNote::ai(match message {
                Some(message) => message.clone(),
                None => format!("Mapa actualizado: {} marcadores", markers.len()),
            }))
        }
        Instruction::FocusArea {
            center,
            zoom,
            markers,
            boundary,
            boundary_style,
            message,
        } => {
            next.center = *center;
            next.zoom = *zoom;
            if let Some(markers) = markers {
                next.markers = markers.clone();
            }
            if let Some(geometry) = boundary {
                next.install_boundary(Arc::clone(geometry));
            }
            if let Some(patch) = boundary_style {
                next.boundary_style = next.boundary_style.merged(patch);
            }
            message.clone().map(TranscriptNote::ai)
        }
        Instruction::ClearBoundary { message } => {
            next.boundary = None;
            next.center = DEFAULT_CENTER;
            next.zoom = DEFAULT_ZOOM;
            message.clone().map(TranscriptNote::ai)
        }
        Instruction::EmergencyAlert { message } => {
            Some(TranscriptNote::ai(format!("{ALERT_PREFIX}{message}")))
        }
        Instruction::Unknown { message } => message.clone().map(TranscriptNote::ai),
        Instruction::PlainText(raw) => Some(TranscriptNote {
            origin: TranscriptOrigin::Ai,
            content: raw.clone(),
        }),
    };

    (next, note)
}

#[cfg(test)]
#[path = "tests/reconciler_tests.rs"]
mod tests;
