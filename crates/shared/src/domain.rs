use serde::{Deserialize, Serialize};

/// Geographic point. On the wire it travels as a `[lat, lng]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<[f64; 2]> for LatLng {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

impl From<LatLng> for [f64; 2] {
    fn from(value: LatLng) -> Self {
        [value.lat, value.lng]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
}

impl Marker {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryStyle {
    pub color: String,
    pub weight: f64,
    pub fill_color: String,
    pub fill_opacity: f64,
}

impl Default for BoundaryStyle {
    fn default() -> Self {
        Self {
            color: "#ef4444".into(),
            weight: 3.0,
            fill_color: "#ef4444".into(),
            fill_opacity: 0.15,
        }
    }
}

impl BoundaryStyle {
    /// Shallow merge: fields set on the patch win, everything else is kept.
    pub fn merged(&self, patch: &BoundaryStylePatch) -> Self {
        Self {
            color: patch.color.clone().unwrap_or_else(|| self.color.clone()),
            weight: patch.weight.unwrap_or(self.weight),
            fill_color: patch
                .fill_color
                .clone()
                .unwrap_or_else(|| self.fill_color.clone()),
            fill_opacity: patch.fill_opacity.unwrap_or(self.fill_opacity),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryStylePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptOrigin {
    User,
    Ai,
    System,
}

impl TranscriptOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ai => "ai",
            Self::System => "system",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}
