use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Image => write!(f, "image"),
        }
    }
}

/// Prediction labels emitted by the analysis backend. The backend may start
/// returning labels this client has never seen, so unrecognized strings are
/// carried through as `Other` instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prediction {
    Real,
    DeepfakeOg,
    DeepfakeLatest,
    Other(String),
}

impl Prediction {
    pub fn as_str(&self) -> &str {
        match self {
            Prediction::Real => "real",
            Prediction::DeepfakeOg => "deepfake_og",
            Prediction::DeepfakeLatest => "deepfake_latest",
            Prediction::Other(label) => label,
        }
    }

    pub fn is_deepfake(&self) -> bool {
        !matches!(self, Prediction::Real)
    }
}

impl From<String> for Prediction {
    fn from(label: String) -> Self {
        match label.as_str() {
            "real" => Prediction::Real,
            "deepfake_og" => Prediction::DeepfakeOg,
            "deepfake_latest" => Prediction::DeepfakeLatest,
            _ => Prediction::Other(label),
        }
    }
}

impl From<&str> for Prediction {
    fn from(label: &str) -> Self {
        Prediction::from(label.to_string())
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Prediction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Prediction {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Prediction::from(String::deserialize(deserializer)?))
    }
}

/// Aggregate confidence reported by the backend. A raw score of exactly zero
/// is a sentinel meaning "no face detected" rather than a genuine score, and
/// an absent field is a third state of its own; collapsing either into a
/// plain float would lose that distinction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Confidence {
    NoFace,
    Score(f64),
    Unknown,
}

impl Confidence {
    pub fn from_raw(raw: Option<f64>) -> Self {
        match raw {
            None => Confidence::Unknown,
            Some(value) if value == 0.0 => Confidence::NoFace,
            Some(value) => Confidence::Score(value),
        }
    }

    /// Numeric score for arithmetic and synthesis; the sentinel states
    /// collapse to zero here, matching the original display math.
    pub fn score(&self) -> f64 {
        match self {
            Confidence::Score(value) => *value,
            Confidence::NoFace | Confidence::Unknown => 0.0,
        }
    }

    pub fn is_no_face(&self) -> bool {
        matches!(self, Confidence::NoFace)
    }
}

impl Serialize for Confidence {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Confidence::NoFace => serializer.serialize_f64(0.0),
            Confidence::Score(value) => serializer.serialize_f64(*value),
            Confidence::Unknown => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Confidence {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Confidence::from_raw(Option::<f64>::deserialize(
            deserializer,
        )?))
    }
}

/// Raw `/analyze` response body. Everything except `prediction` is optional;
/// the backend legitimately omits numeric fields when no face was found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawAnalysisResponse {
    pub prediction: String,
    pub prediction_confidence: Option<f64>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub content_hash: Option<String>,
    pub avg_real_confidence: Option<f64>,
    pub avg_deepfake_og_confidence: Option<f64>,
    pub avg_deepfake_confidence: Option<f64>,
    pub total_frames: Option<u32>,
    pub heatmap_urls: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub timeseries_plot: Option<String>,
    pub time_taken: Option<f64>,
}

/// Canonical result of one completed analysis. Built once per successful
/// submission and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    pub kind: MediaKind,
    pub content_hash: String,
    pub prediction: Prediction,
    pub confidence: Confidence,
    pub is_deepfake: bool,
    pub total_frames: u32,
    /// Synthesized client-side, not measured data.
    pub frame_confidences: Vec<f64>,
    pub avg_real_confidence: Option<f64>,
    pub avg_deepfake_og_confidence: Option<f64>,
    pub avg_deepfake_confidence: Option<f64>,
    pub heatmap_urls: Vec<String>,
    pub time_series_plot_url: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub inference_time_seconds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Deepfake,
    Authentic,
    NoFaceDetected,
    Unknown,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Deepfake => write!(f, "Deepfake"),
            Verdict::Authentic => write!(f, "Authentic"),
            Verdict::NoFaceDetected => write!(f, "No face detected"),
            Verdict::Unknown => write!(f, "Unknown"),
        }
    }
}

impl DetectionResult {
    /// Display verdict, checked in the same order as the results badge:
    /// known deepfake labels win, `real` counts as authentic only with a
    /// genuine score, the zero sentinel reads as "no face detected".
    pub fn verdict(&self) -> Verdict {
        match (&self.prediction, self.confidence) {
            (Prediction::DeepfakeOg | Prediction::DeepfakeLatest, _) => Verdict::Deepfake,
            (Prediction::Real, Confidence::Score(_)) => Verdict::Authentic,
            (_, Confidence::NoFace) => Verdict::NoFaceDetected,
            _ => Verdict::Unknown,
        }
    }
}
