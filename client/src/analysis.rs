use chrono::Utc;
use log::{info, warn};
use rand::Rng;
use reqwest::multipart;
use shared::{Confidence, DetectionResult, MediaKind, Prediction, RawAnalysisResponse};

use crate::config::{ApiConfig, SessionContext};

/// One file queued for analysis. Created at submission time and consumed by
/// the request; the content hash doubles as the storage/report correlation id.
#[derive(Debug, Clone)]
pub struct AnalysisArtifact {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
    pub kind: MediaKind,
    pub content_hash: String,
    pub has_text: bool,
}

impl AnalysisArtifact {
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>, has_text: bool) -> Self {
        let file_name = file_name.into();
        let mime = mime_guess::from_path(&file_name).first_or_octet_stream();
        let kind = if mime.type_() == mime_guess::mime::VIDEO {
            MediaKind::Video
        } else {
            MediaKind::Image
        };
        let content_hash = format!("{}_{}", kind, Utc::now().timestamp_millis());
        Self {
            bytes,
            file_name,
            mime_type: mime.essence_str().to_string(),
            kind,
            content_hash,
            has_text,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    #[error("analysis failed ({status}): {detail}")]
    Remote { status: u16, detail: String },
    #[error("invalid response payload: {0}")]
    InvalidPayload(String),
    #[error("request failed: {0}")]
    Other(String),
}

impl AnalysisError {
    /// Message shown to the end user, matching the original UX copy: a
    /// transport-level failure points at the backend address, everything
    /// else falls back to the server detail or the face heuristic.
    pub fn user_message(&self, config: &ApiConfig) -> String {
        match self {
            AnalysisError::Unreachable(_) => {
                format!("Cannot connect to backend at {}", config.backend_url)
            }
            AnalysisError::Remote { detail, .. } => detail.clone(),
            AnalysisError::InvalidPayload(_) | AnalysisError::Other(_) => {
                "No face detected or file invalid".to_string()
            }
        }
    }
}

pub struct AnalysisClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl AnalysisClient {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Lightweight availability probe, used to gate the upload so a large
    /// file is never sent to a dead backend.
    pub async fn check_health(&self) -> bool {
        match self.http.get(self.config.health_url()).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                warn!("Health check failed: {err}");
                false
            }
        }
    }

    /// Submit the artifact and normalize the response. No retries, no
    /// timeout beyond the health gate; one `DetectionResult` per success,
    /// never a partial one.
    pub async fn submit(
        &self,
        artifact: AnalysisArtifact,
        session: &SessionContext,
    ) -> Result<DetectionResult, AnalysisError> {
        if !self.check_health().await {
            return Err(AnalysisError::Unreachable(format!(
                "health probe failed for {}",
                self.config.backend_url
            )));
        }

        let AnalysisArtifact {
            bytes,
            file_name,
            mime_type,
            kind,
            content_hash,
            has_text,
        } = artifact;

        info!(
            "Uploading {} ({} bytes) as {}",
            file_name,
            bytes.len(),
            content_hash
        );

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(&mime_type)
            .map_err(|err| AnalysisError::Other(err.to_string()))?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("content_hash", content_hash.clone())
            .text("type", kind.to_string())
            .text("has_text", if has_text { "true" } else { "false" });

        let mut request = self.http.post(self.config.analyze_url()).multipart(form);
        if let Some(token) = &session.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| AnalysisError::Unreachable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // Non-JSON error bodies are tolerated and treated as empty.
            let body: serde_json::Value = response
                .json()
                .await
                .unwrap_or_else(|_| serde_json::json!({}));
            let detail = body
                .get("detail")
                .and_then(|detail| detail.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Server error: {}", status.as_u16()));
            return Err(AnalysisError::Remote {
                status: status.as_u16(),
                detail,
            });
        }

        let raw: RawAnalysisResponse = response
            .json()
            .await
            .map_err(|err| AnalysisError::InvalidPayload(err.to_string()))?;

        Ok(normalize(kind, &content_hash, raw, &mut rand::rng()))
    }
}

/// Map the raw backend payload onto the canonical result. URL fields are
/// gated by media kind so the mutual exclusivity holds even if the backend
/// echoes both sets.
pub fn normalize(
    kind: MediaKind,
    fallback_hash: &str,
    raw: RawAnalysisResponse,
    rng: &mut impl Rng,
) -> DetectionResult {
    let prediction = Prediction::from(raw.prediction);
    let confidence = Confidence::from_raw(raw.prediction_confidence);
    let total_frames = raw.total_frames.filter(|frames| *frames > 0).unwrap_or(1);

    DetectionResult {
        kind,
        content_hash: raw
            .content_hash
            .unwrap_or_else(|| fallback_hash.to_string()),
        is_deepfake: prediction.is_deepfake(),
        total_frames,
        frame_confidences: synthesize_frame_confidences(confidence.score(), total_frames, rng),
        avg_real_confidence: raw.avg_real_confidence,
        avg_deepfake_og_confidence: raw.avg_deepfake_og_confidence,
        avg_deepfake_confidence: raw.avg_deepfake_confidence,
        heatmap_urls: match kind {
            MediaKind::Video => raw.heatmap_urls.unwrap_or_default(),
            MediaKind::Image => Vec::new(),
        },
        time_series_plot_url: match kind {
            MediaKind::Video => raw.timeseries_plot,
            MediaKind::Image => None,
        },
        video_url: match kind {
            MediaKind::Video => raw.video_url,
            MediaKind::Image => None,
        },
        image_url: match kind {
            MediaKind::Image => raw.image_url,
            MediaKind::Video => None,
        },
        inference_time_seconds: raw.time_taken.unwrap_or(0.0).max(0.0),
        prediction,
        confidence,
    }
}

/// Placeholder until the backend reports genuine per-frame scores: jittered
/// samples around the aggregate. Deliberately unclamped, so values near the
/// boundaries may leave [0, 1].
pub fn synthesize_frame_confidences(
    confidence: f64,
    total_frames: u32,
    rng: &mut impl Rng,
) -> Vec<f64> {
    (0..total_frames)
        .map(|_| confidence + rng.random_range(-0.1..0.1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn video_artifact() -> AnalysisArtifact {
        AnalysisArtifact::new(vec![0u8; 64], "clip.mp4", false)
    }

    fn client_for(server: &MockServer) -> AnalysisClient {
        AnalysisClient::new(ApiConfig::new(&server.uri()).unwrap())
    }

    #[test]
    fn artifact_detects_kind_from_file_name() {
        let video = AnalysisArtifact::new(vec![1], "clip.mp4", false);
        assert_eq!(video.kind, MediaKind::Video);
        assert!(video.content_hash.starts_with("video_"));

        let image = AnalysisArtifact::new(vec![1], "face.png", true);
        assert_eq!(image.kind, MediaKind::Image);
        assert!(image.content_hash.starts_with("image_"));
    }

    #[test]
    fn synthesis_has_exact_length_and_jitter_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for confidence in [0.0, 0.05, 0.5, 0.82, 1.0] {
            let frames = synthesize_frame_confidences(confidence, 30, &mut rng);
            assert_eq!(frames.len(), 30);
            for value in frames {
                assert!(value >= confidence - 0.1 && value < confidence + 0.1);
            }
        }
    }

    #[test]
    fn synthesis_is_not_clamped_to_unit_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let frames = synthesize_frame_confidences(0.99, 500, &mut rng);
        assert!(frames.iter().any(|value| *value > 1.0));
    }

    #[test]
    fn normalize_defaults_missing_total_frames_to_one() {
        let raw: RawAnalysisResponse = serde_json::from_value(json!({
            "prediction": "real",
            "prediction_confidence": 0.7
        }))
        .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let result = normalize(MediaKind::Video, "video_1", raw, &mut rng);
        assert_eq!(result.total_frames, 1);
        assert_eq!(result.frame_confidences.len(), 1);
    }

    #[test]
    fn normalize_gates_urls_by_kind() {
        let raw: RawAnalysisResponse = serde_json::from_value(json!({
            "prediction": "real",
            "prediction_confidence": 0.7,
            "image_url": "http://x/img.png",
            "video_url": "http://x/clip.mp4",
            "timeseries_plot": "http://x/plot.png",
            "heatmap_urls": ["http://x/hm0.png"]
        }))
        .unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        let video = normalize(MediaKind::Video, "video_1", raw.clone(), &mut rng);
        assert_eq!(video.image_url, None);
        assert_eq!(video.video_url.as_deref(), Some("http://x/clip.mp4"));
        assert_eq!(
            video.time_series_plot_url.as_deref(),
            Some("http://x/plot.png")
        );
        assert_eq!(video.heatmap_urls.len(), 1);

        let image = normalize(MediaKind::Image, "image_1", raw, &mut rng);
        assert_eq!(image.image_url.as_deref(), Some("http://x/img.png"));
        assert_eq!(image.video_url, None);
        assert_eq!(image.time_series_plot_url, None);
        assert!(image.heatmap_urls.is_empty());
    }

    #[tokio::test]
    async fn failed_health_check_prevents_submission() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = client_for(&server)
            .submit(video_artifact(), &SessionContext::default())
            .await;
        assert!(matches!(result, Err(AnalysisError::Unreachable(_))));
    }

    #[tokio::test]
    async fn submit_normalizes_successful_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "prediction": "deepfake_latest",
                "prediction_confidence": 0.82,
                "total_frames": 30,
                "time_taken": 1.23,
                "content_hash": "video_1700000000000"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server)
            .submit(video_artifact(), &SessionContext::default())
            .await
            .unwrap();
        assert!(result.is_deepfake);
        assert_eq!(result.prediction, Prediction::DeepfakeLatest);
        assert_eq!(result.confidence, Confidence::Score(0.82));
        assert_eq!(result.total_frames, 30);
        assert_eq!(result.frame_confidences.len(), 30);
        assert_eq!(result.inference_time_seconds, 1.23);
        assert_eq!(result.content_hash, "video_1700000000000");
    }

    #[tokio::test]
    async fn server_detail_is_surfaced_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "detail": "Invalid file type" })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .submit(video_artifact(), &SessionContext::default())
            .await
            .unwrap_err();
        match err {
            AnalysisError::Remote { status, detail } => {
                assert_eq!(status, 400);
                assert_eq!(detail, "Invalid file type");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_error_body_falls_back_to_generic_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(ResponseTemplate::new(500).set_body_string("<html>boom</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .submit(video_artifact(), &SessionContext::default())
            .await
            .unwrap_err();
        match err {
            AnalysisError::Remote { status, detail } => {
                assert_eq!(status, 500);
                assert_eq!(detail, "Server error: 500");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn user_messages_follow_the_original_copy() {
        let config = ApiConfig::new("http://127.0.0.1:8000").unwrap();
        let unreachable = AnalysisError::Unreachable("refused".into());
        assert_eq!(
            unreachable.user_message(&config),
            "Cannot connect to backend at http://127.0.0.1:8000/"
        );

        let remote = AnalysisError::Remote {
            status: 400,
            detail: "Invalid file type".into(),
        };
        assert_eq!(remote.user_message(&config), "Invalid file type");

        let other = AnalysisError::Other("oops".into());
        assert_eq!(
            other.user_message(&config),
            "No face detected or file invalid"
        );
    }
}
