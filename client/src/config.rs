use url::Url;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";

pub const HEALTH_ENDPOINT: &str = "/health";
pub const ANALYZE_ENDPOINT: &str = "/analyze";

/// Backend endpoint configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub backend_url: Url,
}

impl ApiConfig {
    pub fn new(backend_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            backend_url: Url::parse(backend_url)?,
        })
    }

    pub fn health_url(&self) -> String {
        self.endpoint(HEALTH_ENDPOINT)
    }

    pub fn analyze_url(&self) -> String {
        self.endpoint(ANALYZE_ENDPOINT)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.backend_url.as_str().trim_end_matches('/'), path)
    }
}

/// Caller-provided session state. Passed in explicitly so nothing in the
/// pipeline reads ambient global storage; an absent token is tolerated and
/// simply means the request goes out unauthenticated.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub bearer_token: Option<String>,
    pub user_id: Option<String>,
}
