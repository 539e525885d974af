use url::Url;

use crate::config::SessionContext;

#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("user id missing from session")]
    MissingUser,
    #[error("feedback transport failed: {0}")]
    Transport(String),
    #[error("feedback rejected with status {0}")]
    Status(u16),
}

/// Fire-and-forget liked/disliked side-channel. Writes a per-user,
/// per-content text object plus a parallel feedback record; callers spawn
/// this and only log failures — nothing here feeds back into the result
/// pipeline.
pub struct FeedbackClient {
    http: reqwest::Client,
    storage_url: Url,
}

impl FeedbackClient {
    pub fn new(storage_url: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            storage_url,
        }
    }

    pub async fn record(
        &self,
        session: &SessionContext,
        content_hash: &str,
        liked: bool,
    ) -> Result<(), FeedbackError> {
        let user_id = session
            .user_id
            .as_deref()
            .ok_or(FeedbackError::MissingUser)?;
        let verdict = if liked { "liked" } else { "disliked" };
        let base = self.storage_url.as_str().trim_end_matches('/');

        let object_url = format!("{base}/object/{user_id}/{content_hash}/{verdict}.txt");
        self.send(
            self.http
                .post(object_url)
                .header(reqwest::header::CONTENT_TYPE, "text/plain")
                .body(verdict.to_string()),
            session,
        )
        .await?;

        let record_url = format!("{base}/feedback");
        self.send(
            self.http.post(record_url).json(&serde_json::json!({
                "id": format!("{user_id}_{content_hash}"),
                "feedback": verdict,
            })),
            session,
        )
        .await
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        session: &SessionContext,
    ) -> Result<(), FeedbackError> {
        let request = match &session.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request
            .send()
            .await
            .map_err(|err| FeedbackError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedbackError::Status(status.as_u16()));
        }
        Ok(())
    }
}
