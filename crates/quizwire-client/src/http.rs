//! HTTP implementation of [`ResultFetcher`].

use async_trait::async_trait;
use quizwire_proto::payloads::PlayerResult;

use crate::{error::FetchError, result_cache::ResultFetcher};

/// Path of the results endpoint, relative to the API base.
const RESULTS_PATH: &str = "/v1/api/quiz/multiplayer/room/results";

/// Fetches finished-room results from the REST API.
#[derive(Debug, Clone)]
pub struct HttpResultFetcher {
    client: reqwest::Client,
    base_url: String,
    credential: String,
}

impl HttpResultFetcher {
    /// Fetcher for the API at `base_url`, authenticating with `credential`.
    pub fn new(base_url: impl Into<String>, credential: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client: reqwest::Client::new(), base_url, credential: credential.into() }
    }

    /// URL requested for `room_code`.
    pub fn url_for(&self, room_code: &str) -> String {
        format!("{}{RESULTS_PATH}/{room_code}", self.base_url)
    }
}

#[async_trait]
impl ResultFetcher for HttpResultFetcher {
    async fn fetch(&self, room_code: &str) -> Result<Vec<PlayerResult>, FetchError> {
        let resp = self
            .client
            .get(self.url_for(room_code))
            .bearer_auth(&self.credential)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(FetchError::Status { status: resp.status().as_u16() });
        }

        resp.json().await.map_err(|e| FetchError::Decode(e.to_string()))
    }
}
