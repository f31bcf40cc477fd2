//! HTTP implementation of [`BackendClient`].
//!
//! Talks to the player backend (by default `http://localhost:5000/api`).

use async_trait::async_trait;
use reqwest::{Client, Method, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error};

use super::BackendClient;
use crate::config::PlayerConfig;
use crate::error::{PlayerError, Result};
use crate::models::responses::ErrorBody;
use crate::models::{
    HealthStatus, LikeRequest, LikedCheck, LikedUpdate, Track, TrackListResponse,
};

/// Backend API client over HTTP.
///
/// # Example
///
/// ```rust,no_run
/// use playdeck::{BackendClient, HttpBackend, PlayerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let api = HttpBackend::new(PlayerConfig::default())?;
///     for track in api.search("lofi beats").await? {
///         println!("{}", track.display());
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    config: PlayerConfig,
}

impl HttpBackend {
    /// Create a backend client for `config.base_url`.
    pub fn new(config: PlayerConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("playdeck/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    /// Streaming URL for a backend track id.
    pub fn stream_url(&self, id: &str) -> String {
        self.config.stream_url(id)
    }

    fn api_url(&self, segments: &[&str]) -> Url {
        let mut full = Vec::with_capacity(segments.len() + 1);
        full.push("api");
        full.extend_from_slice(segments);
        self.config.endpoint(&full)
    }

    /// Send a request and decode a JSON body.
    async fn request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<T> {
        debug!("{} {}", method, url);
        let mut request = self.client.request(method, url);
        if let Some(b) = body {
            request = request.json(b);
        }
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        self.request::<T, ()>(Method::GET, url, None).await
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|body| body.error)
                .unwrap_or(text);
            error!("Backend error {}: {}", status.as_u16(), message);
            return Err(PlayerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }

    fn tracks_or_malformed(response: TrackListResponse, what: &str) -> Result<Vec<Track>> {
        response
            .tracks
            .ok_or_else(|| PlayerError::MalformedResponse(format!("{} without tracks", what)))
    }
}

#[async_trait]
impl BackendClient for HttpBackend {
    async fn search(&self, query: &str) -> Result<Vec<Track>> {
        let mut url = self.api_url(&["search"]);
        url.query_pairs_mut().append_pair("q", query);
        let response: TrackListResponse = self.get(url).await?;
        Self::tracks_or_malformed(response, "search response")
    }

    async fn liked(&self) -> Result<Vec<Track>> {
        let response: TrackListResponse = self.get(self.api_url(&["liked"])).await?;
        Self::tracks_or_malformed(response, "liked response")
    }

    async fn add_liked(&self, track: &Track) -> Result<LikedUpdate> {
        let body = LikeRequest { track };
        self.request(Method::POST, self.api_url(&["liked"]), Some(&body))
            .await
    }

    async fn remove_liked(&self, key: &str) -> Result<LikedUpdate> {
        self.request::<_, ()>(Method::DELETE, self.api_url(&["liked", key]), None)
            .await
    }

    async fn track(&self, id: &str) -> Result<Track> {
        self.get(self.api_url(&["track", id])).await
    }

    async fn is_liked(&self, id: &str) -> Result<bool> {
        let check: LikedCheck = self.get(self.api_url(&["liked", id])).await?;
        Ok(check.liked)
    }

    async fn health(&self) -> Result<HealthStatus> {
        self.get(self.api_url(&["test"])).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_generation() {
        let api = HttpBackend::new(PlayerConfig::default()).unwrap();
        assert_eq!(
            api.api_url(&["liked", "abc"]).as_str(),
            "http://localhost:5000/api/liked/abc"
        );
        assert_eq!(
            api.stream_url("abc"),
            "http://localhost:5000/api/stream/abc"
        );
    }

    #[test]
    fn test_search_query_is_encoded() {
        let api = HttpBackend::new(PlayerConfig::default()).unwrap();
        let mut url = api.api_url(&["search"]);
        url.query_pairs_mut().append_pair("q", "miles davis & co");
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/api/search?q=miles+davis+%26+co"
        );
    }

    #[test]
    fn test_missing_tracks_is_malformed() {
        let err = HttpBackend::tracks_or_malformed(TrackListResponse::default(), "search response")
            .unwrap_err();
        assert!(matches!(err, PlayerError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_request_error() {
        let config = PlayerConfig::with_base_url("http://127.0.0.1:9").unwrap();
        let api = HttpBackend::new(config).unwrap();
        let err = api.liked().await.unwrap_err();
        assert!(matches!(err, PlayerError::Request(_)));
    }
}
