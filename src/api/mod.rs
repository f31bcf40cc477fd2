//! Backend client for the search and liked-songs REST API.
//!
//! - [`BackendClient`]: the seam the controller talks through
//! - [`HttpBackend`]: the reqwest implementation against a live server

pub mod http;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{HealthStatus, LikedUpdate, Track};

pub use http::HttpBackend;

/// Request/response operations the player needs from the backend.
///
/// Any failed or malformed response is an error; callers treat errors as
/// "no change".
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Search tracks by free-text query.
    async fn search(&self, query: &str) -> Result<Vec<Track>>;

    /// Current liked list.
    async fn liked(&self) -> Result<Vec<Track>>;

    /// Add a track to the liked list.
    async fn add_liked(&self, track: &Track) -> Result<LikedUpdate>;

    /// Remove a track from the liked list by identity key.
    async fn remove_liked(&self, key: &str) -> Result<LikedUpdate>;

    /// Look up a single track by backend id.
    async fn track(&self, id: &str) -> Result<Track>;

    /// Whether the backend holds `id` in its liked list.
    async fn is_liked(&self, id: &str) -> Result<bool>;

    /// Backend liveness check.
    async fn health(&self) -> Result<HealthStatus>;
}
