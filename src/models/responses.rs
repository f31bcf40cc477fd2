//! Response envelopes returned by the backend.

use serde::{Deserialize, Serialize};

use super::track::Track;

/// `GET /api/search` and `GET /api/liked` body.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TrackListResponse {
    /// Absent when the backend had nothing to return.
    #[serde(default)]
    pub tracks: Option<Vec<Track>>,
}

/// `POST /api/liked` request body.
#[derive(Debug, Serialize)]
pub struct LikeRequest<'a> {
    pub track: &'a Track,
}

/// `POST /api/liked` and `DELETE /api/liked/<id>` body.
///
/// `liked` is the backend's full, authoritative liked list after the change.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct LikedUpdate {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub liked: Vec<Track>,
}

/// `GET /api/liked/<id>` body.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
pub struct LikedCheck {
    #[serde(default)]
    pub liked: bool,
}

/// `GET /api/test` body.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

impl HealthStatus {
    /// Whether the backend reported itself as running.
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Error body the backend sends with 4xx/5xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_liked_update_parses() {
        let json = r#"{"success": true, "liked": [{"id": "a", "title": "A"}]}"#;
        let update: LikedUpdate = serde_json::from_str(json).unwrap();
        assert!(update.success);
        assert_eq!(update.liked.len(), 1);
        assert_eq!(update.liked[0].key(), "a");
    }

    #[test]
    fn test_missing_tracks_is_none() {
        let response: TrackListResponse = serde_json::from_str("{}").unwrap();
        assert!(response.tracks.is_none());
    }

    #[test]
    fn test_like_request_shape() {
        let track = Track::new("a", "A", "Artist");
        let body = serde_json::to_value(LikeRequest { track: &track }).unwrap();
        assert_eq!(body["track"]["id"], "a");
        assert_eq!(body["track"]["title"], "A");
    }
}
