//! Data models for tracks and backend responses.

pub mod responses;
pub mod track;

pub use responses::{HealthStatus, LikeRequest, LikedCheck, LikedUpdate, TrackListResponse};
pub use track::Track;
