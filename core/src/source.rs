use crate::models::{Track, TrackRef};
use async_trait::async_trait;
use std::error::Error as StdError;

/// A remote account that can list liked tracks and resolve their metadata.
#[async_trait]
pub trait LikesSource: Send + Sync {
    type Error: StdError + Send + Sync + 'static;

    /// Liked tracks in the order the service returns them.
    async fn list_liked_tracks(&self) -> Result<Vec<TrackRef>, Self::Error>;

    async fn resolve_track(&self, track: &TrackRef) -> Result<Track, Self::Error>;
}
