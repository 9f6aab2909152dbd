/*
    export-likes | Rust CLI tool to export and re-import liked tracks.
    Copyright (C) 2025  Israel Alberto Roldan Vega

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use async_trait::async_trait;
use log::debug;
use rspotify::{
    model::{SearchResult, SearchType, TrackId},
    prelude::*,
    AuthCodeSpotify,
};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Spotify API error: {0}")]
    Spotify(#[from] rspotify::ClientError),
    #[error("Invalid Track ID: {0}")]
    InvalidTrackId(String),
}

/// The "Liked Songs" collection of a streaming account.
///
/// Track ids are plain strings so callers never depend on the client crate.
#[async_trait]
pub trait LikedLibrary: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Best match for `artist` / `title`, if any.
    async fn search_track(&self, artist: &str, title: &str) -> Result<Option<String>, Self::Error>;

    async fn save_tracks(&self, ids: &[String]) -> Result<(), Self::Error>;

    /// Up to `limit` most recently liked track ids, newest first.
    async fn recent_liked(&self, limit: usize) -> Result<Vec<String>, Self::Error>;

    async fn remove_tracks(&self, ids: &[String]) -> Result<(), Self::Error>;
}

/// Search query in Spotify's field syntax. The artist filter is dropped when
/// the artist is unknown.
pub fn search_query(artist: &str, title: &str) -> String {
    if artist.is_empty() {
        format!("track:{}", title)
    } else {
        format!("artist:{} track:{}", artist, title)
    }
}

pub struct SpotifyLibrary {
    spotify: Arc<AuthCodeSpotify>,
}

impl SpotifyLibrary {
    pub fn new(spotify: AuthCodeSpotify) -> Self {
        Self {
            spotify: Arc::new(spotify),
        }
    }

    fn parse_ids(ids: &[String]) -> Result<Vec<TrackId<'static>>, LibraryError> {
        ids.iter()
            .map(|id| {
                TrackId::from_id(id.clone()).map_err(|_| LibraryError::InvalidTrackId(id.clone()))
            })
            .collect()
    }
}

#[async_trait]
impl LikedLibrary for SpotifyLibrary {
    type Error = LibraryError;

    async fn search_track(&self, artist: &str, title: &str) -> Result<Option<String>, LibraryError> {
        let query = search_query(artist, title);
        debug!("Searching Spotify: {}", query);

        let result = self
            .spotify
            .search(&query, SearchType::Track, None, None, Some(1), None)
            .await?;

        let id = match result {
            SearchResult::Tracks(page) => page
                .items
                .into_iter()
                .next()
                .and_then(|track| track.id)
                .map(|id| id.id().to_string()),
            _ => None,
        };
        Ok(id)
    }

    async fn save_tracks(&self, ids: &[String]) -> Result<(), LibraryError> {
        let ids = Self::parse_ids(ids)?;
        self.spotify.current_user_saved_tracks_add(ids).await?;
        Ok(())
    }

    async fn recent_liked(&self, limit: usize) -> Result<Vec<String>, LibraryError> {
        let page = self
            .spotify
            .current_user_saved_tracks_manual(None, Some(limit as u32), Some(0))
            .await?;

        Ok(page
            .items
            .into_iter()
            .filter_map(|saved| saved.track.id)
            .map(|id| id.id().to_string())
            .collect())
    }

    async fn remove_tracks(&self, ids: &[String]) -> Result<(), LibraryError> {
        let ids = Self::parse_ids(ids)?;
        self.spotify.current_user_saved_tracks_delete(ids).await?;
        Ok(())
    }
}
