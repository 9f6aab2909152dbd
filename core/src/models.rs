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

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lightweight handle of a liked track, as returned by the likes listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackRef {
    pub id: String,
    pub album_id: Option<String>,
}

impl TrackRef {
    pub fn new(id: impl Into<String>, album_id: Option<String>) -> Self {
        Self {
            id: id.into(),
            album_id,
        }
    }

    /// Key used to resolve the full track (`id:album` when the album is known).
    pub fn resolve_key(&self) -> String {
        match &self.album_id {
            Some(album) if !album.is_empty() => format!("{}:{}", self.id, album),
            _ => self.id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub name: String,
}

/// A fully resolved track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artists: Vec<Artist>,
}

impl Track {
    /// Name of the first listed artist, if any.
    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(|a| a.name.as_str())
    }
}

/// One entry of the export file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub artist: String,
    pub title: String,
}

impl From<&Track> for TrackRecord {
    fn from(track: &Track) -> Self {
        TrackRecord {
            artist: track.primary_artist().unwrap_or_default().to_string(),
            title: track.title.clone(),
        }
    }
}

impl fmt::Display for TrackRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.artist.is_empty() {
            write!(f, "{}", self.title)
        } else {
            write!(f, "{} - {}", self.artist, self.title)
        }
    }
}

/// Outcome of one "save to library" request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveBatchLog {
    pub batch_index: usize,
    pub tracks_count: usize,
    pub track_ids: Vec<String>,
    pub status: String, // "Success" or error message
}

impl SaveBatchLog {
    pub fn is_success(&self) -> bool {
        self.status == "Success"
    }
}

/// Report for importing an export file into the library.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ImportReport {
    pub total_records: usize,
    pub skipped_records: usize,
    pub matched: usize,
    pub not_found: Vec<TrackRecord>,
    pub batch_logs: Vec<SaveBatchLog>,
}

impl ImportReport {
    /// Number of tracks whose save request succeeded.
    pub fn saved_count(&self) -> usize {
        self.batch_logs
            .iter()
            .filter(|log| log.is_success())
            .map(|log| log.tracks_count)
            .sum()
    }
}

/// Report for removing the most recently liked tracks.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RemovalReport {
    pub requested: usize,
    pub removed: usize,
    pub batch_logs: Vec<SaveBatchLog>,
}
