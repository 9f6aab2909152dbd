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

pub mod auth;
pub mod config;
pub mod export;
pub mod fetch;
pub mod library;
pub mod models;
pub mod source;
pub mod sync;
pub mod yandex;

// Re-export key items for convenience
pub use auth::get_spotify_client;
pub use export::{export_with_prompt, to_export_records, ExportOutcome, FileFilter, SavePathPrompt};
pub use fetch::{fetch_in_batches, FetchEvent, DEFAULT_BATCH_SIZE};
pub use library::{LikedLibrary, SpotifyLibrary};
pub use models::{ImportReport, RemovalReport, Track, TrackRecord, TrackRef};
pub use source::LikesSource;
pub use yandex::YandexClient;
