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

use log::debug;
use rspotify::{prelude::*, scopes, AuthCodeSpotify, Config, Credentials, OAuth};
use std::path::Path;
use thiserror::Error;

/// File name of the Spotify token cache inside the config directory.
pub const TOKEN_CACHE_FILE: &str = ".spotify_token_cache.json";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Failed to initialize Spotify client: {0}")]
    ClientConfig(String),
    #[error("Spotify authentication failed: {0}")]
    Spotify(#[from] rspotify::ClientError),
}

/// Initializes and authenticates a Spotify client using the Authorization Code Flow.
///
/// Credentials (`RSPOTIFY_CLIENT_ID`, `RSPOTIFY_CLIENT_SECRET`) and the
/// redirect URI (`RSPOTIFY_REDIRECT_URI`) come from the environment, which
/// includes the `.env` in the config directory once it has been loaded.
/// The token is cached in `cache_dir` and refreshed automatically.
///
/// Without a valid cached token the user is asked (via stdout) to visit a URL
/// to authorize the application.
pub async fn get_spotify_client(cache_dir: &Path) -> Result<AuthCodeSpotify, AuthError> {
    let creds = Credentials::from_env().ok_or_else(|| {
        AuthError::ClientConfig("Missing RSPOTIFY_CLIENT_ID or RSPOTIFY_CLIENT_SECRET".to_string())
    })?;

    // - user-library-read: To list the most recent likes.
    // - user-library-modify: To like imported tracks and remove likes.
    let scopes = scopes!("user-library-read", "user-library-modify");

    let oauth = OAuth::from_env(scopes)
        .ok_or_else(|| AuthError::ClientConfig("Missing RSPOTIFY_REDIRECT_URI".to_string()))?;

    let config = Config {
        token_cached: true,
        token_refreshing: true,
        cache_path: cache_dir.join(TOKEN_CACHE_FILE),
        ..Default::default()
    };
    debug!("Spotify token cache: {}", config.cache_path.display());

    let spotify = AuthCodeSpotify::with_config(creds, oauth, config);

    let url = spotify.get_authorize_url(false)?;

    // Opens the browser (or prints the URL) and waits for the redirect.
    spotify.prompt_for_token(&url).await?;

    Ok(spotify)
}
