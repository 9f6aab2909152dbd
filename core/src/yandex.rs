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

use crate::models::{Artist, Track, TrackRef};
use crate::source::LikesSource;
use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://api.music.yandex.net";
const CLIENT_HEADER: &str = "x-yandex-music-client";
const CLIENT_NAME: &str = "YandexMusicAndroid/24023621";

#[derive(Error, Debug)]
pub enum YandexError {
    #[error("Yandex Music request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Yandex Music API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Failed to parse Yandex Music response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Token contains characters not allowed in a header")]
    InvalidToken,
    #[error("Token was accepted but no account is attached to it")]
    NotAuthenticated,
    #[error("Track {0} not found")]
    TrackNotFound(String),
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    name: Option<String>,
    message: Option<String>,
}

// Ids come back as strings or numbers depending on the endpoint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(u64),
}

impl From<RawId> for String {
    fn from(id: RawId) -> Self {
        match id {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccountStatus {
    account: Account,
}

#[derive(Debug, Deserialize)]
struct Account {
    uid: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct LikesResult {
    library: Library,
}

#[derive(Debug, Deserialize)]
struct Library {
    #[serde(default)]
    tracks: Vec<TrackShort>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackShort {
    id: RawId,
    #[serde(default)]
    album_id: Option<RawId>,
}

#[derive(Debug, Deserialize)]
struct RemoteTrack {
    id: RawId,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    artists: Vec<RemoteArtist>,
}

#[derive(Debug, Deserialize)]
struct RemoteArtist {
    #[serde(default)]
    name: String,
}

impl From<TrackShort> for TrackRef {
    fn from(short: TrackShort) -> Self {
        TrackRef {
            id: short.id.into(),
            album_id: short.album_id.map(String::from),
        }
    }
}

impl From<RemoteTrack> for Track {
    fn from(remote: RemoteTrack) -> Self {
        Track {
            id: remote.id.into(),
            title: remote.title.unwrap_or_default(),
            artists: remote
                .artists
                .into_iter()
                .map(|a| Artist { name: a.name })
                .collect(),
        }
    }
}

/// Unwraps the `result` envelope, or turns an error status into `YandexError::Api`.
fn decode_body<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, YandexError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ErrorEnvelope>(body)
            .ok()
            .and_then(|e| e.error.message.or(e.error.name))
            .unwrap_or_else(|| body.chars().take(200).collect());
        return Err(YandexError::Api { status, message });
    }

    let envelope: Envelope<T> = serde_json::from_str(body)?;
    Ok(envelope.result)
}

/// Base URL of the API; `YANDEX_API_BASE` overrides it.
pub fn api_base() -> String {
    std::env::var("YANDEX_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string())
}

/// Authenticated Yandex Music session.
pub struct YandexClient {
    http: Client,
    base_url: String,
    uid: u64,
}

impl YandexClient {
    /// Authenticates with `token` against the default API.
    pub async fn connect(token: &str) -> Result<Self, YandexError> {
        Self::connect_with_base(token, &api_base()).await
    }

    pub async fn connect_with_base(token: &str, base_url: &str) -> Result<Self, YandexError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("OAuth {}", token))
            .map_err(|_| YandexError::InvalidToken)?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CLIENT_HEADER, HeaderValue::from_static(CLIENT_NAME));
        headers.insert(USER_AGENT, HeaderValue::from_static("export-likes"));

        let http = Client::builder().default_headers(headers).build()?;
        let mut client = Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            uid: 0,
        };

        let status: AccountStatus = client.get("/account/status").await?;
        client.uid = status.account.uid.ok_or(YandexError::NotAuthenticated)?;
        debug!("Authenticated Yandex Music account uid={}", client.uid);

        Ok(client)
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, YandexError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        let response = self.http.get(&url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        decode_body(status, &body)
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<T, YandexError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);
        let response = self.http.post(&url).form(form).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        decode_body(status, &body)
    }
}

#[async_trait]
impl LikesSource for YandexClient {
    type Error = YandexError;

    async fn list_liked_tracks(&self) -> Result<Vec<TrackRef>, YandexError> {
        let likes: LikesResult = self
            .get(&format!("/users/{}/likes/tracks", self.uid))
            .await?;
        Ok(likes
            .library
            .tracks
            .into_iter()
            .map(TrackRef::from)
            .collect())
    }

    async fn resolve_track(&self, track: &TrackRef) -> Result<Track, YandexError> {
        let key = track.resolve_key();
        let tracks: Vec<RemoteTrack> = self
            .post_form("/tracks", &[("track-ids", key.as_str()), ("with-positions", "true")])
            .await?;

        tracks
            .into_iter()
            .next()
            .map(Track::from)
            .ok_or(YandexError::TrackNotFound(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_likes_library() {
        let body = r#"{
            "invocationInfo": {"req-id": "x"},
            "result": {
                "library": {
                    "uid": 42,
                    "revision": 7,
                    "tracks": [
                        {"id": "101", "albumId": "201", "timestamp": "2024-01-01T00:00:00+00:00"},
                        {"id": 102, "albumId": 202},
                        {"id": "103"}
                    ]
                }
            }
        }"#;

        let likes: LikesResult = decode_body(200, body).unwrap();
        let refs: Vec<TrackRef> = likes.library.tracks.into_iter().map(TrackRef::from).collect();

        assert_eq!(
            refs,
            vec![
                TrackRef::new("101", Some("201".to_string())),
                TrackRef::new("102", Some("202".to_string())),
                TrackRef::new("103", None),
            ]
        );
    }

    #[test]
    fn test_decode_empty_library() {
        let body = r#"{"result": {"library": {"uid": 42}}}"#;
        let likes: LikesResult = decode_body(200, body).unwrap();
        assert!(likes.library.tracks.is_empty());
    }

    #[test]
    fn test_decode_full_track() {
        let body = r#"{
            "result": [{
                "id": "101",
                "title": "Звезда по имени Солнце",
                "artists": [{"id": 1, "name": "Кино"}, {"id": 2, "name": "Guest"}],
                "albums": [{"id": 201}]
            }]
        }"#;

        let tracks: Vec<RemoteTrack> = decode_body(200, body).unwrap();
        let track = Track::from(tracks.into_iter().next().unwrap());

        assert_eq!(track.id, "101");
        assert_eq!(track.title, "Звезда по имени Солнце");
        assert_eq!(track.primary_artist(), Some("Кино"));
        assert_eq!(track.artists.len(), 2);
    }

    #[test]
    fn test_decode_track_without_artists() {
        let body = r#"{"result": [{"id": 5, "title": "Podcast episode"}]}"#;
        let tracks: Vec<RemoteTrack> = decode_body(200, body).unwrap();
        let track = Track::from(tracks.into_iter().next().unwrap());

        assert_eq!(track.id, "5");
        assert!(track.artists.is_empty());
    }

    #[test]
    fn test_decode_account_status() {
        let body = r#"{"result": {"account": {"uid": 123456, "login": "someone"}}}"#;
        let status: AccountStatus = decode_body(200, body).unwrap();
        assert_eq!(status.account.uid, Some(123456));
    }

    #[test]
    fn test_error_status_uses_service_message() {
        let body = r#"{"error": {"name": "session-expired", "message": "Your OAuth token is expired"}}"#;
        let err = decode_body::<AccountStatus>(401, body).unwrap_err();

        match err {
            YandexError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Your OAuth token is expired");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_error_status_with_plain_body() {
        let err = decode_body::<AccountStatus>(502, "Bad Gateway").unwrap_err();
        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("Bad Gateway"));
    }

    #[test]
    fn test_malformed_success_body() {
        let err = decode_body::<AccountStatus>(200, "not json").unwrap_err();
        assert!(matches!(err, YandexError::Decode(_)));
    }

    const ACCOUNT_OK: &str = r#"{"result": {"account": {"uid": 42, "login": "someone"}}}"#;

    async fn mock_account(server: &mut mockito::ServerGuard, body: &str) -> mockito::Mock {
        server
            .mock("GET", "/account/status")
            .match_header("authorization", "OAuth secret-token")
            .match_header(CLIENT_HEADER, CLIENT_NAME)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_connect_lists_and_resolves_for_account_uid() {
        let mut server = mockito::Server::new_async().await;
        let account = mock_account(&mut server, ACCOUNT_OK).await;
        let likes = server
            .mock("GET", "/users/42/likes/tracks")
            .match_header("authorization", "OAuth secret-token")
            .with_status(200)
            .with_body(r#"{"result": {"library": {"uid": 42, "tracks": [{"id": "101", "albumId": "201"}, {"id": 102}]}}}"#)
            .create_async()
            .await;
        let resolve = server
            .mock("POST", "/tracks")
            .match_header("authorization", "OAuth secret-token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("track-ids".into(), "101:201".into()),
                mockito::Matcher::UrlEncoded("with-positions".into(), "true".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"result": [{"id": "101", "title": "Группа крови", "artists": [{"name": "Кино"}]}]}"#)
            .create_async()
            .await;

        let client = YandexClient::connect_with_base("secret-token", &server.url())
            .await
            .unwrap();
        assert_eq!(client.uid(), 42);

        let refs = client.list_liked_tracks().await.unwrap();
        assert_eq!(
            refs,
            vec![
                TrackRef::new("101", Some("201".to_string())),
                TrackRef::new("102", None),
            ]
        );

        let track = client.resolve_track(&refs[0]).await.unwrap();
        assert_eq!(track.title, "Группа крови");
        assert_eq!(track.primary_artist(), Some("Кино"));

        account.assert_async().await;
        likes.assert_async().await;
        resolve.assert_async().await;
    }

    #[tokio::test]
    async fn test_resolve_without_album_sends_bare_id() {
        let mut server = mockito::Server::new_async().await;
        let _account = mock_account(&mut server, ACCOUNT_OK).await;
        let resolve = server
            .mock("POST", "/tracks")
            .match_body(mockito::Matcher::UrlEncoded("track-ids".into(), "102".into()))
            .with_status(200)
            .with_body(r#"{"result": [{"id": 102, "title": "Solo"}]}"#)
            .create_async()
            .await;

        let client = YandexClient::connect_with_base("secret-token", &server.url())
            .await
            .unwrap();
        let track = client.resolve_track(&TrackRef::new("102", None)).await.unwrap();

        assert_eq!(track.id, "102");
        assert!(track.artists.is_empty());
        resolve.assert_async().await;
    }

    #[tokio::test]
    async fn test_account_without_uid_is_not_authenticated() {
        let mut server = mockito::Server::new_async().await;
        let _account = mock_account(&mut server, r#"{"result": {"account": {"uid": null}}}"#).await;

        let result = YandexClient::connect_with_base("secret-token", &server.url()).await;

        assert!(matches!(result, Err(YandexError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_rejected_token_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _account = server
            .mock("GET", "/account/status")
            .with_status(401)
            .with_body(r#"{"error": {"name": "session-expired", "message": "Your OAuth token is expired"}}"#)
            .create_async()
            .await;

        let result = YandexClient::connect_with_base("secret-token", &server.url()).await;

        match result {
            Err(YandexError::Api { status, .. }) => assert_eq!(status, 401),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("connect should fail"),
        }
    }

    #[tokio::test]
    async fn test_empty_resolve_result_is_track_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _account = mock_account(&mut server, ACCOUNT_OK).await;
        let _resolve = server
            .mock("POST", "/tracks")
            .with_status(200)
            .with_body(r#"{"result": []}"#)
            .create_async()
            .await;

        let client = YandexClient::connect_with_base("secret-token", &server.url())
            .await
            .unwrap();
        let err = client
            .resolve_track(&TrackRef::new("999", Some("1".to_string())))
            .await
            .unwrap_err();

        match err {
            YandexError::TrackNotFound(key) => assert_eq!(key, "999:1"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_token_with_newline_is_rejected_before_request() {
        let result = YandexClient::connect_with_base("bad\ntoken", "http://127.0.0.1:9").await;
        assert!(matches!(result, Err(YandexError::InvalidToken)));
    }
}
