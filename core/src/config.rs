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
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-user application directory.
pub const APP_DIR_NAME: &str = "ExportLikes";
/// Name of the key-value file inside the application directory.
pub const ENV_FILE_NAME: &str = ".env";
/// Key holding the Yandex Music OAuth token.
pub const TOKEN_KEY: &str = "YANDEX_TOKEN";

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("{key} not set (ENV path: {})", .path.display())]
    MissingCredential { key: String, path: PathBuf },
    #[error("Could not determine the home directory")]
    NoHomeDir,
    #[error("Failed to read env file {}: {source}", .path.display())]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

/// Operating system families with a distinct configuration location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Windows,
    MacOs,
    Other,
}

impl OsFamily {
    pub fn current() -> Self {
        Self::from_os_name(env::consts::OS)
    }

    pub fn from_os_name(name: &str) -> Self {
        match name {
            "windows" => OsFamily::Windows,
            "macos" => OsFamily::MacOs,
            _ => OsFamily::Other,
        }
    }
}

/// Resolves the application configuration directory for `os`.
///
/// `local_app_data` is only consulted on Windows; when it is missing the
/// directory falls back to `~/AppData/Local`.
pub fn resolve_config_dir(os: OsFamily, home: &Path, local_app_data: Option<&Path>) -> PathBuf {
    let base = match os {
        OsFamily::Windows => local_app_data
            .map(Path::to_path_buf)
            .unwrap_or_else(|| home.join("AppData").join("Local")),
        OsFamily::MacOs => home.join("Library").join("Application Support"),
        OsFamily::Other => home.join(".config"),
    };
    base.join(APP_DIR_NAME)
}

/// Configuration directory of the current user on the current platform.
pub fn default_config_dir() -> Result<PathBuf, CredentialError> {
    let home = dirs::home_dir().ok_or(CredentialError::NoHomeDir)?;
    let local_app_data = env::var_os("LOCALAPPDATA").map(PathBuf::from);
    Ok(resolve_config_dir(
        OsFamily::current(),
        &home,
        local_app_data.as_deref(),
    ))
}

pub fn env_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(ENV_FILE_NAME)
}

/// Reads `KEY=VALUE` pairs from `path`. A missing file yields an empty map.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>, CredentialError> {
    if !path.exists() {
        debug!("No env file at {}", path.display());
        return Ok(HashMap::new());
    }

    let to_err = |source| CredentialError::EnvFile {
        path: path.to_path_buf(),
        source,
    };

    let mut entries = HashMap::new();
    for item in dotenvy::from_path_iter(path).map_err(to_err)? {
        let (key, value) = item.map_err(to_err)?;
        entries.insert(key, value);
    }
    Ok(entries)
}

/// Loads `path` into the process environment without overriding existing
/// variables. Used so Spotify credentials can live next to the token.
pub fn load_env_file(path: &Path) -> Result<(), CredentialError> {
    if !path.exists() {
        return Ok(());
    }
    dotenvy::from_path(path).map_err(|source| CredentialError::EnvFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Picks the token: the process environment wins over the file, and empty
/// values count as absent.
pub fn select_token(
    from_env: Option<String>,
    file_entries: &HashMap<String, String>,
) -> Option<String> {
    from_env
        .filter(|v| !v.trim().is_empty())
        .or_else(|| file_entries.get(TOKEN_KEY).cloned())
        .filter(|v| !v.trim().is_empty())
}

/// Prepares the process environment and returns the token the process
/// already had.
///
/// `<config_dir>/.env` is loaded first, then `fallback` (the working
/// directory's `.env`), neither overriding existing variables. The returned
/// value is captured before either file is read.
pub fn load_environment(
    config_dir: &Path,
    fallback: Option<&Path>,
) -> Result<Option<String>, CredentialError> {
    let process_token = env::var(TOKEN_KEY).ok();

    load_env_file(&env_file_path(config_dir))?;
    if let Some(path) = fallback {
        load_env_file(path)?;
    }

    Ok(process_token)
}

/// Loads the Yandex token from `<config_dir>/.env`, unless `process_token`
/// (from [`load_environment`]) already holds one.
pub fn load_token(
    config_dir: &Path,
    process_token: Option<String>,
) -> Result<String, CredentialError> {
    let path = env_file_path(config_dir);
    let entries = read_env_file(&path)?;

    select_token(process_token, &entries).ok_or(CredentialError::MissingCredential {
        key: TOKEN_KEY.to_string(),
        path,
    })
}
