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

use crate::models::{Track, TrackRecord};
use log::debug;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_FILE_NAME: &str = "yandex_likes.json";
pub const EXPORT_EXTENSION: &str = "json";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Error saving file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Error reading file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid export file {}: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A named group of file extensions offered by a save dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFilter {
    pub name: String,
    pub extensions: Vec<String>,
}

impl FileFilter {
    pub fn json() -> Self {
        Self {
            name: "JSON files".to_string(),
            extensions: vec![EXPORT_EXTENSION.to_string()],
        }
    }
}

/// Asks the user where to save the export. `None` means the user cancelled.
pub trait SavePathPrompt {
    fn prompt_for_save_path(&self, default_name: &str, filter: &FileFilter) -> Option<PathBuf>;
}

/// Non-interactive prompt that always answers with the same path.
#[derive(Debug, Clone)]
pub struct FixedPath(pub PathBuf);

impl SavePathPrompt for FixedPath {
    fn prompt_for_save_path(&self, _default_name: &str, _filter: &FileFilter) -> Option<PathBuf> {
        Some(self.0.clone())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    Saved { path: PathBuf, count: usize },
    Cancelled,
}

/// Maps resolved tracks to export records, oldest like first.
///
/// The service lists likes newest first, so the sequence is reversed.
pub fn to_export_records(tracks: &[Track]) -> Vec<TrackRecord> {
    tracks.iter().rev().map(TrackRecord::from).collect()
}

/// Appends the `.json` extension when the chosen path has none.
pub fn with_default_extension(path: PathBuf) -> PathBuf {
    if path.extension().is_some() {
        path
    } else {
        path.with_extension(EXPORT_EXTENSION)
    }
}

/// Writes `records` as a pretty-printed JSON array (2-space indent, UTF-8).
pub fn write_export(path: &Path, records: &[TrackRecord]) -> Result<(), ExportError> {
    let to_err = |source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(to_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records)
        .map_err(|e| to_err(std::io::Error::from(e)))?;
    writer.write_all(b"\n").map_err(to_err)?;
    writer.flush().map_err(to_err)?;

    debug!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

pub fn read_export(path: &Path) -> Result<Vec<TrackRecord>, ExportError> {
    let file = File::open(path).map_err(|source| ExportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ExportError::Format {
        path: path.to_path_buf(),
        source,
    })
}

/// Prompts for a destination and writes the export there.
///
/// A cancelled prompt leaves the filesystem untouched.
pub fn export_with_prompt<P>(records: &[TrackRecord], prompt: &P) -> Result<ExportOutcome, ExportError>
where
    P: SavePathPrompt + ?Sized,
{
    let Some(path) = prompt.prompt_for_save_path(DEFAULT_FILE_NAME, &FileFilter::json()) else {
        return Ok(ExportOutcome::Cancelled);
    };

    let path = with_default_extension(path);
    write_export(&path, records)?;

    Ok(ExportOutcome::Saved {
        path,
        count: records.len(),
    })
}
