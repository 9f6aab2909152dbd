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

mod dialog;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dialog::NativeSaveDialog;
use likes_core::config::{self, CredentialError};
use likes_core::export::{read_export, FixedPath};
use likes_core::sync::{import_records, remove_last, ImportEvent};
use likes_core::{
    export_with_prompt, fetch_in_batches, get_spotify_client, to_export_records, ExportOutcome,
    FetchEvent, ImportReport, LikesSource, SavePathPrompt, SpotifyLibrary, YandexClient,
    DEFAULT_BATCH_SIZE,
};
use log::debug;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "export-likes")]
#[command(about = "Export your Yandex Music likes and like them again on Spotify", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exports liked tracks from Yandex Music to a JSON file.
    Export {
        /// Write to this file instead of asking with a save dialog
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// How many tracks are fetched concurrently
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE, value_parser = parse_batch_size)]
        batch_size: usize,
    },
    /// Likes every track of an exported JSON file in Spotify's 'Liked Songs'
    Import {
        /// The JSON file produced by `export`
        #[arg(value_name = "FILE")]
        path: PathBuf,
        /// Output the detailed import report to a JSON file
        #[arg(long)]
        json: Option<String>,
    },
    /// Removes the most recently liked tracks from Spotify's 'Liked Songs'
    RemoveLast {
        /// How many tracks to remove
        #[arg(value_name = "COUNT")]
        count: usize,
    },
}

fn parse_batch_size(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("batch size must be greater than zero".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let config_dir = match config::default_config_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            process::exit(1);
        }
    };
    debug!("Config directory: {}", config_dir.display());

    // Makes RSPOTIFY_* settings visible to rspotify. The working directory's
    // .env only fills gaps and never supplies the Yandex token.
    let process_token = match config::load_environment(&config_dir, Some(Path::new(".env"))) {
        Ok(token) => token,
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Export { output, batch_size } => {
            handle_export(&config_dir, process_token, output, batch_size).await;
        }
        Commands::Import { path, json } => {
            handle_import(&config_dir, &path, json.as_deref()).await;
        }
        Commands::RemoveLast { count } => {
            handle_remove_last(&config_dir, count).await;
        }
    }
}

async fn handle_export(
    config_dir: &Path,
    process_token: Option<String>,
    output: Option<PathBuf>,
    batch_size: usize,
) {
    let token = match config::load_token(config_dir, process_token) {
        Ok(token) => token,
        Err(CredentialError::MissingCredential { key, path }) => {
            eprintln!("Error: {} not set", key);
            eprintln!("ENV path: {}", path.display());
            process::exit(1);
        }
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            process::exit(1);
        }
    };

    let client = match YandexClient::connect(&token).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error initializing Yandex Music client: {}", e);
            process::exit(1);
        }
    };

    let likes = match client.list_liked_tracks().await {
        Ok(likes) => likes,
        Err(e) => {
            eprintln!("[ERROR] Failed to list liked tracks: {}", e);
            process::exit(1);
        }
    };
    println!("Total liked tracks: {}", likes.len());

    let fetched = fetch_in_batches(&client, &likes, batch_size, |event| match event {
        FetchEvent::BatchStarted { index, .. } => println!("Fetching {} chunk...", index),
        FetchEvent::TrackResolved { title } => println!("Work with track {}", title),
    })
    .await;

    let tracks = match fetched {
        Ok(tracks) => tracks,
        Err(e) => {
            eprintln!();
            eprintln!("[ERROR] Export failed: {}", e);
            process::exit(1);
        }
    };

    let records = to_export_records(&tracks);

    let prompt: Box<dyn SavePathPrompt> = match output {
        Some(path) => Box::new(FixedPath(path)),
        None => Box::new(NativeSaveDialog::new("Save liked tracks as JSON")),
    };
    let outcome = tokio::task::block_in_place(|| export_with_prompt(&records, prompt.as_ref()));

    match outcome {
        Ok(ExportOutcome::Saved { path, count }) => {
            println!();
            println!("Parsing likes from Yandex Music has been completed.");
            println!("[SAVED] Saved {} tracks into {}", count, path.display());
        }
        Ok(ExportOutcome::Cancelled) => {
            println!("Save cancelled.");
        }
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            process::exit(1);
        }
    }
}

async fn get_library(config_dir: &Path) -> SpotifyLibrary {
    let spotify = match get_spotify_client(config_dir).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error initializing Spotify client: {}", e);
            process::exit(1);
        }
    };
    SpotifyLibrary::new(spotify)
}

fn write_report(path: &str, report: &ImportReport) -> anyhow::Result<()> {
    let json_content = serde_json::to_string_pretty(report)?;
    let mut file = File::create(path).with_context(|| format!("Failed to create file '{}'", path))?;
    file.write_all(json_content.as_bytes())
        .with_context(|| format!("Failed to write report to '{}'", path))?;
    Ok(())
}

async fn handle_import(config_dir: &Path, path: &Path, json_path: Option<&str>) {
    let records = match read_export(path) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            process::exit(1);
        }
    };
    println!("Loaded {} tracks from {}", records.len(), path.display());

    let library = get_library(config_dir).await;
    println!("Liking tracks in Spotify...");

    let report = import_records(&library, &records, |event| match event {
        ImportEvent::Searched {
            current,
            total,
            record,
            found,
        } => {
            let mark = if found { "+" } else { "?" };
            println!("[{}/{}] {} {}", current, total, mark, record);
        }
        ImportEvent::BatchSaved {
            index,
            count,
            success,
        } => {
            if success {
                println!("Saved batch {} ({} tracks)", index + 1, count);
            } else {
                eprintln!("[ERROR] Failed to save batch {} ({} tracks)", index + 1, count);
            }
        }
    })
    .await;

    println!();
    println!("---------------------------------------------------");
    println!("IMPORT COMPLETE");
    println!("---------------------------------------------------");
    println!("Records in File:     {}", report.total_records);
    println!("Skipped (no title):  {}", report.skipped_records);
    println!("Matched on Spotify:  {}", report.matched);
    println!("Saved to Library:    {}", report.saved_count());
    println!("Not Found:           {}", report.not_found.len());
    println!("---------------------------------------------------");

    if !report.not_found.is_empty() {
        println!();
        println!("Tracks not found on Spotify:");
        for (i, record) in report.not_found.iter().enumerate() {
            println!("{}. {}", i + 1, record);
        }
    }

    if let Some(path) = json_path {
        match write_report(path, &report) {
            Ok(()) => {
                println!();
                println!("[SAVED] Detailed report saved to: {}", path);
            }
            Err(e) => {
                eprintln!();
                eprintln!("[ERROR] {:#}", e);
            }
        }
    }
}

async fn handle_remove_last(config_dir: &Path, count: usize) {
    let library = get_library(config_dir).await;
    println!("Removing {} most recent tracks from Liked Songs...", count);

    match remove_last(&library, count, |done, total| {
        println!("Removed: {}/{}", done, total)
    })
    .await
    {
        Ok(report) => {
            println!();
            if report.removed < report.requested {
                println!(
                    "[OK] Removed {} tracks (library had fewer than {}).",
                    report.removed, report.requested
                );
            } else {
                println!("[OK] Removed {} tracks.", report.removed);
            }
        }
        Err(e) => {
            eprintln!();
            eprintln!("[ERROR] Removal failed: {}", e);
            process::exit(1);
        }
    }
}
