use crate::library::LikedLibrary;
use crate::models::{ImportReport, RemovalReport, SaveBatchLog, TrackRecord};
use log::{debug, info, warn};

/// Maximum number of ids per save/remove request.
pub const LIBRARY_BATCH_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportEvent<'a> {
    Searched {
        current: usize,
        total: usize,
        record: &'a TrackRecord,
        found: bool,
    },
    BatchSaved {
        index: usize,
        count: usize,
        success: bool,
    },
}

async fn save_batch<L>(library: &L, batch_index: usize, ids: Vec<String>) -> SaveBatchLog
where
    L: LikedLibrary + ?Sized,
{
    let status = match library.save_tracks(&ids).await {
        Ok(()) => {
            debug!("Saved {} tracks successfully.", ids.len());
            "Success".to_string()
        }
        Err(e) => {
            warn!("Failed to save {} tracks: {}", ids.len(), e);
            format!("Error: {}", e)
        }
    };

    SaveBatchLog {
        batch_index,
        tracks_count: ids.len(),
        track_ids: ids,
        status,
    }
}

/// Likes every exported record in `library`.
///
/// Records without a title are skipped. A failed search counts as "not
/// found", and a failed save is recorded in its batch log; neither stops the
/// import.
pub async fn import_records<L, F>(
    library: &L,
    records: &[TrackRecord],
    mut on_progress: F,
) -> ImportReport
where
    L: LikedLibrary + ?Sized,
    F: FnMut(ImportEvent<'_>),
{
    let mut report = ImportReport {
        total_records: records.len(),
        ..Default::default()
    };
    let total = records.len();
    let mut pending: Vec<String> = Vec::with_capacity(LIBRARY_BATCH_SIZE);
    let mut searched = 0;

    for record in records {
        if record.title.is_empty() {
            report.skipped_records += 1;
            continue;
        }

        let found = match library.search_track(&record.artist, &record.title).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Search failed for '{}': {}", record, e);
                None
            }
        };

        searched += 1;
        on_progress(ImportEvent::Searched {
            current: searched,
            total,
            record,
            found: found.is_some(),
        });

        let Some(id) = found else {
            report.not_found.push(record.clone());
            continue;
        };

        report.matched += 1;
        pending.push(id);
        if pending.len() == LIBRARY_BATCH_SIZE {
            let index = report.batch_logs.len();
            let log = save_batch(library, index, std::mem::take(&mut pending)).await;
            on_progress(ImportEvent::BatchSaved {
                index,
                count: log.tracks_count,
                success: log.is_success(),
            });
            report.batch_logs.push(log);
        }
    }

    if !pending.is_empty() {
        let index = report.batch_logs.len();
        let log = save_batch(library, index, pending).await;
        on_progress(ImportEvent::BatchSaved {
            index,
            count: log.tracks_count,
            success: log.is_success(),
        });
        report.batch_logs.push(log);
    }

    info!(
        "Import finished: {} matched, {} not found, {} skipped",
        report.matched,
        report.not_found.len(),
        report.skipped_records
    );
    report
}

/// Removes the `count` most recently liked tracks, newest first.
///
/// Stops early when the library runs out of likes. Any error aborts.
pub async fn remove_last<L, F>(
    library: &L,
    count: usize,
    mut on_progress: F,
) -> Result<RemovalReport, L::Error>
where
    L: LikedLibrary + ?Sized,
    F: FnMut(usize, usize),
{
    let mut report = RemovalReport {
        requested: count,
        ..Default::default()
    };
    let mut remaining = count;

    while remaining > 0 {
        let batch = remaining.min(LIBRARY_BATCH_SIZE);
        let mut ids = library.recent_liked(batch).await?;
        ids.truncate(batch);

        if ids.is_empty() {
            info!("No tracks to remove");
            break;
        }

        library.remove_tracks(&ids).await?;

        report.removed += ids.len();
        remaining -= ids.len();
        report.batch_logs.push(SaveBatchLog {
            batch_index: report.batch_logs.len(),
            tracks_count: ids.len(),
            track_ids: ids,
            status: "Success".to_string(),
        });
        on_progress(report.removed, count);
    }

    Ok(report)
}
