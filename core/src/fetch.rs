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

use crate::models::{Track, TrackRef};
use crate::source::LikesSource;
use futures::future::try_join_all;
use log::debug;
use thiserror::Error;

/// Number of tracks resolved concurrently.
pub const DEFAULT_BATCH_SIZE: usize = 50;

#[derive(Error, Debug)]
pub enum FetchError<E: std::error::Error + 'static> {
    #[error("Batch size must be greater than zero")]
    ZeroBatchSize,
    #[error("Failed to resolve batch {batch}: {source}")]
    Resolve {
        batch: usize,
        #[source]
        source: E,
    },
}

/// Progress notifications emitted while fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchEvent<'a> {
    BatchStarted { index: usize, total: usize },
    TrackResolved { title: &'a str },
}

/// Number of batches needed for `len` items.
pub fn batch_count(len: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        return 0;
    }
    len.div_ceil(batch_size)
}

/// Resolves `refs` in consecutive groups of `batch_size`.
///
/// Every group is fetched concurrently and awaited in full before the next
/// one starts, so at most `batch_size` requests are in flight. The result
/// keeps the input order. The first failing resolution aborts the run.
pub async fn fetch_in_batches<S, F>(
    source: &S,
    refs: &[TrackRef],
    batch_size: usize,
    mut on_progress: F,
) -> Result<Vec<Track>, FetchError<S::Error>>
where
    S: LikesSource + ?Sized,
    F: FnMut(FetchEvent<'_>),
{
    if batch_size == 0 {
        return Err(FetchError::ZeroBatchSize);
    }

    let total = batch_count(refs.len(), batch_size);
    let mut tracks = Vec::with_capacity(refs.len());

    for (i, chunk) in refs.chunks(batch_size).enumerate() {
        let index = i + 1;
        on_progress(FetchEvent::BatchStarted { index, total });
        debug!("Resolving batch {}/{} ({} tracks)", index, total, chunk.len());

        let resolved = try_join_all(chunk.iter().map(|r| source.resolve_track(r)))
            .await
            .map_err(|err| FetchError::Resolve {
                batch: index,
                source: err,
            })?;

        for track in &resolved {
            on_progress(FetchEvent::TrackResolved {
                title: &track.title,
            });
        }
        tracks.extend(resolved);
    }

    Ok(tracks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Artist;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, thiserror::Error)]
    #[error("fake failure for {0}")]
    struct FakeError(String);

    /// Resolves every reference to a track titled after its id.
    #[derive(Default)]
    struct FakeSource {
        refs: Vec<TrackRef>,
        fail_on: Option<String>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn with_ids(ids: &[&str]) -> Self {
            Self {
                refs: ids.iter().map(|id| TrackRef::new(*id, None)).collect(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl LikesSource for FakeSource {
        type Error = FakeError;

        async fn list_liked_tracks(&self) -> Result<Vec<TrackRef>, FakeError> {
            Ok(self.refs.clone())
        }

        async fn resolve_track(&self, track: &TrackRef) -> Result<Track, FakeError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.calls.lock().unwrap().push(track.id.clone());

            // Later ids finish first to shake out ordering bugs.
            let delay = 20u64.saturating_sub(track.id.len() as u64 * 2);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_on.as_deref() == Some(track.id.as_str()) {
                return Err(FakeError(track.id.clone()));
            }
            Ok(Track {
                id: track.id.clone(),
                title: format!("t{}", track.id),
                artists: vec![Artist {
                    name: "Artist".to_string(),
                }],
            })
        }
    }

    #[test]
    fn test_batch_count() {
        assert_eq!(batch_count(0, 50), 0);
        assert_eq!(batch_count(1, 50), 1);
        assert_eq!(batch_count(50, 50), 1);
        assert_eq!(batch_count(51, 50), 2);
        assert_eq!(batch_count(3, 2), 2);
        assert_eq!(batch_count(10, 0), 0);
    }

    #[tokio::test]
    async fn test_groups_and_order_are_preserved() {
        let source = FakeSource::with_ids(&["a", "bb", "ccc"]);
        let refs = source.list_liked_tracks().await.unwrap();

        let mut batches = Vec::new();
        let tracks = fetch_in_batches(&source, &refs, 2, |event| {
            if let FetchEvent::BatchStarted { index, total } = event {
                batches.push((index, total));
            }
        })
        .await
        .unwrap();

        assert_eq!(batches, vec![(1, 2), (2, 2)]);
        let ids: Vec<&str> = tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "bb", "ccc"]);
    }

    #[tokio::test]
    async fn test_concurrency_bounded_by_batch_size() {
        let ids: Vec<String> = (0..23).map(|i| i.to_string()).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let source = FakeSource::with_ids(&id_refs);
        let refs = source.list_liked_tracks().await.unwrap();

        let tracks = fetch_in_batches(&source, &refs, 5, |_| {}).await.unwrap();

        assert_eq!(tracks.len(), 23);
        assert!(source.peak.load(Ordering::SeqCst) <= 5);
        let resolved: Vec<String> = tracks.into_iter().map(|t| t.id).collect();
        assert_eq!(resolved, ids);
    }

    #[tokio::test]
    async fn test_reports_each_resolved_title() {
        let source = FakeSource::with_ids(&["1", "2", "3"]);
        let refs = source.list_liked_tracks().await.unwrap();

        let mut titles = Vec::new();
        fetch_in_batches(&source, &refs, DEFAULT_BATCH_SIZE, |event| {
            if let FetchEvent::TrackResolved { title } = event {
                titles.push(title.to_string());
            }
        })
        .await
        .unwrap();

        assert_eq!(titles, vec!["t1", "t2", "t3"]);
    }

    #[tokio::test]
    async fn test_empty_input_yields_no_batches() {
        let source = FakeSource::default();
        let mut events = 0;
        let tracks = fetch_in_batches(&source, &[], 50, |_| events += 1)
            .await
            .unwrap();

        assert!(tracks.is_empty());
        assert_eq!(events, 0);
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_batches() {
        let mut source = FakeSource::with_ids(&["a", "b", "c", "d", "e"]);
        source.fail_on = Some("b".to_string());
        let refs = source.refs.clone();

        let err = fetch_in_batches(&source, &refs, 2, |_| {})
            .await
            .unwrap_err();

        match err {
            FetchError::Resolve { batch, source: e } => {
                assert_eq!(batch, 1);
                assert_eq!(e.0, "b");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let calls = source.calls.lock().unwrap();
        assert!(!calls.contains(&"c".to_string()));
    }

    #[tokio::test]
    async fn test_zero_batch_size_rejected() {
        let source = FakeSource::with_ids(&["a"]);
        let refs = source.refs.clone();
        let err = fetch_in_batches(&source, &refs, 0, |_| {}).await.unwrap_err();
        assert!(matches!(err, FetchError::ZeroBatchSize));
    }
}
