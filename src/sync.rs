use crate::api::error::api_error;
use crate::api::Provider;
use crate::library::Library;
use crate::models::{
    FieldValue, SyncOptions, SyncReport, ALBUM_POPULARITY_FIELD, TRACK_POPULARITY_FIELD,
    UPDATED_FIELD,
};
use crate::retry::RetryPolicy;
use anyhow::{Context, Error, Result};
use chrono::Utc;
use tracing::{debug, info, warn};

/// What to do with one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision<'a> {
    NoId,
    AlreadySet,
    Fetch(&'a str),
}

fn decide(tidal_id: Option<&str>, popularity: Option<i64>, force: bool) -> Decision<'_> {
    match (tidal_id, popularity) {
        (None, _) => Decision::NoId,
        (Some(_), Some(_)) if !force => Decision::AlreadySet,
        (Some(id), _) => Decision::Fetch(id),
    }
}

/// Authenticates with the provider on the first lookup of a run, so a run
/// with nothing to fetch never touches the network.
struct Remote<'p> {
    provider: &'p dyn Provider,
    retry: RetryPolicy,
    ready: bool,
}

impl<'p> Remote<'p> {
    async fn ready(&mut self) -> Result<()> {
        if !self.ready {
            let provider = self.provider;
            self.retry
                .run("authenticate", || provider.authenticate())
                .await
                .with_context(|| format!("authenticating with {}", provider.name()))?;
            self.ready = true;
        }
        Ok(())
    }
}

/// Errors that will hit every remaining record end the run.
fn abort_on_fatal(e: Error, what: &str) -> Result<Error> {
    if api_error(&e).map(|a| a.is_fatal()).unwrap_or(false) {
        return Err(e.context(format!("aborting tidalsync at {}", what)));
    }
    Ok(e)
}

fn now_fields(field: &'static str, popularity: i64) -> [(&'static str, FieldValue); 2] {
    let now = Utc::now().timestamp_millis() as f64 / 1000.0;
    [
        (field, FieldValue::Integer(popularity)),
        (UPDATED_FIELD, FieldValue::Real(now)),
    ]
}

/// Fetch track popularity for every track that carries a Tidal id and store
/// it on the track, then optionally do the same for albums.
///
/// Records are processed one at a time in library order. A lookup that
/// still fails after the retry policy is exhausted, or that the catalogue
/// refuses outright, is counted and skipped. Failing authentication and
/// failing library writes abort the run.
pub async fn sync_popularity<L>(
    library: &mut L,
    provider: &dyn Provider,
    opts: SyncOptions,
    retry: RetryPolicy,
) -> Result<SyncReport>
where
    L: Library + ?Sized,
{
    let mut remote = Remote {
        provider,
        retry,
        ready: false,
    };
    let mut report = sync_tracks(library, &mut remote, opts.force).await?;
    if opts.albums {
        report.merge(sync_albums(library, &mut remote, opts.force).await?);
    }
    info!("tidalsync finished: {}", report);
    Ok(report)
}

async fn sync_tracks<L>(
    library: &mut L,
    remote: &mut Remote<'_>,
    force: bool,
) -> Result<SyncReport>
where
    L: Library + ?Sized,
{
    let provider = remote.provider;
    let retry = remote.retry;
    let tracks = library.tracks().context("listing library tracks")?;
    info!("Checking {} tracks for {} popularity", tracks.len(), provider.name());
    let mut report = SyncReport::default();

    for track in tracks {
        report.examined += 1;
        let tidal_id = match decide(track.tidal_id.as_deref(), track.popularity, force) {
            Decision::NoId => {
                debug!("No tidal id for track {} ({}), skipping", track.id, track.title);
                report.skipped_no_id += 1;
                continue;
            }
            Decision::AlreadySet => {
                debug!("Popularity already set for track {} ({}), skipping", track.id, track.title);
                report.skipped_existing += 1;
                continue;
            }
            Decision::Fetch(id) => id,
        };
        remote.ready().await?;

        let label = format!("track {}", tidal_id);
        let fetched = retry
            .run(&label, || provider.track_popularity(tidal_id))
            .await;
        match fetched {
            Ok(Some(popularity)) => {
                library
                    .set_item_fields(track.id, &now_fields(TRACK_POPULARITY_FIELD, popularity))
                    .with_context(|| format!("storing popularity for track {}", track.id))?;
                info!(
                    "{} - {}: popularity {} (was {:?})",
                    track.artist, track.title, popularity, track.popularity
                );
                report.updated += 1;
            }
            Ok(None) => {
                info!("No popularity for tidal track {} ({})", tidal_id, track.title);
                report.not_found += 1;
            }
            Err(e) => {
                let e = abort_on_fatal(e, &label)?;
                warn!("Giving up on tidal track {} ({}): {}", tidal_id, track.title, e);
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

async fn sync_albums<L>(
    library: &mut L,
    remote: &mut Remote<'_>,
    force: bool,
) -> Result<SyncReport>
where
    L: Library + ?Sized,
{
    let provider = remote.provider;
    let retry = remote.retry;
    let albums = library.albums().context("listing library albums")?;
    info!("Checking {} albums for {} popularity", albums.len(), provider.name());
    let mut report = SyncReport::default();

    for album in albums {
        report.examined += 1;
        let tidal_id = match decide(album.tidal_id.as_deref(), album.popularity, force) {
            Decision::NoId => {
                report.skipped_no_id += 1;
                continue;
            }
            Decision::AlreadySet => {
                report.skipped_existing += 1;
                continue;
            }
            Decision::Fetch(id) => id,
        };
        remote.ready().await?;

        let label = format!("album {}", tidal_id);
        match retry
            .run(&label, || provider.album_popularity(tidal_id))
            .await
        {
            Ok(Some(popularity)) => {
                library
                    .set_album_fields(album.id, &now_fields(ALBUM_POPULARITY_FIELD, popularity))
                    .with_context(|| format!("storing popularity for album {}", album.id))?;
                info!("{} - {}: album popularity {}", album.albumartist, album.album, popularity);
                report.updated += 1;
            }
            Ok(None) => {
                info!("No popularity for tidal album {} ({})", tidal_id, album.album);
                report.not_found += 1;
            }
            Err(e) => {
                let e = abort_on_fatal(e, &label)?;
                warn!("Giving up on tidal album {} ({}): {}", tidal_id, album.album, e);
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decide_respects_force_and_missing_ids() {
        assert_eq!(decide(None, None, true), Decision::NoId);
        assert_eq!(decide(None, Some(10), false), Decision::NoId);
        assert_eq!(decide(Some("1"), Some(10), false), Decision::AlreadySet);
        assert_eq!(decide(Some("1"), Some(10), true), Decision::Fetch("1"));
        assert_eq!(decide(Some("2"), None, false), Decision::Fetch("2"));
    }
}
