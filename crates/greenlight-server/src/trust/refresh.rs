//! Refresh cycles: rebuild snapshots wholesale from the authority feeds
//!
//! A cycle either completes and publishes, or fails and leaves the
//! previously-published snapshots serving traffic. Partial state is never
//! published. The background task runs cycles strictly sequentially, so a
//! slow cycle delays the next one instead of overlapping it.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use greenlight_core::{SignerCertificate, TrustSnapshot};

use crate::policy::{ConfigError, PolicySnapshot};
use crate::trust::store::TrustContext;
use crate::trust::sync::{AuthorityFeed, FeedPage, SyncError};

/// A refresh cycle failure; the previous snapshots stay in service
#[derive(Error, Debug)]
pub enum RefreshError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Fetch the valid key-id list and paginate the certificate feed into a
/// new [`TrustSnapshot`].
///
/// Certificates whose key id is not currently valid are dropped at
/// ingestion; they never enter the snapshot. Any feed error aborts the
/// whole cycle and discards the partial candidate list.
pub async fn refresh_trust(feed: &dyn AuthorityFeed) -> Result<TrustSnapshot, SyncError> {
    let kids = feed.valid_kids().await?;
    let valid_kids: HashSet<String> = kids.into_iter().collect();
    info!(valid_kids = valid_kids.len(), "fetched valid key ids");

    let mut certificates = Vec::new();
    let mut downloaded = 0usize;
    let mut cursor = String::new();

    loop {
        match feed.next_certificate(&cursor).await? {
            FeedPage::Done => break,
            FeedPage::Certificate {
                kid,
                body,
                next_cursor,
            } => {
                downloaded += 1;
                if valid_kids.contains(&kid) {
                    certificates.push(SignerCertificate::from_feed(kid, &body));
                }
                cursor = next_cursor;
            }
        }
    }

    info!(
        downloaded,
        added = certificates.len(),
        "certificate download complete"
    );

    Ok(TrustSnapshot::new(valid_kids, certificates))
}

/// Fetch the settings table wholesale and derive the revocation set.
pub async fn refresh_policy(feed: &dyn AuthorityFeed) -> Result<PolicySnapshot, RefreshError> {
    let entries = feed.settings().await?;
    Ok(PolicySnapshot::from_settings(entries)?)
}

/// Run one full refresh cycle and publish both snapshots on success.
pub async fn refresh_all(
    context: &TrustContext,
    feed: &dyn AuthorityFeed,
) -> Result<(), RefreshError> {
    let trust = refresh_trust(feed).await?;
    let policy = refresh_policy(feed).await?;

    context.publish_trust(trust);
    context.publish_policy(policy);
    Ok(())
}

/// Spawn the periodic background refresh task.
///
/// Cycles are single-flight by construction: the loop awaits each cycle
/// before selecting the next tick. A failed cycle is logged and the
/// previous snapshots keep serving; it is never surfaced to request
/// traffic. The task stops when `shutdown` fires.
pub fn spawn_refresh_task(
    context: Arc<TrustContext>,
    feed: Arc<dyn AuthorityFeed>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; the initial synchronization
        // already ran before the server started serving.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    info!("starting scheduled trust refresh");
                    if let Err(err) = refresh_all(&context, feed.as_ref()).await {
                        warn!(
                            error = %err,
                            "scheduled refresh failed; previous snapshots stay in service"
                        );
                    }
                }
                _ = shutdown.changed() => {
                    info!("refresh task shutting down");
                    break;
                }
            }
        }
    })
}
