//! Background repair of the user/post link and of orphaned attachments.
//!
//! Publish and delete each touch two records without a transaction, and
//! deleting a post never cascades into the blob store. This job periodically
//! recomputes each user's reference set from the posts that actually exist,
//! then sweeps blob objects no live post references. Objects younger than
//! the grace window are spared; an in-flight upload is not an orphan yet.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::blob::BlobStore;
use crate::db::{posts, users};
use crate::error::Result;

/// Outcome of one reference-repair pass
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub users_repaired: usize,
    pub refs_added: usize,
    pub refs_dropped: usize,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.users_repaired == 0
    }
}

/// Recompute every user's reference set from the posts they own
///
/// Re-attaches orphaned posts (rows missing from their owner's set) and
/// drops dangling references (set entries whose row is gone).
pub async fn reconcile_references(pool: &SqlitePool) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();

    for user_id in users::list_user_ids(pool).await? {
        let Some(user) = users::find_by_id(pool, user_id).await? else {
            continue;
        };

        let owned: Vec<Uuid> = posts::find_by_owner(pool, user_id)
            .await?
            .iter()
            .map(|p| p.id)
            .collect();
        let owned_set: HashSet<Uuid> = owned.iter().copied().collect();
        let stored: HashSet<Uuid> = user.post_ids.0.iter().copied().collect();

        if stored == owned_set {
            continue;
        }

        report.users_repaired += 1;
        report.refs_added += owned_set.difference(&stored).count();
        report.refs_dropped += stored.difference(&owned_set).count();
        users::update_post_refs(pool, user_id, &owned).await?;
    }

    Ok(report)
}

/// Delete blob objects no live post references, once older than `grace`
///
/// Returns how many objects were removed. Objects whose names don't carry a
/// parsable creation time are left alone.
pub async fn sweep_blobs(pool: &SqlitePool, blobs: &BlobStore, grace: Duration) -> Result<usize> {
    let live: HashSet<String> = posts::list_image_names(pool).await?.into_iter().collect();
    let cutoff = Utc::now().timestamp_millis() - grace.as_millis() as i64;

    let mut removed = 0;
    for name in blobs.list().await? {
        if live.contains(&name) {
            continue;
        }
        let Some(created) = name.split('-').next().and_then(|s| s.parse::<i64>().ok()) else {
            continue;
        };
        if created > cutoff {
            continue;
        }

        blobs.delete(&name).await?;
        removed += 1;
    }

    Ok(removed)
}

/// Interval loop started from `main`
pub async fn run_reconciler(
    pool: SqlitePool,
    blobs: BlobStore,
    interval: Duration,
    grace: Duration,
) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        grace_secs = grace.as_secs(),
        "starting reconciliation job"
    );

    loop {
        tokio::time::sleep(interval).await;

        match reconcile_references(&pool).await {
            Ok(report) if !report.is_clean() => {
                tracing::info!(
                    users = report.users_repaired,
                    added = report.refs_added,
                    dropped = report.refs_dropped,
                    "repaired post references"
                );
            }
            Ok(_) => tracing::debug!("post references consistent"),
            Err(e) => tracing::error!(error = %e, "reference reconciliation failed"),
        }

        match sweep_blobs(&pool, &blobs, grace).await {
            Ok(0) => tracing::debug!("no orphaned attachments"),
            Ok(n) => tracing::info!(removed = n, "swept orphaned attachments"),
            Err(e) => tracing::error!(error = %e, "attachment sweep failed"),
        }
    }
}
