//! Archival sweep.
//!
//! Listings disappear from the public marketplace when they sell or expire;
//! their rows here must follow. The sweep probes each active krisha-bearing
//! row's public page and soft-archives the ones that are gone. Probing is
//! behind the `ListingProbe` trait so the sweep itself stays testable.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::Semaphore;

use crate::db::repos::{ArchiveCandidate, DbError, ParsedPropertyRepo};

/// Default cap on rows per sweep.
const DEFAULT_SWEEP_LIMIT: i64 = 500;

/// What the probe saw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Alive,
    Gone,
    /// Transport failure or an unexpected status; skipped, retried next sweep
    Indeterminate,
}

/// Map an HTTP status to a liveness verdict. 404/410 mean the listing page
/// no longer exists; anything that is neither OK nor gone is left alone.
pub fn classify_status(status: u16) -> Liveness {
    match status {
        200 => Liveness::Alive,
        404 | 410 => Liveness::Gone,
        _ => Liveness::Indeterminate,
    }
}

/// Checks whether a listing's public page still exists.
#[async_trait]
pub trait ListingProbe: Send + Sync {
    async fn probe(&self, krisha_id: &str) -> Liveness;
}

/// HTTP probe with bounded concurrency.
pub struct HttpProbe {
    client: reqwest::Client,
    url_template: String,
    permits: Semaphore,
}

impl HttpProbe {
    /// `url_template` has `{krisha_id}` substituted per probe.
    pub fn new(
        url_template: String,
        concurrency: usize,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            url_template,
            permits: Semaphore::new(concurrency.max(1)),
        })
    }
}

#[async_trait]
impl ListingProbe for HttpProbe {
    async fn probe(&self, krisha_id: &str) -> Liveness {
        let url = self.url_template.replace("{krisha_id}", krisha_id);
        // Semaphore is never closed, acquire cannot fail
        let _permit = self.permits.acquire().await.expect("probe semaphore closed");

        match self.client.get(&url).send().await {
            Ok(response) => classify_status(response.status().as_u16()),
            Err(e) => {
                tracing::warn!(krisha_id, error = %e, "listing probe failed");
                Liveness::Indeterminate
            }
        }
    }
}

/// Counters for one sweep
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ArchiveStats {
    pub checked: u64,
    pub archived: u64,
}

/// The sweep
pub struct ArchiveSweep {
    pool: PgPool,
    probe: Arc<dyn ListingProbe>,
    limit: i64,
}

impl ArchiveSweep {
    pub fn new(pool: PgPool, probe: Arc<dyn ListingProbe>) -> Self {
        Self {
            pool,
            probe,
            limit: DEFAULT_SWEEP_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit.max(1);
        self
    }

    /// One sweep: probe candidates concurrently, archive the gone ones.
    pub async fn run_once(&self) -> Result<ArchiveStats, DbError> {
        let repo = ParsedPropertyRepo::new(&self.pool);
        let candidates = repo.archive_candidates(self.limit).await?;
        if candidates.is_empty() {
            return Ok(ArchiveStats::default());
        }

        let verdicts = futures::future::join_all(candidates.iter().map(|c| async move {
            let liveness = self.probe.probe(&c.krisha_id).await;
            (c, liveness)
        }))
        .await;

        let mut stats = ArchiveStats {
            checked: verdicts.len() as u64,
            archived: 0,
        };

        for (candidate, liveness) in verdicts {
            match liveness {
                Liveness::Gone => {
                    repo.mark_archived(candidate.vitrina_id).await?;
                    stats.archived += 1;
                }
                Liveness::Alive => {}
                Liveness::Indeterminate => {
                    tracing::info!(
                        krisha_id = %candidate.krisha_id,
                        "listing state indeterminate, skipping"
                    );
                }
            }
        }

        tracing::info!(
            checked = stats.checked,
            archived = stats.archived,
            "archival sweep complete"
        );
        Ok(stats)
    }
}

/// Probe with canned verdicts, for tests and dry runs.
pub struct StaticProbe {
    gone: Vec<String>,
}

impl StaticProbe {
    pub fn gone(ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            gone: ids.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl ListingProbe for StaticProbe {
    async fn probe(&self, krisha_id: &str) -> Liveness {
        if self.gone.iter().any(|id| id == krisha_id) {
            Liveness::Gone
        } else {
            Liveness::Alive
        }
    }
}
