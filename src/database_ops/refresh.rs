//! One refresh batch: fetch both sources, reconcile, write, commit the marker.

use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::artifact::{SummaryArtifact, SUMMARY_TOP_N};
use crate::database_ops::countries::StoreError;
use crate::database_ops::sources::{DataSources, SourceError};
use crate::models::RefreshSummary;
use crate::normalization::reconcile;
use crate::util::db::Db;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Fetching,
    Reconciling,
    Writing,
    MarkerCommitted,
}

impl fmt::Display for RefreshPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Reconciling => "reconciling",
            Self::Writing => "writing",
            Self::MarkerCommitted => "marker_committed",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum RefreshError {
    /// A source failed; nothing was written.
    #[error("External data source unavailable: {0}")]
    Source(#[from] SourceError),
    #[error("refresh failed while {phase}: {source}")]
    Store {
        phase: RefreshPhase,
        #[source]
        source: StoreError,
    },
}

impl RefreshError {
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Source(_))
    }
}

/// Drives refresh batches. Concurrent `run` calls are not serialized here;
/// callers that need one-at-a-time semantics must arrange it themselves.
#[derive(Clone)]
pub struct RefreshService {
    db: Db,
    sources: Arc<dyn DataSources>,
    artifact: Option<SummaryArtifact>,
}

impl RefreshService {
    pub fn new(db: Db, sources: Arc<dyn DataSources>) -> Self {
        Self {
            db,
            sources,
            artifact: None,
        }
    }

    /// Render the summary image after every committed batch.
    pub fn with_artifact(mut self, artifact: SummaryArtifact) -> Self {
        self.artifact = Some(artifact);
        self
    }

    pub async fn run(&self) -> Result<RefreshSummary, RefreshError> {
        let mut rng = StdRng::from_entropy();
        self.run_with_rng(&mut rng).await
    }

    /// Same as [`run`](Self::run) with a caller-supplied source for the GDP multiplier.
    #[instrument(skip_all)]
    pub async fn run_with_rng<R>(&self, rng: &mut R) -> Result<RefreshSummary, RefreshError>
    where
        R: Rng + Send + ?Sized,
    {
        info!(phase = %RefreshPhase::Fetching, "starting country refresh");
        let (countries, rates) = tokio::join!(
            self.sources.fetch_countries(),
            self.sources.fetch_exchange_rates()
        );
        let (countries, rates) = match (countries, rates) {
            (Ok(c), Ok(r)) => (c, r),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, next = %RefreshPhase::Idle, "source fetch failed; refresh aborted");
                return Err(e.into());
            }
        };

        debug!(
            phase = %RefreshPhase::Reconciling,
            countries = countries.len(),
            rates = rates.len(),
            "joining countries to exchange rates"
        );
        let normalized = reconcile(&countries, &rates, rng);

        debug!(phase = %RefreshPhase::Writing, records = normalized.len(), "writing countries");
        let written = self.db.bulk_reconcile(&normalized).await;
        let failed = normalized.len() - written.len();

        let last_refreshed_at = self
            .db
            .commit_refresh_marker()
            .await
            .map_err(|source| RefreshError::Store {
                phase: RefreshPhase::Writing,
                source,
            })?;
        let total_countries = self
            .db
            .country_count()
            .await
            .map_err(|source| RefreshError::Store {
                phase: RefreshPhase::MarkerCommitted,
                source,
            })?;

        info!(
            phase = %RefreshPhase::MarkerCommitted,
            fetched = countries.len(),
            written = written.len(),
            failed,
            total_countries,
            %last_refreshed_at,
            "country refresh completed"
        );

        if let Some(artifact) = &self.artifact {
            if let Err(e) = self.publish_summary(artifact, total_countries, last_refreshed_at).await {
                warn!(error = ?e, "summary image generation failed");
            }
        }

        Ok(RefreshSummary {
            total_countries,
            last_refreshed_at,
            fetched: countries.len(),
            written: written.len(),
            failed,
        })
    }

    async fn publish_summary(
        &self,
        artifact: &SummaryArtifact,
        total_countries: i64,
        last_refreshed_at: chrono::DateTime<chrono::Utc>,
    ) -> anyhow::Result<()> {
        let top = self.db.top_countries_by_gdp(SUMMARY_TOP_N).await?;
        artifact.render(total_countries, &top, last_refreshed_at).await?;
        Ok(())
    }
}
