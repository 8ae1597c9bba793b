use crate::config::RetentionConfig;
use crate::error::SweepItemError;
use crate::ports::storage::RemoteStorage;
use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// What one sweep matched and removed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub matched: usize,
    pub deleted: usize,
    pub failures: Vec<SweepItemError>,
}

/// Deletes delivered artifacts older than the retention age, once a day.
pub struct RetentionSweeper<S> {
    storage: Arc<S>,
    config: RetentionConfig,
}

impl<S: RemoteStorage + 'static> RetentionSweeper<S> {
    pub fn new(storage: Arc<S>, config: RetentionConfig) -> Self {
        Self { storage, config }
    }

    /// Lists the folder and deletes every asset created before
    /// `now - max_age`. A failed delete is recorded and the sweep moves on;
    /// only a failed listing fails the sweep.
    pub async fn sweep_once(
        &self,
        now: DateTime<Utc>,
    ) -> Result<SweepReport, Box<dyn Error + Send + Sync>> {
        let max_age = TimeDelta::from_std(self.config.max_age)?;
        let cutoff = now
            .checked_sub_signed(max_age)
            .ok_or("retention age out of range")?;

        let assets = self.storage.list_assets(&self.config.folder).await?;
        let expired: Vec<_> = assets
            .into_iter()
            .filter(|asset| asset.created_at < cutoff)
            .collect();

        let mut report = SweepReport {
            matched: expired.len(),
            ..Default::default()
        };
        info!(folder = %self.config.folder, %cutoff, matched = report.matched, "Sweeping expired assets");

        for asset in expired {
            match self.storage.delete(&asset.public_id).await {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    warn!(public_id = %asset.public_id, error = %e, "Failed to delete expired asset");
                    report.failures.push(SweepItemError {
                        public_id: asset.public_id,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            deleted = report.deleted,
            failed = report.failures.len(),
            "Sweep finished"
        );
        Ok(report)
    }

    /// Sleeps until each daily run time and sweeps. Never returns.
    pub async fn run(self) {
        loop {
            let now = Utc::now();
            let next = next_run_after(now, self.config.run_at);
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            info!(next_run = %next, "Retention sweep scheduled");
            tokio::time::sleep(wait).await;

            if let Err(e) = self.sweep_once(Utc::now()).await {
                error!(error = %e, "Retention sweep failed, retrying at next run");
            }
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

/// First instant strictly after `now` whose UTC time of day is `run_at`.
pub fn next_run_after(now: DateTime<Utc>, run_at: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(run_at).and_utc();
    if today > now {
        today
    } else {
        today + TimeDelta::days(1)
    }
}
