//! Run driver: probe every site, aggregate groups, record history

use crate::aggregator::aggregate;
use crate::config::Config;
use crate::errors::{CollectorError, Result};
use crate::log_store::LogStore;
use crate::probe::Prober;
use crate::status::Status;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

/// Orchestrates one pass over the configured groups
pub struct StatusCollector<P: Prober> {
    config: Config,
    store: LogStore,
    prober: P,
    run_id: String,
}

/// Result of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub groups: Vec<GroupReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub name: String,
    pub slug: String,
    pub status: Status,
    pub appended: bool,
    pub sites: Vec<SiteReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SiteReport {
    pub name: String,
    pub slug: String,
    pub status: Status,
    pub appended: bool,
}

impl RunReport {
    pub fn site_count(&self) -> usize {
        self.groups.iter().map(|g| g.sites.len()).sum()
    }

    pub fn failing_sites(&self) -> Vec<&str> {
        self.groups
            .iter()
            .flat_map(|g| g.sites.iter())
            .filter(|s| !s.status.is_success())
            .map(|s| s.slug.as_str())
            .collect()
    }
}

impl<P: Prober> StatusCollector<P> {
    /// Create a collector; the config is validated before anything is probed
    pub fn new(config: Config, store: LogStore, prober: P) -> Result<Self> {
        config.validate().map_err(CollectorError::Config)?;

        Ok(Self {
            config,
            store,
            prober,
            run_id: Uuid::new_v4().to_string(),
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Probe every site in config order and record site and group statuses.
    ///
    /// `now` is shared by every record of the run. Any log error aborts the run.
    #[instrument(skip(self), fields(run_id = %self.run_id))]
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunReport> {
        info!(
            "Starting run over {} groups, {} sites",
            self.config.groups.len(),
            self.config.site_count()
        );

        let mut groups = Vec::with_capacity(self.config.groups.len());

        for group in &self.config.groups {
            let mut sites = Vec::with_capacity(group.sites.len());

            for site in &group.sites {
                let status = self.prober.probe(&site.desc).await;
                let outcome = self.store.record(&site.slug, now, status)?;

                sites.push(SiteReport {
                    name: site.name.clone(),
                    slug: site.slug.clone(),
                    status,
                    appended: outcome.appended,
                });
            }

            let status = aggregate(sites.iter().map(|s| s.status));
            let outcome = self.store.record(&group.slug, now, status)?;

            info!(
                group = %group.slug,
                status = %status,
                appended = outcome.appended,
                "Group {} is {}",
                group.name,
                status
            );

            groups.push(GroupReport {
                name: group.name.clone(),
                slug: group.slug.clone(),
                status,
                appended: outcome.appended,
                sites,
            });
        }

        Ok(RunReport {
            run_id: self.run_id.clone(),
            started_at: now,
            groups,
        })
    }
}
