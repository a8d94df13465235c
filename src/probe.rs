//! HTTP probing of site endpoints

use crate::errors::{CollectorError, Result};
use crate::status::Status;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Checks a single target and reports a binary outcome.
///
/// Failures are data: implementations never return an error, they report
/// `Status::Error`.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, target: &str) -> Status;
}

/// Probes targets with a single HTTP GET
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
    timeout: Duration,
}

impl HttpProber {
    pub fn new(http_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(http_timeout)
            .user_agent(format!("status_collector/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(CollectorError::Http)?;

        Ok(Self {
            client,
            timeout: http_timeout,
        })
    }

    /// Single attempt against `target`; `Ok` only for a 200 response.
    ///
    /// The response is dropped before returning, which releases the connection.
    pub async fn check(&self, target: &str) -> Result<()> {
        let response = timeout(self.timeout, self.client.get(target).send())
            .await
            .map_err(|_| CollectorError::Probe(format!("request to {} timed out", target)))?
            .map_err(CollectorError::Http)?;

        let status = response.status();
        drop(response);

        if status == StatusCode::OK {
            Ok(())
        } else {
            Err(CollectorError::Probe(format!(
                "{} responded with {}",
                target, status
            )))
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, target: &str) -> Status {
        match self.check(target).await {
            Ok(()) => {
                debug!("Probe of {} succeeded", target);
                Status::Success
            }
            Err(e) => {
                warn!("Probe of {} failed: {}", target, e);
                Status::Error
            }
        }
    }
}
