//! `reqwest`-backed implementation of [`PersistenceFacade`]. Every call has
//! a fixed per-call timeout; 4xx responses are logical failures (logged,
//! not retried), 5xx and connection errors are retried up to 3 times with
//! exponential backoff, matching §7's `PersistenceTransient`/
//! `PersistenceLogical` split.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use tracing::warn;

use crate::error::IotwxError;
use crate::model::{Reading, Station};

use super::PersistenceFacade;

const CALL_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_ATTEMPTS: u32 = 3;

pub struct HttpPersistenceFacade {
    client: Client,
    base_url: String,
}

impl HttpPersistenceFacade {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(CALL_TIMEOUT)
            .build()
            .expect("reqwest client builds with a static timeout");
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Send a request with bounded exponential backoff, passing the raw
    /// response through untouched so callers can interpret status codes
    /// (e.g. a 404 meaning "not found" rather than a logical failure) for
    /// themselves. 5xx responses and connection errors are retried;
    /// everything else returns on the first attempt.
    async fn retrying<F, Fut>(&self, mut attempt: F) -> Result<reqwest::Response, IotwxError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = reqwest::Result<reqwest::Response>>,
    {
        let mut backoff = Duration::from_millis(200);
        for try_n in 1..=MAX_ATTEMPTS {
            match attempt().await {
                Ok(resp) if resp.status().is_server_error() => {
                    if try_n == MAX_ATTEMPTS {
                        return Err(IotwxError::PersistenceTransient(resp.status().to_string()));
                    }
                    warn!(attempt = try_n, status = %resp.status(), "transient persistence error, retrying");
                }
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if try_n == MAX_ATTEMPTS {
                        return Err(IotwxError::PersistenceTransient(e.to_string()));
                    }
                    warn!(attempt = try_n, error = %e, "persistence request failed, retrying");
                }
            }
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
        unreachable!("loop always returns by the final attempt")
    }

    fn reject_client_error(resp: reqwest::Response) -> Result<reqwest::Response, IotwxError> {
        if resp.status().is_client_error() {
            Err(IotwxError::PersistenceLogical(resp.status().to_string()))
        } else {
            Ok(resp)
        }
    }
}

#[async_trait]
impl PersistenceFacade for HttpPersistenceFacade {
    async fn get_station(&self, station_id: &str) -> Result<Option<Station>, IotwxError> {
        let url = format!("{}/api/stations/{}", self.base_url, station_id);
        let client = &self.client;
        let resp = self.retrying(|| client.get(&url).send()).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = Self::reject_client_error(resp)?;
        let station = resp
            .json::<Station>()
            .await
            .map_err(|e| IotwxError::PersistenceLogical(e.to_string()))?;
        Ok(Some(station))
    }

    async fn upsert_station(&self, station: &Station) -> Result<(), IotwxError> {
        let exists = self.get_station(&station.station_id).await?.is_some();
        let client = &self.client;
        let resp = if exists {
            let url = format!("{}/api/stations/{}", self.base_url, station.station_id);
            self.retrying(|| client.put(&url).json(station).send()).await?
        } else {
            let url = format!("{}/api/stations", self.base_url);
            self.retrying(|| client.post(&url).json(station).send()).await?
        };
        Self::reject_client_error(resp)?;
        Ok(())
    }

    async fn insert_reading(&self, reading: &Reading) -> Result<(), IotwxError> {
        let url = format!("{}/api/readings", self.base_url);
        let client = &self.client;
        let resp = self.retrying(|| client.post(&url).json(reading).send()).await?;
        Self::reject_client_error(resp)?;
        Ok(())
    }

    async fn update_station_last_active(&self, station_id: &str, ts: DateTime<Utc>) -> Result<(), IotwxError> {
        let url = format!("{}/api/stations/{}", self.base_url, station_id);
        let client = &self.client;
        let resp = self
            .retrying(|| {
                client
                    .put(&url)
                    .json(&serde_json::json!({ "last_active": ts }))
                    .send()
            })
            .await?;
        Self::reject_client_error(resp)?;
        Ok(())
    }

    async fn health(&self) -> Result<(), IotwxError> {
        let url = format!("{}/health", self.base_url);
        let client = &self.client;
        let resp = self.retrying(|| client.get(&url).send()).await?;
        Self::reject_client_error(resp)?;
        Ok(())
    }
}
