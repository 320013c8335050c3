//! # Persistence façade
//!
//! Narrow client-side interface the controller and merger call through;
//! the HTTP CRUD server those calls land on is out of scope for this
//! crate (only the client boundary is built). Grounded on
//! `cloud/services/database_api/crud/station.py`'s upsert shape and
//! `mqtt_client.py`'s `requests.get/put/post` calls against
//! `STATION_ENDPOINT`/`READING_ENDPOINT`.

pub mod http;
pub mod mock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::IotwxError;
use crate::model::{Reading, Station};

#[async_trait]
pub trait PersistenceFacade: Send + Sync {
    /// `GET /api/stations/{id}`. `Ok(None)` on a 404, never an error.
    async fn get_station(&self, station_id: &str) -> Result<Option<Station>, IotwxError>;

    /// `PUT` if the station exists, `POST` otherwise.
    async fn upsert_station(&self, station: &Station) -> Result<(), IotwxError>;

    /// `POST /api/readings`.
    async fn insert_reading(&self, reading: &Reading) -> Result<(), IotwxError>;

    /// Partial update of just `last_active`, via the same upsert endpoint.
    async fn update_station_last_active(&self, station_id: &str, ts: DateTime<Utc>) -> Result<(), IotwxError>;

    /// `GET /health`.
    async fn health(&self) -> Result<(), IotwxError>;
}

pub use http::HttpPersistenceFacade;
pub use mock::MockPersistenceFacade;
