//! Inference is treated as an opaque external service: `original_source`
//! never implements it (the ThingsBoard/Metabase side handles analytics,
//! out of scope here), so this trait exists purely as the seam the batch
//! cycle calls through, with a no-op default that makes that step real
//! without inventing a model contract nobody asked for.

use async_trait::async_trait;

use crate::error::IotwxError;
use crate::statestore::SensorSnapshot;

#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn infer(&self, station_id: &str, snapshot: &SensorSnapshot) -> Result<(), IotwxError>;
}

/// Default client: every batch cycle calls through but nothing happens.
pub struct NullInferenceClient;

#[async_trait]
impl InferenceClient for NullInferenceClient {
    async fn infer(&self, _station_id: &str, _snapshot: &SensorSnapshot) -> Result<(), IotwxError> {
        Ok(())
    }
}
