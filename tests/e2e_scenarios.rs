//! Literal §8 scenario tests not already covered by their owning module's
//! unit tests: S4 (pong backoff, receive loop stays live during the burst)
//! and S5 (buffer merge across two envelopes), driven end-to-end through
//! the public `Gateway` / `IngestionMerger` API rather than internals.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use iotwx::broker::MockBrokerClient;
use iotwx::codec::{encode, FrameType, LoraFrame};
use iotwx::config::{RadioConfig, StationConfig};
use iotwx::edge::load::{FixedSampler, Utilization};
use iotwx::edge::Gateway;
use iotwx::ingestion::{IngestionMerger, NullInferenceClient};
use iotwx::model::Coords;
use iotwx::persistence::MockPersistenceFacade;
use iotwx::statestore::{MockStateStore, StateStore};
use iotwx::transport::{LoRaTransport, MockTransport};

/// S4 — a ping triggers a pong burst from a dedicated producer while the
/// receive loop keeps ingesting traffic: a concurrent sensor frame from a
/// second station is published to the broker within 1s of the ping.
#[tokio::test]
async fn s4_pong_burst_does_not_block_concurrent_ingestion() {
    let transport = Arc::new(MockTransport::new());
    let broker = Arc::new(MockBrokerClient::new());
    let sampler = Arc::new(FixedSampler(Utilization { cpu: 0.1, mem: 0.1 }));
    let radio_config = RadioConfig {
        pong_duration_secs: 3.0,
        pong_initial_delay_max_secs: 0.5,
        ..RadioConfig::default()
    };

    let gateway = Arc::new(Gateway::new(
        "edge-1",
        transport.clone() as Arc<dyn LoRaTransport>,
        broker.clone() as Arc<dyn iotwx::broker::BrokerClient>,
        sampler,
        radio_config,
        StationConfig::default(),
    ));

    let ping = LoraFrame::bare("s1", FrameType::Ping);
    gateway.handle_inbound(&encode(&ping), -60).await.unwrap();

    // The pong burst runs as its own task; a sensor frame addressed to this
    // edge, received concurrently, must still be published promptly.
    let mut sensor_frame = LoraFrame::bare("s2", FrameType::SensorData);
    sensor_frame.s = Some("bme680".to_string());
    sensor_frame.m = Some("tmp".to_string());
    sensor_frame.d = Some(21.1);
    sensor_frame.to = Some("edge-1".to_string());

    tokio::time::timeout(
        Duration::from_secs(1),
        gateway.handle_inbound(&encode(&sensor_frame), -55),
    )
    .await
    .expect("receive loop must not be blocked by the pong burst")
    .unwrap();

    assert_eq!(broker.published().len(), 1);
    assert_eq!(broker.published()[0].0, "iotwx/s2");

    // The pong burst itself still runs to completion, pongs addressed to s1.
    tokio::time::sleep(Duration::from_millis(700)).await;
    let sent = transport.take_sent().await;
    assert!(!sent.is_empty(), "expected at least one pong to have been sent by now");
}

/// S5 — two envelopes for the same station, each carrying one measurement,
/// merge into a single buffered sensor tree by the next batch cycle.
#[tokio::test]
async fn s5_buffer_merges_readings_across_envelopes() {
    let persistence = Arc::new(MockPersistenceFacade::new());
    let state_store = Arc::new(MockStateStore::new());
    let merger = IngestionMerger::new(
        persistence,
        state_store.clone(),
        Arc::new(NullInferenceClient),
        StationConfig::default(),
    );

    let base = iotwx::codec::BrokerEnvelope {
        station_id: "s1".to_string(),
        edge_id: Some("edge-1".to_string()),
        message_type: "sensor_data".to_string(),
        sensor: Some("bme680".to_string()),
        sensor_protocol: None,
        measurement: None,
        value: None,
        rssi: Some(-65),
        coords: Coords::default(),
        owner: Default::default(),
        timestamp: Utc::now(),
    };

    let mut envelope_a = base.clone();
    envelope_a.measurement = Some("tmp".to_string());
    envelope_a.value = Some(21.1);
    merger.handle_envelope(&envelope_a).await.unwrap();

    let mut envelope_b = base;
    envelope_b.measurement = Some("rh".to_string());
    envelope_b.value = Some(44.0);
    merger.handle_envelope(&envelope_b).await.unwrap();

    merger.run_batch(Utc::now()).await.unwrap();

    let snapshot = state_store.get("s1").await.unwrap().unwrap();
    assert_eq!(snapshot.values["bme680.tmp"], 21.1);
    assert_eq!(snapshot.values["bme680.rh"], 44.0);
}
