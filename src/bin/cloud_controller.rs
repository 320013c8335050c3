//! Cloud-tier process: consumes broker envelopes from every edge, feeds the
//! ingestion merger and the assignment controller, and republishes
//! assignment directives back to edges. Grounded on
//! `cloud/services/mqtt_listener/mqtt_client.py`'s subscribe-and-dispatch
//! loop plus `dynamic_assignment_network.py`'s periodic re-solve ticker,
//! split into the cooperative tasks the concurrency model calls for: one
//! dispatch loop per incoming message, a periodic batch worker, and a
//! periodic dwell/timeout worker.

use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{info, warn};

use iotwx::assignment::{AssignmentController, Directive};
use iotwx::broker::{BrokerClient, MqttBrokerClient};
use iotwx::codec::{self, BrokerEnvelope};
use iotwx::config::Config;
use iotwx::ingestion::{IngestionMerger, NullInferenceClient};
use iotwx::persistence::HttpPersistenceFacade;
use iotwx::statestore::TtlMapStateStore;

#[derive(Parser)]
#[command(name = "cloud-controller")]
#[command(about = "Assignment controller and ingestion merger for the station/edge mesh")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "config.yml")]
    config: String,

    /// Base URL of the persistence façade (CRUD HTTP API).
    #[arg(long, default_value = "http://localhost:8000")]
    persistence_url: String,
}

/// Publish both halves of a directive: logged, not retried. The next
/// re-solve republishes the intended state if this fails.
async fn publish_directive(
    broker: &dyn BrokerClient,
    edge_topic_template: &str,
    directive: Directive,
) {
    let (edge_id, station_id, status) = match directive {
        Directive::Assigned { station_id, edge_id } => (edge_id, station_id, "assigned"),
        Directive::Unassigned { station_id, edge_id } => (edge_id, station_id, "unassigned"),
    };
    let topic = codec::topic_for_edge(edge_topic_template, &edge_id);
    let payload = json!({
        "station_id": station_id,
        "status": status,
        "timestamp": Utc::now(),
    });
    let bytes = match serde_json::to_vec(&payload) {
        Ok(b) => b,
        Err(e) => {
            warn!(error = %e, "failed to encode assignment directive");
            return;
        }
    };
    if let Err(e) = broker.publish(&topic, bytes).await {
        warn!(error = %e, edge_id, station_id, status, "failed to publish assignment directive");
    }
}

async fn publish_directives(broker: &dyn BrokerClient, edge_topic_template: &str, directives: Vec<Directive>) {
    for directive in directives {
        publish_directive(broker, edge_topic_template, directive).await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    iotwx::logging::init_logger();

    let cli = Cli::parse();
    let config_path = env::var("CONFIG_FILE_PATH").unwrap_or(cli.config);
    let config = Config::load(&config_path)?;

    let broker = Arc::new(MqttBrokerClient::connect(
        "cloud-controller",
        &config.mqtt.broker_ip,
        config.mqtt.broker_port,
    ));
    broker.subscribe(&config.mqtt.msg_topic).await?;

    let persistence = Arc::new(HttpPersistenceFacade::new(cli.persistence_url));
    let state_store = Arc::new(TtlMapStateStore::new());
    let merger = Arc::new(IngestionMerger::new(
        persistence,
        state_store,
        Arc::new(NullInferenceClient),
        config.station.clone(),
    ));
    let controller = Arc::new(Mutex::new(AssignmentController::new(&config.assignment)));
    let edge_last_seen: Arc<Mutex<HashMap<String, chrono::DateTime<Utc>>>> = Arc::new(Mutex::new(HashMap::new()));

    info!(
        broker_ip = %config.mqtt.broker_ip,
        msg_topic = %config.mqtt.msg_topic,
        "cloud controller starting"
    );

    // Dispatch loop: one broker message in, merger update + assignment join.
    let dispatch_merger = merger.clone();
    let dispatch_controller = controller.clone();
    let dispatch_broker = broker.clone();
    let dispatch_edge_last_seen = edge_last_seen.clone();
    let dispatch_edge_topic_template = config.mqtt.edge_topic_template.clone();
    let mut incoming = broker.incoming();
    tokio::spawn(async move {
        loop {
            let msg = match incoming.recv().await {
                Ok(msg) => msg,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "dispatch loop lagged behind incoming broker messages");
                    continue;
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            };

            let envelope: BrokerEnvelope = match serde_json::from_slice(&msg.payload) {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, topic = %msg.topic, "dropping malformed broker envelope");
                    continue;
                }
            };

            if let Err(e) = dispatch_merger.handle_envelope(&envelope).await {
                warn!(error = %e, station_id = %envelope.station_id, "ingestion merger rejected envelope");
            }

            let now = Utc::now();
            if let Some(edge_id) = envelope.edge_id.clone() {
                let mut ctrl = dispatch_controller.lock().await;
                ctrl.on_edge_join(&edge_id);
                dispatch_edge_last_seen.lock().await.insert(edge_id.clone(), now);

                if let Some(rssi) = envelope.rssi {
                    if envelope.message_type != "keep_alive" && envelope.message_type != "disconnect" {
                        ctrl.on_station_join(&envelope.station_id, HashMap::from([(edge_id, rssi)]), now);
                    }
                }
            }

            if envelope.message_type == "disconnect" {
                let directives = dispatch_controller.lock().await.on_station_leave(&envelope.station_id);
                publish_directives(dispatch_broker.as_ref(), &dispatch_edge_topic_template, directives).await;
            }
        }
    });

    // Periodic dwell-expiry: admits newly joined stations into the
    // assignment map once their dwell window has elapsed.
    let dwell_controller = controller.clone();
    let dwell_broker = broker.clone();
    let edge_topic_template = config.mqtt.edge_topic_template.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let directives = dwell_controller.lock().await.expire_dwell(Utc::now());
            if !directives.is_empty() {
                publish_directives(dwell_broker.as_ref(), &edge_topic_template, directives).await;
            }
        }
    });

    // Periodic edge-timeout sweep: an edge that has gone quiet for
    // `mqtt.assignment_timeout` is treated as having left, orphaning its
    // stations for greedy reassignment.
    let timeout_controller = controller.clone();
    let timeout_broker = broker.clone();
    let timeout_edge_last_seen = edge_last_seen.clone();
    let edge_topic_template = config.mqtt.edge_topic_template.clone();
    let assignment_timeout = chrono::Duration::seconds(config.mqtt.assignment_timeout as i64);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            let now = Utc::now();
            let stale: Vec<String> = {
                let seen = timeout_edge_last_seen.lock().await;
                seen.iter()
                    .filter(|(_, last)| now - **last > assignment_timeout)
                    .map(|(id, _)| id.clone())
                    .collect()
            };
            if stale.is_empty() {
                continue;
            }
            let directives = {
                let mut ctrl = timeout_controller.lock().await;
                stale
                    .iter()
                    .flat_map(|edge_id| ctrl.on_edge_leave(edge_id))
                    .collect::<Vec<_>>()
            };
            publish_directives(timeout_broker.as_ref(), &edge_topic_template, directives).await;
            let mut seen = timeout_edge_last_seen.lock().await;
            for edge_id in &stale {
                seen.remove(edge_id);
            }
            info!(?stale, "timed out edges and reassigned their stations");
        }
    });

    // Periodic batch worker: reconciles the ingestion buffer with the
    // short-lived state store, runs inference, and evicts stale stations.
    // Interrupted only between iterations, never mid-flush, by the loop
    // structure itself (no cancellation signal crosses `run_batch`).
    let batch_interval = Duration::from_secs(config.station.batch_interval_secs);
    loop {
        tokio::time::sleep(batch_interval).await;
        if let Err(e) = merger.run_batch(Utc::now()).await {
            warn!(error = %e, "batch cycle failed");
        }
    }
}
