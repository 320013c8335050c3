//! Per-gateway process: receives LoRa frames, runs the attachment state
//! machine, and republishes accepted frames to the broker. Grounded on
//! `pi_lora.py`'s `main()` loop (connect-if-disconnected, receive-with-
//! timeout, periodic keep-alive) and teacher's `main.rs` `clap` CLI shape.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use iotwx::config::Config;
use iotwx::edge::{Gateway, ProcSampler};
use iotwx::broker::{BrokerClient, MqttBrokerClient};
use iotwx::transport::UdpTransport;

#[derive(Parser)]
#[command(name = "edge-gateway")]
#[command(about = "LoRa-to-broker telemetry gateway for one edge site")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "config.yml")]
    config: String,

    /// This gateway's identity, published as `edge_id` on every envelope.
    #[arg(long)]
    edge_id: String,

    /// Local UDP address the radio bridge sends packets to.
    #[arg(long, default_value = "0.0.0.0:9999")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    iotwx::logging::init_logger();

    let cli = Cli::parse();
    let config_path = env::var("CONFIG_FILE_PATH").unwrap_or(cli.config);
    let config = Config::load(&config_path)?;

    let transport = Arc::new(UdpTransport::bind(&cli.listen).await?);
    let broker = Arc::new(MqttBrokerClient::connect(
        &format!("edge-{}", cli.edge_id),
        &config.mqtt.broker_ip,
        config.mqtt.broker_port,
    ));
    broker
        .subscribe(&iotwx::codec::topic_for_edge(
            &config.mqtt.edge_topic_template,
            &cli.edge_id,
        ))
        .await?;

    let gateway = Arc::new(Gateway::new(
        cli.edge_id.clone(),
        transport,
        broker,
        Arc::new(ProcSampler::new()),
        config.radio.clone(),
        config.station.clone(),
    ));

    info!(edge_id = %cli.edge_id, listen = %cli.listen, "edge gateway starting");

    let rcv_timeout = Duration::from_secs_f64(config.radio.rcv_timeout_secs);
    let keep_alive_interval = Duration::from_secs_f64(config.radio.keep_alive_interval_secs);

    let load_gateway = gateway.clone();
    tokio::spawn(async move {
        loop {
            load_gateway.update_load().await;
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
    });

    let keep_alive_gateway = gateway.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(keep_alive_interval).await;
            let detached = keep_alive_gateway.keep_alive_tick().await;
            if !detached.is_empty() {
                info!(?detached, "stations detached on keep-alive timeout");
            }
        }
    });

    loop {
        if let Err(e) = gateway.receive_tick(rcv_timeout).await {
            warn!(error = %e, "failed to handle inbound frame");
        }
    }
}
