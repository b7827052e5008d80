//! Command-line interface for the MedLink telemetry pipeline.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use medlink_cloud::{HttpSink, StaticPatientResolver, Subscriber, Transformer};
use medlink_core::eventbus::EventBus;
use medlink_core::queue::TelemetryQueue;
use medlink_core::retry::RetryPolicy;
use medlink_core::telemetry::TelemetrySnapshot;
use medlink_core::MedlinkConfig;
use medlink_device::{simulator, TcpRegisterClient};
use medlink_edge::{CircuitBreaker, MqttTransport, Poller, Publisher};
use medlink_rules::AnomalyMonitor;

/// MedLink - dialysis telemetry pipeline.
#[derive(Parser, Debug)]
#[command(name = "medlink")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to a JSON config file; defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the edge process: device pollers and the broker publisher.
    Edge,
    /// Run the cloud process: subscriber, transformer, and anomaly monitor.
    Cloud,
    /// Serve simulated devices for the configured device list.
    Simulate,
    /// Evaluate one snapshot JSON file against the anomaly rules.
    Check {
        /// Path to a TelemetrySnapshot JSON file.
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => MedlinkConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => MedlinkConfig::default(),
    };

    match args.command {
        Command::Edge => run_edge(config).await,
        Command::Cloud => run_cloud(config).await,
        Command::Simulate => run_simulate(config).await,
        Command::Check { file } => run_check(&file),
    }
}

/// Poll every configured device and publish onto the broker.
async fn run_edge(config: MedlinkConfig) -> Result<()> {
    anyhow::ensure!(!config.devices.is_empty(), "no devices configured");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let queue = TelemetryQueue::new(config.queue.capacity, config.queue.overflow);

    let mut workers = Vec::new();
    for device in &config.devices {
        let client = TcpRegisterClient::new(
            &device.host,
            device.port,
            Duration::from_millis(config.connect_timeout_ms),
        );
        let poller = Poller::new(
            device.device_id.clone(),
            client,
            queue.clone(),
            Duration::from_millis(config.poll_interval_ms),
        );
        workers.push(tokio::spawn(poller.run(shutdown_rx.clone())));
    }
    tracing::info!(devices = config.devices.len(), "edge pollers started");

    let transport = MqttTransport::connect(&config.broker, shutdown_rx.clone());
    let publisher = Publisher::new(
        queue.clone(),
        transport,
        config.broker.topic_prefix.clone(),
        RetryPolicy::default(),
        CircuitBreaker::new(
            config.breaker.failure_threshold,
            Duration::from_secs(config.breaker.cooldown_secs),
        ),
    );
    workers.push(tokio::spawn(publisher.run()));

    wait_for_shutdown().await;
    shutdown_tx.send(true).ok();
    // Pollers exit first; closing the queue lets the publisher drain and stop.
    queue.close();
    for worker in workers {
        worker.await.ok();
    }
    tracing::info!("edge process stopped");
    Ok(())
}

/// Consume the broker topic, fan snapshots out to the sink, watch for
/// anomalies.
async fn run_cloud(config: MedlinkConfig) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let queue = TelemetryQueue::new(config.queue.capacity, config.queue.overflow);
    let bus = EventBus::new();

    let monitor = AnomalyMonitor::new(bus.clone());
    let monitor_handle = tokio::spawn(monitor.run(shutdown_rx.clone()));

    let resolver = Arc::new(StaticPatientResolver::new(config.patients.clone()));
    let sink = Arc::new(HttpSink::new(&config.sink, RetryPolicy::default())?);
    let transformer = Transformer::new(queue.clone(), resolver, sink, config.fanout_concurrency);
    let transformer_handle = tokio::spawn(transformer.run());

    let subscriber = Subscriber::new(config.broker.clone(), queue.clone(), bus);
    let subscriber_handle = tokio::spawn(subscriber.run(shutdown_rx));

    wait_for_shutdown().await;
    shutdown_tx.send(true).ok();
    // The subscriber closes the queue on shutdown, draining the transformer.
    subscriber_handle.await.ok();
    transformer_handle.await.ok();
    monitor_handle.await.ok();
    tracing::info!("cloud process stopped");
    Ok(())
}

/// Serve one simulated device per configured device entry.
async fn run_simulate(config: MedlinkConfig) -> Result<()> {
    anyhow::ensure!(!config.devices.is_empty(), "no devices configured");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut servers = Vec::new();
    for device in &config.devices {
        let addr = format!("{}:{}", device.host, device.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("binding simulator for {} on {addr}", device.device_id))?;
        servers.push(tokio::spawn(simulator::serve(
            device.device_id.clone(),
            listener,
            shutdown_rx.clone(),
        )));
    }
    tracing::info!(devices = config.devices.len(), "device simulators started");

    wait_for_shutdown().await;
    shutdown_tx.send(true).ok();
    for server in servers {
        server.await.ok();
    }
    Ok(())
}

/// Run the anomaly rules over one snapshot file and print the verdict.
fn run_check(file: &PathBuf) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("reading snapshot from {}", file.display()))?;
    let snapshot: TelemetrySnapshot =
        serde_json::from_str(&text).context("parsing telemetry snapshot")?;

    match medlink_rules::analyze(&snapshot.measurements, &snapshot.alarms) {
        Some(result) => {
            println!("severity:       {}", result.severity);
            println!("finding:        {}", result.finding);
            println!("recommendation: {}", result.recommendation);
        }
        None => println!("no anomaly detected"),
    }
    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
}
