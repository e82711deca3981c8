//! Daemon assembly and lifecycle management.
//!
//! The [`Orchestrator`] wires the concrete collaborators into one
//! [`IngestPipeline`]:
//!
//! ```text
//! JsonlStore (records + completion ledger) --+
//!                                            +--> IngestPipeline
//! TextReportRenderer<JsonlStore> ------------+
//! ```
//!
//! `run()` writes the PID file, starts the pipeline, logs health
//! periodically and waits for SIGTERM/SIGINT. Shutdown lets the workers
//! drain the queue before the PID file is removed.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

use logdrop_core::config::LogdropConfig;
use logdrop_core::pipeline::{HealthStatus, Pipeline};
use logdrop_ingest::{
    IngestPipeline, IngestPipelineBuilder, IngestPipelineConfig, JsonlStore, TextReportRenderer,
};

use crate::health::{ComponentHealth, DaemonHealth, aggregate_status, directory_status};
use crate::metrics_server;
use crate::pid::{remove_pid_file, write_pid_file};

/// Interval between periodic health log lines.
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Pipeline type assembled by the daemon.
pub type DaemonPipeline = IngestPipeline<JsonlStore, JsonlStore, TextReportRenderer<JsonlStore>>;

/// The daemon orchestrator.
pub struct Orchestrator {
    config: LogdropConfig,
    pipeline: DaemonPipeline,
    store: Arc<JsonlStore>,
    start_time: Instant,
}

impl Orchestrator {
    /// Load `logdrop.toml`, apply environment overrides and build.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = LogdropConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    ///
    /// Creates the input, data and report directories when missing and
    /// opens the file-backed store, which loads the completion ledger.
    pub async fn build_from_config(config: LogdropConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        }

        for dir in [
            &config.ingest.input_dir,
            &config.storage.data_dir,
            &config.report.output_dir,
        ] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| anyhow::anyhow!("failed to create directory {}: {}", dir, e))?;
        }

        let store = Arc::new(
            JsonlStore::open(&config.storage.data_dir)
                .await
                .map_err(|e| anyhow::anyhow!("failed to open store: {}", e))?,
        );
        let reports = Arc::new(TextReportRenderer::new(
            &config.report.output_dir,
            Arc::clone(&store),
        ));

        let pipeline = IngestPipelineBuilder::new()
            .config(IngestPipelineConfig::from_core(&config.ingest))
            .store(Arc::clone(&store))
            .ledger(Arc::clone(&store))
            .reports(reports)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build ingest pipeline: {}", e))?;

        tracing::info!(
            input_dir = %config.ingest.input_dir,
            data_dir = %config.storage.data_dir,
            report_dir = %config.report.output_dir,
            "orchestrator initialized"
        );

        Ok(Self {
            config,
            pipeline,
            store,
            start_time: Instant::now(),
        })
    }

    /// Start the ingest pipeline.
    pub async fn start(&mut self) -> Result<()> {
        self.pipeline
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start ingest pipeline: {}", e))
    }

    /// Stop the pipeline; returns once queued files are drained.
    pub async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("stopping ingest pipeline");
        self.pipeline
            .stop()
            .await
            .map_err(|e| anyhow::anyhow!("failed to stop ingest pipeline: {}", e))
    }

    /// Run until SIGTERM or SIGINT, then shut down gracefully.
    pub async fn run(&mut self) -> Result<()> {
        let pid_path = self.pid_path();
        if let Some(path) = &pid_path {
            write_pid_file(path)?;
        }

        if let Err(e) = self.start().await {
            if let Some(path) = &pid_path {
                remove_pid_file(path);
            }
            return Err(e);
        }

        let result = self.wait_for_shutdown().await;

        let stopped = self.shutdown().await;
        if let Some(path) = &pid_path {
            remove_pid_file(path);
        }

        let signal = result?;
        stopped?;
        tracing::info!(signal = signal, "logdrop-daemon shut down");
        Ok(())
    }

    /// Aggregated health of the pipeline and its directories.
    pub async fn health(&self) -> DaemonHealth {
        let components = vec![
            ComponentHealth::new("ingest-pipeline", self.pipeline.health_check().await),
            ComponentHealth::new(
                "input-dir",
                directory_status(Path::new(&self.config.ingest.input_dir)),
            ),
            ComponentHealth::new("storage", directory_status(self.store.dir())),
            ComponentHealth::new(
                "report-dir",
                directory_status(Path::new(&self.config.report.output_dir)),
            ),
        ];

        DaemonHealth {
            status: aggregate_status(&components),
            uptime_secs: self.start_time.elapsed().as_secs(),
            in_flight: self.pipeline.in_flight(),
            queue_utilization: self.pipeline.queue_utilization(),
            completed_files: self.store.completed_count().await,
            stats: self.pipeline.stats(),
            components,
        }
    }

    /// Loaded configuration.
    pub fn config(&self) -> &LogdropConfig {
        &self.config
    }

    /// Pipeline lifecycle state name.
    pub fn state_name(&self) -> &str {
        self.pipeline.state_name()
    }

    fn pid_path(&self) -> Option<PathBuf> {
        let pid_file = &self.config.general.pid_file;
        (!pid_file.is_empty()).then(|| PathBuf::from(pid_file))
    }

    async fn wait_for_shutdown(&self) -> Result<&'static str> {
        let signal = wait_for_shutdown_signal();
        tokio::pin!(signal);

        let mut ticker = tokio::time::interval(HEALTH_LOG_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // first tick fires immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                received = &mut signal => {
                    let name = received?;
                    tracing::info!(signal = name, "shutdown signal received");
                    return Ok(name);
                }
                _ = ticker.tick() => log_health(&self.health().await),
            }
        }
    }
}

fn log_health(health: &DaemonHealth) {
    match serde_json::to_string(health) {
        Ok(report) => tracing::debug!(report = %report, "health report"),
        Err(e) => tracing::warn!(error = %e, "failed to serialize health report"),
    }

    match &health.status {
        HealthStatus::Healthy => tracing::info!(
            uptime_secs = health.uptime_secs,
            in_flight = health.in_flight,
            completed_files = health.completed_files,
            rows = health.stats.rows_stored,
            "daemon healthy"
        ),
        HealthStatus::Degraded(reason) => tracing::warn!(
            reason = %reason,
            in_flight = health.in_flight,
            "daemon degraded"
        ),
        HealthStatus::Unhealthy(reason) => tracing::error!(reason = %reason, "daemon unhealthy"),
    }
}

/// Wait for SIGTERM or SIGINT and return the signal name.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}
