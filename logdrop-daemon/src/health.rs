//! Aggregated health reporting.
//!
//! Combines the ingest pipeline's own `health_check()` with checks of the
//! directories the daemon depends on into one [`DaemonHealth`] report.
//!
//! # Aggregation Rule
//!
//! - All Healthy -> Healthy
//! - Any Degraded, none Unhealthy -> Degraded(reason)
//! - Any Unhealthy -> Unhealthy(reason)

use std::path::Path;

use serde::Serialize;

use logdrop_core::pipeline::HealthStatus;
use logdrop_ingest::StatsSnapshot;

/// Aggregated health report for the daemon.
#[derive(Debug, Clone, Serialize)]
pub struct DaemonHealth {
    /// Overall status (worst of all components).
    pub status: HealthStatus,
    /// Seconds since the orchestrator was built.
    pub uptime_secs: u64,
    /// Files currently queued or being processed.
    pub in_flight: usize,
    /// Work queue fill ratio, 0.0 when not running.
    pub queue_utilization: f64,
    /// Files recorded in the completion ledger.
    pub completed_files: usize,
    /// Pipeline counters.
    pub stats: StatsSnapshot,
    /// Per-component statuses.
    pub components: Vec<ComponentHealth>,
}

/// Health status for a single component.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    /// Component name (e.g., "ingest-pipeline", "storage").
    pub name: String,
    /// Current status.
    pub status: HealthStatus,
}

impl ComponentHealth {
    pub fn new(name: impl Into<String>, status: HealthStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }
}

/// Check that `dir` still exists and is a directory.
pub fn directory_status(dir: &Path) -> HealthStatus {
    match std::fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => HealthStatus::Healthy,
        Ok(_) => HealthStatus::Unhealthy(format!("{} is not a directory", dir.display())),
        Err(e) => HealthStatus::Unhealthy(format!("{}: {}", dir.display(), e)),
    }
}

/// Aggregate component statuses, worst first: Unhealthy > Degraded > Healthy.
pub fn aggregate_status(components: &[ComponentHealth]) -> HealthStatus {
    let mut degraded = Vec::new();
    let mut unhealthy = Vec::new();

    for component in components {
        match &component.status {
            HealthStatus::Healthy => {}
            HealthStatus::Degraded(reason) => {
                degraded.push(format!("{}: {}", component.name, reason));
            }
            HealthStatus::Unhealthy(reason) => {
                unhealthy.push(format!("{}: {}", component.name, reason));
            }
        }
    }

    if !unhealthy.is_empty() {
        HealthStatus::Unhealthy(unhealthy.join("; "))
    } else if !degraded.is_empty() {
        HealthStatus::Degraded(degraded.join("; "))
    } else {
        HealthStatus::Healthy
    }
}
