//! 디렉토리 스캐너
//!
//! [`DirectoryScanner`]는 시작 직후 한 번, 이후 `scan_interval`마다 감시 디렉토리를
//! 나열하고 아직 처리되지 않은 파일을 작업 큐에 넣습니다.
//!
//! 파일마다 다음 순서로 거릅니다:
//! 1. 이미 처리 중 ([`InFlightSet`]) → 건너뜀
//! 2. 완료 원장에 기록 있음 → 건너뜀 (원장 조회 실패도 건너뜀)
//! 3. 처리 중 집합에 등록
//! 4. 원장 재확인: 1~3 사이에 다른 스캔이 같은 파일을 끝냈을 수 있으므로
//!    완료됐거나 조회에 실패하면 등록을 되돌리고 건너뜀
//! 5. 큐에 전송 (큐가 가득 차면 대기)
//!
//! 취소는 파일 사이와 큐 대기 중에 확인하며, 등록만 하고 전송하지 못한 파일은
//! 처리 중 집합에서 다시 제거합니다. 스캐너 태스크가 끝나면 송신측이 drop되어
//! 큐가 닫힙니다.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use logdrop_core::metrics as m;
use logdrop_core::pipeline::CompletionLedger;

use crate::config::IngestPipelineConfig;
use crate::error::IngestError;
use crate::inflight::InFlightSet;
use crate::stats::PipelineStats;
use crate::store::bounded;

/// 스캔 한 번의 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// 발견한 후보 파일 수
    pub discovered: usize,
    /// 완료 원장에 있어 건너뛴 수
    pub already_complete: usize,
    /// 이미 처리 중이라 건너뛴 수
    pub already_in_flight: usize,
    /// 큐에 넣은 수
    pub enqueued: usize,
    /// 원장 조회 실패로 건너뛴 수
    pub ledger_errors: usize,
    /// 취소로 중간에 멈췄는지 여부
    pub cancelled: bool,
}

enum Publish {
    Sent,
    Cancelled,
    Closed,
}

/// 디렉토리 스캐너
pub struct DirectoryScanner<L> {
    input_dir: PathBuf,
    file_suffix: String,
    max_file_size: u64,
    scan_interval: Duration,
    storage_timeout: Duration,
    ledger: Arc<L>,
    inflight: Arc<InFlightSet>,
    queue: mpsc::Sender<PathBuf>,
    stats: Arc<PipelineStats>,
}

impl<L: CompletionLedger> DirectoryScanner<L> {
    pub fn new(
        config: &IngestPipelineConfig,
        ledger: Arc<L>,
        inflight: Arc<InFlightSet>,
        queue: mpsc::Sender<PathBuf>,
    ) -> Self {
        Self {
            input_dir: config.input_dir.clone(),
            file_suffix: config.file_suffix.clone(),
            max_file_size: config.max_file_size,
            scan_interval: config.scan_interval,
            storage_timeout: config.storage_timeout,
            ledger,
            inflight,
            queue,
            stats: Arc::new(PipelineStats::new()),
        }
    }

    /// 카운터를 공유할 통계 객체를 지정합니다.
    pub fn with_stats(mut self, stats: Arc<PipelineStats>) -> Self {
        self.stats = stats;
        self
    }

    /// 취소될 때까지 주기적으로 스캔합니다.
    ///
    /// 첫 스캔은 즉시 실행됩니다. 반환 시 큐 송신측이 drop됩니다.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            dir = %self.input_dir.display(),
            suffix = %self.file_suffix,
            interval_ms = self.scan_interval.as_millis() as u64,
            "scanner started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match self.scan_once(&cancel).await {
                        Ok(report) if report.enqueued > 0 => info!(
                            discovered = report.discovered,
                            enqueued = report.enqueued,
                            "scan enqueued files"
                        ),
                        Ok(report) => debug!(
                            discovered = report.discovered,
                            complete = report.already_complete,
                            in_flight = report.already_in_flight,
                            "scan found nothing new"
                        ),
                        Err(IngestError::Channel(reason)) => {
                            warn!(reason = %reason, "work queue closed, stopping scanner");
                            break;
                        }
                        Err(e) => warn!(error = %e, "scan failed"),
                    }
                }
            }
        }

        info!("scanner stopped");
    }

    /// 스캔을 한 번 수행합니다.
    pub async fn scan_once(&self, cancel: &CancellationToken) -> Result<ScanReport, IngestError> {
        let mut report = ScanReport::default();
        if cancel.is_cancelled() {
            report.cancelled = true;
            return Ok(report);
        }

        let started = Instant::now();
        let candidates = {
            let dir = self.input_dir.clone();
            let suffix = self.file_suffix.clone();
            let max_file_size = self.max_file_size;
            tokio::task::spawn_blocking(move || discover_candidates(&dir, &suffix, max_file_size))
                .await
                .map_err(|e| IngestError::Channel(format!("spawn_blocking failed: {e}")))?
        };
        report.discovered = candidates.len();

        for path in candidates {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            if self.inflight.contains(&path) {
                report.already_in_flight += 1;
                continue;
            }

            if !self.ledger_allows(&path, &mut report).await {
                continue;
            }

            if !self.inflight.try_add(&path) {
                report.already_in_flight += 1;
                continue;
            }

            if !self.ledger_allows(&path, &mut report).await {
                self.inflight.remove(&path);
                continue;
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Publish::Cancelled,
                sent = self.queue.send(path.clone()) => match sent {
                    Ok(()) => Publish::Sent,
                    Err(_) => Publish::Closed,
                },
            };

            match outcome {
                Publish::Sent => {
                    report.enqueued += 1;
                    PipelineStats::add(&self.stats.files_enqueued, 1);
                    metrics::counter!(m::INGEST_FILES_ENQUEUED_TOTAL).increment(1);
                    debug!(file = %path.display(), "file enqueued");
                }
                Publish::Cancelled => {
                    self.inflight.remove(&path);
                    report.cancelled = true;
                    break;
                }
                Publish::Closed => {
                    self.inflight.remove(&path);
                    return Err(IngestError::Channel("work queue closed".to_owned()));
                }
            }
        }

        PipelineStats::add(&self.stats.scans, 1);
        metrics::counter!(m::INGEST_SCANS_TOTAL).increment(1);

        debug!(
            discovered = report.discovered,
            enqueued = report.enqueued,
            elapsed_ms = started.elapsed().as_millis() as u64,
            cancelled = report.cancelled,
            "scan finished"
        );
        Ok(report)
    }

    /// 원장에 완료 기록이 없으면 `true`. 완료 또는 조회 실패는 `report`에 셉니다.
    async fn ledger_allows(&self, path: &Path, report: &mut ScanReport) -> bool {
        match bounded(
            "is_complete",
            self.storage_timeout,
            self.ledger.is_complete(path),
        )
        .await
        {
            Ok(false) => true,
            Ok(true) => {
                report.already_complete += 1;
                false
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "ledger check failed, skipping");
                report.ledger_errors += 1;
                false
            }
        }
    }
}

/// 디렉토리에서 처리 대상 파일을 찾습니다 (blocking I/O).
///
/// 하위 디렉토리는 탐색하지 않으며 확장자가 `suffix`인 일반 파일만 반환합니다.
/// 결과는 경로 순으로 정렬됩니다. 디렉토리가 없으면 빈 목록입니다.
pub fn discover_candidates(dir: &Path, suffix: &str, max_file_size: u64) -> Vec<PathBuf> {
    let mut results = Vec::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "failed to read input directory");
            return results;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "failed to read directory entry");
                continue;
            }
        };

        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(suffix) {
            continue;
        }

        let metadata = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read file metadata");
                continue;
            }
        };

        if !metadata.is_file() {
            continue;
        }

        if metadata.len() > max_file_size {
            warn!(
                path = %path.display(),
                size = metadata.len(),
                max = max_file_size,
                "file too large, skipping"
            );
            continue;
        }

        results.push(path);
    }

    results.sort();
    results
}
