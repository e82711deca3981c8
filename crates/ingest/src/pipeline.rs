//! 파이프라인 오케스트레이션 -- 스캔/큐/워커의 전체 흐름을 관리합니다.
//!
//! [`IngestPipeline`]은 core의 [`Pipeline`] trait을 구현하여
//! `logdrop-daemon`에서 시작/정지/헬스 체크 생명주기로 관리됩니다.
//!
//! # 내부 아키텍처
//! ```text
//! DirectoryScanner -> mpsc(queue_capacity) -> Worker x N -> FileIngestor
//! ```
//!
//! # 정지 순서
//! 1. 취소 토큰을 취소 → 스캐너가 새 스캔을 시작하지 않고 종료
//! 2. 스캐너 종료와 함께 큐 송신측 drop → 큐 닫힘
//! 3. 워커가 큐에 남은 파일을 모두 처리한 뒤 종료

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use logdrop_core::error::{LogdropError, PipelineError};
use logdrop_core::pipeline::{CompletionLedger, HealthStatus, Pipeline, RecordStore, ReportTrigger};

use crate::config::IngestPipelineConfig;
use crate::error::IngestError;
use crate::inflight::InFlightSet;
use crate::parser::FileIngestor;
use crate::scanner::DirectoryScanner;
use crate::stats::{PipelineStats, StatsSnapshot};
use crate::worker::{WorkerContext, spawn_workers};

/// 큐 사용률이 이 값을 넘으면 Degraded
const QUEUE_DEGRADED_THRESHOLD: f64 = 0.9;

/// 파이프라인 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// 수집 파이프라인
///
/// # 사용 예시
/// ```ignore
/// use std::sync::Arc;
/// use logdrop_ingest::{IngestPipelineBuilder, MemoryStore, TextReportRenderer};
///
/// let store = Arc::new(MemoryStore::new());
/// let mut pipeline = IngestPipelineBuilder::new()
///     .config(config)
///     .store(Arc::clone(&store))
///     .ledger(Arc::clone(&store))
///     .reports(Arc::new(TextReportRenderer::new("/var/lib/logdrop/reports", store)))
///     .build()?;
///
/// pipeline.start().await?;
/// ```
pub struct IngestPipeline<S, L, R> {
    config: IngestPipelineConfig,
    state: PipelineState,
    store: Arc<S>,
    ledger: Arc<L>,
    reports: Arc<R>,
    inflight: Arc<InFlightSet>,
    stats: Arc<PipelineStats>,
    cancel: CancellationToken,
    /// 헬스 체크용 큐 핸들 (큐 수명에는 관여하지 않음)
    queue_watch: Option<mpsc::WeakSender<PathBuf>>,
    scanner_task: Option<JoinHandle<()>>,
    worker_tasks: Vec<JoinHandle<()>>,
}

impl<S, L, R> IngestPipeline<S, L, R>
where
    S: RecordStore,
    L: CompletionLedger,
    R: ReportTrigger,
{
    /// 현재 상태를 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            PipelineState::Initialized => "initialized",
            PipelineState::Running => "running",
            PipelineState::Stopped => "stopped",
        }
    }

    /// 파이프라인 설정
    pub fn config(&self) -> &IngestPipelineConfig {
        &self.config
    }

    /// 처리 카운터 스냅샷
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// 큐에 있거나 처리 중인 파일 수
    pub fn in_flight(&self) -> usize {
        self.inflight.len()
    }

    /// 작업 큐 사용률 (0.0 ~ 1.0). 실행 중이 아니면 0.0
    pub fn queue_utilization(&self) -> f64 {
        let Some(tx) = self.queue_watch.as_ref().and_then(mpsc::WeakSender::upgrade) else {
            return 0.0;
        };
        let max = tx.max_capacity();
        if max == 0 {
            return 0.0;
        }
        (max - tx.capacity()) as f64 / max as f64
    }
}

impl<S, L, R> Pipeline for IngestPipeline<S, L, R>
where
    S: RecordStore,
    L: CompletionLedger,
    R: ReportTrigger,
{
    async fn start(&mut self) -> Result<(), LogdropError> {
        if self.state == PipelineState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        info!(
            input_dir = %self.config.input_dir.display(),
            workers = self.config.workers,
            queue_capacity = self.config.queue_capacity,
            "starting ingest pipeline"
        );

        self.cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(self.config.queue_capacity);
        self.queue_watch = Some(tx.downgrade());

        // 1. 워커 먼저 스폰 (첫 스캔 결과를 바로 소비)
        let ingestor = FileIngestor::new(
            Arc::clone(&self.store),
            Arc::clone(&self.ledger),
            self.config.storage_timeout,
        )
        .with_stats(Arc::clone(&self.stats));
        let ctx = Arc::new(WorkerContext::new(
            ingestor,
            Arc::clone(&self.reports),
            Arc::clone(&self.inflight),
            Arc::clone(&self.stats),
            self.config.report_timeout,
        ));
        self.worker_tasks = spawn_workers(self.config.workers, Arc::new(Mutex::new(rx)), ctx);

        // 2. 스캐너 스폰 (송신측 소유)
        let scanner = DirectoryScanner::new(
            &self.config,
            Arc::clone(&self.ledger),
            Arc::clone(&self.inflight),
            tx,
        )
        .with_stats(Arc::clone(&self.stats));
        self.scanner_task = Some(tokio::spawn(scanner.run(self.cancel.clone())));

        self.state = PipelineState::Running;
        info!("ingest pipeline started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), LogdropError> {
        if self.state != PipelineState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        info!(in_flight = self.inflight.len(), "stopping ingest pipeline");

        // 1. 스캐너 중단 → 큐 닫힘
        self.cancel.cancel();
        if let Some(scanner) = self.scanner_task.take() {
            if let Err(e) = scanner.await {
                warn!(error = %e, "scanner task ended abnormally");
            }
        }

        // 2. 워커가 남은 큐를 비울 때까지 대기
        for task in self.worker_tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "worker task ended abnormally");
            }
        }

        self.queue_watch = None;
        self.state = PipelineState::Stopped;
        let stats = self.stats.snapshot();
        info!(
            succeeded = stats.files_succeeded,
            failed = stats.files_failed,
            aborted = stats.files_aborted,
            rows = stats.rows_stored,
            "ingest pipeline stopped"
        );
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            PipelineState::Running => {
                let utilization = self.queue_utilization();
                if utilization >= QUEUE_DEGRADED_THRESHOLD {
                    HealthStatus::Degraded(format!(
                        "work queue utilization high: {:.1}%",
                        utilization * 100.0
                    ))
                } else {
                    HealthStatus::Healthy
                }
            }
            PipelineState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            PipelineState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 수집 파이프라인 빌더
pub struct IngestPipelineBuilder<S, L, R> {
    config: IngestPipelineConfig,
    store: Option<Arc<S>>,
    ledger: Option<Arc<L>>,
    reports: Option<Arc<R>>,
}

impl<S, L, R> IngestPipelineBuilder<S, L, R>
where
    S: RecordStore,
    L: CompletionLedger,
    R: ReportTrigger,
{
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: IngestPipelineConfig::default(),
            store: None,
            ledger: None,
            reports: None,
        }
    }

    /// 파이프라인 설정을 지정합니다.
    pub fn config(mut self, config: IngestPipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// 메시지/파싱 실패 저장소를 지정합니다.
    pub fn store(mut self, store: Arc<S>) -> Self {
        self.store = Some(store);
        self
    }

    /// 완료 원장을 지정합니다.
    pub fn ledger(mut self, ledger: Arc<L>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// 리포트 생성기를 지정합니다.
    pub fn reports(mut self, reports: Arc<R>) -> Self {
        self.reports = Some(reports);
        self
    }

    /// 파이프라인을 빌드합니다.
    pub fn build(self) -> Result<IngestPipeline<S, L, R>, IngestError> {
        self.config.validate()?;

        let missing = |field: &str| IngestError::Config {
            field: field.to_owned(),
            reason: "must be set before build".to_owned(),
        };

        Ok(IngestPipeline {
            config: self.config,
            state: PipelineState::Initialized,
            store: self.store.ok_or_else(|| missing("store"))?,
            ledger: self.ledger.ok_or_else(|| missing("ledger"))?,
            reports: self.reports.ok_or_else(|| missing("reports"))?,
            inflight: Arc::new(InFlightSet::new()),
            stats: Arc::new(PipelineStats::new()),
            cancel: CancellationToken::new(),
            queue_watch: None,
            scanner_task: None,
            worker_tasks: Vec::new(),
        })
    }
}

impl<S, L, R> Default for IngestPipelineBuilder<S, L, R>
where
    S: RecordStore,
    L: CompletionLedger,
    R: ReportTrigger,
{
    fn default() -> Self {
        Self::new()
    }
}
