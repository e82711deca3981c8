//! 워커 풀
//!
//! 고정 개수의 워커가 작업 큐 하나를 공유합니다. 각 워커는
//! 파일을 꺼내 [`FileIngestor`]로 처리하고, 저장된 메시지의 그룹 키마다
//! 리포트를 한 번씩 생성한 뒤 처리 중 등록을 해제합니다.
//!
//! 큐가 닫히고 비면 워커가 종료됩니다. 처리 중인 파일은 항상 끝까지 처리합니다.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use logdrop_core::error::ReportError;
use logdrop_core::metrics as m;
use logdrop_core::pipeline::{CompletionLedger, RecordStore, ReportTrigger};
use logdrop_core::types::CompletionStatus;

use crate::inflight::InFlightSet;
use crate::parser::FileIngestor;
use crate::stats::PipelineStats;

/// 워커들이 공유하는 큐 수신측
pub type SharedQueue = Arc<Mutex<mpsc::Receiver<PathBuf>>>;

/// 파일 하나의 최종 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// 완료 기록까지 마침
    Completed(CompletionStatus),
    /// 읽기/디코딩 실패로 중단 (완료 기록 없음)
    Aborted,
}

/// 워커가 파일을 처리하는 데 필요한 모든 것
pub struct WorkerContext<S, L, R> {
    ingestor: FileIngestor<S, L>,
    reports: Arc<R>,
    inflight: Arc<InFlightSet>,
    stats: Arc<PipelineStats>,
    report_timeout: Duration,
}

impl<S, L, R> WorkerContext<S, L, R>
where
    S: RecordStore,
    L: CompletionLedger,
    R: ReportTrigger,
{
    pub fn new(
        ingestor: FileIngestor<S, L>,
        reports: Arc<R>,
        inflight: Arc<InFlightSet>,
        stats: Arc<PipelineStats>,
        report_timeout: Duration,
    ) -> Self {
        Self {
            ingestor,
            reports,
            inflight,
            stats,
            report_timeout,
        }
    }

    /// 파일 하나를 처리합니다.
    ///
    /// 결과와 관계없이 반환 전에 처리 중 등록을 해제합니다.
    pub async fn process(&self, worker: usize, path: PathBuf) -> FileOutcome {
        let _release = self.inflight.release_on_drop(path.clone());
        let started = Instant::now();

        let outcome = match self.ingestor.ingest(&path).await {
            Ok(ingested) => {
                let units = ingested.unit_ids();
                for unit in &units {
                    self.generate_report(worker, *unit).await;
                }

                info!(
                    worker,
                    file = %path.display(),
                    stored = ingested.messages.len(),
                    failed = ingested.failed_rows,
                    units = units.len(),
                    status = %ingested.status,
                    "file processed"
                );
                FileOutcome::Completed(ingested.status)
            }
            Err(e) => {
                error!(
                    worker,
                    file = %path.display(),
                    error = %e,
                    "file aborted, will retry on next scan"
                );
                FileOutcome::Aborted
            }
        };

        let (counter, label) = match outcome {
            FileOutcome::Completed(CompletionStatus::Success) => (&self.stats.files_succeeded, "success"),
            FileOutcome::Completed(CompletionStatus::Failed) => (&self.stats.files_failed, "failed"),
            FileOutcome::Aborted => (&self.stats.files_aborted, "aborted"),
        };
        PipelineStats::add(counter, 1);
        metrics::counter!(m::INGEST_FILES_PROCESSED_TOTAL, m::LABEL_RESULT => label).increment(1);
        metrics::histogram!(m::INGEST_FILE_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        outcome
    }

    async fn generate_report(&self, worker: usize, unit: uuid::Uuid) {
        let result = match tokio::time::timeout(self.report_timeout, self.reports.generate(unit)).await
        {
            Ok(result) => result,
            Err(_) => Err(ReportError::Timeout {
                millis: u64::try_from(self.report_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        };

        match result {
            Ok(()) => {
                PipelineStats::add(&self.stats.reports_generated, 1);
                metrics::counter!(m::INGEST_REPORTS_TOTAL, m::LABEL_RESULT => "success").increment(1);
                debug!(worker, unit = %unit, "unit report generated");
            }
            Err(e) => {
                PipelineStats::add(&self.stats.reports_failed, 1);
                metrics::counter!(m::INGEST_REPORTS_TOTAL, m::LABEL_RESULT => "failed").increment(1);
                warn!(worker, unit = %unit, error = %e, "unit report failed");
            }
        }
    }
}

/// 워커 `count`개를 스폰합니다.
pub fn spawn_workers<S, L, R>(
    count: usize,
    queue: SharedQueue,
    ctx: Arc<WorkerContext<S, L, R>>,
) -> Vec<JoinHandle<()>>
where
    S: RecordStore,
    L: CompletionLedger,
    R: ReportTrigger,
{
    (0..count)
        .map(|id| tokio::spawn(run_worker(id, Arc::clone(&queue), Arc::clone(&ctx))))
        .collect()
}

async fn run_worker<S, L, R>(id: usize, queue: SharedQueue, ctx: Arc<WorkerContext<S, L, R>>)
where
    S: RecordStore,
    L: CompletionLedger,
    R: ReportTrigger,
{
    debug!(worker = id, "worker started");
    loop {
        let next = queue.lock().await.recv().await;
        let Some(path) = next else {
            break;
        };
        ctx.process(id, path).await;
    }
    debug!(worker = id, "worker stopped, queue drained");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tests::{valid_line, UNIT_A};
    use crate::store::MemoryStore;
    use std::path::Path;
    use uuid::Uuid;

    const UNIT_B: &str = "0a1b2c3d-4e5f-4a6b-9c7d-8e9f0a1b2c3d";

    #[derive(Default)]
    struct RecordingReports {
        calls: std::sync::Mutex<Vec<Uuid>>,
        fail: bool,
    }

    impl ReportTrigger for RecordingReports {
        async fn generate(&self, unit: Uuid) -> Result<(), ReportError> {
            self.calls.lock().unwrap().push(unit);
            if self.fail {
                Err(ReportError::NoMessages {
                    unit: unit.to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn context(
        store: &Arc<MemoryStore>,
        reports: &Arc<RecordingReports>,
        inflight: &Arc<InFlightSet>,
    ) -> WorkerContext<MemoryStore, MemoryStore, RecordingReports> {
        WorkerContext::new(
            FileIngestor::new(Arc::clone(store), Arc::clone(store), Duration::from_secs(5)),
            Arc::clone(reports),
            Arc::clone(inflight),
            Arc::new(PipelineStats::new()),
            Duration::from_secs(5),
        )
    }

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn reports_once_per_distinct_unit() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(
            tmp.path(),
            "a.tsv",
            &format!(
                "{}\n{}\n{}\n",
                valid_line(UNIT_A, "M-1", "1"),
                valid_line(UNIT_B, "M-2", "1"),
                valid_line(UNIT_A, "M-3", "1"),
            ),
        );
        let store = Arc::new(MemoryStore::new());
        let reports = Arc::new(RecordingReports::default());
        let inflight = Arc::new(InFlightSet::new());
        inflight.try_add(&path);

        let outcome = context(&store, &reports, &inflight).process(0, path.clone()).await;

        assert_eq!(outcome, FileOutcome::Completed(CompletionStatus::Success));
        assert_eq!(reports.calls.lock().unwrap().len(), 2);
        assert!(!inflight.contains(&path));
    }

    #[tokio::test]
    async fn aborted_file_releases_in_flight_without_reports() {
        let store = Arc::new(MemoryStore::new());
        let reports = Arc::new(RecordingReports::default());
        let inflight = Arc::new(InFlightSet::new());
        let path = PathBuf::from("/nonexistent/missing.tsv");
        inflight.try_add(&path);

        let outcome = context(&store, &reports, &inflight).process(0, path.clone()).await;

        assert_eq!(outcome, FileOutcome::Aborted);
        assert!(reports.calls.lock().unwrap().is_empty());
        assert!(!inflight.contains(&path));
    }

    #[tokio::test]
    async fn report_failure_does_not_change_file_status() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "a.tsv", &valid_line(UNIT_A, "M-1", "1"));
        let store = Arc::new(MemoryStore::new());
        let reports = Arc::new(RecordingReports {
            fail: true,
            ..RecordingReports::default()
        });
        let inflight = Arc::new(InFlightSet::new());

        let ctx = context(&store, &reports, &inflight);
        let outcome = ctx.process(0, path).await;

        assert_eq!(outcome, FileOutcome::Completed(CompletionStatus::Success));
        let snap = ctx.stats.snapshot();
        assert_eq!(snap.reports_failed, 1);
        assert_eq!(snap.files_succeeded, 1);
    }

    #[tokio::test]
    async fn workers_drain_queue_then_exit() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let reports = Arc::new(RecordingReports::default());
        let inflight = Arc::new(InFlightSet::new());
        let ctx = Arc::new(context(&store, &reports, &inflight));

        let (tx, rx) = mpsc::channel(16);
        for i in 0..6 {
            let path = write(
                tmp.path(),
                &format!("f{i}.tsv"),
                &valid_line(UNIT_A, &format!("M-{i}"), "1"),
            );
            inflight.try_add(&path);
            tx.send(path).await.unwrap();
        }
        drop(tx);

        let handles = spawn_workers(3, Arc::new(Mutex::new(rx)), Arc::clone(&ctx));
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.completions().await.len(), 6);
        assert_eq!(store.messages().await.len(), 6);
        assert!(inflight.is_empty());
    }
}
