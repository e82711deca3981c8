//! 파일 단위 수집
//!
//! 파일 하나를 읽어 모든 행을 검증/저장하고, 끝나면 완료 원장에 정확히
//! 한 번 기록합니다.
//!
//! ```text
//! Reading -> (행마다: Valid -> Stored | Invalid -> ErrorLogged) -> EOF -> LedgerWritten
//!         \-> AbortedUnrecorded (읽기/디코딩 실패)
//! ```
//!
//! 디코딩은 첫 행을 저장하기 전에 파일 전체에 대해 끝내므로, 중단된 파일은
//! 메시지도 파싱 실패도 완료 기록도 남기지 않고 다음 스캔에서 다시 시도됩니다.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use csv::StringRecord;
use tracing::{debug, error, warn};
use uuid::Uuid;

use logdrop_core::metrics as m;
use logdrop_core::pipeline::{CompletionLedger, RecordStore};
use logdrop_core::types::{file_key, CompletionStatus, Message, ParseFailure};

use super::{decode_row, decode_rows, raw_line};
use crate::error::IngestError;
use crate::stats::PipelineStats;
use crate::store::bounded;

/// 파일 하나의 처리 결과
#[derive(Debug, Clone)]
pub struct IngestedFile {
    /// 처리한 파일
    pub path: PathBuf,
    /// 저장에 성공한 메시지 (파일 내 순서)
    pub messages: Vec<Message>,
    /// 검증 또는 저장에 실패한 행 수
    pub failed_rows: usize,
    /// 파일 상태
    pub status: CompletionStatus,
    /// 완료 원장 기록 성공 여부
    pub ledger_written: bool,
}

impl IngestedFile {
    /// 저장된 메시지의 서로 다른 그룹 키 (정렬됨)
    pub fn unit_ids(&self) -> BTreeSet<Uuid> {
        self.messages.iter().map(|m| m.unit_guid).collect()
    }
}

/// 파일 수집기
///
/// 저장소와 원장 호출은 모두 `storage_timeout`으로 제한됩니다.
pub struct FileIngestor<S, L> {
    store: Arc<S>,
    ledger: Arc<L>,
    storage_timeout: Duration,
    stats: Arc<PipelineStats>,
}

impl<S: RecordStore, L: CompletionLedger> FileIngestor<S, L> {
    pub fn new(store: Arc<S>, ledger: Arc<L>, storage_timeout: Duration) -> Self {
        Self {
            store,
            ledger,
            storage_timeout,
            stats: Arc::new(PipelineStats::new()),
        }
    }

    /// 카운터를 공유할 통계 객체를 지정합니다.
    pub fn with_stats(mut self, stats: Arc<PipelineStats>) -> Self {
        self.stats = stats;
        self
    }

    /// 파일 하나를 처리합니다.
    ///
    /// 행 단위 실패는 파싱 실패로 기록하고 계속 진행하며, 파일 상태만 `failed`로
    /// 바꿉니다. 읽기/디코딩 실패일 때만 `Err`를 반환합니다.
    pub async fn ingest(&self, path: &Path) -> Result<IngestedFile, IngestError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| IngestError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let rows = decode_rows(&bytes).map_err(|e| IngestError::Decode {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let filename = file_key(path);
        let mut messages = Vec::with_capacity(rows.len());
        let mut failed_rows = 0usize;

        for row in &rows {
            let message = match decode_row(row) {
                Ok(message) => message,
                Err(e) => {
                    failed_rows += 1;
                    self.record_failure(&filename, row, e.to_string()).await;
                    continue;
                }
            };

            match bounded(
                "insert_message",
                self.storage_timeout,
                self.store.insert_message(&message),
            )
            .await
            {
                Ok(()) => messages.push(message),
                Err(e) => {
                    failed_rows += 1;
                    self.record_failure(&filename, row, format!("database insert failed: {e}"))
                        .await;
                }
            }
        }

        let status = if failed_rows == 0 {
            CompletionStatus::Success
        } else {
            CompletionStatus::Failed
        };

        let ledger_written = match bounded(
            "record_completion",
            self.storage_timeout,
            self.ledger.record_completion(path, status),
        )
        .await
        {
            Ok(()) => true,
            Err(e) => {
                error!(
                    file = %path.display(),
                    status = %status,
                    error = %e,
                    "failed to record file completion"
                );
                false
            }
        };

        PipelineStats::add(&self.stats.rows_stored, messages.len() as u64);
        PipelineStats::add(&self.stats.parse_failures, failed_rows as u64);
        metrics::counter!(m::INGEST_ROWS_STORED_TOTAL).increment(messages.len() as u64);
        metrics::counter!(m::INGEST_PARSE_FAILURES_TOTAL).increment(failed_rows as u64);

        debug!(
            file = %path.display(),
            rows = rows.len(),
            stored = messages.len(),
            failed = failed_rows,
            "file ingested"
        );

        Ok(IngestedFile {
            path: path.to_path_buf(),
            messages,
            failed_rows,
            status,
            ledger_written,
        })
    }

    async fn record_failure(&self, filename: &str, row: &StringRecord, reason: String) {
        let failure = ParseFailure::new(filename, raw_line(row), reason);
        if let Err(e) = bounded(
            "insert_parse_failure",
            self.storage_timeout,
            self.store.insert_parse_failure(&failure),
        )
        .await
        {
            warn!(
                file = filename,
                reason = %failure.reason,
                error = %e,
                "failed to store parse failure"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tests::{valid_line, UNIT_A};
    use crate::store::MemoryStore;

    const UNIT_B: &str = "0a1b2c3d-4e5f-4a6b-9c7d-8e9f0a1b2c3d";

    fn ingestor(store: &Arc<MemoryStore>) -> FileIngestor<MemoryStore, MemoryStore> {
        FileIngestor::new(Arc::clone(store), Arc::clone(store), Duration::from_secs(5))
    }

    async fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        tokio::fs::write(&path, content).await.unwrap();
        path
    }

    #[tokio::test]
    async fn clean_file_is_success() {
        let tmp = tempfile::tempdir().unwrap();
        let content = format!(
            "{}\n{}\n{}\n",
            valid_line(UNIT_A, "M-1", "1"),
            valid_line(UNIT_A, "M-2", "2"),
            valid_line(UNIT_B, "M-3", "3"),
        );
        let path = write(tmp.path(), "clean.tsv", content.as_bytes()).await;
        let store = Arc::new(MemoryStore::new());

        let result = ingestor(&store).ingest(&path).await.unwrap();

        assert_eq!(result.status, CompletionStatus::Success);
        assert_eq!(result.messages.len(), 3);
        assert_eq!(result.failed_rows, 0);
        assert!(result.ledger_written);
        assert_eq!(result.unit_ids().len(), 2);
        assert_eq!(store.messages().await.len(), 3);
        assert!(store.parse_failures().await.is_empty());
        let completions = store.completions().await;
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].status, CompletionStatus::Success);
    }

    #[tokio::test]
    async fn bad_rows_are_recorded_and_file_marked_failed() {
        let tmp = tempfile::tempdir().unwrap();
        let content = format!(
            "{}\nshort\trow\n{}\n",
            valid_line(UNIT_A, "M-1", "1"),
            valid_line(UNIT_A, "M-2", "loud"),
        );
        let path = write(tmp.path(), "mixed.tsv", content.as_bytes()).await;
        let store = Arc::new(MemoryStore::new());

        let result = ingestor(&store).ingest(&path).await.unwrap();

        assert_eq!(result.status, CompletionStatus::Failed);
        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.failed_rows, 2);

        let failures = store.parse_failures().await;
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].raw_line, "short\trow");
        assert_eq!(failures[0].reason, "not enough columns, expected 14 got 2");
        assert!(failures[1].reason.starts_with("invalid level value"));
        assert!(failures.iter().all(|f| f.filename == file_key(&path)));
        assert_eq!(store.completions().await[0].status, CompletionStatus::Failed);
    }

    #[tokio::test]
    async fn undecodable_file_leaves_no_trace() {
        let tmp = tempfile::tempdir().unwrap();
        let mut content = format!("{}\n", valid_line(UNIT_A, "M-1", "1")).into_bytes();
        content.extend_from_slice(b"\xc3\x28\tbad\n");
        let path = write(tmp.path(), "binary.tsv", &content).await;
        let store = Arc::new(MemoryStore::new());

        let err = ingestor(&store).ingest(&path).await.unwrap_err();

        assert!(matches!(err, IngestError::Decode { .. }));
        assert!(store.messages().await.is_empty());
        assert!(store.parse_failures().await.is_empty());
        assert!(store.completions().await.is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_read_error() {
        let store = Arc::new(MemoryStore::new());
        let err = ingestor(&store)
            .ingest(Path::new("/nonexistent/gone.tsv"))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Read { .. }));
        assert!(store.completions().await.is_empty());
    }

    #[tokio::test]
    async fn empty_file_completes_successfully() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "empty.tsv", b"").await;
        let store = Arc::new(MemoryStore::new());

        let result = ingestor(&store).ingest(&path).await.unwrap();
        assert_eq!(result.status, CompletionStatus::Success);
        assert!(result.messages.is_empty());
        assert_eq!(store.completions().await.len(), 1);
    }

    #[tokio::test]
    async fn stats_are_shared() {
        let tmp = tempfile::tempdir().unwrap();
        let content = format!("{}\nx\n", valid_line(UNIT_A, "M-1", "1"));
        let path = write(tmp.path(), "s.tsv", content.as_bytes()).await;
        let store = Arc::new(MemoryStore::new());
        let stats = Arc::new(PipelineStats::new());

        ingestor(&store)
            .with_stats(Arc::clone(&stats))
            .ingest(&path)
            .await
            .unwrap();

        let snap = stats.snapshot();
        assert_eq!(snap.rows_stored, 1);
        assert_eq!(snap.parse_failures, 1);
    }
}
