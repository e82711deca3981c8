//! 통합 테스트 공용 헬퍼: TSV 생성기와 장애 주입용 협력자

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use logdrop_core::error::{ReportError, StorageError};
use logdrop_core::pipeline::{CompletionLedger, RecordStore, ReportTrigger};
use logdrop_core::types::{CompletionStatus, Message, ParseFailure};
use logdrop_ingest::MemoryStore;
use uuid::Uuid;

pub const UNIT_A: &str = "6f1c2d3e-4a5b-4c6d-8e7f-901a2b3c4d5e";
pub const UNIT_B: &str = "0a1b2c3d-4e5f-4a6b-9c7d-8e9f0a1b2c3d";
pub const UNIT_C: &str = "f0e1d2c3-b4a5-4697-8877-665544332211";

/// 14열짜리 정상 행
pub fn valid_row(unit: &str, msg_id: &str) -> String {
    [
        "plant/line1",
        "1",
        unit,
        msg_id,
        "Conveyor jam",
        "belt",
        "alarm",
        "2",
        "A7",
        "DB20.DBX1.3",
        "",
        "bool",
        "3",
        "",
    ]
    .join("\t")
}

/// 행 목록으로 TSV 파일을 씁니다.
pub fn write_tsv(dir: &Path, name: &str, rows: &[String]) -> PathBuf {
    let path = dir.join(name);
    let mut content = rows.join("\n");
    content.push('\n');
    std::fs::write(&path, content).expect("write tsv");
    path
}

/// 조건이 참이 될 때까지 기다립니다.
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check().await
}

/// 장애를 주입할 수 있는 저장소 (내부는 [`MemoryStore`])
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    /// 이 msg_id를 가진 메시지 저장은 실패
    pub reject_msg_ids: Mutex<HashSet<String>>,
    /// 완료 기록 실패 여부
    pub fail_ledger: AtomicBool,
    /// 메시지 저장마다 지연
    pub insert_delay: Mutex<Duration>,
    pub ledger_checks: AtomicUsize,
}

impl FlakyStore {
    pub fn rejecting(msg_ids: &[&str]) -> Self {
        let store = Self::default();
        store
            .reject_msg_ids
            .lock()
            .unwrap()
            .extend(msg_ids.iter().map(|s| (*s).to_owned()));
        store
    }

    pub fn with_insert_delay(delay: Duration) -> Self {
        let store = Self::default();
        *store.insert_delay.lock().unwrap() = delay;
        store
    }
}

impl RecordStore for FlakyStore {
    async fn insert_message(&self, message: &Message) -> Result<(), StorageError> {
        let delay = *self.insert_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let rejected = self.reject_msg_ids.lock().unwrap().contains(&message.msg_id);
        if rejected {
            return Err(StorageError::Unavailable("constraint violation".to_owned()));
        }
        self.inner.insert_message(message).await
    }

    async fn insert_parse_failure(&self, failure: &ParseFailure) -> Result<(), StorageError> {
        self.inner.insert_parse_failure(failure).await
    }

    async fn messages_for_unit(&self, unit: Uuid) -> Result<Vec<Message>, StorageError> {
        self.inner.messages_for_unit(unit).await
    }
}

impl CompletionLedger for FlakyStore {
    async fn is_complete(&self, file: &Path) -> Result<bool, StorageError> {
        self.ledger_checks.fetch_add(1, Ordering::SeqCst);
        self.inner.is_complete(file).await
    }

    async fn record_completion(
        &self,
        file: &Path,
        status: CompletionStatus,
    ) -> Result<(), StorageError> {
        if self.fail_ledger.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("ledger offline".to_owned()));
        }
        self.inner.record_completion(file, status).await
    }
}

/// 호출된 유닛을 기록하는 리포트 생성기
#[derive(Default)]
pub struct CountingReports {
    pub calls: Mutex<Vec<Uuid>>,
}

impl CountingReports {
    pub fn calls(&self) -> Vec<Uuid> {
        self.calls.lock().unwrap().clone()
    }
}

impl ReportTrigger for CountingReports {
    async fn generate(&self, unit: Uuid) -> Result<(), ReportError> {
        self.calls.lock().unwrap().push(unit);
        Ok(())
    }
}
