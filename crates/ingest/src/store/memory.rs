//! 메모리 저장소

use std::path::Path;

use tokio::sync::Mutex;
use uuid::Uuid;

use logdrop_core::error::StorageError;
use logdrop_core::pipeline::{CompletionLedger, RecordStore};
use logdrop_core::types::{file_key, CompletionRecord, CompletionStatus, Message, ParseFailure};

/// 프로세스 메모리에 모든 기록을 보관하는 저장소
///
/// 재시작하면 내용이 사라지므로 테스트와 임베딩 용도로만 사용합니다.
#[derive(Debug, Default)]
pub struct MemoryStore {
    messages: Mutex<Vec<Message>>,
    failures: Mutex<Vec<ParseFailure>>,
    completions: Mutex<Vec<CompletionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 메시지 스냅샷 (저장 순서)
    pub async fn messages(&self) -> Vec<Message> {
        self.messages.lock().await.clone()
    }

    /// 저장된 파싱 실패 스냅샷
    pub async fn parse_failures(&self) -> Vec<ParseFailure> {
        self.failures.lock().await.clone()
    }

    /// 완료 기록 스냅샷
    pub async fn completions(&self) -> Vec<CompletionRecord> {
        self.completions.lock().await.clone()
    }
}

impl RecordStore for MemoryStore {
    async fn insert_message(&self, message: &Message) -> Result<(), StorageError> {
        self.messages.lock().await.push(message.clone());
        Ok(())
    }

    async fn insert_parse_failure(&self, failure: &ParseFailure) -> Result<(), StorageError> {
        self.failures.lock().await.push(failure.clone());
        Ok(())
    }

    async fn messages_for_unit(&self, unit: Uuid) -> Result<Vec<Message>, StorageError> {
        let mut found: Vec<Message> = self
            .messages
            .lock()
            .await
            .iter()
            .filter(|m| m.unit_guid == unit)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}

impl CompletionLedger for MemoryStore {
    async fn is_complete(&self, file: &Path) -> Result<bool, StorageError> {
        let key = file_key(file);
        Ok(self
            .completions
            .lock()
            .await
            .iter()
            .any(|record| record.filename == key))
    }

    async fn record_completion(
        &self,
        file: &Path,
        status: CompletionStatus,
    ) -> Result<(), StorageError> {
        self.completions
            .lock()
            .await
            .push(CompletionRecord::new(file, status));
        Ok(())
    }
}
