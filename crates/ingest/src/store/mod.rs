//! 저장소 구현
//!
//! core의 [`RecordStore`](logdrop_core::RecordStore)와
//! [`CompletionLedger`](logdrop_core::CompletionLedger) 구현을 제공합니다.
//!
//! - [`JsonlStore`]: 데이터 디렉토리의 append-only JSON Lines 파일 (데몬 기본값)
//! - [`MemoryStore`]: 프로세스 메모리 (테스트/임베딩용)

mod jsonl;
mod memory;

pub use jsonl::{JsonlStore, MESSAGES_FILE, PARSE_ERRORS_FILE, PROCESSED_FILES_FILE};
pub use memory::MemoryStore;

use std::future::Future;
use std::time::Duration;

use logdrop_core::error::StorageError;

/// 저장소 호출을 제한 시간 안에서 실행합니다.
pub(crate) async fn bounded<T>(
    operation: &str,
    limit: Duration,
    fut: impl Future<Output = Result<T, StorageError>>,
) -> Result<T, StorageError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(StorageError::Timeout {
            operation: operation.to_owned(),
            millis: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}
