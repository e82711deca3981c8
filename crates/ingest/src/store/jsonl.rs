//! JSON Lines 파일 저장소
//!
//! 데이터 디렉토리 아래 세 개의 append-only 파일을 사용합니다.
//!
//! | 파일 | 내용 |
//! |------|------|
//! | `messages.jsonl` | 저장된 메시지 |
//! | `parse_errors.jsonl` | 행 단위 파싱 실패 |
//! | `processed_files.jsonl` | 파일 완료 원장 |
//!
//! 한 줄이 JSON 문서 하나입니다. 파일마다 쓰기는 직렬화되며, 원장은
//! 기록마다 `sync_data`로 디스크에 반영합니다. 손상된 줄은 경고 후 건너뜁니다.
//! 이전 쓰기가 중간에 끊겨 파일이 줄바꿈으로 끝나지 않으면, 다음 기록 앞에
//! 줄바꿈을 넣어 새 기록이 잘린 줄에 붙지 않게 합니다.

use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use logdrop_core::error::StorageError;
use logdrop_core::pipeline::{CompletionLedger, RecordStore};
use logdrop_core::types::{file_key, CompletionRecord, CompletionStatus, Message, ParseFailure};

/// 메시지 파일 이름
pub const MESSAGES_FILE: &str = "messages.jsonl";
/// 파싱 실패 파일 이름
pub const PARSE_ERRORS_FILE: &str = "parse_errors.jsonl";
/// 완료 원장 파일 이름
pub const PROCESSED_FILES_FILE: &str = "processed_files.jsonl";

/// JSON Lines 파일 저장소
///
/// 완료 원장은 열 때 한 번 읽어 메모리 인덱스로 유지하므로
/// `is_complete`는 디스크를 읽지 않습니다.
#[derive(Debug)]
pub struct JsonlStore {
    dir: PathBuf,
    messages: Mutex<()>,
    failures: Mutex<()>,
    /// 파일 키 -> 마지막 완료 상태
    ledger: Mutex<HashMap<String, CompletionStatus>>,
}

impl JsonlStore {
    /// 데이터 디렉토리를 열고 완료 원장을 로드합니다.
    ///
    /// 디렉토리가 없으면 생성합니다.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;

        let records: Vec<CompletionRecord> = read_lines(&dir.join(PROCESSED_FILES_FILE)).await?;
        let ledger: HashMap<String, CompletionStatus> = records
            .into_iter()
            .map(|record| (record.filename, record.status))
            .collect();

        debug!(
            dir = %dir.display(),
            completed = ledger.len(),
            "opened jsonl store"
        );

        Ok(Self {
            dir,
            messages: Mutex::new(()),
            failures: Mutex::new(()),
            ledger: Mutex::new(ledger),
        })
    }

    /// 데이터 디렉토리 경로
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 완료 기록이 있는 파일 수
    pub async fn completed_count(&self) -> usize {
        self.ledger.lock().await.len()
    }

    /// 파일의 마지막 완료 상태
    pub async fn completion_status(&self, file: &Path) -> Option<CompletionStatus> {
        self.ledger.lock().await.get(&file_key(file)).copied()
    }

    /// 저장된 파싱 실패 전체를 읽습니다.
    pub async fn parse_failures(&self) -> Result<Vec<ParseFailure>, StorageError> {
        let _guard = self.failures.lock().await;
        read_lines(&self.dir.join(PARSE_ERRORS_FILE)).await
    }
}

impl RecordStore for JsonlStore {
    async fn insert_message(&self, message: &Message) -> Result<(), StorageError> {
        let _guard = self.messages.lock().await;
        append_line(&self.dir.join(MESSAGES_FILE), message, false).await
    }

    async fn insert_parse_failure(&self, failure: &ParseFailure) -> Result<(), StorageError> {
        let _guard = self.failures.lock().await;
        append_line(&self.dir.join(PARSE_ERRORS_FILE), failure, false).await
    }

    async fn messages_for_unit(&self, unit: Uuid) -> Result<Vec<Message>, StorageError> {
        let all: Vec<Message> = {
            let _guard = self.messages.lock().await;
            read_lines(&self.dir.join(MESSAGES_FILE)).await?
        };
        let mut found: Vec<Message> = all.into_iter().filter(|m| m.unit_guid == unit).collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}

impl CompletionLedger for JsonlStore {
    async fn is_complete(&self, file: &Path) -> Result<bool, StorageError> {
        Ok(self.ledger.lock().await.contains_key(&file_key(file)))
    }

    async fn record_completion(
        &self,
        file: &Path,
        status: CompletionStatus,
    ) -> Result<(), StorageError> {
        let record = CompletionRecord::new(file, status);
        let mut ledger = self.ledger.lock().await;
        append_line(&self.dir.join(PROCESSED_FILES_FILE), &record, true).await?;
        ledger.insert(record.filename, status);
        Ok(())
    }
}

fn io_error(path: &Path, err: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

async fn append_line<T: Serialize>(path: &Path, value: &T, sync: bool) -> Result<(), StorageError> {
    let mut line =
        serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
    line.push('\n');

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| io_error(path, e))?;
    if !ends_with_newline(&mut file).await.map_err(|e| io_error(path, e))? {
        warn!(path = %path.display(), "file does not end with newline, separating torn line");
        line.insert(0, '\n');
    }
    file.write_all(line.as_bytes())
        .await
        .map_err(|e| io_error(path, e))?;
    file.flush().await.map_err(|e| io_error(path, e))?;
    if sync {
        file.sync_data().await.map_err(|e| io_error(path, e))?;
    }
    Ok(())
}

/// 빈 파일이거나 마지막 바이트가 `\n`이면 `true`
async fn ends_with_newline(file: &mut tokio::fs::File) -> std::io::Result<bool> {
    if file.metadata().await?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] == b'\n')
}

/// JSON Lines 파일을 읽습니다. 파일이 없으면 빈 목록입니다.
async fn read_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StorageError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_error(path, e)),
    };

    let mut values = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(value) => values.push(value),
            Err(e) => warn!(
                path = %path.display(),
                line = idx + 1,
                error = %e,
                "skipping corrupt jsonl line"
            ),
        }
    }
    Ok(values)
}
