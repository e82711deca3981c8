//! 도메인 타입 -- 파이프라인 전역에서 사용되는 공통 타입
//!
//! 파서가 만들고 저장소가 보관하는 레코드, 행 단위 파싱 실패,
//! 파일 단위 완료 기록을 정의합니다.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 파싱된 메시지 레코드
///
/// TSV 한 행에서 만들어지며, 생성 이후 변경되지 않습니다.
/// `unit_guid`는 리포트 생성 단위(그룹 키)입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// 레코드 ID (UUID v4)
    pub id: Uuid,
    pub mqtt: String,
    /// 그룹 키 (장치 식별자)
    pub unit_guid: Uuid,
    pub msg_id: String,
    pub text: String,
    pub context: String,
    pub class: String,
    /// 심각도 (정수)
    pub level: i64,
    pub area: String,
    pub addr: String,
    /// 비어 있거나 공백뿐인 값은 `None`
    pub block: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    /// 비어 있거나 공백뿐인 값은 `None`
    pub bit: Option<String>,
    /// 비어 있거나 공백뿐인 값은 `None`
    pub invert_bit: Option<String>,
    /// 생성 시각
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] unit={} level={} {}",
            self.msg_id, self.unit_guid, self.level, self.text
        )
    }
}

/// 행 단위 파싱 실패 기록
///
/// 검증 또는 저장에 실패한 행마다 하나씩 만들어지며, 재시도하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFailure {
    pub id: Uuid,
    /// 원본 파일 식별자
    pub filename: String,
    /// 문제가 된 원본 행 (필드를 탭으로 다시 이은 문자열)
    pub raw_line: String,
    /// 사람이 읽을 수 있는 실패 사유
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl ParseFailure {
    /// 현재 시각으로 새 실패 기록을 만듭니다.
    pub fn new(filename: impl Into<String>, raw_line: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            raw_line: raw_line.into(),
            reason: reason.into(),
            created_at: Utc::now(),
        }
    }
}

/// 파일 처리 결과 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    /// 모든 행이 저장됨
    Success,
    /// 하나 이상의 행이 실패함 (파일은 처리 완료로 간주)
    Failed,
}

impl CompletionStatus {
    /// 문자열 표현
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 파일 완료 기록
///
/// 파일 하나를 끝까지 처리한 뒤 정확히 한 번 기록됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub id: Uuid,
    /// 파일 식별자
    pub filename: String,
    pub processed_at: DateTime<Utc>,
    pub status: CompletionStatus,
}

impl CompletionRecord {
    /// 현재 시각으로 완료 기록을 만듭니다.
    pub fn new(file: &Path, status: CompletionStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: file_key(file),
            processed_at: Utc::now(),
            status,
        }
    }
}

/// 파일 경로를 저장소 키 문자열로 변환합니다.
///
/// 원장과 파싱 실패 기록은 모두 이 키로 파일을 식별합니다.
pub fn file_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
