//! 수집 파이프라인 에러 타입
//!
//! [`IngestError`]는 파이프라인 내부에서 발생하는 에러를 표현합니다.
//! `From<IngestError> for LogdropError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.
//!
//! 행 단위 검증 실패는 에러가 아니라 [`ParseFailure`](logdrop_core::ParseFailure)
//! 기록으로 남습니다. 여기에는 파일 단위 또는 파이프라인 단위 실패만 포함됩니다.

use logdrop_core::error::{ConfigError, LogdropError, PipelineError, StorageError};

/// 수집 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// 파일을 읽을 수 없음 (구조적 실패, 다음 스캔에서 재시도)
    #[error("read error: {path}: {reason}")]
    Read {
        /// 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 파일을 행으로 디코딩할 수 없음 (잘못된 인코딩 등, 다음 스캔에서 재시도)
    #[error("decode error: {path}: {reason}")]
    Decode {
        /// 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 저장소/원장 에러
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// 파일 하나의 처리를 중단시키는 구조적 실패인지 여부
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Decode { .. })
    }
}

impl From<IngestError> for LogdropError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Config { field, reason } => {
                LogdropError::Config(ConfigError::InvalidValue { field, reason })
            }
            IngestError::Storage(e) => LogdropError::Storage(e),
            IngestError::Io(e) => LogdropError::Io(e),
            IngestError::Channel(reason) => LogdropError::Pipeline(PipelineError::ChannelSend(reason)),
            other => LogdropError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}
