//! 에러 타입 -- 설정, 파이프라인, 저장소, 리포트 계층별 에러

/// logdrop 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LogdropError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 스토리지 에러
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// 리포트 생성 에러
    #[error("report error: {0}")]
    Report(#[from] ReportError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 채널 전송 실패
    #[error("channel send failed: {0}")]
    ChannelSend(String),

    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 이미 실행 중
    #[error("pipeline is already running")]
    AlreadyRunning,

    /// 실행 중이 아님
    #[error("pipeline is not running")]
    NotRunning,
}

/// 스토리지 에러
///
/// 레코드 저장소와 완료 원장 구현이 공통으로 반환합니다.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 파일 I/O 실패
    #[error("storage io failed at {path}: {reason}")]
    Io { path: String, reason: String },

    /// 직렬화/역직렬화 실패
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// 제한 시간 초과
    #[error("{operation} timed out after {millis}ms")]
    Timeout { operation: String, millis: u64 },

    /// 백엔드 사용 불가
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// 리포트 생성 에러
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// 해당 유닛에 저장된 메시지가 없음
    #[error("no messages stored for unit {unit}")]
    NoMessages { unit: String },

    /// 리포트 파일 쓰기 실패
    #[error("failed to write report {path}: {reason}")]
    Io { path: String, reason: String },

    /// 메시지 조회 실패
    #[error("failed to load messages: {0}")]
    Storage(#[from] StorageError),

    /// 제한 시간 초과
    #[error("report generation timed out after {millis}ms")]
    Timeout { millis: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_converts_into_top_level() {
        let err: LogdropError = StorageError::Unavailable("closed".to_owned()).into();
        assert!(matches!(err, LogdropError::Storage(_)));
        assert!(err.to_string().contains("closed"));
    }

    #[test]
    fn timeout_message_names_operation() {
        let err = StorageError::Timeout {
            operation: "insert_message".to_owned(),
            millis: 5000,
        };
        assert_eq!(err.to_string(), "insert_message timed out after 5000ms");
    }

    #[test]
    fn report_error_wraps_storage_error() {
        let err: ReportError = StorageError::Serialization("bad json".to_owned()).into();
        assert!(err.to_string().contains("bad json"));
    }
}
