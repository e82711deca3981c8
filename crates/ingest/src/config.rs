//! 수집 파이프라인 설정
//!
//! [`IngestPipelineConfig`]는 core의 [`IngestConfig`](logdrop_core::config::IngestConfig)를
//! 파이프라인에서 바로 쓰는 타입(`PathBuf`, `Duration`)으로 변환한 설정입니다.
//!
//! # 사용 예시
//! ```ignore
//! use logdrop_core::config::LogdropConfig;
//! use logdrop_ingest::config::IngestPipelineConfig;
//!
//! let core_config = LogdropConfig::default();
//! let config = IngestPipelineConfig::from_core(&core_config.ingest);
//! ```

use std::path::{Component, PathBuf};
use std::time::Duration;

use logdrop_core::config::{IngestConfig, MAX_QUEUE_CAPACITY, MAX_WORKERS};

use crate::error::IngestError;

/// 수집 파이프라인 설정
#[derive(Debug, Clone)]
pub struct IngestPipelineConfig {
    /// 감시 디렉토리 (재귀 탐색 안 함)
    pub input_dir: PathBuf,
    /// 대상 파일 확장자 (점 없이)
    pub file_suffix: String,
    /// 스캔 주기
    pub scan_interval: Duration,
    /// 워커 수
    pub workers: usize,
    /// 작업 큐 용량
    pub queue_capacity: usize,
    /// 처리할 최대 파일 크기 (바이트)
    pub max_file_size: u64,
    /// 저장소/원장 호출 제한 시간
    pub storage_timeout: Duration,
    /// 유닛 리포트 생성 제한 시간
    pub report_timeout: Duration,
}

impl Default for IngestPipelineConfig {
    fn default() -> Self {
        Self::from_core(&IngestConfig::default())
    }
}

impl IngestPipelineConfig {
    /// core의 `IngestConfig`에서 파이프라인 설정을 생성합니다.
    pub fn from_core(core: &IngestConfig) -> Self {
        Self {
            input_dir: PathBuf::from(&core.input_dir),
            file_suffix: core.file_suffix.clone(),
            scan_interval: Duration::from_secs(core.scan_interval_secs),
            workers: core.workers,
            queue_capacity: core.queue_capacity,
            max_file_size: core.max_file_size,
            storage_timeout: Duration::from_secs(core.storage_timeout_secs),
            report_timeout: Duration::from_secs(core.report_timeout_secs),
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.input_dir.as_os_str().is_empty() {
            return Err(config_error("input_dir", "must not be empty"));
        }

        if self
            .input_dir
            .components()
            .any(|c| c == Component::ParentDir)
        {
            return Err(config_error(
                "input_dir",
                format!(
                    "'{}' contains path traversal pattern '..'",
                    self.input_dir.display()
                ),
            ));
        }

        if self.file_suffix.is_empty()
            || self.file_suffix.contains('.')
            || self.file_suffix.contains('/')
        {
            return Err(config_error(
                "file_suffix",
                format!("'{}' is not a bare extension", self.file_suffix),
            ));
        }

        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(config_error(
                "workers",
                format!("must be between 1 and {MAX_WORKERS}"),
            ));
        }

        if self.queue_capacity == 0 || self.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(config_error(
                "queue_capacity",
                format!("must be between 1 and {MAX_QUEUE_CAPACITY}"),
            ));
        }

        if self.scan_interval.is_zero() {
            return Err(config_error("scan_interval", "must be greater than 0"));
        }

        if self.max_file_size == 0 {
            return Err(config_error("max_file_size", "must be greater than 0"));
        }

        if self.storage_timeout.is_zero() {
            return Err(config_error("storage_timeout", "must be greater than 0"));
        }

        if self.report_timeout.is_zero() {
            return Err(config_error("report_timeout", "must be greater than 0"));
        }

        Ok(())
    }
}

fn config_error(field: &str, reason: impl Into<String>) -> IngestError {
    IngestError::Config {
        field: field.to_owned(),
        reason: reason.into(),
    }
}
