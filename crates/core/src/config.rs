//! 설정 관리 -- logdrop.toml 파싱 및 런타임 설정
//!
//! [`LogdropConfig`]는 모든 컴포넌트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGDROP_INGEST_WORKERS=8` 형식)
//! 3. 설정 파일 (`logdrop.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logdrop_core::error::LogdropError> {
//! use logdrop_core::config::LogdropConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LogdropConfig::load("logdrop.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LogdropConfig::parse("[ingest]\nworkers = 8")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LogdropError};

/// 워커 수 상한
pub const MAX_WORKERS: usize = 256;
/// 작업 큐 용량 상한
pub const MAX_QUEUE_CAPACITY: usize = 100_000;
/// 스캔 주기 상한 (초, 하루)
pub const MAX_SCAN_INTERVAL_SECS: u64 = 86_400;

/// logdrop 통합 설정
///
/// `logdrop.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogdropConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 수집 파이프라인 설정
    #[serde(default)]
    pub ingest: IngestConfig,
    /// 저장소 설정
    #[serde(default)]
    pub storage: StorageConfig,
    /// 리포트 설정
    #[serde(default)]
    pub report: ReportConfig,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl LogdropConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogdropError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogdropError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogdropError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogdropError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LogdropError> {
        toml::from_str(toml_str).map_err(|e| {
            LogdropError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGDROP_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGDROP_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGDROP_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.pid_file, "LOGDROP_GENERAL_PID_FILE");

        // Ingest
        override_string(&mut self.ingest.input_dir, "LOGDROP_INGEST_INPUT_DIR");
        override_string(&mut self.ingest.file_suffix, "LOGDROP_INGEST_FILE_SUFFIX");
        override_u64(
            &mut self.ingest.scan_interval_secs,
            "LOGDROP_INGEST_SCAN_INTERVAL_SECS",
        );
        override_usize(&mut self.ingest.workers, "LOGDROP_INGEST_WORKERS");
        override_usize(
            &mut self.ingest.queue_capacity,
            "LOGDROP_INGEST_QUEUE_CAPACITY",
        );
        override_u64(&mut self.ingest.max_file_size, "LOGDROP_INGEST_MAX_FILE_SIZE");
        override_u64(
            &mut self.ingest.storage_timeout_secs,
            "LOGDROP_INGEST_STORAGE_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.ingest.report_timeout_secs,
            "LOGDROP_INGEST_REPORT_TIMEOUT_SECS",
        );

        // Storage / Report
        override_string(&mut self.storage.data_dir, "LOGDROP_STORAGE_DATA_DIR");
        override_string(&mut self.report.output_dir, "LOGDROP_REPORT_OUTPUT_DIR");

        // Metrics
        override_bool(&mut self.metrics.enabled, "LOGDROP_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "LOGDROP_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "LOGDROP_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogdropError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        validate_dir("ingest.input_dir", &self.ingest.input_dir)?;
        validate_dir("storage.data_dir", &self.storage.data_dir)?;
        validate_dir("report.output_dir", &self.report.output_dir)?;

        let suffix = &self.ingest.file_suffix;
        if suffix.is_empty() || suffix.contains('.') || suffix.contains('/') {
            return Err(invalid(
                "ingest.file_suffix",
                "must be a bare extension such as 'tsv'",
            ));
        }

        if self.ingest.workers == 0 || self.ingest.workers > MAX_WORKERS {
            return Err(invalid(
                "ingest.workers",
                format!("must be between 1 and {MAX_WORKERS}"),
            ));
        }

        if self.ingest.queue_capacity == 0 || self.ingest.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(invalid(
                "ingest.queue_capacity",
                format!("must be between 1 and {MAX_QUEUE_CAPACITY}"),
            ));
        }

        if self.ingest.scan_interval_secs == 0
            || self.ingest.scan_interval_secs > MAX_SCAN_INTERVAL_SECS
        {
            return Err(invalid(
                "ingest.scan_interval_secs",
                format!("must be between 1 and {MAX_SCAN_INTERVAL_SECS}"),
            ));
        }

        if self.ingest.max_file_size == 0 {
            return Err(invalid("ingest.max_file_size", "must be greater than 0"));
        }

        if self.ingest.storage_timeout_secs == 0 {
            return Err(invalid(
                "ingest.storage_timeout_secs",
                "must be greater than 0",
            ));
        }

        if self.ingest.report_timeout_secs == 0 {
            return Err(invalid(
                "ingest.report_timeout_secs",
                "must be greater than 0",
            ));
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(invalid(
                "metrics.port",
                "must be non-zero when metrics are enabled",
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> LogdropError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

fn validate_dir(field: &str, dir: &str) -> Result<(), LogdropError> {
    if dir.trim().is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    if Path::new(dir)
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        return Err(invalid(field, "must not contain '..'"));
    }
    Ok(())
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// PID 파일 경로 (빈 문자열이면 사용 안 함)
    pub pid_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            pid_file: String::new(),
        }
    }
}

/// 수집 파이프라인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// 감시 디렉토리
    pub input_dir: String,
    /// 대상 파일 확장자 (점 없이)
    pub file_suffix: String,
    /// 스캔 주기 (초)
    pub scan_interval_secs: u64,
    /// 워커 수
    pub workers: usize,
    /// 작업 큐 용량
    pub queue_capacity: usize,
    /// 처리할 최대 파일 크기 (바이트)
    pub max_file_size: u64,
    /// 저장소/원장 호출 제한 시간 (초)
    pub storage_timeout_secs: u64,
    /// 리포트 생성 제한 시간 (초)
    pub report_timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            input_dir: "/var/lib/logdrop/incoming".to_owned(),
            file_suffix: "tsv".to_owned(),
            scan_interval_secs: 30,
            workers: 4,
            queue_capacity: 100,
            max_file_size: 64 * 1024 * 1024, // 64MB
            storage_timeout_secs: 30,
            report_timeout_secs: 60,
        }
    }
}

/// 저장소 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON Lines 데이터 디렉토리
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "/var/lib/logdrop/data".to_owned(),
        }
    }
}

/// 리포트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// 리포트 출력 디렉토리
    pub output_dir: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: "/var/lib/logdrop/reports".to_owned(),
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 리스닝 주소
    pub listen_addr: String,
    /// 리스닝 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9187,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    override_parsed(target, env_key, "bool");
}

fn override_usize(target: &mut usize, env_key: &str) {
    override_parsed(target, env_key, "usize");
}

fn override_u16(target: &mut u16, env_key: &str) {
    override_parsed(target, env_key, "u16");
}

fn override_u64(target: &mut u64, env_key: &str) {
    override_parsed(target, env_key, "u64");
}

fn override_parsed<T: std::str::FromStr>(target: &mut T, env_key: &str, type_name: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                expected = type_name,
                "failed to parse env var, ignoring"
            ),
        }
    }
}
