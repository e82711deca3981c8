//! logdrop 공통 크레이트
//!
//! 수집 파이프라인과 데몬이 공유하는 도메인 타입, 에러, 설정,
//! 생명주기/협력자 trait, 메트릭 이름을 정의합니다.

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, LogdropError, PipelineError, ReportError, StorageError};

// 설정
pub use config::LogdropConfig;

// 파이프라인 trait
pub use pipeline::{
    BoxFuture, CompletionLedger, DynPipeline, HealthStatus, Pipeline, RecordStore, ReportTrigger,
};

// 도메인 타입
pub use types::{CompletionRecord, CompletionStatus, Message, ParseFailure};
