//! logdrop 수집 파이프라인
//!
//! 감시 디렉토리에 떨어진 TSV 파일을 주기적으로 찾아 워커 풀에서 파싱하고,
//! 행 단위 결과와 파일 단위 완료 기록을 저장합니다.
//!
//! # 아키텍처
//! ```text
//! DirectoryScanner -> mpsc (WorkQueue) -> Workers -> FileIngestor -> RecordStore / CompletionLedger
//!                                            \-> ReportTrigger (유닛별)
//! ```
//!
//! - [`InFlightSet`]: 큐에 있거나 처리 중인 파일의 중복 등록 방지
//! - [`DirectoryScanner`]: 완료/처리 중 파일을 제외하고 큐에 넣음 (큐가 차면 대기)
//! - [`worker`]: 고정 개수 워커가 큐를 비울 때까지 처리
//! - [`FileIngestor`]: 행 검증, 저장, 완료 기록
//! - [`IngestPipeline`]: core의 `Pipeline` trait 구현

pub mod config;
pub mod error;
pub mod inflight;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod scanner;
pub mod stats;
pub mod store;
pub mod worker;

pub use config::IngestPipelineConfig;
pub use error::IngestError;
pub use inflight::InFlightSet;
pub use parser::{FileIngestor, IngestedFile};
pub use pipeline::{IngestPipeline, IngestPipelineBuilder};
pub use report::TextReportRenderer;
pub use scanner::{DirectoryScanner, ScanReport};
pub use stats::{PipelineStats, StatsSnapshot};
pub use store::{JsonlStore, MemoryStore};
