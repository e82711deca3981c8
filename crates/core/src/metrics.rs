//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 컴포넌트는 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logdrop_`
//! - 컴포넌트명: `ingest_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 레이블 키 (success, failed, aborted)
pub const LABEL_RESULT: &str = "result";

// ─── Ingest 메트릭 ─────────────────────────────────────────────────

/// Ingest: 완료된 스캔 수 (counter)
pub const INGEST_SCANS_TOTAL: &str = "logdrop_ingest_scans_total";

/// Ingest: 큐에 넣은 파일 수 (counter)
pub const INGEST_FILES_ENQUEUED_TOTAL: &str = "logdrop_ingest_files_enqueued_total";

/// Ingest: 처리를 마친 파일 수 (counter, label: result)
pub const INGEST_FILES_PROCESSED_TOTAL: &str = "logdrop_ingest_files_processed_total";

/// Ingest: 저장된 메시지 수 (counter)
pub const INGEST_ROWS_STORED_TOTAL: &str = "logdrop_ingest_rows_stored_total";

/// Ingest: 행 단위 파싱 실패 수 (counter)
pub const INGEST_PARSE_FAILURES_TOTAL: &str = "logdrop_ingest_parse_failures_total";

/// Ingest: 리포트 생성 수 (counter, label: result)
pub const INGEST_REPORTS_TOTAL: &str = "logdrop_ingest_reports_total";

/// Ingest: 처리 중인 파일 수 (gauge)
pub const INGEST_IN_FLIGHT_FILES: &str = "logdrop_ingest_in_flight_files";

/// Ingest: 파일 하나 처리 시간 (histogram, 초)
pub const INGEST_FILE_DURATION_SECONDS: &str = "logdrop_ingest_file_duration_seconds";

// ─── Daemon 메트릭 ─────────────────────────────────────────────────

/// Daemon: 빌드 정보 (gauge, 항상 1)
pub const DAEMON_BUILD_INFO: &str = "logdrop_daemon_build_info";

/// 파일 처리 시간 히스토그램 버킷 (초)
pub const FILE_DURATION_BUCKETS: [f64; 9] = [0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 120.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다. 레코더가 없어도 안전합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(INGEST_SCANS_TOTAL, "Directory scans completed");
    describe_counter!(
        INGEST_FILES_ENQUEUED_TOTAL,
        "Files handed to the worker queue"
    );
    describe_counter!(
        INGEST_FILES_PROCESSED_TOTAL,
        "Files finished by workers, by result (success, failed, aborted)"
    );
    describe_counter!(INGEST_ROWS_STORED_TOTAL, "Rows stored as messages");
    describe_counter!(
        INGEST_PARSE_FAILURES_TOTAL,
        "Rows rejected by validation or storage"
    );
    describe_counter!(
        INGEST_REPORTS_TOTAL,
        "Unit reports generated, by result (success, failed)"
    );
    describe_gauge!(
        INGEST_IN_FLIGHT_FILES,
        "Files currently queued or being processed"
    );
    describe_histogram!(
        INGEST_FILE_DURATION_SECONDS,
        "Time spent processing one file in seconds"
    );
    describe_gauge!(DAEMON_BUILD_INFO, "Build information (always 1)");
}
