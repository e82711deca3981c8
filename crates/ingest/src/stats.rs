//! 파이프라인 처리 카운터

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// 파이프라인 전역 처리 카운터
///
/// 스캐너와 워커가 공유하며, [`snapshot`](Self::snapshot)으로 읽습니다.
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub(crate) scans: AtomicU64,
    pub(crate) files_enqueued: AtomicU64,
    pub(crate) files_succeeded: AtomicU64,
    pub(crate) files_failed: AtomicU64,
    pub(crate) files_aborted: AtomicU64,
    pub(crate) rows_stored: AtomicU64,
    pub(crate) parse_failures: AtomicU64,
    pub(crate) reports_generated: AtomicU64,
    pub(crate) reports_failed: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// 현재 카운터 값을 읽습니다.
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            scans: load(&self.scans),
            files_enqueued: load(&self.files_enqueued),
            files_succeeded: load(&self.files_succeeded),
            files_failed: load(&self.files_failed),
            files_aborted: load(&self.files_aborted),
            rows_stored: load(&self.rows_stored),
            parse_failures: load(&self.parse_failures),
            reports_generated: load(&self.reports_generated),
            reports_failed: load(&self.reports_failed),
        }
    }
}

/// 카운터 스냅샷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub scans: u64,
    pub files_enqueued: u64,
    pub files_succeeded: u64,
    pub files_failed: u64,
    pub files_aborted: u64,
    pub rows_stored: u64,
    pub parse_failures: u64,
    pub reports_generated: u64,
    pub reports_failed: u64,
}

impl StatsSnapshot {
    /// 완료 기록까지 끝났거나 중단된 파일 수
    pub fn files_finished(&self) -> u64 {
        self.files_succeeded + self.files_failed + self.files_aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let stats = PipelineStats::new();
        PipelineStats::add(&stats.files_succeeded, 2);
        PipelineStats::add(&stats.files_aborted, 1);
        PipelineStats::add(&stats.rows_stored, 10);

        let snap = stats.snapshot();
        assert_eq!(snap.files_succeeded, 2);
        assert_eq!(snap.rows_stored, 10);
        assert_eq!(snap.files_finished(), 3);
    }
}
