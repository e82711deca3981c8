//! 처리 중 파일 집합
//!
//! 스캐너가 같은 파일을 두 번 큐에 넣지 않도록, 큐에 들어갔거나 워커가
//! 처리 중인 파일 경로를 메모리에만 기록합니다. 재시작하면 비어 있는 상태로
//! 시작하며, 이미 끝난 파일은 완료 원장이 걸러냅니다.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use logdrop_core::metrics as m;

/// 처리 중 파일 집합
///
/// 검사와 삽입은 하나의 잠금 구간에서 수행되므로 여러 스캐너와 워커가
/// 동시에 사용해도 같은 파일이 두 번 등록되지 않습니다.
#[derive(Debug, Default)]
pub struct InFlightSet {
    entries: Mutex<HashSet<PathBuf>>,
}

impl InFlightSet {
    /// 빈 집합을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    // 잠금을 쥔 채 패닉이 나도 집합 자체는 일관된 상태이므로 그대로 사용합니다.
    fn lock(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 파일을 등록합니다. 새로 등록된 경우에만 `true`를 반환합니다.
    pub fn try_add(&self, path: &Path) -> bool {
        let mut entries = self.lock();
        let added = entries.insert(path.to_path_buf());
        if added {
            metrics::gauge!(m::INGEST_IN_FLIGHT_FILES).set(entries.len() as f64);
        }
        added
    }

    /// 파일 등록을 해제합니다. 등록되어 있지 않아도 에러가 아닙니다.
    pub fn remove(&self, path: &Path) {
        let mut entries = self.lock();
        if entries.remove(path) {
            metrics::gauge!(m::INGEST_IN_FLIGHT_FILES).set(entries.len() as f64);
        }
    }

    /// 파일이 등록되어 있는지 확인합니다.
    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains(path)
    }

    /// 등록된 파일 수
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// 반환된 가드가 drop될 때 `path`를 해제합니다.
    ///
    /// 워커가 파일 처리 중 패닉하더라도 등록이 남지 않습니다.
    pub fn release_on_drop(self: &Arc<Self>, path: PathBuf) -> InFlightRelease {
        InFlightRelease {
            set: Arc::clone(self),
            path,
        }
    }
}

/// drop 시 처리 중 등록을 해제하는 가드
#[derive(Debug)]
pub struct InFlightRelease {
    set: Arc<InFlightSet>,
    path: PathBuf,
}

impl InFlightRelease {
    /// 가드가 해제할 경로
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InFlightRelease {
    fn drop(&mut self) {
        self.set.remove(&self.path);
    }
}
