//! 파이프라인 trait -- 생명주기와 외부 협력자 확장 포인트 정의
//!
//! - [`Pipeline`]: 시작/정지/헬스 체크 생명주기
//! - [`CompletionLedger`]: 파일 완료 원장
//! - [`RecordStore`]: 메시지/파싱 실패 저장소
//! - [`ReportTrigger`]: 그룹 키 단위 리포트 생성기
//!
//! 협력자 trait은 반환 위치 `impl Future`를 사용하므로 제네릭으로 사용합니다.
//! 트레이트 객체가 필요하면 [`DynPipeline`]처럼 박싱된 변형을 사용합니다.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use serde::Serialize;
use uuid::Uuid;

use crate::error::{LogdropError, ReportError, StorageError};
use crate::types::{CompletionStatus, Message, ParseFailure};

/// 박싱된 `Send` future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 컴포넌트 헬스 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum HealthStatus {
    /// 정상 동작
    Healthy,
    /// 동작하지만 성능 저하
    Degraded(String),
    /// 동작 불가
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 여부
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 동작 불가 여부
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

/// 파이프라인 생명주기 trait
///
/// `start` 이후 `stop`이 완료되면 큐에 남은 작업이 모두 끝난 상태여야 합니다.
pub trait Pipeline: Send + Sync {
    /// 백그라운드 태스크를 시작합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), LogdropError>> + Send;

    /// 정지 신호를 보내고 처리 중인 작업이 끝날 때까지 기다립니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), LogdropError>> + Send;

    /// 현재 헬스 상태를 반환합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

/// 트레이트 객체로 사용할 수 있는 [`Pipeline`] 변형
///
/// 모든 `Pipeline` 구현에 대해 blanket 구현이 제공됩니다.
pub trait DynPipeline: Send + Sync {
    fn start(&mut self) -> BoxFuture<'_, Result<(), LogdropError>>;
    fn stop(&mut self) -> BoxFuture<'_, Result<(), LogdropError>>;
    fn health_check(&self) -> BoxFuture<'_, HealthStatus>;
}

impl<T: Pipeline> DynPipeline for T {
    fn start(&mut self) -> BoxFuture<'_, Result<(), LogdropError>> {
        Box::pin(Pipeline::start(self))
    }

    fn stop(&mut self) -> BoxFuture<'_, Result<(), LogdropError>> {
        Box::pin(Pipeline::stop(self))
    }

    fn health_check(&self) -> BoxFuture<'_, HealthStatus> {
        Box::pin(Pipeline::health_check(self))
    }
}

/// 파일 완료 원장
///
/// 스캐너가 큐에 넣기 전에 조회하고, 파서가 파일 처리 후 기록합니다.
/// 상태와 관계없이 완료 기록이 있는 파일은 다시 처리하지 않습니다.
pub trait CompletionLedger: Send + Sync + 'static {
    /// 파일의 완료 기록이 있는지 확인합니다.
    fn is_complete(&self, file: &Path) -> impl Future<Output = Result<bool, StorageError>> + Send;

    /// 파일 완료 기록을 남깁니다.
    fn record_completion(
        &self,
        file: &Path,
        status: CompletionStatus,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// 메시지 및 파싱 실패 저장소
pub trait RecordStore: Send + Sync + 'static {
    /// 메시지 하나를 저장합니다.
    fn insert_message(&self, message: &Message) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// 파싱 실패 기록 하나를 저장합니다.
    fn insert_parse_failure(
        &self,
        failure: &ParseFailure,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// 유닛의 모든 메시지를 최신순으로 조회합니다.
    fn messages_for_unit(&self, unit: Uuid) -> impl Future<Output = Result<Vec<Message>, StorageError>> + Send;
}

/// 그룹 키 단위 리포트 생성기
///
/// 같은 유닛에 대해 여러 번 호출될 수 있으며, 마지막 호출 결과가 남습니다.
pub trait ReportTrigger: Send + Sync + 'static {
    fn generate(&self, unit: Uuid) -> impl Future<Output = Result<(), ReportError>> + Send;
}
