//! # テスト用モックリポジトリ
//!
//! ユースケーステストで使用するインメモリモックリポジトリ。
//! 楽観的ロック（バージョンチェック）を含め、PostgreSQL 実装と
//! 同じ契約で動作する。

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shinsei_domain::{
    appraisal::{AppraisalPeriod, AppraisalPeriodId},
    approval::{ApprovalRequest, ApprovalRequestId, ChangeRequest, ChangeRequestId},
    user::UserId,
    value_objects::Version,
};

use crate::{
    error::InfraError,
    notification::{ApprovalNotifier, Notification},
    repository::{
        AppraisalPeriodRepository, ApprovalRequestRepository, ChangeRequestRepository, Page,
    },
};

// ===== MockApprovalRequestRepository =====

#[derive(Clone, Default)]
pub struct MockApprovalRequestRepository {
    requests: Arc<Mutex<Vec<ApprovalRequest>>>,
}

impl MockApprovalRequestRepository {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn add_request(&self, request: ApprovalRequest) {
        self.requests.lock().unwrap().push(request);
    }
}

#[async_trait]
impl ApprovalRequestRepository for MockApprovalRequestRepository {
    async fn insert(&self, request: &ApprovalRequest) -> Result<(), InfraError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &ApprovalRequestId,
    ) -> Result<Option<ApprovalRequest>, InfraError> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id() == id)
            .cloned())
    }

    async fn find_by_requester(
        &self,
        requester: &UserId,
        page: Page,
    ) -> Result<(Vec<ApprovalRequest>, u64), InfraError> {
        let requests = self.requests.lock().unwrap();
        let mut matched: Vec<ApprovalRequest> = requests
            .iter()
            .filter(|r| r.requester() == requester)
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at().cmp(&a.created_at()));

        let total = matched.len() as u64;
        let paged = matched
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();
        Ok((paged, total))
    }

    async fn find_pending_by_approver(
        &self,
        approver: &UserId,
    ) -> Result<Vec<ApprovalRequest>, InfraError> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.current_approver() == Some(approver))
            .cloned()
            .collect())
    }

    async fn find_all(&self, page: Page) -> Result<(Vec<ApprovalRequest>, u64), InfraError> {
        let requests = self.requests.lock().unwrap();
        let mut all: Vec<ApprovalRequest> = requests.iter().cloned().collect();
        all.sort_by(|a, b| b.created_at().cmp(&a.created_at()));

        let total = all.len() as u64;
        let paged = all
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();
        Ok((paged, total))
    }

    async fn update_with_version_check(
        &self,
        request: &ApprovalRequest,
        expected_version: Version,
    ) -> Result<(), InfraError> {
        let mut requests = self.requests.lock().unwrap();
        // PostgreSQL 実装と同じ契約: 対象行なし（id 不在・バージョン不一致）は競合
        let Some(pos) = requests.iter().position(|r| r.id() == request.id()) else {
            return Err(InfraError::conflict(
                "ApprovalRequest",
                request.id().to_string(),
            ));
        };
        if requests[pos].version() != expected_version {
            return Err(InfraError::conflict(
                "ApprovalRequest",
                request.id().to_string(),
            ));
        }
        requests[pos] = request.clone();
        Ok(())
    }

    async fn delete(&self, id: &ApprovalRequestId) -> Result<bool, InfraError> {
        let mut requests = self.requests.lock().unwrap();
        let before = requests.len();
        requests.retain(|r| r.id() != id);
        Ok(requests.len() < before)
    }
}

// ===== MockChangeRequestRepository =====

#[derive(Clone, Default)]
pub struct MockChangeRequestRepository {
    requests: Arc<Mutex<Vec<ChangeRequest>>>,
}

impl MockChangeRequestRepository {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn add_request(&self, request: ChangeRequest) {
        self.requests.lock().unwrap().push(request);
    }
}

#[async_trait]
impl ChangeRequestRepository for MockChangeRequestRepository {
    async fn insert(&self, request: &ChangeRequest) -> Result<(), InfraError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &ChangeRequestId,
        include_deleted: bool,
    ) -> Result<Option<ChangeRequest>, InfraError> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id() == id && (include_deleted || !r.is_deleted()))
            .cloned())
    }

    async fn find_active(&self) -> Result<Vec<ChangeRequest>, InfraError> {
        let mut active: Vec<ChangeRequest> = self
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| !r.is_deleted())
            .cloned()
            .collect();
        active.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(active)
    }

    async fn update_with_version_check(
        &self,
        request: &ChangeRequest,
        expected_version: Version,
    ) -> Result<(), InfraError> {
        let mut requests = self.requests.lock().unwrap();
        let Some(pos) = requests.iter().position(|r| r.id() == request.id()) else {
            return Err(InfraError::conflict(
                "ChangeRequest",
                request.id().to_string(),
            ));
        };
        if requests[pos].version() != expected_version {
            return Err(InfraError::conflict(
                "ChangeRequest",
                request.id().to_string(),
            ));
        }
        requests[pos] = request.clone();
        Ok(())
    }

    async fn delete_permanently(&self, id: &ChangeRequestId) -> Result<bool, InfraError> {
        let mut requests = self.requests.lock().unwrap();
        let before = requests.len();
        requests.retain(|r| r.id() != id);
        Ok(requests.len() < before)
    }
}

// ===== MockAppraisalPeriodRepository =====

#[derive(Clone, Default)]
pub struct MockAppraisalPeriodRepository {
    periods: Arc<Mutex<Vec<AppraisalPeriod>>>,
}

impl MockAppraisalPeriodRepository {
    pub fn new() -> Self {
        Self {
            periods: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn add_period(&self, period: AppraisalPeriod) {
        self.periods.lock().unwrap().push(period);
    }
}

#[async_trait]
impl AppraisalPeriodRepository for MockAppraisalPeriodRepository {
    async fn find_by_id(
        &self,
        id: &AppraisalPeriodId,
    ) -> Result<Option<AppraisalPeriod>, InfraError> {
        Ok(self
            .periods
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id() == id)
            .cloned())
    }
}

// ===== MockNotifier =====

/// 送信内容を記録するテスト用 Notifier
#[derive(Clone, Default)]
pub struct MockNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// これまでに送信された通知を取得する
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApprovalNotifier for MockNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), InfraError> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}
