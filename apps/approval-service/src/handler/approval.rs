//! # 承認申請 API ハンドラ
//!
//! 承認申請のエンドポイントを実装する。
//! 外部 DTO は camelCase、操作は PATCH の `action` フィールドで指定する。
//!
//! ## エンドポイント
//!
//! ```text
//! POST   /approvals
//! GET    /approvals/my-approvals?userId={id}&page={n}&perPage={n}
//! GET    /approvals/pending?userId={id}
//! GET    /approvals/all?userId={id}&role={role}&page={n}&perPage={n}
//! GET    /approvals/{id}
//! PATCH  /approvals/{id}/approve
//! DELETE /approvals/{id}?userId={id}&role={role}
//! ```

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use shinsei_domain::{
    approval::{
        ApprovalAction, ApprovalRequest, ApprovalRequestId, ApprovalRequestType, OverallStatus,
        WorkflowStep, WorkflowStepStatus,
    },
    user::{Actor, Role, UserId},
    value_objects::Version,
};
use shinsei_infra::repository::{AppraisalPeriodRepository, ApprovalRequestRepository, Page};
use shinsei_shared::{ApiResponse, PageResponse};
use uuid::Uuid;

use crate::{
    error::ServiceError,
    usecase::{ApprovalActionInput, ApprovalUseCaseImpl, CreateApprovalInput},
};

/// 承認申請ハンドラーの State
pub struct ApprovalState<R, P> {
    pub usecase: ApprovalUseCaseImpl<R, P>,
}

// ===== DTO =====

/// ワークフローステップ DTO
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStepDto {
    pub step_name:   String,
    pub approver_id: Uuid,
    pub status:      WorkflowStepStatus,
    pub comments:    Option<String>,
    pub acted_at:    Option<String>,
}

impl WorkflowStepDto {
    pub(crate) fn from_step(step: &WorkflowStep) -> Self {
        Self {
            step_name:   step.step_name().to_string(),
            approver_id: *step.approver().as_uuid(),
            status:      step.status(),
            comments:    step.comments().map(str::to_string),
            acted_at:    step.acted_at().map(|t| t.to_rfc3339()),
        }
    }
}

/// 承認申請 DTO
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequestDto {
    pub id:                  Uuid,
    pub requester_id:        Uuid,
    pub request_type:        ApprovalRequestType,
    pub details:             String,
    pub payload:             serde_json::Value,
    pub status:              OverallStatus,
    pub current_approver_id: Option<Uuid>,
    pub steps:               Vec<WorkflowStepDto>,
    pub version:             u32,
    pub created_at:          String,
    pub updated_at:          String,
}

impl ApprovalRequestDto {
    fn from_request(request: &ApprovalRequest) -> Result<Self, ServiceError> {
        let payload = serde_json::to_value(request.payload())
            .map_err(|e| ServiceError::Internal(format!("ペイロードの変換に失敗: {}", e)))?;

        Ok(Self {
            id: *request.id().as_uuid(),
            requester_id: *request.requester().as_uuid(),
            request_type: request.request_type(),
            details: request.details().as_str().to_string(),
            payload,
            status: request.overall_status(),
            current_approver_id: request.current_approver().map(|u| *u.as_uuid()),
            steps: request.workflow().iter().map(WorkflowStepDto::from_step).collect(),
            version: request.version().as_u32(),
            created_at: request.created_at().to_rfc3339(),
            updated_at: request.updated_at().to_rfc3339(),
        })
    }
}

// ===== リクエスト型 =====

/// 申請作成リクエスト
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApprovalBody {
    pub user_id:      Uuid,
    pub request_type: ApprovalRequestType,
    pub details:      String,
    pub payload:      serde_json::Value,
    pub approvers:    Vec<Uuid>,
}

/// PATCH で指定する操作種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Approve,
    Reject,
    Reassign,
    InsertStep,
}

/// 承認操作リクエスト
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalActionBody {
    pub action:           ActionKind,
    pub comments:         Option<String>,
    pub new_approver_id:  Option<Uuid>,
    pub step_name:        Option<String>,
    pub expected_version: u32,
    pub user_id:          Uuid,
    pub role:             Role,
}

impl ApprovalActionBody {
    /// ドメインの操作型へ変換する
    fn to_action(&self) -> Result<ApprovalAction, ServiceError> {
        match self.action {
            ActionKind::Approve => Ok(ApprovalAction::Approve {
                comments: self.comments.clone(),
            }),
            ActionKind::Reject => Ok(ApprovalAction::Reject {
                comments: self.comments.clone(),
            }),
            ActionKind::Reassign => {
                let new_approver = self.new_approver_id.ok_or_else(|| {
                    ServiceError::BadRequest("newApproverId は必須です".to_string())
                })?;
                Ok(ApprovalAction::Reassign {
                    new_approver: UserId::from_uuid(new_approver),
                })
            }
            ActionKind::InsertStep => {
                let step_name = self.step_name.clone().ok_or_else(|| {
                    ServiceError::BadRequest("stepName は必須です".to_string())
                })?;
                let approver = self.new_approver_id.ok_or_else(|| {
                    ServiceError::BadRequest("newApproverId は必須です".to_string())
                })?;
                Ok(ApprovalAction::InsertStep {
                    step_name,
                    approver: UserId::from_uuid(approver),
                })
            }
        }
    }
}

/// 申請者指定 + ページングのクエリ
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyApprovalsQuery {
    pub user_id:  Uuid,
    pub page:     Option<u32>,
    pub per_page: Option<u32>,
}

/// 承認者指定のクエリ
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingQuery {
    pub user_id: Uuid,
}

/// 操作主体 + ページングのクエリ（全件一覧で使用）
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllApprovalsQuery {
    pub user_id:  Uuid,
    pub role:     Role,
    pub page:     Option<u32>,
    pub per_page: Option<u32>,
}

/// 操作主体のクエリ（削除系で使用）
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorQuery {
    pub user_id: Uuid,
    pub role:    Role,
}

impl ActorQuery {
    pub(crate) fn to_actor(&self) -> Actor {
        Actor::new(UserId::from_uuid(self.user_id), self.role)
    }
}

pub(crate) fn page_from(page: Option<u32>, per_page: Option<u32>) -> Page {
    Page::new(
        page.unwrap_or(1),
        per_page.unwrap_or(Page::DEFAULT_PER_PAGE),
    )
}

// ===== ハンドラ =====

/// 申請を作成する
///
/// ## エンドポイント
/// POST /approvals
pub async fn create_approval<R, P>(
    State(state): State<Arc<ApprovalState<R, P>>>,
    Json(body): Json<CreateApprovalBody>,
) -> Result<Response, ServiceError>
where
    R: ApprovalRequestRepository,
    P: AppraisalPeriodRepository,
{
    let request = state
        .usecase
        .create(CreateApprovalInput {
            requester:    UserId::from_uuid(body.user_id),
            request_type: body.request_type,
            details:      body.details,
            payload:      body.payload,
            approvers:    body.approvers.into_iter().map(UserId::from_uuid).collect(),
        })
        .await?;

    let dto = ApprovalRequestDto::from_request(&request)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(dto))).into_response())
}

/// 自分の申請一覧を取得する
///
/// ## エンドポイント
/// GET /approvals/my-approvals?userId={id}&page={n}&perPage={n}
pub async fn list_my_approvals<R, P>(
    State(state): State<Arc<ApprovalState<R, P>>>,
    Query(query): Query<MyApprovalsQuery>,
) -> Result<Response, ServiceError>
where
    R: ApprovalRequestRepository,
    P: AppraisalPeriodRepository,
{
    let page = page_from(query.page, query.per_page);
    let (requests, total) = state
        .usecase
        .list_my(UserId::from_uuid(query.user_id), page)
        .await?;

    let dtos = requests
        .iter()
        .map(ApprovalRequestDto::from_request)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(PageResponse::new(dtos, total, page.page(), page.per_page())).into_response())
}

/// 自分が承認者であるアクティブな申請一覧を取得する
///
/// ## エンドポイント
/// GET /approvals/pending?userId={id}
pub async fn list_pending_approvals<R, P>(
    State(state): State<Arc<ApprovalState<R, P>>>,
    Query(query): Query<PendingQuery>,
) -> Result<Response, ServiceError>
where
    R: ApprovalRequestRepository,
    P: AppraisalPeriodRepository,
{
    let requests = state
        .usecase
        .list_pending(UserId::from_uuid(query.user_id))
        .await?;

    let dtos = requests
        .iter()
        .map(ApprovalRequestDto::from_request)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(ApiResponse::new(dtos)).into_response())
}

/// 全申請一覧を取得する（管理者のみ）
///
/// ## エンドポイント
/// GET /approvals/all?userId={id}&role={role}&page={n}&perPage={n}
pub async fn list_all_approvals<R, P>(
    State(state): State<Arc<ApprovalState<R, P>>>,
    Query(query): Query<AllApprovalsQuery>,
) -> Result<Response, ServiceError>
where
    R: ApprovalRequestRepository,
    P: AppraisalPeriodRepository,
{
    let actor = Actor::new(UserId::from_uuid(query.user_id), query.role);
    let page = page_from(query.page, query.per_page);
    let (requests, total) = state.usecase.list_all(actor, page).await?;

    let dtos = requests
        .iter()
        .map(ApprovalRequestDto::from_request)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(PageResponse::new(dtos, total, page.page(), page.per_page())).into_response())
}

/// 申請を取得する
///
/// ## エンドポイント
/// GET /approvals/{id}
pub async fn get_approval<R, P>(
    State(state): State<Arc<ApprovalState<R, P>>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError>
where
    R: ApprovalRequestRepository,
    P: AppraisalPeriodRepository,
{
    let request = state
        .usecase
        .get(ApprovalRequestId::from_uuid(id))
        .await?;

    let dto = ApprovalRequestDto::from_request(&request)?;
    Ok(Json(ApiResponse::new(dto)).into_response())
}

/// 申請に承認操作を適用する
///
/// ## エンドポイント
/// PATCH /approvals/{id}/approve
pub async fn act_on_approval<R, P>(
    State(state): State<Arc<ApprovalState<R, P>>>,
    Path(id): Path<Uuid>,
    Json(body): Json<ApprovalActionBody>,
) -> Result<Response, ServiceError>
where
    R: ApprovalRequestRepository,
    P: AppraisalPeriodRepository,
{
    let action = body.to_action()?;
    let expected_version = Version::new(body.expected_version);

    let updated = state
        .usecase
        .act(ApprovalActionInput {
            id: ApprovalRequestId::from_uuid(id),
            actor: Actor::new(UserId::from_uuid(body.user_id), body.role),
            action,
            expected_version,
        })
        .await?;

    let dto = ApprovalRequestDto::from_request(&updated)?;
    Ok(Json(ApiResponse::new(dto)).into_response())
}

/// 申請を削除する（管理者のみ）
///
/// ## エンドポイント
/// DELETE /approvals/{id}?userId={id}&role={role}
pub async fn delete_approval<R, P>(
    State(state): State<Arc<ApprovalState<R, P>>>,
    Path(id): Path<Uuid>,
    Query(query): Query<ActorQuery>,
) -> Result<Response, ServiceError>
where
    R: ApprovalRequestRepository,
    P: AppraisalPeriodRepository,
{
    state
        .usecase
        .delete(ApprovalRequestId::from_uuid(id), query.to_actor())
        .await?;

    Ok(Json(serde_json::json!({ "message": "承認申請を削除しました" })).into_response())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_action_bodyのデシリアライズ() {
        let json = serde_json::json!({
            "action": "insert_step",
            "stepName": "部長確認",
            "newApproverId": Uuid::nil(),
            "expectedVersion": 2,
            "userId": Uuid::nil(),
            "role": "admin"
        });

        let body: ApprovalActionBody = serde_json::from_value(json).unwrap();

        assert_eq!(body.action, ActionKind::InsertStep);
        assert_eq!(body.expected_version, 2);
        assert_eq!(body.role, Role::Admin);
    }

    #[test]
    fn test_reassignでnew_approver_id未指定はbad_request() {
        let body = ApprovalActionBody {
            action:           ActionKind::Reassign,
            comments:         None,
            new_approver_id:  None,
            step_name:        None,
            expected_version: 1,
            user_id:          Uuid::nil(),
            role:             Role::Admin,
        };

        let result = body.to_action();

        assert!(matches!(result, Err(ServiceError::BadRequest(_))));
    }

    #[test]
    fn test_insert_stepでstep_name未指定はbad_request() {
        let body = ApprovalActionBody {
            action:           ActionKind::InsertStep,
            comments:         None,
            new_approver_id:  Some(Uuid::nil()),
            step_name:        None,
            expected_version: 1,
            user_id:          Uuid::nil(),
            role:             Role::Admin,
        };

        let result = body.to_action();

        assert!(matches!(result, Err(ServiceError::BadRequest(_))));
    }

    #[test]
    fn test_一覧レスポンスはページ情報がトップレベルに並ぶ() {
        let dto = ApprovalRequestDto {
            id: Uuid::nil(),
            requester_id: Uuid::nil(),
            request_type: ApprovalRequestType::Leave,
            details: "年次有給休暇".to_string(),
            payload: serde_json::json!({}),
            status: OverallStatus::Pending,
            current_approver_id: None,
            steps: vec![],
            version: 0,
            created_at: "2026-04-01T00:00:00+00:00".to_string(),
            updated_at: "2026-04-01T00:00:00+00:00".to_string(),
        };

        let json = serde_json::to_value(PageResponse::new(vec![dto], 1, 1, 20)).unwrap();

        assert!(json["data"].is_array());
        assert_eq!(json["total"], 1);
        assert_eq!(json["page"], 1);
        assert_eq!(json["pages"], 1);
    }

    #[test]
    fn test_page_fromは未指定をデフォルトにする() {
        let page = page_from(None, None);

        assert_eq!(page.page(), 1);
        assert_eq!(page.per_page(), Page::DEFAULT_PER_PAGE);
    }
}
