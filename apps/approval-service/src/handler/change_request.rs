//! # 変更申請 API ハンドラ
//!
//! 承認申請と構造的に対になる変更申請のエンドポイントを実装する。
//! 論理削除・復元・完全削除のライフサイクル操作を持つ。
//!
//! ## エンドポイント
//!
//! ```text
//! POST   /change-requests
//! GET    /change-requests
//! GET    /change-requests/{id}
//! PATCH  /change-requests/{id}/approve
//! DELETE /change-requests/{id}?userId={id}&role={role}            論理削除
//! POST   /change-requests/{id}/restore
//! DELETE /change-requests/{id}/permanent?userId={id}&role={role}  完全削除
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
    approval::{ChangeRequest, ChangeRequestAction, ChangeRequestId, OverallStatus},
    user::{Actor, Role, UserId},
    value_objects::Version,
};
use shinsei_infra::repository::ChangeRequestRepository;
use shinsei_shared::ApiResponse;
use uuid::Uuid;

use crate::{
    error::ServiceError,
    handler::approval::{ActorQuery, WorkflowStepDto},
    usecase::{ChangeRequestActionInput, ChangeRequestUseCaseImpl, CreateChangeRequestInput},
};

/// 変更申請ハンドラーの State
pub struct ChangeRequestState<R> {
    pub usecase: ChangeRequestUseCaseImpl<R>,
}

// ===== DTO =====

/// 変更申請 DTO
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequestDto {
    pub id:                  Uuid,
    pub requester_id:        Uuid,
    pub title:               String,
    pub details:             String,
    pub status:              OverallStatus,
    pub current_approver_id: Option<Uuid>,
    pub steps:               Vec<WorkflowStepDto>,
    pub version:             u32,
    pub deleted_at:          Option<String>,
    pub created_at:          String,
    pub updated_at:          String,
}

impl ChangeRequestDto {
    fn from_request(request: &ChangeRequest) -> Self {
        Self {
            id:                  *request.id().as_uuid(),
            requester_id:        *request.requester().as_uuid(),
            title:               request.title().as_str().to_string(),
            details:             request.details().as_str().to_string(),
            status:              request.overall_status(),
            current_approver_id: request.current_approver().map(|u| *u.as_uuid()),
            steps:               request
                .workflow()
                .iter()
                .map(WorkflowStepDto::from_step)
                .collect(),
            version:             request.version().as_u32(),
            deleted_at:          request.deleted_at().map(|t| t.to_rfc3339()),
            created_at:          request.created_at().to_rfc3339(),
            updated_at:          request.updated_at().to_rfc3339(),
        }
    }
}

// ===== リクエスト型 =====

/// 変更申請作成リクエスト
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChangeRequestBody {
    pub user_id:   Uuid,
    pub title:     String,
    pub details:   String,
    pub approvers: Vec<Uuid>,
}

/// 変更申請への操作種別（承認・却下のみ）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeActionKind {
    Approve,
    Reject,
}

/// 変更申請への承認操作リクエスト
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequestActionBody {
    pub action:           ChangeActionKind,
    pub comments:         Option<String>,
    pub expected_version: u32,
    pub user_id:          Uuid,
    pub role:             Role,
}

/// 操作主体のみのリクエスト（復元で使用）
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorBody {
    pub user_id: Uuid,
    pub role:    Role,
}

// ===== ハンドラ =====

/// 変更申請を作成する
///
/// ## エンドポイント
/// POST /change-requests
pub async fn create_change_request<R>(
    State(state): State<Arc<ChangeRequestState<R>>>,
    Json(body): Json<CreateChangeRequestBody>,
) -> Result<Response, ServiceError>
where
    R: ChangeRequestRepository,
{
    let request = state
        .usecase
        .create(CreateChangeRequestInput {
            requester: UserId::from_uuid(body.user_id),
            title:     body.title,
            details:   body.details,
            approvers: body.approvers.into_iter().map(UserId::from_uuid).collect(),
        })
        .await?;

    let dto = ChangeRequestDto::from_request(&request);
    Ok((StatusCode::CREATED, Json(ApiResponse::new(dto))).into_response())
}

/// 論理削除されていない変更申請の一覧を取得する
///
/// ## エンドポイント
/// GET /change-requests
pub async fn list_change_requests<R>(
    State(state): State<Arc<ChangeRequestState<R>>>,
) -> Result<Response, ServiceError>
where
    R: ChangeRequestRepository,
{
    let requests = state.usecase.list_active().await?;

    let dtos: Vec<ChangeRequestDto> =
        requests.iter().map(ChangeRequestDto::from_request).collect();

    Ok(Json(ApiResponse::new(dtos)).into_response())
}

/// 変更申請を取得する
///
/// ## エンドポイント
/// GET /change-requests/{id}
pub async fn get_change_request<R>(
    State(state): State<Arc<ChangeRequestState<R>>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError>
where
    R: ChangeRequestRepository,
{
    let request = state.usecase.get(ChangeRequestId::from_uuid(id)).await?;

    let dto = ChangeRequestDto::from_request(&request);
    Ok(Json(ApiResponse::new(dto)).into_response())
}

/// 変更申請に承認操作を適用する
///
/// ## エンドポイント
/// PATCH /change-requests/{id}/approve
pub async fn act_on_change_request<R>(
    State(state): State<Arc<ChangeRequestState<R>>>,
    Path(id): Path<Uuid>,
    Json(body): Json<ChangeRequestActionBody>,
) -> Result<Response, ServiceError>
where
    R: ChangeRequestRepository,
{
    let action = match body.action {
        ChangeActionKind::Approve => ChangeRequestAction::Approve {
            comments: body.comments,
        },
        ChangeActionKind::Reject => ChangeRequestAction::Reject {
            comments: body.comments,
        },
    };

    let updated = state
        .usecase
        .act(ChangeRequestActionInput {
            id: ChangeRequestId::from_uuid(id),
            actor: Actor::new(UserId::from_uuid(body.user_id), body.role),
            action,
            expected_version: Version::new(body.expected_version),
        })
        .await?;

    let dto = ChangeRequestDto::from_request(&updated);
    Ok(Json(ApiResponse::new(dto)).into_response())
}

/// 変更申請を論理削除する
///
/// ## エンドポイント
/// DELETE /change-requests/{id}?userId={id}&role={role}
pub async fn soft_delete_change_request<R>(
    State(state): State<Arc<ChangeRequestState<R>>>,
    Path(id): Path<Uuid>,
    Query(query): Query<ActorQuery>,
) -> Result<Response, ServiceError>
where
    R: ChangeRequestRepository,
{
    let deleted = state
        .usecase
        .soft_delete(ChangeRequestId::from_uuid(id), query.to_actor())
        .await?;

    let dto = ChangeRequestDto::from_request(&deleted);
    Ok(Json(ApiResponse::new(dto)).into_response())
}

/// 論理削除された変更申請を復元する
///
/// ## エンドポイント
/// POST /change-requests/{id}/restore
pub async fn restore_change_request<R>(
    State(state): State<Arc<ChangeRequestState<R>>>,
    Path(id): Path<Uuid>,
    Json(body): Json<ActorBody>,
) -> Result<Response, ServiceError>
where
    R: ChangeRequestRepository,
{
    let restored = state
        .usecase
        .restore(
            ChangeRequestId::from_uuid(id),
            Actor::new(UserId::from_uuid(body.user_id), body.role),
        )
        .await?;

    let dto = ChangeRequestDto::from_request(&restored);
    Ok(Json(ApiResponse::new(dto)).into_response())
}

/// 変更申請を完全削除する
///
/// ## エンドポイント
/// DELETE /change-requests/{id}/permanent?userId={id}&role={role}
pub async fn permanently_delete_change_request<R>(
    State(state): State<Arc<ChangeRequestState<R>>>,
    Path(id): Path<Uuid>,
    Query(query): Query<ActorQuery>,
) -> Result<Response, ServiceError>
where
    R: ChangeRequestRepository,
{
    state
        .usecase
        .delete_permanently(ChangeRequestId::from_uuid(id), query.to_actor())
        .await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}
