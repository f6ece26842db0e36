//! # Approval Service エラー定義
//!
//! サービス固有のエラーと、HTTP レスポンスへの変換を定義する。
//!
//! ## ステータスコード対応
//!
//! | エラー | ステータス |
//! |--------|-----------|
//! | `BadRequest` / `Validation` | 400 |
//! | `Forbidden` | 403 |
//! | `NotFound` | 404 |
//! | `Conflict` / 楽観的ロック失敗 | 409 |
//! | `Database` / `Internal` | 500（detail は固定文言） |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use shinsei_domain::{DomainError, FieldError};
use shinsei_infra::InfraError;
use shinsei_shared::{ErrorResponse, FieldErrorDetail};
use thiserror::Error;

/// Approval Service で発生するエラー
#[derive(Debug, Error)]
pub enum ServiceError {
    /// 不正なリクエスト
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),

    /// フィールド単位のバリデーションエラー
    #[error("入力が不正です")]
    Validation(Vec<FieldError>),

    /// リソースが見つからない
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// 権限不足
    #[error("権限がありません: {0}")]
    Forbidden(String),

    /// 競合（楽観的ロック失敗・状態遷移違反）
    #[error("競合が発生しました: {0}")]
    Conflict(String),

    /// インフラ層エラー
    #[error("インフラエラー: {0}")]
    Database(#[from] InfraError),

    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl From<DomainError> for ServiceError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(msg) | DomainError::InvalidWorkflow(msg) => {
                Self::BadRequest(msg)
            }
            DomainError::FieldValidation(errors) => Self::Validation(errors),
            DomainError::InvalidTransition(msg) | DomainError::Conflict(msg) => {
                Self::Conflict(msg)
            }
            DomainError::NotFound { entity_type, id } => {
                Self::NotFound(format!("{}(id={})が見つかりません", entity_type, id))
            }
            DomainError::Forbidden(msg) => Self::Forbidden(msg),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = match &self {
            ServiceError::BadRequest(msg) => ErrorResponse::bad_request(msg.clone()),
            ServiceError::Validation(errors) => ErrorResponse::validation_errors(
                "入力が不正です",
                errors
                    .iter()
                    .map(|e| FieldErrorDetail {
                        field:   e.field.clone(),
                        message: e.message.clone(),
                    })
                    .collect(),
            ),
            ServiceError::NotFound(msg) => ErrorResponse::not_found(msg.clone()),
            ServiceError::Forbidden(msg) => ErrorResponse::forbidden(msg.clone()),
            ServiceError::Conflict(msg) => ErrorResponse::conflict(msg.clone()),
            ServiceError::Database(e) => {
                if let Some((entity, id)) = e.as_conflict() {
                    ErrorResponse::conflict(format!(
                        "他の操作によって更新されています: {}(id={})",
                        entity, id
                    ))
                } else {
                    tracing::error!("インフラエラー: {}", e);
                    ErrorResponse::internal_error()
                }
            }
            ServiceError::Internal(msg) => {
                tracing::error!("内部エラー: {}", msg);
                ErrorResponse::internal_error()
            }
        };

        let status = StatusCode::from_u16(body.status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}
