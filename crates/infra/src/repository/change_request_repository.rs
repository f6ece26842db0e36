//! # ChangeRequestRepository
//!
//! 変更申請の永続化を担当するリポジトリ。
//!
//! 承認申請と同じ集約単位の JSONB 永続化 + 楽観的ロック構成に加え、
//! `deleted_at` による論理削除をサポートする。
//! 既定の検索は論理削除済みの行を除外する。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shinsei_domain::{
    approval::{ChangeRequest, ChangeRequestId, ChangeRequestRecord},
    user::UserId,
    value_objects::Version,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// 変更申請リポジトリトレイト
#[async_trait]
pub trait ChangeRequestRepository: Send + Sync {
    /// 変更申請を新規保存する
    async fn insert(&self, request: &ChangeRequest) -> Result<(), InfraError>;

    /// ID で変更申請を取得する
    ///
    /// `include_deleted` が `false` の場合、論理削除済みの行は
    /// 見つからなかったものとして扱う。
    async fn find_by_id(
        &self,
        id: &ChangeRequestId,
        include_deleted: bool,
    ) -> Result<Option<ChangeRequest>, InfraError>;

    /// 論理削除されていない変更申請の一覧を取得する（新しい順）
    async fn find_active(&self) -> Result<Vec<ChangeRequest>, InfraError>;

    /// バージョンチェック付きで変更申請を更新する
    ///
    /// # エラー
    ///
    /// DB 上のバージョンが `expected_version` と一致しない場合は
    /// `InfraError::Conflict` を返す。
    async fn update_with_version_check(
        &self,
        request: &ChangeRequest,
        expected_version: Version,
    ) -> Result<(), InfraError>;

    /// 変更申請を物理削除する
    ///
    /// # 戻り値
    ///
    /// 削除された場合は `true`、該当行がない場合は `false`。
    async fn delete_permanently(&self, id: &ChangeRequestId) -> Result<bool, InfraError>;
}

/// PostgreSQL 実装の ChangeRequestRepository
#[derive(Debug, Clone)]
pub struct PostgresChangeRequestRepository {
    pool: PgPool,
}

impl PostgresChangeRequestRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// SELECT 結果の行
#[derive(Debug, sqlx::FromRow)]
struct ChangeRequestRow {
    id:           Uuid,
    requester_id: Uuid,
    title:        String,
    details:      String,
    workflow:     serde_json::Value,
    version:      i32,
    deleted_at:   Option<DateTime<Utc>>,
    created_at:   DateTime<Utc>,
    updated_at:   DateTime<Utc>,
}

const SELECT_COLUMNS: &str =
    "id, requester_id, title, details, workflow, version, deleted_at, created_at, updated_at";

impl TryFrom<ChangeRequestRow> for ChangeRequest {
    type Error = InfraError;

    fn try_from(row: ChangeRequestRow) -> Result<Self, Self::Error> {
        let record = ChangeRequestRecord {
            id:         ChangeRequestId::from_uuid(row.id),
            requester:  UserId::from_uuid(row.requester_id),
            title:      row.title,
            details:    row.details,
            workflow:   serde_json::from_value(row.workflow)?,
            version:    Version::try_from(row.version)
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        };

        ChangeRequest::from_db(record).map_err(|e| InfraError::unexpected(e.to_string()))
    }
}

#[async_trait]
impl ChangeRequestRepository for PostgresChangeRequestRepository {
    async fn insert(&self, request: &ChangeRequest) -> Result<(), InfraError> {
        let workflow = serde_json::to_value(request.workflow())?;

        sqlx::query(
            r#"
            INSERT INTO change_requests (
                id, requester_id, title, details,
                workflow, status, current_approver_id,
                version, deleted_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(request.id().as_uuid())
        .bind(request.requester().as_uuid())
        .bind(request.title().as_str())
        .bind(request.details().as_str())
        .bind(workflow)
        .bind(request.overall_status().to_string())
        .bind(request.current_approver().map(|u| *u.as_uuid()))
        .bind(request.version().as_i32())
        .bind(request.deleted_at())
        .bind(request.created_at())
        .bind(request.updated_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &ChangeRequestId,
        include_deleted: bool,
    ) -> Result<Option<ChangeRequest>, InfraError> {
        let filter = if include_deleted {
            ""
        } else {
            " AND deleted_at IS NULL"
        };

        let row: Option<ChangeRequestRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM change_requests WHERE id = $1{filter}"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ChangeRequest::try_from).transpose()
    }

    async fn find_active(&self) -> Result<Vec<ChangeRequest>, InfraError> {
        let rows: Vec<ChangeRequestRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM change_requests
            WHERE deleted_at IS NULL
            ORDER BY created_at DESC
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ChangeRequest::try_from).collect()
    }

    async fn update_with_version_check(
        &self,
        request: &ChangeRequest,
        expected_version: Version,
    ) -> Result<(), InfraError> {
        let workflow = serde_json::to_value(request.workflow())?;

        let result = sqlx::query(
            r#"
            UPDATE change_requests SET
                workflow = $1,
                status = $2,
                current_approver_id = $3,
                version = $4,
                deleted_at = $5,
                updated_at = $6
            WHERE id = $7 AND version = $8
            "#,
        )
        .bind(workflow)
        .bind(request.overall_status().to_string())
        .bind(request.current_approver().map(|u| *u.as_uuid()))
        .bind(request.version().as_i32())
        .bind(request.deleted_at())
        .bind(request.updated_at())
        .bind(request.id().as_uuid())
        .bind(expected_version.as_i32())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict(
                "ChangeRequest",
                request.id().to_string(),
            ));
        }
        Ok(())
    }

    async fn delete_permanently(&self, id: &ChangeRequestId) -> Result<bool, InfraError> {
        let result = sqlx::query("DELETE FROM change_requests WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
